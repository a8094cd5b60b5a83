// Source: https://docs.cdp.coinbase.com/exchange/reference/exchangerestapi_getproductbook (level=2)
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CoinbaseBook {
    pub bids: Vec<CoinbaseLevel>,
    pub asks: Vec<CoinbaseLevel>,
    #[serde(default)]
    pub sequence: Option<u64>,
}

/// Positional level: `[price, size, num_orders]`. Kept loose so extra or
/// numeric entries don't break decoding.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct CoinbaseLevel(pub Vec<Value>);

impl CoinbaseLevel {
    /// Text of the entry at `idx`, accepting both JSON strings and numbers.
    pub fn field(&self, idx: usize) -> Option<String> {
        match self.0.get(idx)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
