// Source: https://docs.gemini.com/rest-api/#current-order-book (GET /v1/book/:symbol)
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GeminiBook {
    pub bids: Vec<GeminiLevel>,
    pub asks: Vec<GeminiLevel>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiLevel {
    pub price: String,  // e.g. "3607.85"
    pub amount: String, // e.g. "0.00253"
    #[serde(default)]
    pub timestamp: Option<String>, // deprecated by Gemini, always "0"-ish
}
