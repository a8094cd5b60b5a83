use super::coinbase_types::{CoinbaseBook, CoinbaseLevel};
use super::{decode, RawLevels, VenueAdapter};
use crate::engine::types::{PriceLevel, Venue};
use crate::market_data::error::{FetchError, FetchResult};
use crate::market_data::normaliser::Normaliser;

pub const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";

/// Coinbase Exchange level-2 book. Levels are positional `[price, size, n]`.
#[derive(Debug, Clone)]
pub struct CoinbaseAdapter {
    pub product: String, // e.g. "BTC-USD"
    url: String,
    endpoint_key: String,
    normaliser: Normaliser,
}

impl CoinbaseAdapter {
    pub fn new(base_url: &str, product: &str, normaliser: Normaliser) -> Self {
        Self {
            product: product.to_string(),
            url: format!("{}/products/{}/book?level=2", base_url.trim_end_matches('/'), product),
            endpoint_key: format!("{}:book:{}", Venue::Coinbase, product),
            normaliser,
        }
    }

    fn norm_side(&self, side: &[CoinbaseLevel]) -> FetchResult<Vec<PriceLevel>> {
        side.iter()
            .enumerate()
            .map(|(i, lvl)| {
                let (Some(px), Some(sz)) = (lvl.field(0), lvl.field(1)) else {
                    let detail = format!("level {i} is not [price, size, ..]");
                    return Err(FetchError::malformed(Venue::Coinbase, detail));
                };
                self.normaliser
                    .level(Venue::Coinbase, &px, &sz)
                    .map_err(|e| FetchError::malformed(Venue::Coinbase, e))
            })
            .collect()
    }
}

impl VenueAdapter for CoinbaseAdapter {
    fn venue(&self) -> Venue {
        Venue::Coinbase
    }

    fn endpoint_key(&self) -> &str {
        &self.endpoint_key
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse_levels(&self, body: &[u8]) -> FetchResult<RawLevels> {
        let book: CoinbaseBook = decode(Venue::Coinbase, body)?;
        Ok((self.norm_side(&book.bids)?, self.norm_side(&book.asks)?))
    }
}
