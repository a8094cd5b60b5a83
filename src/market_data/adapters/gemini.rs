use super::gemini_types::{GeminiBook, GeminiLevel};
use super::{decode, RawLevels, VenueAdapter};
use crate::engine::types::{PriceLevel, Venue};
use crate::market_data::error::{FetchError, FetchResult};
use crate::market_data::normaliser::Normaliser;

pub const DEFAULT_BASE_URL: &str = "https://api.gemini.com";

/// Gemini public order book. Levels are objects with named `price`/`amount`.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    pub symbol: String, // e.g. "BTCUSD"
    url: String,
    endpoint_key: String,
    normaliser: Normaliser,
}

impl GeminiAdapter {
    pub fn new(base_url: &str, symbol: &str, normaliser: Normaliser) -> Self {
        Self {
            symbol: symbol.to_string(),
            url: format!("{}/v1/book/{}", base_url.trim_end_matches('/'), symbol),
            endpoint_key: format!("{}:book:{}", Venue::Gemini, symbol),
            normaliser,
        }
    }

    fn norm_side(&self, side: &[GeminiLevel]) -> FetchResult<Vec<PriceLevel>> {
        side.iter()
            .map(|lvl| {
                self.normaliser
                    .level(Venue::Gemini, &lvl.price, &lvl.amount)
                    .map_err(|e| FetchError::malformed(Venue::Gemini, e))
            })
            .collect()
    }
}

impl VenueAdapter for GeminiAdapter {
    fn venue(&self) -> Venue {
        Venue::Gemini
    }

    fn endpoint_key(&self) -> &str {
        &self.endpoint_key
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse_levels(&self, body: &[u8]) -> FetchResult<RawLevels> {
        let book: GeminiBook = decode(Venue::Gemini, body)?;
        Ok((self.norm_side(&book.bids)?, self.norm_side(&book.asks)?))
    }
}
