// Shared trait + fetch pipeline for venue adapters

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use crate::engine::book::VenueBook;
use crate::engine::types::{PriceLevel, Venue};
use crate::market_data::error::{FetchError, FetchResult};
use crate::market_data::governor::{Admission, RateGovernor};
use crate::market_data::retry::{fetch_with_retry, AttemptOutcome, RetryPolicy};
use crate::market_data::transport::Transport;

/// Unsorted (bids, asks) as they came off the wire.
pub type RawLevels = (Vec<PriceLevel>, Vec<PriceLevel>);

/// Venue-specific knowledge: where the book lives and how its payload is laid out.
pub trait VenueAdapter: Send + Sync {
    fn venue(&self) -> Venue;
    /// Key the rate governor tracks this endpoint under.
    fn endpoint_key(&self) -> &str;
    fn url(&self) -> &str;
    fn parse_levels(&self, body: &[u8]) -> FetchResult<RawLevels>;
}

/// Everything a fetch needs besides the adapter itself.
#[derive(Clone)]
pub struct FetchContext {
    pub transport: Arc<dyn Transport>,
    pub governor: Arc<RateGovernor>,
    pub retry: RetryPolicy,
}

/// Fetch, parse and sort one venue's book.
#[instrument(skip_all, fields(venue = %adapter.venue()))]
pub async fn get_order_book(
    adapter: &dyn VenueAdapter,
    ctx: &FetchContext,
) -> FetchResult<VenueBook> {
    let started = Instant::now();
    let key = adapter.endpoint_key();
    let url = adapter.url();

    let body = fetch_with_retry(&ctx.retry, ctx.governor.clock().as_ref(), key, || async move {
        if let Admission::Throttled { .. } = ctx.governor.admit(key) {
            return AttemptOutcome::Throttled;
        }
        match ctx.transport.raw_get(url).await {
            Ok(resp) if resp.is_success() => AttemptOutcome::Success(resp.body),
            Ok(resp) if resp.is_rate_limited() => AttemptOutcome::Throttled,
            Ok(resp) => AttemptOutcome::Unexpected(format!("HTTP {}", resp.status)),
            Err(e) => AttemptOutcome::Unexpected(e.to_string()),
        }
    })
    .await
    .inspect_err(|e| count_failure(key, e))?;

    let (bids, asks) = adapter.parse_levels(&body).inspect_err(|e| count_failure(key, e))?;
    let book = VenueBook::new(adapter.venue(), bids, asks);

    metrics::histogram!("sorx_fetch_seconds", "venue" => adapter.venue().as_str())
        .record(started.elapsed().as_secs_f64());
    debug!(bids = book.bids.len(), asks = book.asks.len(), "Fetched venue book");
    Ok(book)
}

fn count_failure(endpoint: &str, error: &FetchError) {
    metrics::counter!(
        "sorx_fetch_failures_total",
        "endpoint" => endpoint.to_owned(),
        "reason" => error.kind()
    )
    .increment(1);
}

/// Deserialize a venue payload, mapping any serde failure to `MalformedPayload`.
pub(crate) fn decode<'a, T: serde::Deserialize<'a>>(
    venue: Venue,
    body: &'a [u8],
) -> FetchResult<T> {
    serde_json::from_slice(body).map_err(|e| FetchError::malformed(venue, e))
}

pub mod coinbase;
pub mod coinbase_types;
pub mod gemini;
pub mod gemini_types;
