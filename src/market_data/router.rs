// Router orchestrates adapters -> aggregated book -> simulated walks
use std::sync::Arc;

use config::ConfigError;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::RouterConfig;
use crate::engine::book::{AggregatedBook, VenueBook};
use crate::engine::simulator::walk;
use crate::engine::types::{BookError, BookSide, FillResult, Side};
use crate::market_data::adapters::coinbase::CoinbaseAdapter;
use crate::market_data::adapters::gemini::GeminiAdapter;
use crate::market_data::adapters::{get_order_book, FetchContext, VenueAdapter};
use crate::market_data::clock::Clock;
use crate::market_data::error::FetchResult;
use crate::market_data::governor::RateGovernor;
use crate::market_data::transport::Transport;

/// Which side(s) to quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RouteSide {
    Buy,
    Sell,
    Both,
}

impl RouteSide {
    pub fn sides(self) -> &'static [Side] {
        match self {
            RouteSide::Buy => &[Side::Buy],
            RouteSide::Sell => &[Side::Sell],
            RouteSide::Both => &[Side::Buy, Side::Sell],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideFill {
    pub side: Side,
    #[serde(serialize_with = "outcome_ser")]
    pub outcome: Result<FillResult, BookError>,
}

fn outcome_ser<S: serde::Serializer>(
    outcome: &Result<FillResult, BookError>,
    s: S,
) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    #[serde(rename_all = "lowercase")]
    enum Outcome<'a> {
        Filled(&'a FillResult),
        Error(String),
    }
    match outcome {
        Ok(fill) => Outcome::Filled(fill).serialize(s),
        Err(e) => Outcome::Error(e.to_string()).serialize(s),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteReport {
    pub requested: Decimal,
    pub book: AggregatedBook,
    pub fills: Vec<SideFill>,
}

impl RouteReport {
    pub fn all_filled(&self) -> bool {
        self.fills.iter().all(|f| f.outcome.is_ok())
    }
}

pub struct SmartOrderRouter {
    adapters: Vec<Box<dyn VenueAdapter>>,
    ctx: FetchContext,
}

impl SmartOrderRouter {
    pub fn new(adapters: Vec<Box<dyn VenueAdapter>>, ctx: FetchContext) -> Self {
        Self { adapters, ctx }
    }

    /// Build adapters for every enabled venue, sharing one governor.
    pub fn from_config(
        cfg: &RouterConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let normaliser = cfg.normaliser();
        let mut adapters: Vec<Box<dyn VenueAdapter>> = Vec::new();
        if cfg.gemini.enabled {
            let gemini = &cfg.gemini;
            adapters.push(Box::new(GeminiAdapter::new(
                &gemini.base_url,
                &gemini.symbol,
                normaliser,
            )));
        }
        if cfg.coinbase.enabled {
            let coinbase = &cfg.coinbase;
            adapters.push(Box::new(CoinbaseAdapter::new(
                &coinbase.base_url,
                &coinbase.symbol,
                normaliser,
            )));
        }
        let ctx = FetchContext {
            transport,
            governor: Arc::new(RateGovernor::new(cfg.min_interval()?, clock)),
            retry: cfg.retry_policy()?,
        };
        Ok(Self::new(adapters, ctx))
    }

    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.ctx.governor
    }

    pub fn adapters(&self) -> &[Box<dyn VenueAdapter>] {
        &self.adapters
    }

    /// Fetch every venue concurrently. Any venue failing fails the whole call:
    /// a quote over partial coverage is never produced.
    pub async fn fetch_books(&self) -> FetchResult<Vec<VenueBook>> {
        try_join_all(self.adapters.iter().map(|a| get_order_book(a.as_ref(), &self.ctx))).await
    }

    pub async fn aggregated_book(&self) -> FetchResult<AggregatedBook> {
        let books = self.fetch_books().await?;
        let book = AggregatedBook::from_venue_books(&books);
        metrics::gauge!("sorx_book_levels", "side" => BookSide::Bid.as_str())
            .set(book.bids.len() as f64);
        metrics::gauge!("sorx_book_levels", "side" => BookSide::Ask.as_str())
            .set(book.asks.len() as f64);
        Ok(book)
    }

    /// Fetch, aggregate and walk each requested side against the same book.
    /// A walk failing only affects its own entry in the report.
    #[instrument(skip(self), fields(venues = self.adapters.len()))]
    pub async fn run(&self, quantity: Decimal, side: RouteSide) -> FetchResult<RouteReport> {
        let book = self.aggregated_book().await?;
        let fills: Vec<SideFill> = side
            .sides()
            .iter()
            .map(|&s| SideFill { side: s, outcome: walk(quantity, s, &book) })
            .collect();
        info!(
            best_bid = ?book.best_bid().map(|l| l.price),
            best_ask = ?book.best_ask().map(|l| l.price),
            filled = fills.iter().filter(|f| f.outcome.is_ok()).count(),
            "Route complete"
        );
        Ok(RouteReport { requested: quantity, book, fills })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Venue;
    use crate::market_data::clock::ManualClock;
    use crate::market_data::error::FetchError;
    use crate::market_data::transport::StaticTransport;
    use rust_decimal_macros::dec;

    const GEMINI: &str = "https://gemini.test/v1/book/BTCUSD";
    const COINBASE: &str = "https://coinbase.test/products/BTC-USD/book?level=2";

    fn config() -> RouterConfig {
        let mut cfg = RouterConfig::default();
        cfg.gemini.base_url = "https://gemini.test".into();
        cfg.coinbase.base_url = "https://coinbase.test".into();
        cfg
    }

    const GEMINI_BOOK: &str =
        r#"{"bids":[{"price":"100","amount":"1"}],"asks":[{"price":"101","amount":"1"}]}"#;
    const COINBASE_BOOK: &str = r#"{"bids":[["100.5","0.5",1]],"asks":[["101.5","2",1]]}"#;

    fn transport() -> StaticTransport {
        StaticTransport::new()
            .with_response(GEMINI, 200, GEMINI_BOOK)
            .with_response(COINBASE, 200, COINBASE_BOOK)
    }

    fn build_router(cfg: &RouterConfig, transport: StaticTransport) -> SmartOrderRouter {
        let clock = Arc::new(ManualClock::new());
        SmartOrderRouter::from_config(cfg, Arc::new(transport), clock).unwrap()
    }

    #[test]
    fn test_route_side_expansion() {
        assert_eq!(RouteSide::Both.sides(), &[Side::Buy, Side::Sell]);
        assert_eq!(RouteSide::Sell.sides(), &[Side::Sell]);
    }

    #[test]
    fn test_from_config_respects_enabled() {
        let mut cfg = config();
        cfg.coinbase.enabled = false;
        let router = build_router(&cfg, transport());
        assert_eq!(router.adapters().len(), 1);
        assert_eq!(router.adapters()[0].venue(), Venue::Gemini);
    }

    #[tokio::test]
    async fn test_run_both() {
        let router = build_router(&config(), transport());
        let report = router.run(dec!(1), RouteSide::Both).await.unwrap();
        assert_eq!(report.fills.len(), 2);
        assert!(report.all_filled());
        let buy = report.fills[0].outcome.as_ref().unwrap();
        let sell = report.fills[1].outcome.as_ref().unwrap();
        assert_eq!(buy.average_price, dec!(101));
        // 0.5 @ 100.5 + 0.5 @ 100
        assert_eq!(sell.average_price, dec!(100.25));
    }

    #[tokio::test]
    async fn test_one_venue_failing_fails_run() {
        let t = StaticTransport::new()
            .with_response(GEMINI, 200, r#"{"bids":[],"asks":[]}"#)
            .with_response(COINBASE, 500, "oops");
        let router = build_router(&config(), t);
        let err = router.run(dec!(1), RouteSide::Buy).await.unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedResponse { .. }));
    }

    #[tokio::test]
    async fn test_walk_failure_is_per_side() {
        let t = StaticTransport::new()
            .with_response(GEMINI, 200, r#"{"bids":[{"price":"100","amount":"1"}],"asks":[]}"#)
            .with_response(COINBASE, 200, r#"{"bids":[],"asks":[]}"#);
        let router = build_router(&config(), t);
        let report = router.run(dec!(1), RouteSide::Both).await.unwrap();
        assert_eq!(report.fills[0].outcome, Err(BookError::NoLiquidity { side: Side::Buy }));
        assert!(report.fills[1].outcome.is_ok());
        assert!(!report.all_filled());

        let json = serde_json::to_value(&report.fills).unwrap();
        assert_eq!(json[0]["outcome"]["error"], "no liquidity available to buy");
        assert_eq!(json[1]["side"], "sell");
    }
}
