use std::cmp::Ordering;
use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

/// Direction of the simulated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The book side a taker on this side consumes: buyers lift asks, sellers hit bids.
    pub fn consumes(self) -> BookSide {
        match self {
            Side::Buy => BookSide::Ask,
            Side::Sell => BookSide::Bid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a resting book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bid,
    Ask,
}

impl BookSide {
    /// Ordering of two prices from best to worst: bids high-to-low, asks low-to-high.
    pub fn rank(self, a: &Decimal, b: &Decimal) -> Ordering {
        match self {
            BookSide::Bid => b.cmp(a),
            BookSide::Ask => a.cmp(b),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookSide::Bid => "bid",
            BookSide::Ask => "ask",
        }
    }
}

/// Venues the router knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Gemini,
    Coinbase,
}

impl Venue {
    pub fn as_str(self) -> &'static str {
        match self {
            Venue::Gemini => "gemini",
            Venue::Coinbase => "coinbase",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resting liquidity at one price on one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
    pub venue: Venue,
}

impl PriceLevel {
    pub fn new(price: Decimal, quantity: Decimal, venue: Venue) -> Self {
        Self { price, quantity, venue }
    }
}

/// Price levels for one side of a book, always held best price first.
///
/// The only way to build a `Ladder` is through [`Ladder::new`], which sorts, so
/// a ladder handed out anywhere in the crate already satisfies the ordering
/// invariant. Equal prices are kept as distinct entries in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ladder {
    side: BookSide,
    levels: Vec<PriceLevel>,
}

impl Ladder {
    pub fn new(side: BookSide, mut levels: Vec<PriceLevel>) -> Self {
        levels.sort_by(|a, b| side.rank(&a.price, &b.price));
        Self { side, levels }
    }

    pub fn empty(side: BookSide) -> Self {
        Self { side, levels: Vec::new() }
    }

    /// Wraps levels the caller has already ordered (e.g. a k-way merge of ladders).
    pub(crate) fn from_sorted(side: BookSide, levels: Vec<PriceLevel>) -> Self {
        debug_assert!(levels
            .windows(2)
            .all(|w| side.rank(&w[0].price, &w[1].price) != Ordering::Greater));
        Self { side, levels }
    }

    pub fn side(&self) -> BookSide {
        self.side
    }

    pub fn levels(&self) -> &[PriceLevel] {
        &self.levels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceLevel> {
        self.levels.iter()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn best(&self) -> Option<&PriceLevel> {
        self.levels.first()
    }

    pub fn total_quantity(&self) -> Decimal {
        self.levels.iter().map(|l| l.quantity).sum()
    }

    /// True if every adjacent pair respects the side's ordering.
    pub fn is_sorted(&self) -> bool {
        self.levels
            .windows(2)
            .all(|w| self.side.rank(&w[0].price, &w[1].price) != Ordering::Greater)
    }
}

impl<'a> IntoIterator for &'a Ladder {
    type Item = &'a PriceLevel;
    type IntoIter = std::slice::Iter<'a, PriceLevel>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.iter()
    }
}

/// How much of a walk was sourced from one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueFill {
    pub venue: Venue,
    pub quantity: Decimal,
    pub notional: Decimal,
}

/// Outcome of walking a ladder for a target quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillResult {
    pub side: Side,
    pub requested_quantity: Decimal,
    pub filled_quantity: Decimal,
    /// Volume-weighted price over everything consumed.
    pub average_price: Decimal,
    pub notional: Decimal,
    pub best_price: Decimal,
    pub worst_price: Decimal,
    pub levels_consumed: usize,
    pub allocations: Vec<VenueFill>,
}

impl FillResult {
    pub fn is_partial(&self) -> bool {
        self.filled_quantity < self.requested_quantity
    }

    pub fn shortfall(&self) -> Decimal {
        self.requested_quantity - self.filled_quantity
    }
}

impl fmt::Display for FillResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:.2}` on a Decimal truncates, so round half away from zero first
        let avg = self
            .average_price
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{} {} {:.2}", self.filled_quantity.normalize(), self.side, avg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    #[error("no liquidity available to {side}")]
    NoLiquidity { side: Side },
    #[error("invalid quantity {quantity}: must be greater than zero")]
    InvalidQuantity { quantity: Decimal },
    #[error("notional overflow while walking {side}")]
    Overflow { side: Side },
}
