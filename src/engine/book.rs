use std::borrow::Cow;
use std::cmp::Ordering;

use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::engine::types::{BookSide, Ladder, PriceLevel, Side, Venue};

/// One venue's snapshot, as returned by a venue adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueBook {
    pub venue: Venue,
    pub bids: Ladder,
    pub asks: Ladder,
}

impl VenueBook {
    pub fn new(venue: Venue, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            venue,
            bids: Ladder::new(BookSide::Bid, bids),
            asks: Ladder::new(BookSide::Ask, asks),
        }
    }

    pub fn ladder(&self, side: BookSide) -> &Ladder {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }
}

/// Merge several ladders of one side into a single ladder.
///
/// Levels are never collapsed across venues, so two venues quoting the same
/// price show up as two entries. Inputs built for the other side are re-sorted
/// before merging.
#[instrument(level = "trace", skip(ladders), fields(inputs = ladders.len()))]
pub fn aggregate(ladders: &[&Ladder], side: BookSide) -> Ladder {
    let sorted: Vec<Cow<'_, Ladder>> = ladders
        .iter()
        .map(|ladder| {
            if ladder.side() == side {
                Cow::Borrowed(*ladder)
            } else {
                trace!(expected = side.as_str(), got = ladder.side().as_str(), "re-sorting ladder");
                Cow::Owned(Ladder::new(side, ladder.levels().to_vec()))
            }
        })
        .collect();

    let levels: Vec<PriceLevel> = sorted
        .iter()
        .map(|ladder| ladder.iter())
        .kmerge_by(|a, b| side.rank(&a.price, &b.price) == Ordering::Less)
        .cloned()
        .collect();

    Ladder::from_sorted(side, levels)
}

/// Virtual book combining every venue's liquidity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedBook {
    pub bids: Ladder,
    pub asks: Ladder,
    pub venues: Vec<Venue>,
}

impl AggregatedBook {
    pub fn from_venue_books(books: &[VenueBook]) -> Self {
        let bids: Vec<&Ladder> = books.iter().map(|b| &b.bids).collect();
        let asks: Vec<&Ladder> = books.iter().map(|b| &b.asks).collect();
        let book = Self {
            bids: aggregate(&bids, BookSide::Bid),
            asks: aggregate(&asks, BookSide::Ask),
            venues: books.iter().map(|b| b.venue).collect(),
        };
        debug!(
            venues = book.venues.len(),
            bid_levels = book.bids.len(),
            ask_levels = book.asks.len(),
            "Aggregated venue books"
        );
        book
    }

    pub fn ladder(&self, side: BookSide) -> &Ladder {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// The ladder a taker on `side` consumes.
    pub fn ladder_for(&self, side: Side) -> &Ladder {
        self.ladder(side.consumes())
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.best()
    }

    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask.price - bid.price)
    }

    pub fn depth(&self, side: BookSide) -> Decimal {
        self.ladder(side).total_quantity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn gemini() -> VenueBook {
        VenueBook::new(
            Venue::Gemini,
            vec![
                PriceLevel::new(dec!(100), dec!(1), Venue::Gemini),
                PriceLevel::new(dec!(99), dec!(2), Venue::Gemini),
            ],
            vec![
                PriceLevel::new(dec!(101), dec!(1), Venue::Gemini),
                PriceLevel::new(dec!(102), dec!(3), Venue::Gemini),
            ],
        )
    }

    fn coinbase() -> VenueBook {
        VenueBook::new(
            Venue::Coinbase,
            vec![PriceLevel::new(dec!(100.5), dec!(0.5), Venue::Coinbase)],
            vec![PriceLevel::new(dec!(101.5), dec!(2), Venue::Coinbase)],
        )
    }

    fn prices(ladder: &Ladder) -> Vec<Decimal> {
        ladder.iter().map(|l| l.price).collect()
    }

    #[test]
    fn test_aggregate_two_venues() {
        let book = AggregatedBook::from_venue_books(&[gemini(), coinbase()]);
        assert_eq!(prices(&book.asks), vec![dec!(101), dec!(101.5), dec!(102)]);
        assert_eq!(prices(&book.bids), vec![dec!(100.5), dec!(100), dec!(99)]);
        assert_eq!(book.venues, vec![Venue::Gemini, Venue::Coinbase]);
        assert_eq!(book.spread(), Some(dec!(0.5)));
        assert_eq!(book.depth(BookSide::Ask), dec!(6));
    }

    #[test]
    fn test_equal_prices_not_collapsed() {
        let a = VenueBook::new(
            Venue::Gemini,
            vec![PriceLevel::new(dec!(100), dec!(1), Venue::Gemini)],
            vec![],
        );
        let b = VenueBook::new(
            Venue::Coinbase,
            vec![PriceLevel::new(dec!(100), dec!(4), Venue::Coinbase)],
            vec![],
        );
        let book = AggregatedBook::from_venue_books(&[a, b]);
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.depth(BookSide::Bid), dec!(5));
        assert!(book.asks.is_empty());
        assert_eq!(book.spread(), None);
    }

    #[test]
    fn test_aggregate_resorts_mismatched_side() {
        let asks = Ladder::new(
            BookSide::Ask,
            vec![
                PriceLevel::new(dec!(1), dec!(1), Venue::Gemini),
                PriceLevel::new(dec!(3), dec!(1), Venue::Gemini),
            ],
        );
        let bids =
            Ladder::new(BookSide::Bid, vec![PriceLevel::new(dec!(2), dec!(1), Venue::Coinbase)]);
        let merged = aggregate(&[&asks, &bids], BookSide::Bid);
        assert_eq!(prices(&merged), vec![dec!(3), dec!(2), dec!(1)]);
        assert_eq!(merged.side(), BookSide::Bid);
    }

    #[test]
    fn test_aggregate_no_inputs() {
        let merged = aggregate(&[], BookSide::Ask);
        assert!(merged.is_empty());
    }

    fn arb_levels(venue: Venue) -> impl Strategy<Value = Vec<PriceLevel>> {
        prop::collection::vec((1i64..1_000_000, 0i64..10_000), 0..20).prop_map(move |raw| {
            raw.into_iter()
                .map(|(p, q)| PriceLevel::new(Decimal::new(p, 2), Decimal::new(q, 3), venue))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_aggregate_sorted_and_idempotent(
            g_bids in arb_levels(Venue::Gemini),
            g_asks in arb_levels(Venue::Gemini),
            c_bids in arb_levels(Venue::Coinbase),
            c_asks in arb_levels(Venue::Coinbase),
        ) {
            let books = vec![
                VenueBook::new(Venue::Gemini, g_bids, g_asks),
                VenueBook::new(Venue::Coinbase, c_bids, c_asks),
            ];
            let first = AggregatedBook::from_venue_books(&books);
            let second = AggregatedBook::from_venue_books(&books);
            prop_assert!(first.bids.is_sorted());
            prop_assert!(first.asks.is_sorted());
            prop_assert_eq!(first.bids.len(), books[0].bids.len() + books[1].bids.len());
            prop_assert_eq!(first.asks.len(), books[0].asks.len() + books[1].asks.len());
            prop_assert_eq!(first, second);
        }
    }
}
