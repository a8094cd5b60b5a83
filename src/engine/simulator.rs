use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::engine::book::AggregatedBook;
use crate::engine::types::{BookError, FillResult, Side, VenueFill};

/// Simulate taking `target_quantity` on `side` against the aggregated book.
///
/// Buys consume asks and sells consume bids, best price first. When the book
/// runs out before the target is reached the result is a partial fill; callers
/// detect it with [`FillResult::is_partial`].
#[instrument(level = "debug", skip_all, fields(%side, %target_quantity))]
pub fn walk(
    target_quantity: Decimal,
    side: Side,
    book: &AggregatedBook,
) -> Result<FillResult, BookError> {
    if target_quantity <= Decimal::ZERO {
        let error = BookError::InvalidQuantity { quantity: target_quantity };
        warn!(error = %error, "Rejecting walk");
        return Err(error);
    }

    let ladder = book.ladder_for(side);
    let mut filled = Decimal::ZERO;
    let mut notional = Decimal::ZERO;
    let mut best_price: Option<Decimal> = None;
    let mut worst_price = Decimal::ZERO;
    let mut levels_consumed = 0usize;
    let mut allocations: Vec<VenueFill> = Vec::new();

    for level in ladder {
        if filled >= target_quantity {
            break;
        }
        let take = level.quantity.min(target_quantity - filled);
        if take.is_zero() {
            continue;
        }
        let overflow = || {
            let error = BookError::Overflow { side };
            warn!(error = %error, price = %level.price, qty = %take, "Aborting walk");
            error
        };
        let cost = level.price.checked_mul(take).ok_or_else(overflow)?;
        notional = notional.checked_add(cost).ok_or_else(overflow)?;
        filled += take;
        levels_consumed += 1;
        best_price.get_or_insert(level.price);
        worst_price = level.price;

        // venue totals never exceed the walk totals, which were checked above
        match allocations.iter_mut().find(|a| a.venue == level.venue) {
            Some(alloc) => {
                alloc.quantity += take;
                alloc.notional += cost;
            }
            None => {
                allocations.push(VenueFill { venue: level.venue, quantity: take, notional: cost })
            }
        }
        debug!(venue = %level.venue, price = %level.price, qty = %take, "Consumed level");
    }

    let Some(best_price) = best_price else {
        let error = BookError::NoLiquidity { side };
        warn!(error = %error, levels = ladder.len(), "Nothing filled");
        return Err(error);
    };

    let result = FillResult {
        side,
        requested_quantity: target_quantity,
        filled_quantity: filled,
        average_price: notional / filled,
        notional,
        best_price,
        worst_price,
        levels_consumed,
        allocations,
    };

    if result.is_partial() {
        warn!(
            filled = %result.filled_quantity,
            shortfall = %result.shortfall(),
            "Partial fill - insufficient liquidity"
        );
    } else {
        debug!(avg = %result.average_price, levels = levels_consumed, "Walk fully filled");
    }
    Ok(result)
}
