//! Time-dependent order pricing.
//!
//! Prices move linearly from `start_price` at `start_time` to `end_price` at
//! `end_time`. All arithmetic is exact on whole base units; when the
//! interpolation does not land on a whole unit the remainder is rounded in
//! the maker's favour:
//!
//! | maker side | rounding | why it favours the maker |
//! |------------|----------|--------------------------|
//! | Sell       | up       | seller receives at least the curve price |
//! | Buy        | down     | buyer pays at most the curve price |

use bundlematch_types::{Amount, BundlematchError, Order, OrderSide, Result, constants};
use rust_decimal::Decimal;

/// Price of `order` at `at` (seconds since epoch).
///
/// # Errors
/// - [`BundlematchError::OrderExpiredOrNotStarted`] outside `[start_time, end_time]`
/// - [`BundlematchError::InvalidOrder`] on an empty window or arithmetic overflow
pub fn current_price(order: &Order, at: i64) -> Result<Amount> {
    if !order.is_live_at(at) {
        return Err(BundlematchError::OrderExpiredOrNotStarted {
            now: at,
            start_time: order.start_time,
            end_time: order.end_time,
        });
    }
    let duration = order.end_time - order.start_time;
    if duration <= 0 {
        return Err(BundlematchError::InvalidOrder {
            reason: format!("empty price window on {}", order.id),
        });
    }
    if order.start_price == order.end_price || at == order.start_time {
        return Ok(order.start_price);
    }
    if at == order.end_time {
        return Ok(order.end_price);
    }

    // Split `diff * elapsed / duration` as `q * elapsed + r * elapsed / duration`
    // with `diff = q * duration + r`, so no intermediate exceeds `diff` or
    // `duration^2`.
    let elapsed = Decimal::from(at - order.start_time);
    let duration = Decimal::from(duration);
    let diff = order
        .end_price
        .checked_sub(order.start_price)
        .ok_or_else(|| overflow(order))?;
    let r = diff.checked_rem(duration).ok_or_else(|| overflow(order))?;
    let q = (diff - r).checked_div(duration).ok_or_else(|| overflow(order))?;
    let partial = r.checked_mul(elapsed).ok_or_else(|| overflow(order))?;
    let remainder = partial.checked_rem(duration).ok_or_else(|| overflow(order))?;
    let quotient = q
        .checked_mul(elapsed)
        .and_then(|whole| {
            (partial - remainder)
                .checked_div(duration)
                .and_then(|frac| whole.checked_add(frac))
        })
        .ok_or_else(|| overflow(order))?;

    let mut price = order
        .start_price
        .checked_add(quotient)
        .ok_or_else(|| overflow(order))?;
    // `remainder` carries the sign of `diff`: positive means the exact price
    // lies just above `price`, negative just below.
    if !remainder.is_zero() {
        match (order.side, remainder.is_sign_positive()) {
            (OrderSide::Sell, true) => price += Decimal::ONE,
            (OrderSide::Buy, false) => price -= Decimal::ONE,
            _ => {}
        }
    }
    Ok(price.normalize())
}

/// Whether settling `order` at `price` with `fee` respects its signed floor.
///
/// Sell orders: the seller nets at least `min_bps_to_seller` of the price,
/// `(price - fee) * 10000 >= price * min_bps`.
/// Buy orders: the fee share of the buyer's total cost stays under the
/// complementary ceiling, `fee * 10000 <= price * (10000 - min_bps)`.
///
/// Returns `false` on violation or overflow, never an error.
#[must_use]
pub fn within_slippage_bound(order: &Order, price: Amount, fee: Amount) -> bool {
    let denominator = Decimal::from(constants::BPS_DENOMINATOR);
    let min_bps = Decimal::from(order.min_bps_to_seller);
    let check = || -> Option<bool> {
        match order.side {
            OrderSide::Sell => {
                let net = price.checked_sub(fee)?;
                Some(net.checked_mul(denominator)? >= price.checked_mul(min_bps)?)
            }
            OrderSide::Buy => {
                let ceiling_bps = denominator.checked_sub(min_bps)?;
                Some(fee.checked_mul(denominator)? <= price.checked_mul(ceiling_bps)?)
            }
        }
    };
    check().unwrap_or(false)
}

/// Curator fee: `price * fee_bps / 10000`, rounded down.
///
/// # Errors
/// [`BundlematchError::Internal`] if the product overflows.
pub fn curator_fee(price: Amount, fee_bps: u32) -> Result<Amount> {
    let denominator = Decimal::from(constants::BPS_DENOMINATOR);
    let scaled = price
        .checked_mul(Decimal::from(fee_bps))
        .ok_or_else(|| BundlematchError::Internal(format!("fee overflow on price {price}")))?;
    let remainder = scaled % denominator;
    Ok(((scaled - remainder) / denominator).normalize())
}

fn overflow(order: &Order) -> BundlematchError {
    BundlematchError::InvalidOrder {
        reason: format!("price arithmetic overflow on {}", order.id),
    }
}

#[cfg(test)]
mod tests {
    use bundlematch_types::Address;
    use rand::Rng;

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn whole(n: i128) -> Decimal {
        Decimal::from_i128_with_scale(n, 0)
    }

    fn decaying(side: OrderSide, start: i64, end: i64) -> Order {
        let mut order = Order::dummy(side, Address::repeat(1), dec(start), 1_000);
        order.end_price = dec(end);
        order.start_time = 1_000;
        order.end_time = 1_003;
        order
    }

    #[test]
    fn endpoints_are_exact() {
        for side in [OrderSide::Sell, OrderSide::Buy] {
            let order = decaying(side, 100, 0);
            assert_eq!(current_price(&order, 1_000).unwrap(), dec(100));
            assert_eq!(current_price(&order, 1_003).unwrap(), dec(0));
        }
    }

    #[test]
    fn constant_price_curve() {
        let order = Order::dummy(OrderSide::Sell, Address::repeat(1), dec(7), 0);
        assert_eq!(current_price(&order, 0).unwrap(), dec(7));
        assert_eq!(current_price(&order, 300).unwrap(), dec(7));
        assert_eq!(current_price(&order, 600).unwrap(), dec(7));
    }

    #[test]
    fn rounding_favours_maker_on_decay() {
        // Exact value at t=1001 is 66.67.
        let sell = decaying(OrderSide::Sell, 100, 0);
        let buy = decaying(OrderSide::Buy, 100, 0);
        assert_eq!(current_price(&sell, 1_001).unwrap(), dec(67));
        assert_eq!(current_price(&buy, 1_001).unwrap(), dec(66));
    }

    #[test]
    fn rounding_favours_maker_on_ramp() {
        // Exact value at t=1001 is 33.33.
        let sell = decaying(OrderSide::Sell, 0, 100);
        let buy = decaying(OrderSide::Buy, 0, 100);
        assert_eq!(current_price(&sell, 1_001).unwrap(), dec(34));
        assert_eq!(current_price(&buy, 1_001).unwrap(), dec(33));
    }

    #[test]
    fn outside_window_is_an_error() {
        let order = decaying(OrderSide::Sell, 100, 0);
        for at in [999, 1_004] {
            let err = current_price(&order, at).unwrap_err();
            assert!(
                matches!(err, BundlematchError::OrderExpiredOrNotStarted { now, .. } if now == at),
                "got {err:?}"
            );
        }
    }

    #[test]
    fn decay_is_monotonic_over_random_windows() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let start_price: i64 = rng.gen_range(0..1_000_000_000);
            let end_price: i64 = rng.gen_range(0..=start_price);
            let duration: i64 = rng.gen_range(1..100_000);
            for side in [OrderSide::Sell, OrderSide::Buy] {
                let mut order = Order::dummy(side, Address::repeat(1), dec(start_price), 0);
                order.end_price = dec(end_price);
                order.end_time = duration;

                let mut last = current_price(&order, 0).unwrap();
                assert_eq!(last, dec(start_price));
                let step = (duration / 20).max(1);
                let mut t = step;
                while t <= duration {
                    let p = current_price(&order, t).unwrap();
                    assert!(p <= last, "price rose from {last} to {p} at t={t}");
                    assert!(p >= dec(end_price));
                    last = p;
                    t += step;
                }
                assert_eq!(current_price(&order, duration).unwrap(), dec(end_price));
            }
        }
    }

    #[test]
    fn large_prices_interpolate_without_overflow() {
        // 1e27 base units decaying to 5e26 over one day.
        let start: i128 = 1_000_000_000_000_000_000_000_000_000;
        let end: i128 = start / 2;
        let day: i64 = 86_400;
        for side in [OrderSide::Sell, OrderSide::Buy] {
            let mut order = Order::dummy(side, Address::repeat(1), whole(start), 0);
            order.end_price = whole(end);
            order.end_time = day;

            assert_eq!(current_price(&order, 0).unwrap(), whole(start));
            assert_eq!(current_price(&order, day / 2).unwrap(), whole((start + end) / 2));
            assert_eq!(current_price(&order, day).unwrap(), whole(end));

            let step = (start - end) / i128::from(day);
            let expected = match side {
                OrderSide::Sell => start - step,
                OrderSide::Buy => start - step - 1,
            };
            assert_eq!(current_price(&order, 1).unwrap(), whole(expected));
        }
    }

    #[test]
    fn sell_slippage_floor() {
        let order = Order::dummy(OrderSide::Sell, Address::repeat(1), dec(10_000), 0);
        // min 9000 bps: seller must keep >= 9000 of 10000.
        assert!(within_slippage_bound(&order, dec(10_000), dec(150)));
        assert!(within_slippage_bound(&order, dec(10_000), dec(1_000)));
        assert!(!within_slippage_bound(&order, dec(10_000), dec(1_001)));
        assert!(!within_slippage_bound(&order, dec(10_000), dec(10_001)));
    }

    #[test]
    fn buy_fee_ceiling() {
        let order = Order::dummy(OrderSide::Buy, Address::repeat(1), dec(10_000), 0);
        assert!(within_slippage_bound(&order, dec(10_000), dec(1_000)));
        assert!(!within_slippage_bound(&order, dec(10_000), dec(1_001)));
    }

    #[test]
    fn zero_floor_accepts_any_fee() {
        let mut order = Order::dummy(OrderSide::Sell, Address::repeat(1), dec(100), 0);
        order.min_bps_to_seller = 0;
        assert!(within_slippage_bound(&order, dec(100), dec(100)));
    }

    #[test]
    fn curator_fee_rounds_down() {
        assert_eq!(curator_fee(dec(1_000_000_000_000_000_000), 150).unwrap(), dec(15_000_000_000_000_000));
        assert_eq!(curator_fee(dec(99), 150).unwrap(), dec(1));
        assert_eq!(curator_fee(dec(66), 150).unwrap(), dec(0));
        assert_eq!(curator_fee(dec(1_000), 0).unwrap(), dec(0));
    }
}
