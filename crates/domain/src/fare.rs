//! Fare calculation, pure and deterministic.
//!
//! Grounded on `rust_decimal` (already a workspace dependency for monetary
//! amounts) so that `total_fare` is exact and bit-for-bit reproducible for a
//! fixed `(distance_km, duration_sec, tier, surge)`.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::models::ride::RideTier;

/// One tier's rate table entry.
#[derive(Debug, Clone, Copy)]
pub struct TierRates {
    pub base: Decimal,
    pub per_km: Decimal,
    pub per_min: Decimal,
}

/// Per-tier base fare, per-km rate, and per-minute rate.
pub fn rates_for(tier: RideTier) -> TierRates {
    match tier {
        RideTier::Economy => TierRates {
            base: dec!(5.00),
            per_km: dec!(1.50),
            per_min: dec!(0.25),
        },
        RideTier::Premium => TierRates {
            base: dec!(8.00),
            per_km: dec!(2.50),
            per_min: dec!(0.40),
        },
        RideTier::Luxury => TierRates {
            base: dec!(15.00),
            per_km: dec!(4.00),
            per_min: dec!(0.60),
        },
    }
}

/// The result of a fare calculation: the pre-surge subtotal (`base_fare`)
/// and the surge-multiplied total (`total_fare`), both rounded half-up to
/// two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FareBreakdown {
    pub base_fare: Decimal,
    pub total_fare: Decimal,
}

/// Computes the fare for a trip:
///
/// `total = (base + distance_km * per_km + (duration_sec / 60) * per_min) * surge`
///
/// rounded half-up (`MidpointAwayFromZero`) to two decimal places. `base_fare`
/// is the pre-surge subtotal; `total_fare` is the surge-multiplied total.
pub fn calculate_fare(
    tier: RideTier,
    distance_km: Decimal,
    duration_sec: i64,
    surge_multiplier: Decimal,
) -> FareBreakdown {
    let rates = rates_for(tier);
    let duration_min = Decimal::from_i64(duration_sec)
        .unwrap_or(Decimal::ZERO)
        / dec!(60);

    let subtotal = rates.base + distance_km * rates.per_km + duration_min * rates.per_min;
    let base_fare = subtotal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let total_fare = (subtotal * surge_multiplier)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    FareBreakdown {
        base_fare,
        total_fare,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn economy_trip_10km_20min_no_surge() {
        let fare = calculate_fare(RideTier::Economy, dec!(10), 1200, dec!(1.00));
        assert_eq!(fare.total_fare, dec!(25.00));
    }

    #[test]
    fn premium_trip_with_surge_multiplier() {
        let fare = calculate_fare(RideTier::Premium, dec!(10), 1200, dec!(2.0));
        assert_eq!(fare.total_fare, dec!(82.00));
    }

    #[test]
    fn zero_distance_and_duration_is_just_the_base_fare() {
        let fare = calculate_fare(RideTier::Luxury, dec!(0), 0, dec!(1.00));
        assert_eq!(fare.total_fare, dec!(15.00));
        assert_eq!(fare.base_fare, dec!(15.00));
    }

    #[test]
    fn fare_is_deterministic_across_repeated_calls() {
        // Fixed inputs must yield bit-for-bit identical output.
        let a = calculate_fare(RideTier::Economy, dec!(7.3), 842, dec!(1.25));
        let b = calculate_fare(RideTier::Economy, dec!(7.3), 842, dec!(1.25));
        assert_eq!(a, b);
    }

    #[test]
    fn half_up_rounding_rounds_away_from_zero_at_midpoint() {
        // base=5.00, distance=1km*1.50=1.50, duration 1 min * 0.25=0.25 -> subtotal 6.75, surge 1 -> 6.75 (no rounding needed)
        // Craft an exact .xx5 midpoint: per_km=1.50, distance=0.01km -> 0.015 contributes a midpoint at the third decimal.
        let fare = calculate_fare(RideTier::Economy, dec!(0.01), 0, dec!(1.00));
        // subtotal = 5.00 + 0.015 = 5.015 -> rounds to 5.02 (away from zero)
        assert_eq!(fare.total_fare, dec!(5.02));
    }

    #[test]
    fn base_fare_is_pre_surge_subtotal() {
        let fare = calculate_fare(RideTier::Premium, dec!(10), 1200, dec!(2.0));
        assert_eq!(fare.base_fare, dec!(41.00));
        assert_eq!(fare.total_fare, fare.base_fare * dec!(2.0));
    }
}
