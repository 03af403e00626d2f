// 💰 GDP Estimator
//
// estimated_gdp = population * r / exchange_rate, r drawn from [1000, 3000),
// rounded to one decimal place. Non-deterministic between runs.

use rand::Rng;
use serde::Serialize;

/// Lower bound of the random multiplier (inclusive)
pub const MULTIPLIER_MIN: u32 = 1000;

/// Upper bound of the random multiplier (exclusive)
pub const MULTIPLIER_MAX: u32 = 3000;

/// An exchange rate that is safe to divide by: finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ExchangeRate(f64);

impl ExchangeRate {
    /// Returns `None` for zero, negative, NaN and infinite rates.
    pub fn new(rate: f64) -> Option<Self> {
        if rate.is_finite() && rate > 0.0 {
            Some(ExchangeRate(rate))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Estimate GDP using the thread-local RNG. Returns 0 when no rate resolved.
pub fn estimate(population: u64, rate: Option<ExchangeRate>) -> f64 {
    estimate_with(&mut rand::thread_rng(), population, rate)
}

/// Estimate GDP drawing the multiplier from `rng`.
pub fn estimate_with<R: Rng + ?Sized>(
    rng: &mut R,
    population: u64,
    rate: Option<ExchangeRate>,
) -> f64 {
    let Some(rate) = rate else {
        return 0.0;
    };

    let multiplier = rng.gen_range(MULTIPLIER_MIN..MULTIPLIER_MAX) as f64;
    let amount = round_to_tenth(population as f64 * multiplier / rate.value());

    // Saturate instead of reporting an infinite estimate
    if amount.is_finite() {
        amount
    } else {
        f64::MAX
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_exchange_rate_rejects_unusable_values() {
        assert!(ExchangeRate::new(0.0).is_none());
        assert!(ExchangeRate::new(-1.5).is_none());
        assert!(ExchangeRate::new(f64::NAN).is_none());
        assert!(ExchangeRate::new(f64::INFINITY).is_none());
        assert_eq!(ExchangeRate::new(1600.5).map(ExchangeRate::value), Some(1600.5));
    }

    #[test]
    fn test_estimate_is_zero_without_rate() {
        assert_eq!(estimate(1_000_000, None), 0.0);
    }

    #[test]
    fn test_estimate_stays_within_multiplier_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let rate = ExchangeRate::new(2.0);

        for _ in 0..500 {
            let amount = estimate_with(&mut rng, 1_000_000, rate);
            assert!(amount >= 1_000_000.0 * 1000.0 / 2.0, "too small: {}", amount);
            assert!(amount < 1_000_000.0 * 3000.0 / 2.0, "too large: {}", amount);
            assert!(amount.is_finite());
        }
    }

    #[test]
    fn test_estimate_is_non_negative() {
        let mut rng = StdRng::seed_from_u64(11);
        for population in [0, 1, 37, 1_400_000_000] {
            for rate in [0.0001, 0.5, 1.0, 3750.25] {
                let amount = estimate_with(&mut rng, population, ExchangeRate::new(rate));
                assert!(amount >= 0.0);
            }
        }
    }

    #[test]
    fn test_estimate_rounds_to_one_decimal() {
        let mut rng = StdRng::seed_from_u64(3);
        let amount = estimate_with(&mut rng, 7, ExchangeRate::new(3.0));
        let scaled = amount * 10.0;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_saturates_instead_of_infinity() {
        let mut rng = StdRng::seed_from_u64(5);
        let amount = estimate_with(&mut rng, u64::MAX, ExchangeRate::new(f64::MIN_POSITIVE));
        assert_eq!(amount, f64::MAX);
    }

    #[test]
    fn test_zero_population_estimates_zero() {
        assert_eq!(estimate(0, ExchangeRate::new(1.0)), 0.0);
    }
}
