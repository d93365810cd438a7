//! Heuristic scenario generation settings.

use serde::{Deserialize, Serialize};
use valuation_core::types::ValuationError;

/// Tunables for heuristic scenario generation.
///
/// Smoothing is exponential mean reversion toward a long-run prior:
/// `v_k = prior + (trend - prior) * (1 - mean_reversion)^k` for the k-th
/// forecast year. With `mean_reversion` in `[0, 1]` the path is monotonic
/// and stays between the clamped trend and the prior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Fewer common historical years than this triggers flat carry-forward
    pub min_trend_years: usize,
    /// Trailing window length in years
    pub max_trend_years: usize,
    /// Long-run revenue growth prior
    pub long_run_revenue_growth: f64,
    /// Long-run invested capital growth prior
    pub long_run_ic_growth: f64,
    /// Fraction of the gap to the prior closed each year
    pub mean_reversion: f64,
    /// Lower clamp on growth trends
    pub growth_floor: f64,
    /// Upper clamp on growth trends
    pub growth_cap: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_trend_years: 3,
            max_trend_years: 5,
            long_run_revenue_growth: 0.03,
            long_run_ic_growth: 0.03,
            mean_reversion: 0.2,
            growth_floor: -0.3,
            growth_cap: 0.3,
        }
    }
}

impl GeneratorConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// `InvalidInput` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ValuationError> {
        if self.min_trend_years < 2 {
            return Err(ValuationError::invalid_input(
                "min_trend_years",
                format!("need at least 2 years to measure a trend, got {}", self.min_trend_years),
            ));
        }
        if self.max_trend_years < self.min_trend_years {
            return Err(ValuationError::invalid_input(
                "max_trend_years",
                format!(
                    "must be >= min_trend_years ({}), got {}",
                    self.min_trend_years, self.max_trend_years
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.mean_reversion) {
            return Err(ValuationError::invalid_input(
                "mean_reversion",
                format!("must lie in [0, 1], got {}", self.mean_reversion),
            ));
        }
        if !(self.growth_floor.is_finite()
            && self.growth_cap.is_finite()
            && self.growth_floor > -1.0
            && self.growth_floor <= self.growth_cap)
        {
            return Err(ValuationError::invalid_input(
                "growth_floor",
                format!(
                    "need -1 < growth_floor <= growth_cap, got [{}, {}]",
                    self.growth_floor, self.growth_cap
                ),
            ));
        }
        for (field, prior) in [
            ("long_run_revenue_growth", self.long_run_revenue_growth),
            ("long_run_ic_growth", self.long_run_ic_growth),
        ] {
            if !(self.growth_floor..=self.growth_cap).contains(&prior) {
                return Err(ValuationError::invalid_input(
                    field,
                    format!(
                        "prior {prior} outside [{}, {}]",
                        self.growth_floor, self.growth_cap
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Clamps a growth rate into `[growth_floor, growth_cap]`.
    #[inline]
    pub fn clamp_growth(&self, rate: f64) -> f64 {
        rate.clamp(self.growth_floor, self.growth_cap)
    }

    /// Smoothed value for the `k`-th forecast year (1-based).
    #[inline]
    pub fn smooth(&self, trend: f64, prior: f64, k: usize) -> f64 {
        let decay = (1.0 - self.mean_reversion).powi(k as i32);
        prior + (trend - prior) * decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_windows() {
        let config = GeneratorConfig {
            min_trend_years: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeneratorConfig {
            min_trend_years: 4,
            max_trend_years: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_reversion_and_bounds() {
        let config = GeneratorConfig {
            mean_reversion: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeneratorConfig {
            growth_floor: 0.5,
            growth_cap: 0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GeneratorConfig {
            long_run_ic_growth: 0.9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_smooth_path() {
        let config = GeneratorConfig::default();
        assert_relative_eq!(config.smooth(0.10, 0.03, 0), 0.10);
        assert_relative_eq!(config.smooth(0.10, 0.03, 1), 0.03 + 0.07 * 0.8, epsilon = 1e-12);
        assert_relative_eq!(config.smooth(0.10, 0.03, 2), 0.03 + 0.07 * 0.64, epsilon = 1e-12);
    }

    #[test]
    fn test_no_reversion_holds_trend() {
        let config = GeneratorConfig {
            mean_reversion: 0.0,
            ..Default::default()
        };
        assert_relative_eq!(config.smooth(0.12, 0.03, 7), 0.12, epsilon = 1e-12);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_smoothing_monotonic_and_bounded(
                trend in -0.3f64..0.3,
                prior in -0.3f64..0.3,
                reversion in 0.0f64..=1.0,
                horizon in 1usize..30
            ) {
                let config = GeneratorConfig { mean_reversion: reversion, ..Default::default() };
                let (lo, hi) = (trend.min(prior), trend.max(prior));
                let path: Vec<f64> = (1..=horizon).map(|k| config.smooth(trend, prior, k)).collect();
                for v in &path {
                    prop_assert!(*v >= lo - 1e-12 && *v <= hi + 1e-12);
                }
                for pair in path.windows(2) {
                    if trend >= prior {
                        prop_assert!(pair[1] <= pair[0] + 1e-12);
                    } else {
                        prop_assert!(pair[1] >= pair[0] - 1e-12);
                    }
                }
            }
        }
    }
}
