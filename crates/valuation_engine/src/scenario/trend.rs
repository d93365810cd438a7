//! Trailing historical trends.

use super::config::GeneratorConfig;
use serde::{Deserialize, Serialize};
use valuation_core::types::{FinancialLineItem, LineRole, ValuationError, Year};

/// One year in which revenue, earnings and invested capital were all reported.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    /// Fiscal year
    pub year: Year,
    /// Revenue
    pub revenue: f64,
    /// Earnings
    pub earnings: f64,
    /// Invested capital
    pub invested_capital: f64,
}

impl Observation {
    /// Earnings over revenue, `None` for zero revenue.
    pub fn margin(&self) -> Option<f64> {
        (self.revenue != 0.0).then(|| self.earnings / self.revenue)
    }
}

/// Collects the years in which all three required rows carry finite values.
///
/// # Errors
///
/// `MissingLineItem` naming the first required row not present.
pub fn observations(historical: &[FinancialLineItem]) -> Result<Vec<Observation>, ValuationError> {
    let row = |role: LineRole| {
        role.find(historical)
            .ok_or_else(|| ValuationError::missing_line(role.canonical_name()))
    };
    let revenue = row(LineRole::Revenue)?;
    let earnings = row(LineRole::Earnings)?;
    let capital = row(LineRole::InvestedCapital)?;

    Ok(revenue
        .values_by_year()
        .iter()
        .filter_map(|(&year, &r)| {
            let e = earnings.value(year)?;
            let ic = capital.value(year)?;
            (r.is_finite() && e.is_finite() && ic.is_finite()).then_some(Observation {
                year,
                revenue: r,
                earnings: e,
                invested_capital: ic,
            })
        })
        .collect())
}

/// Longest contiguous run of years ending at the latest observation.
pub fn trailing_run(observations: &[Observation]) -> &[Observation] {
    let mut start = observations.len().saturating_sub(1);
    while start > 0 && observations[start - 1].year + 1 == observations[start].year {
        start -= 1;
    }
    &observations[start..]
}

/// Where an estimate came from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum TrendSource {
    /// Measured from the window as is
    Measured,
    /// Measured, then clamped into bounds
    Clamped {
        /// Unclamped measurement
        raw: f64,
    },
    /// Not measurable; the long-run prior was used
    Prior,
}

/// A trend value and its provenance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendEstimate {
    /// Value after clamping
    pub value: f64,
    /// Provenance
    pub source: TrendSource,
}

impl TrendEstimate {
    fn bounded(raw: Option<f64>, lo: f64, hi: f64, prior: f64) -> Self {
        match raw.filter(|v| v.is_finite()) {
            Some(raw) if raw < lo || raw > hi => Self {
                value: raw.clamp(lo, hi),
                source: TrendSource::Clamped { raw },
            },
            Some(raw) => Self {
                value: raw,
                source: TrendSource::Measured,
            },
            None => Self {
                value: prior,
                source: TrendSource::Prior,
            },
        }
    }
}

/// Trends measured over the trailing window.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoricalTrend {
    /// Years in the window, ascending
    pub window: Vec<Year>,
    /// Revenue compound annual growth
    pub revenue_growth: TrendEstimate,
    /// Average earnings margin
    pub earnings_margin: TrendEstimate,
    /// Average invested capital growth
    pub invested_capital_growth: TrendEstimate,
    /// Full-history average margin, the margin prior
    pub margin_prior: f64,
}

impl HistoricalTrend {
    /// Measures trends over the last `max_trend_years` contiguous observations.
    ///
    /// Returns `None` when fewer than `min_trend_years` contiguous years end
    /// at the latest observation.
    pub fn measure(observations: &[Observation], config: &GeneratorConfig) -> Option<Self> {
        let run = trailing_run(observations);
        if run.len() < config.min_trend_years {
            return None;
        }
        let window = &run[run.len() - run.len().min(config.max_trend_years)..];
        let margin_prior = mean(observations.iter().filter_map(Observation::margin))
            .map_or(0.0, |m| m.clamp(-1.0, 1.0));

        let revenue_cagr = match (window.first(), window.last()) {
            (Some(first), Some(last)) if first.revenue > 0.0 && last.revenue > 0.0 => {
                let periods = (window.len() - 1) as f64;
                Some((last.revenue / first.revenue).powf(1.0 / periods) - 1.0)
            }
            _ => None,
        };
        let average_margin = mean(window.iter().filter_map(Observation::margin));
        let average_capital_growth = mean(window.windows(2).filter_map(|pair| {
            (pair[0].invested_capital != 0.0)
                .then(|| pair[1].invested_capital / pair[0].invested_capital - 1.0)
        }));

        Some(Self {
            window: window.iter().map(|o| o.year).collect(),
            revenue_growth: TrendEstimate::bounded(
                revenue_cagr,
                config.growth_floor,
                config.growth_cap,
                config.long_run_revenue_growth,
            ),
            earnings_margin: TrendEstimate::bounded(average_margin, -1.0, 1.0, margin_prior),
            invested_capital_growth: TrendEstimate::bounded(
                average_capital_growth,
                config.growth_floor,
                config.growth_cap,
                config.long_run_ic_growth,
            ),
            margin_prior,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
