//! Sensitivity Analyzer.
//!
//! Re-runs the forecast builder and calculator for every pair in
//! `axis_x.deltas x axis_y.deltas`. Each cell clones the base scenario and
//! parameters, so cells share no mutable state and may run in any order.
//!
//! With a cell timeout set, the grid has one deadline: start of the run
//! plus the timeout. A cell checks it before starting and again between
//! building its table and valuing it. Cells past the deadline get the
//! divergent sentinel with `DivergenceCause::Timeout`; a cell that already
//! finished keeps its value.

use super::grid::{GridAxis, OutputField, SensitivityCell, SensitivityGrid};
use super::variable::SensitivityAxis;
use crate::forecast::{ForecastTable, ForecastTableBuilder};
use crate::parallel::{map_indices, ParallelConfig};
use crate::valuation::ValuationCalculator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use valuation_core::types::{
    FinancialLineItem, ScenarioAssumptions, ValuationError, ValuationParameters, Year,
};

/// Cooperative cancellation flag shared with a running analysis.
///
/// Cells not yet started when the flag is raised are reported as
/// `SensitivityCell::NotComputed`.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Configuration for sensitivity runs.
#[derive(Clone, Debug, PartialEq)]
pub struct SensitivityConfig {
    /// Parallel fan-out settings
    pub parallel: ParallelConfig,
    /// Cells unresolved this long after the grid starts are marked divergent
    pub cell_timeout: Option<Duration>,
    /// Output field written to each cell
    pub output: OutputField,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            parallel: ParallelConfig::default(),
            cell_timeout: None,
            output: OutputField::PerShareValue,
        }
    }
}

impl SensitivityConfig {
    /// Sets the output field.
    pub fn with_output(mut self, output: OutputField) -> Self {
        self.output = output;
        self
    }

    /// Sets the per-cell timeout.
    pub fn with_cell_timeout(mut self, timeout: Duration) -> Self {
        self.cell_timeout = Some(timeout);
        self
    }

    /// Sets parallel fan-out settings.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Base case the grid perturbs.
#[derive(Clone, Copy, Debug)]
pub struct SensitivityBase<'a> {
    /// Historical rows
    pub historical: &'a [FinancialLineItem],
    /// Base scenario
    pub scenario: &'a ScenarioAssumptions,
    /// Base valuation parameters
    pub params: &'a ValuationParameters,
    /// Forecast horizon
    pub forecast_years: &'a [Year],
    /// Share count
    pub shares_outstanding: f64,
}

/// Runs two-axis sensitivity grids.
#[derive(Clone, Debug, Default)]
pub struct SensitivityAnalyzer {
    config: SensitivityConfig,
}

impl SensitivityAnalyzer {
    /// Creates an analyzer.
    pub fn new(config: SensitivityConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &SensitivityConfig {
        &self.config
    }

    /// Computes the grid for `axis_x` (rows) against `axis_y` (columns).
    ///
    /// # Errors
    ///
    /// Only request-level problems are errors: an unknown year scope, a
    /// non-finite delta, or perturbing an absent exit multiple. Per-cell
    /// failures become sentinel cells.
    pub fn analyze(
        &self,
        base: &SensitivityBase<'_>,
        builder: &ForecastTableBuilder,
        calculator: &ValuationCalculator,
        axis_x: &SensitivityAxis,
        axis_y: &SensitivityAxis,
    ) -> Result<SensitivityGrid, ValuationError> {
        self.analyze_with_cancellation(
            base,
            builder,
            calculator,
            axis_x,
            axis_y,
            &CancellationToken::new(),
        )
    }

    /// As [`analyze`](Self::analyze), skipping cells once `token` is cancelled.
    pub fn analyze_with_cancellation(
        &self,
        base: &SensitivityBase<'_>,
        builder: &ForecastTableBuilder,
        calculator: &ValuationCalculator,
        axis_x: &SensitivityAxis,
        axis_y: &SensitivityAxis,
        token: &CancellationToken,
    ) -> Result<SensitivityGrid, ValuationError> {
        axis_x.validate(base.forecast_years, base.params)?;
        axis_y.validate(base.forecast_years, base.params)?;

        let rows = axis_x.len();
        let cols = axis_y.len();
        let total = rows * cols;
        info!(
            x = %axis_x.variable,
            y = %axis_y.variable,
            rows,
            cols,
            parallel = self.config.parallel.should_parallelize(total),
            "Running sensitivity grid"
        );

        let deadline = self
            .config
            .cell_timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let flat = map_indices(total, &self.config.parallel, |index| {
            let (i, j) = (index / cols, index % cols);
            if token.is_cancelled() {
                return SensitivityCell::NotComputed;
            }
            self.compute_cell(base, builder, calculator, (axis_x, axis_y), (i, j), deadline)
        });

        let cells: Vec<Vec<SensitivityCell>> = (0..rows)
            .map(|i| flat[i * cols..(i + 1) * cols].to_vec())
            .collect();

        let grid = SensitivityGrid {
            row_axis: render_axis(axis_x, base),
            col_axis: render_axis(axis_y, base),
            output: self.config.output,
            cells,
        };
        if grid.sentinel_count() > 0 {
            warn!(
                sentinels = grid.sentinel_count(),
                computed = grid.computed_count(),
                "Sensitivity grid has cells without values"
            );
        }
        Ok(grid)
    }

    fn compute_cell(
        &self,
        base: &SensitivityBase<'_>,
        builder: &ForecastTableBuilder,
        calculator: &ValuationCalculator,
        (axis_x, axis_y): (&SensitivityAxis, &SensitivityAxis),
        (i, j): (usize, usize),
        deadline: Option<Instant>,
    ) -> SensitivityCell {
        let expired = || deadline.is_some_and(|d| Instant::now() >= d);
        if expired() {
            debug!(row = i, col = j, "Sensitivity cell timed out before start");
            return SensitivityCell::timed_out();
        }

        let (dx, dy) = (axis_x.deltas[i], axis_y.deltas[j]);
        let (table, params) = match perturbed_table(base, builder, (axis_x, dx), (axis_y, dy)) {
            Ok(built) => built,
            Err(err) => return failed_cell(i, j, err),
        };

        if expired() {
            debug!(row = i, col = j, "Sensitivity cell timed out before valuation");
            return SensitivityCell::timed_out();
        }

        match calculator.evaluate(&table, &params, base.shares_outstanding) {
            Ok(result) => SensitivityCell::Value {
                value: self.config.output.extract(&result),
            },
            Err(err) => failed_cell(i, j, err),
        }
    }
}

fn failed_cell(i: usize, j: usize, err: ValuationError) -> SensitivityCell {
    if err.is_divergent() {
        return SensitivityCell::divergent();
    }
    debug!(row = i, col = j, error = %err, "Sensitivity cell failed");
    SensitivityCell::Failed {
        reason: err.to_string(),
    }
}

fn perturbed_table(
    base: &SensitivityBase<'_>,
    builder: &ForecastTableBuilder,
    (axis_x, dx): (&SensitivityAxis, f64),
    (axis_y, dy): (&SensitivityAxis, f64),
) -> Result<(ForecastTable, ValuationParameters), ValuationError> {
    let mut scenario = base.scenario.clone();
    let mut params = base.params.clone();
    axis_x.variable.apply(&mut scenario, &mut params, dx)?;
    axis_y.variable.apply(&mut scenario, &mut params, dy)?;
    let table = builder.build(base.historical, &scenario, base.forecast_years)?;
    Ok((table, params))
}

fn render_axis(axis: &SensitivityAxis, base: &SensitivityBase<'_>) -> GridAxis {
    let values = axis
        .variable
        .base_value(base.scenario, base.params)
        .map(|b| axis.deltas.iter().map(|d| b + d).collect());
    GridAxis {
        variable: axis.variable,
        deltas: axis.deltas.clone(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensitivity::SensitivityVariable;
    use valuation_core::types::AssumptionSeries;

    struct Fixture {
        historical: Vec<FinancialLineItem>,
        scenario: ScenarioAssumptions,
        params: ValuationParameters,
        years: Vec<Year>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                historical: vec![
                    FinancialLineItem::from_pairs("Revenue", false, [(2023, 1000.0)]),
                    FinancialLineItem::from_pairs("Earnings", false, [(2023, 200.0)]),
                    FinancialLineItem::from_pairs("Invested Capital", false, [(2023, 500.0)]),
                ],
                scenario: ScenarioAssumptions::constant(&[2024, 2025], 0.10, 0.20, 0.05),
                params: ValuationParameters::new(0.10, 0.03),
                years: vec![2024, 2025],
            }
        }

        fn base(&self) -> SensitivityBase<'_> {
            SensitivityBase {
                historical: &self.historical,
                scenario: &self.scenario,
                params: &self.params,
                forecast_years: &self.years,
                shares_outstanding: 100.0,
            }
        }

        fn base_per_share(&self) -> f64 {
            let table = ForecastTableBuilder::new()
                .build(&self.historical, &self.scenario, &self.years)
                .unwrap();
            ValuationCalculator::new()
                .evaluate(&table, &self.params, 100.0)
                .unwrap()
                .per_share_value
        }
    }

    fn rate_axes() -> (SensitivityAxis, SensitivityAxis) {
        (
            SensitivityAxis::new(SensitivityVariable::DiscountRate, vec![-0.01, 0.0, 0.01]),
            SensitivityAxis::new(
                SensitivityVariable::TerminalGrowthRate,
                vec![-0.005, 0.0, 0.005],
            ),
        )
    }

    #[test]
    fn test_center_cell_equals_base_case() {
        let fixture = Fixture::new();
        let (x, y) = rate_axes();
        let grid = SensitivityAnalyzer::default()
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap();

        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.cell(1, 1).unwrap().value(), Some(fixture.base_per_share()));
        assert_eq!(grid.computed_count(), 9);
    }

    #[test]
    fn test_axis_ordering_preserved() {
        let fixture = Fixture::new();
        let x = SensitivityAxis::new(SensitivityVariable::DiscountRate, vec![0.02, -0.02, 0.02]);
        let y = SensitivityAxis::new(SensitivityVariable::TerminalGrowthRate, vec![0.0]);
        let grid = SensitivityAnalyzer::default()
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap();

        assert_eq!(grid.row_axis.deltas, vec![0.02, -0.02, 0.02]);
        let values = grid.row_axis.values.as_ref().unwrap();
        assert!((values[0] - 0.12).abs() < 1e-12);
        assert!((values[1] - 0.08).abs() < 1e-12);
        let v0 = grid.cell(0, 0).unwrap().value().unwrap();
        let v1 = grid.cell(1, 0).unwrap().value().unwrap();
        let v2 = grid.cell(2, 0).unwrap().value().unwrap();
        assert!(v1 > v0);
        assert_eq!(v0, v2);
    }

    #[test]
    fn test_divergent_cells_are_isolated() {
        let fixture = Fixture::new();
        let x = SensitivityAxis::new(SensitivityVariable::DiscountRate, vec![-0.08, 0.0]);
        let y = SensitivityAxis::new(SensitivityVariable::TerminalGrowthRate, vec![0.0, 0.02]);
        let grid = SensitivityAnalyzer::default()
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap();

        // r = 0.02 against g = 0.03 / 0.05 diverges; r = 0.10 does not.
        assert_eq!(grid.cell(0, 0), Some(&SensitivityCell::divergent()));
        assert_eq!(grid.cell(0, 1), Some(&SensitivityCell::divergent()));
        assert!(grid.cell(1, 0).unwrap().is_value());
        assert!(grid.cell(1, 1).unwrap().is_value());
    }

    #[test]
    fn test_failed_cells_carry_reason() {
        let fixture = Fixture::new();
        // A discount rate below -100% is rejected outright rather than diverging.
        let x = SensitivityAxis::new(
            SensitivityVariable::all_years(AssumptionSeries::RevenueGrowth),
            vec![0.0],
        );
        let y = SensitivityAxis::new(SensitivityVariable::DiscountRate, vec![-1.5, 0.0]);
        let grid = SensitivityAnalyzer::default()
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap();

        match grid.cell(0, 0).unwrap() {
            SensitivityCell::Failed { reason } => assert!(reason.contains("discount_rate")),
            other => panic!("unexpected cell: {other:?}"),
        }
        assert!(grid.cell(0, 1).unwrap().is_value());
        assert!(grid.row_axis.values.is_none());
    }

    #[test]
    fn test_cancelled_analysis_marks_not_computed() {
        let fixture = Fixture::new();
        let (x, y) = rate_axes();
        let token = CancellationToken::new();
        token.cancel();
        let grid = SensitivityAnalyzer::default()
            .analyze_with_cancellation(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
                &token,
            )
            .unwrap();
        assert!(grid.iter_cells().all(|c| *c == SensitivityCell::NotComputed));
    }

    #[test]
    fn test_zero_timeout_marks_timed_out() {
        let fixture = Fixture::new();
        let (x, y) = rate_axes();
        let analyzer =
            SensitivityAnalyzer::new(SensitivityConfig::default().with_cell_timeout(Duration::ZERO));
        let grid = analyzer
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.computed_count(), 0);
        assert!(grid.iter_cells().all(|c| *c == SensitivityCell::timed_out()));

        let json = serde_json::to_value(grid.cell(0, 0).unwrap()).unwrap();
        assert_eq!(json["status"], "divergent");
        assert_eq!(json["cause"], "timeout");
    }

    #[test]
    fn test_generous_timeout_keeps_values() {
        let fixture = Fixture::new();
        let (x, y) = rate_axes();
        let analyzer = SensitivityAnalyzer::new(
            SensitivityConfig::default().with_cell_timeout(Duration::from_secs(3600)),
        );
        let grid = analyzer
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap();
        assert_eq!(grid.computed_count(), 9);
        assert_eq!(grid.cell(1, 1).unwrap().value(), Some(fixture.base_per_share()));
    }

    #[test]
    fn test_timeout_beyond_clock_range_disables_deadline() {
        let fixture = Fixture::new();
        let (x, y) = rate_axes();
        let analyzer =
            SensitivityAnalyzer::new(SensitivityConfig::default().with_cell_timeout(Duration::MAX));
        let grid = analyzer
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap();
        assert_eq!(grid.computed_count(), 9);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let fixture = Fixture::new();
        let x = SensitivityAxis::new(
            SensitivityVariable::all_years(AssumptionSeries::EarningsMargin),
            (0..8).map(|k| k as f64 * 0.01 - 0.04).collect::<Vec<_>>(),
        );
        let y = SensitivityAxis::new(
            SensitivityVariable::DiscountRate,
            (0..8).map(|k| k as f64 * 0.005).collect::<Vec<_>>(),
        );
        let run = |parallel: ParallelConfig| {
            SensitivityAnalyzer::new(SensitivityConfig::default().with_parallel(parallel))
                .analyze(
                    &fixture.base(),
                    &ForecastTableBuilder::new(),
                    &ValuationCalculator::new(),
                    &x,
                    &y,
                )
                .unwrap()
        };
        assert_eq!(run(ParallelConfig::sequential()), run(ParallelConfig::new(1, Some(4))));
    }

    #[test]
    fn test_invalid_axis_is_request_error() {
        let fixture = Fixture::new();
        let x = SensitivityAxis::new(
            SensitivityVariable::single_year(AssumptionSeries::RevenueGrowth, 2031),
            vec![0.0],
        );
        let y = SensitivityAxis::new(SensitivityVariable::DiscountRate, vec![0.0]);
        let err = SensitivityAnalyzer::default()
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }

    #[test]
    fn test_empty_axis_yields_empty_grid() {
        let fixture = Fixture::new();
        let x = SensitivityAxis::new(SensitivityVariable::DiscountRate, Vec::new());
        let y = SensitivityAxis::new(SensitivityVariable::TerminalGrowthRate, vec![0.0, 0.01]);
        let grid = SensitivityAnalyzer::default()
            .analyze(
                &fixture.base(),
                &ForecastTableBuilder::new(),
                &ValuationCalculator::new(),
                &x,
                &y,
            )
            .unwrap();
        assert_eq!(grid.rows(), 0);
        assert_eq!(grid.cols(), 2);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn test_grid_shape_matches_axes(
                xs in proptest::collection::vec(-0.05f64..0.05, 0..6),
                ys in proptest::collection::vec(-0.02f64..0.02, 0..6)
            ) {
                let fixture = Fixture::new();
                let x = SensitivityAxis::new(SensitivityVariable::DiscountRate, xs.clone());
                let y = SensitivityAxis::new(SensitivityVariable::TerminalGrowthRate, ys.clone());
                let grid = SensitivityAnalyzer::default()
                    .analyze(
                        &fixture.base(),
                        &ForecastTableBuilder::new(),
                        &ValuationCalculator::new(),
                        &x,
                        &y,
                    )
                    .unwrap();
                prop_assert_eq!(grid.cells.len(), xs.len());
                for row in &grid.cells {
                    prop_assert_eq!(row.len(), ys.len());
                }
            }
        }
    }
}
