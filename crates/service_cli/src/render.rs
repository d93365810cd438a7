//! Box-drawn table output.

use valuation_core::types::AssumptionSeries;
use valuation_engine::sensitivity::GridAxis;
use valuation_engine::{EvaluateResponse, ScenarioResponse, SensitivityResponse};

use crate::config::CliConfig;

/// A plain text table; first column left-aligned, the rest right-aligned.
#[derive(Debug, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    /// Creates a table with the given headers.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row; missing cells render empty.
    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    /// Renders the table.
    pub fn render(&self) -> String {
        let widths = self.widths();
        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("{left}{}{right}\n", segments.join(mid))
        };
        let line = |cells: &[String]| {
            let padded: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, &w)| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    if i == 0 {
                        format!(" {cell:<w$} ")
                    } else {
                        format!(" {cell:>w$} ")
                    }
                })
                .collect();
            format!("│{}│\n", padded.join("│"))
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }
}

fn amount(value: f64) -> String {
    format!("{value:.2}")
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn optional(value: Option<f64>, fmt: fn(f64) -> String) -> String {
    value.map_or_else(|| "n/a".to_string(), fmt)
}

/// Forecast table, cash-flow schedule and valuation summary.
pub fn evaluation(response: &EvaluateResponse) -> String {
    let table = &response.table_data;

    let mut headers = vec!["Line".to_string()];
    headers.extend(table.years().map(|y| {
        if table.is_forecast_year(y) {
            format!("{y}E")
        } else {
            y.to_string()
        }
    }));
    let mut lines = TextTable::new(headers);
    for row in table.rows() {
        let mut cells = vec![row.item.name().to_string()];
        cells.extend(
            table
                .years()
                .map(|y| row.item.value(y).map_or_else(String::new, amount)),
        );
        lines.push_row(cells);
    }

    let result = &response.valuation_vars;
    let mut flows = TextTable::new([
        "Year",
        "Earnings",
        "Net reinvestment",
        "FCF",
        "Discount factor",
        "PV",
    ]);
    for cf in &result.cash_flows {
        flows.push_row([
            cf.year.to_string(),
            amount(cf.earnings),
            amount(cf.net_reinvestment),
            amount(cf.free_cash_flow),
            format!("{:.4}", cf.discount_factor),
            amount(cf.present_value),
        ]);
    }

    let multiples = &result.implied_multiples;
    let mut summary = TextTable::new(["Metric", "Value"]);
    summary.push_row(["PV explicit period".to_string(), amount(result.present_value_of_explicit_period)]);
    summary.push_row(["Terminal value".to_string(), amount(result.terminal_value)]);
    summary.push_row(["Terminal method".to_string(), format!("{:?}", result.terminal_method)]);
    summary.push_row(["PV terminal value".to_string(), amount(result.present_value_of_terminal_value)]);
    summary.push_row(["Enterprise value".to_string(), amount(result.enterprise_value)]);
    summary.push_row(["Net debt".to_string(), amount(result.net_debt)]);
    summary.push_row(["Equity value".to_string(), amount(result.equity_value)]);
    summary.push_row(["Shares outstanding".to_string(), amount(result.shares_outstanding)]);
    summary.push_row(["Per-share value".to_string(), amount(result.per_share_value)]);
    summary.push_row(["EV / Revenue".to_string(), optional(multiples.ev_to_revenue, amount)]);
    summary.push_row(["EV / Earnings".to_string(), optional(multiples.ev_to_earnings, amount)]);
    summary.push_row([
        "Terminal value share".to_string(),
        optional(multiples.terminal_value_share, percent),
    ]);

    format!(
        "{}\n{}\n{}\n{}",
        response.symbol,
        lines.render(),
        flows.render(),
        summary.render()
    )
}

fn axis_labels(axis: &GridAxis) -> Vec<String> {
    match &axis.values {
        Some(values) => values.iter().map(|v| format!("{v:.4}")).collect(),
        None => axis.deltas.iter().map(|d| format!("{d:+.4}")).collect(),
    }
}

/// Sensitivity grid with axis values (or deltas for whole-series knobs).
pub fn sensitivity(response: &SensitivityResponse) -> String {
    let grid = &response.grid;
    let mut headers = vec![format!("{} \\ {}", grid.row_axis.variable, grid.col_axis.variable)];
    headers.extend(axis_labels(&grid.col_axis));

    let mut table = TextTable::new(headers);
    for (label, row) in axis_labels(&grid.row_axis).into_iter().zip(&grid.cells) {
        let mut cells = vec![label];
        cells.extend(row.iter().map(ToString::to_string));
        table.push_row(cells);
    }

    format!(
        "{} {:?} (base {:.2}, {} computed, {} without value)\n{}",
        response.symbol,
        grid.output,
        response.base_value,
        grid.computed_count(),
        grid.sentinel_count(),
        table.render()
    )
}

/// Generated assumptions by year, followed by the rationale.
pub fn scenario(response: &ScenarioResponse) -> String {
    let mut headers = vec!["Year".to_string()];
    headers.extend(AssumptionSeries::ALL.iter().map(|s| s.boundary_key().to_string()));
    let mut table = TextTable::new(headers);
    for year in response.scenario.years() {
        let mut cells = vec![year.to_string()];
        cells.extend(AssumptionSeries::ALL.iter().map(|&series| {
            optional(response.scenario.series(series).get(&year).copied(), percent)
        }));
        table.push_row(cells);
    }

    let mut out = format!("{} ({})\n{}", response.symbol, response.mode, table.render());
    if let Some(rationale) = &response.rationale {
        out.push('\n');
        out.push_str(rationale);
        out.push('\n');
    }
    out
}

/// Effective configuration as a two-column table.
pub fn config(config: &CliConfig) -> String {
    let threads = match config.num_threads {
        Some(n) => n.to_string(),
        None => format!("global pool ({})", config.effective_threads()),
    };
    let timeout = config
        .cell_timeout_ms
        .map_or_else(|| "none".to_string(), |ms| format!("{ms} ms"));

    let mut table = TextTable::new(["Setting", "Value"]);
    table.push_row(["log_level".to_string(), config.log_level.to_string()]);
    table.push_row(["output_format".to_string(), config.output_format.to_string()]);
    table.push_row(["parallel_threshold".to_string(), config.parallel_threshold.to_string()]);
    table.push_row(["num_threads".to_string(), threads]);
    table.push_row(["cell_timeout_ms".to_string(), timeout]);
    table.push_row(["min_trend_years".to_string(), config.min_trend_years.to_string()]);
    table.push_row(["max_trend_years".to_string(), config.max_trend_years.to_string()]);
    table.push_row(["long_run_revenue_growth".to_string(), percent(config.long_run_revenue_growth)]);
    table.push_row(["long_run_ic_growth".to_string(), percent(config.long_run_ic_growth)]);
    table.push_row(["mean_reversion".to_string(), config.mean_reversion.to_string()]);
    table.push_row(["growth_floor".to_string(), percent(config.growth_floor)]);
    table.push_row(["growth_cap".to_string(), percent(config.growth_cap)]);
    table.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_table_alignment() {
        let mut table = TextTable::new(["Name", "Value"]);
        table.push_row(["a", "1.00"]);
        table.push_row(["long name", "10.00"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "┌───────────┬───────┐");
        assert_eq!(lines[1], "│ Name      │ Value │");
        assert_eq!(lines[3], "│ a         │  1.00 │");
        assert_eq!(lines[4], "│ long name │ 10.00 │");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = TextTable::new(["A", "B", "C"]);
        table.push_row(["x"]);
        assert!(table.render().contains("│ x │   │   │"));
    }

    #[test]
    fn test_config_lists_every_setting() {
        let rendered = config(&CliConfig::default());
        for key in ["log_level", "num_threads", "mean_reversion", "growth_cap"] {
            assert!(rendered.contains(key), "missing {key}");
        }
    }
}
