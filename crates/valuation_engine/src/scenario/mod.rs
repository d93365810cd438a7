//! Scenario Generator.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  ScenarioMode::Manual(s)  ──► validate_for(years) ──► s   │
//! │                                                          │
//! │  ScenarioMode::Heuristic                                 │
//! │    observations ──► trailing window (3..=5 years)        │
//! │        │ enough years          │ too few                 │
//! │        ▼                       ▼                         │
//! │    CAGR / avg margin /     flat carry-forward            │
//! │    avg IC growth           (used_fallback = true)        │
//! │        │                                                 │
//! │        ▼ clamp, then mean-revert toward prior            │
//! │    ScenarioAssumptions + rationale                       │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod generator;
mod trend;

pub use config::GeneratorConfig;
pub use generator::{GeneratedScenario, GenerationMode, ScenarioGenerator, ScenarioMode};
pub use trend::{
    observations, trailing_run, HistoricalTrend, Observation, TrendEstimate, TrendSource,
};
