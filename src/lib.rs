// Derived-metrics engine for daily Makkah housing supply and demand.
//
// The pipeline is pure: raw rows, a scenario and category/year filters go
// in, a fresh set of KPIs, rollups and report text comes out.
pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod error;
pub mod insights;
pub mod loader;
pub mod logging;
pub mod output;
pub mod report;
pub mod scenario;
pub mod series;
pub mod types;
pub mod util;

pub use error::{ReportError, Result};
pub use report::{build_report_payload, run_pipeline, PipelineInput, PipelineOutput};
pub use scenario::{adjust, Scenario, ScenarioKey};
pub use series::project;
pub use types::{
    AdjustedRow, Dataset, DemandCategory, Kpi, RawRow, ReportPayload, Scope, SeriesPoint,
    SupplyCategory,
};
