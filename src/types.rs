use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

use crate::error::ReportError;
use crate::scenario::ScenarioSummary;

/// One calendar day of raw supply and demand as produced by ingestion.
///
/// `None` means the source had no value for that component. It is kept
/// apart from `Some(0.0)` all the way through scenario adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub date: NaiveDate,
    #[serde(default)]
    pub sl: Option<f64>,
    #[serde(default)]
    pub sf: Option<f64>,
    #[serde(default)]
    pub sh: Option<f64>,
    #[serde(default)]
    pub do_: Option<f64>,
    #[serde(default)]
    pub di: Option<f64>,
    #[serde(default, rename = "isRamadan")]
    pub is_ramadan: bool,
    #[serde(default, rename = "isHajj")]
    pub is_hajj: bool,
}

impl RawRow {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            sl: None,
            sf: None,
            sh: None,
            do_: None,
            di: None,
            is_ramadan: false,
            is_hajj: false,
        }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// What the ingestion side hands to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub years: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    Year,
}

impl FromStr for Scope {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Scope::All),
            "year" => Ok(Scope::Year),
            other => Err(ReportError::Filter(format!("unknown scope `{}`", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandCategory {
    Outside,
    Inside,
}

impl DemandCategory {
    pub const ALL: [DemandCategory; 2] = [DemandCategory::Outside, DemandCategory::Inside];

    pub fn label(self) -> &'static str {
        match self {
            DemandCategory::Outside => "Outside",
            DemandCategory::Inside => "Inside",
        }
    }
}

impl FromStr for DemandCategory {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outside" => Ok(DemandCategory::Outside),
            "inside" => Ok(DemandCategory::Inside),
            other => Err(ReportError::Filter(format!(
                "unknown demand category `{}`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyCategory {
    Licensed,
    Future,
    Hajj,
}

impl SupplyCategory {
    pub const ALL: [SupplyCategory; 3] = [
        SupplyCategory::Licensed,
        SupplyCategory::Future,
        SupplyCategory::Hajj,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SupplyCategory::Licensed => "Licensed facilities",
            SupplyCategory::Future => "Future projects",
            SupplyCategory::Hajj => "Pilgrim housing",
        }
    }
}

impl FromStr for SupplyCategory {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "licensed" => Ok(SupplyCategory::Licensed),
            "future" => Ok(SupplyCategory::Future),
            "hajj" => Ok(SupplyCategory::Hajj),
            other => Err(ReportError::Filter(format!(
                "unknown supply category `{}`",
                other
            ))),
        }
    }
}

/// A raw row after scenario deltas, rounded to whole beds/visitors.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedRow {
    pub date: NaiveDate,
    pub asl: Option<i64>,
    pub asf: Option<i64>,
    pub ash: Option<i64>,
    pub ado: Option<i64>,
    pub adi: Option<i64>,
    pub is_ramadan: bool,
    pub is_hajj: bool,
}

impl AdjustedRow {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapStatus {
    Deficit,
    Surplus,
    Balanced,
}

impl GapStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GapStatus::Deficit => "deficit",
            GapStatus::Surplus => "surplus",
            GapStatus::Balanced => "balanced",
        }
    }
}

impl fmt::Display for GapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub demand: i64,
    pub supply: i64,
    /// `demand - supply`; positive is a deficit.
    pub gap: i64,
    pub is_ramadan: bool,
    pub is_hajj: bool,
}

impl SeriesPoint {
    pub fn status(&self) -> GapStatus {
        match self.gap {
            g if g > 0 => GapStatus::Deficit,
            g if g < 0 => GapStatus::Surplus,
            _ => GapStatus::Balanced,
        }
    }

    /// Both sides carry a signal, so the day counts toward KPI denominators.
    pub fn is_qualifying(&self) -> bool {
        self.demand != 0 && self.supply != 0
    }

    pub fn is_deficit(&self) -> bool {
        self.gap > 0
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub avg_demand: f64,
    pub avg_supply: f64,
    pub avg_gap: f64,
    pub def_days: usize,
    pub def_pct: f64,
    pub total: usize,
    pub critical_days: usize,
    pub critical_pct: i64,
    pub occupancy_pct: i64,
    pub peak_occ_pct: i64,
    pub peak_occ_date: NaiveDate,
    pub max_deficit: SeriesPoint,
    pub max_surplus: SeriesPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub avg_dem: i64,
    pub avg_sup: i64,
    pub avg_gap: i64,
    pub def_days: usize,
    pub total_days: usize,
    pub is_ram: bool,
    pub is_hajj: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonBucket {
    pub days: usize,
    pub def_days: usize,
    pub def_pct: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalStats {
    pub ramadan: SeasonBucket,
    pub hajj: SeasonBucket,
    pub other: SeasonBucket,
}

/// Deficit statistics for a set of days.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeficitWindow {
    pub days: usize,
    pub def_pct: f64,
    /// Mean of `max(0, gap)` over the window.
    pub avg_deficit: f64,
    pub peak: Option<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RamadanPeriodStats {
    pub index: usize,
    pub year: i32,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub window: DeficitWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RamadanStats {
    pub ramadan: DeficitWindow,
    pub other: DeficitWindow,
    pub periods: Vec<RamadanPeriodStats>,
    pub is_dual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FutureContribution {
    pub def_without: usize,
    pub def_with: usize,
    pub resolved: usize,
    /// `None` when there was no deficit to resolve.
    pub pct: Option<i64>,
    pub has_future: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakDay {
    pub date: NaiveDate,
    pub value: i64,
    pub is_ramadan: bool,
    pub is_hajj: bool,
}

/// Average daily outside vs inside demand over rows that carry any demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandSplit {
    pub days: usize,
    pub avg_outside: i64,
    pub avg_inside: i64,
    pub outside_pct: i64,
    pub inside_pct: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAdjustment {
    pub key: &'static str,
    pub label: &'static str,
    pub value: i32,
    pub category: &'static str,
}

/// Everything the report renderer needs, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub year: Option<i32>,
    pub period_label: String,
    pub series_years: Vec<i32>,
    pub kpi: Option<Kpi>,
    pub seasonal: SeasonalStats,
    pub ramadan: RamadanStats,
    pub monthly: Vec<MonthlyBucket>,
    pub future_contribution: Option<FutureContribution>,
    pub peak_demand: Option<PeakDay>,
    pub peak_supply: Option<PeakDay>,
    pub demand_split: DemandSplit,
    pub scenario_summary: ScenarioSummary,
    pub scope: Scope,
    pub scope_label: String,
    pub demand_label: String,
    pub supply_label: String,
    pub adjustments: Vec<ActiveAdjustment>,
    pub insights: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SeriesCsvRow {
    #[serde(rename = "date")]
    #[tabled(rename = "Date")]
    pub date: String,
    #[serde(rename = "demand")]
    #[tabled(rename = "Demand")]
    pub demand: i64,
    #[serde(rename = "supply")]
    #[tabled(rename = "Supply")]
    pub supply: i64,
    #[serde(rename = "gap")]
    #[tabled(rename = "Gap")]
    pub gap: i64,
    #[serde(rename = "status")]
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(rename = "isRamadan")]
    #[tabled(rename = "Ramadan")]
    pub is_ramadan: String,
    #[serde(rename = "isHajj")]
    #[tabled(rename = "Hajj")]
    pub is_hajj: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct MonthlyPreviewRow {
    #[tabled(rename = "Month")]
    pub month: String,
    #[tabled(rename = "AvgDemand")]
    pub avg_dem: String,
    #[tabled(rename = "AvgSupply")]
    pub avg_sup: String,
    #[tabled(rename = "AvgGap")]
    pub avg_gap: String,
    #[tabled(rename = "DeficitDays")]
    pub deficit_days: String,
    #[tabled(rename = "Season")]
    pub season: String,
}
