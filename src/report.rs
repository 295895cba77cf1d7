// End-to-end pipeline and report payload assembly.
//
// `run_pipeline` is the only entry point a host needs: it takes the whole
// immutable input bundle and returns fresh output every call.
use std::collections::BTreeSet;
use tracing::info;

use crate::aggregate;
use crate::error::{ReportError, Result};
use crate::insights;
use crate::scenario::{self, Scenario, ScenarioKey, ScenarioSummary};
use crate::series;
use crate::types::{
    ActiveAdjustment, DemandCategory, DemandSplit, FutureContribution, Kpi, MonthlyBucket,
    PeakDay, RamadanStats, RawRow, ReportPayload, Scope, SeasonalStats, SeriesPoint,
    SupplyCategory,
};

#[derive(Debug, Clone)]
pub struct PipelineInput<'a> {
    pub rows: &'a [RawRow],
    pub scenario: Scenario,
    pub scope: Scope,
    pub years: BTreeSet<i32>,
    pub demand: BTreeSet<DemandCategory>,
    pub supply: BTreeSet<SupplyCategory>,
}

impl<'a> PipelineInput<'a> {
    /// All categories on, every year present in `rows`, no scenario.
    pub fn new(rows: &'a [RawRow]) -> Self {
        Self {
            rows,
            scenario: Scenario::default(),
            scope: Scope::All,
            years: rows.iter().map(RawRow::year).collect(),
            demand: DemandCategory::ALL.into_iter().collect(),
            supply: SupplyCategory::ALL.into_iter().collect(),
        }
    }

    /// Checks the preconditions the pipeline itself assumes.
    ///
    /// An empty dataset has no years to select; it passes so the caller
    /// still gets an insufficient-data report.
    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() && !self.rows.is_empty() {
            return Err(ReportError::Filter("no year selected".to_string()));
        }
        if self.demand.is_empty() {
            return Err(ReportError::Filter("no demand category active".to_string()));
        }
        if self.supply.is_empty() {
            return Err(ReportError::Filter("no supply category active".to_string()));
        }
        self.scenario.validate()
    }

    /// The single selected year, if only one is selected.
    pub fn single_year(&self) -> Option<i32> {
        if self.years.len() == 1 {
            self.years.iter().next().copied()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub series: Vec<SeriesPoint>,
    pub kpi: Option<Kpi>,
    pub monthly: Vec<MonthlyBucket>,
    pub seasonal: SeasonalStats,
    pub ramadan: RamadanStats,
    pub future_contribution: Option<FutureContribution>,
    pub peak_demand: Option<PeakDay>,
    pub peak_supply: Option<PeakDay>,
    pub demand_split: DemandSplit,
    pub scenario_summary: ScenarioSummary,
    pub insights: Vec<String>,
    pub notes: Vec<String>,
}

pub fn run_pipeline(input: &PipelineInput<'_>) -> PipelineOutput {
    let adjusted = scenario::adjust(input.rows, &input.scenario, input.scope, &input.years);
    let selected = series::select_years(&adjusted, &input.years);
    let points = series::project(&selected, &input.demand, &input.supply);

    let kpi = aggregate::aggregate(&points);
    let monthly = aggregate::aggregate_monthly(&points);
    let seasonal = aggregate::seasonal_breakdown(&points);
    let ramadan = aggregate::ramadan_stats(&points, &input.years);
    let (without, with) = series::project_future_pair(&selected, &input.demand, &input.supply);
    let future_contribution = aggregate::future_contribution(&without, &with);
    let peak_demand = aggregate::peak_demand(&selected);
    let peak_supply = aggregate::peak_supply(&points);
    let demand_split = aggregate::demand_split(&selected, None, false);

    let label = period_label(input.single_year(), &series_years(&points));
    let insights = insights::generate_insights(
        kpi.as_ref(),
        &ramadan,
        &monthly,
        &input.scenario,
        &label,
    );
    let notes = insights::generate_notes(kpi.as_ref(), &ramadan, &input.scenario, input.scope);

    info!(
        rows = input.rows.len(),
        points = points.len(),
        qualifying = kpi.as_ref().map_or(0, |k| k.total),
        insights = insights.len(),
        "pipeline complete"
    );

    PipelineOutput {
        series: points,
        kpi,
        monthly,
        seasonal,
        ramadan,
        future_contribution,
        peak_demand,
        peak_supply,
        demand_split,
        scenario_summary: input.scenario.summary(),
        insights,
        notes,
    }
}

pub fn series_years(series: &[SeriesPoint]) -> Vec<i32> {
    series
        .iter()
        .map(SeriesPoint::year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `2027` for a single year, `2026–2028` for a contiguous run, otherwise
/// the years joined with commas.
pub fn period_label(year: Option<i32>, series_years: &[i32]) -> String {
    if let Some(y) = year {
        return y.to_string();
    }
    match series_years {
        [] => "—".to_string(),
        [only] => only.to_string(),
        [first, .., last] if (last - first) as usize + 1 == series_years.len() => {
            format!("{}–{}", first, last)
        }
        _ => series_years
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn scope_label(scope: Scope, year: Option<i32>) -> String {
    match (scope, year) {
        (Scope::All, _) => "All years".to_string(),
        (Scope::Year, Some(y)) => format!("{} only", y),
        (Scope::Year, None) => "Selected years".to_string(),
    }
}

fn join_labels<T: Copy>(items: &BTreeSet<T>, label: fn(T) -> &'static str) -> String {
    items
        .iter()
        .map(|c| label(*c))
        .collect::<Vec<_>>()
        .join(" + ")
}

fn active_adjustments(sc: &Scenario) -> Vec<ActiveAdjustment> {
    ScenarioKey::ALL
        .iter()
        .filter(|k| sc.get(**k) != 0)
        .map(|k| ActiveAdjustment {
            key: k.name(),
            label: k.label(),
            value: sc.get(*k),
            category: if k.is_supply() { "supply" } else { "demand" },
        })
        .collect()
}

/// Assemble the exportable report. No metric is computed here.
pub fn build_report_payload(input: &PipelineInput<'_>, output: &PipelineOutput) -> ReportPayload {
    let year = input.single_year();
    let years = series_years(&output.series);
    ReportPayload {
        year,
        period_label: period_label(year, &years),
        series_years: years,
        kpi: output.kpi.clone(),
        seasonal: output.seasonal.clone(),
        ramadan: output.ramadan.clone(),
        monthly: output.monthly.clone(),
        future_contribution: output.future_contribution.clone(),
        peak_demand: output.peak_demand.clone(),
        peak_supply: output.peak_supply.clone(),
        demand_split: output.demand_split.clone(),
        scenario_summary: output.scenario_summary,
        scope: input.scope,
        scope_label: scope_label(input.scope, year),
        demand_label: join_labels(&input.demand, DemandCategory::label),
        supply_label: join_labels(&input.supply, SupplyCategory::label),
        adjustments: active_adjustments(&input.scenario),
        insights: output.insights.clone(),
        notes: output.notes.clone(),
    }
}
