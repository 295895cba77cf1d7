// Rule-based report insights and confidence notes.
//
// Each rule reads only aggregated metrics, so the same inputs always give
// the same sentences in the same order.
use crate::scenario::Scenario;
use crate::types::{Kpi, MonthlyBucket, RamadanStats, Scope};
use crate::util::format_int;

pub const MAX_INSIGHTS: usize = 5;

fn beds(v: f64) -> String {
    format_int(v.abs().round() as i64)
}

fn deficit_rule(kpi: &Kpi, period_label: &str) -> String {
    let def_pct = kpi.def_pct.round() as i64;
    if def_pct > 70 {
        format!(
            "{} saw a capacity deficit on {}% of days ({} days). The situation is critical and capacity expansion plans need urgent review.",
            period_label, def_pct, kpi.def_days
        )
    } else if def_pct > 40 {
        format!(
            "Daily deficit exceeded {}% of observed days. Expanding future projects would improve the position noticeably.",
            def_pct
        )
    } else {
        format!(
            "The position is relatively stable with a deficit on {}% of days. Surplus in quieter months leaves an acceptable margin for unexpected peaks.",
            def_pct
        )
    }
}

fn critical_rule(kpi: &Kpi) -> Option<String> {
    if kpi.critical_pct > 50 {
        Some(format!(
            "{}% of days fall in the critical band (demand at or above 90% of capacity). Sustained pressure at this level is an operational risk to service quality.",
            kpi.critical_pct
        ))
    } else if kpi.critical_pct > 25 {
        Some(format!(
            "{}% of days fall in the critical band, a rate that calls for a clear contingency plan in peak seasons.",
            kpi.critical_pct
        ))
    } else {
        None
    }
}

fn gap_rule(kpi: &Kpi) -> Option<String> {
    let gap = kpi.avg_gap;
    if gap > 10_000.0 {
        Some(format!(
            "The average daily gap is {} beds, a structural shortfall of capacity against demand.",
            beds(gap)
        ))
    } else if gap > 3_000.0 {
        Some(format!(
            "The average daily gap is {} beds; raising licensed capacity or accelerating future projects would relieve it.",
            beds(gap)
        ))
    } else if gap < -10_000.0 {
        Some(format!(
            "A large surplus of over {} beds/day on average leaves room to revisit how facilities are distributed.",
            beds(gap)
        ))
    } else {
        None
    }
}

fn ramadan_rule(ramadan: &RamadanStats) -> Option<String> {
    if ramadan.ramadan.days == 0 {
        return None;
    }
    let ram_pct = ramadan.ramadan.def_pct.round() as i64;
    let other_pct = ramadan.other.def_pct.round() as i64;
    if ram_pct > 80 {
        Some(format!(
            "Ramadan is the peak stress point (deficit on {}% of its days against {}% outside it). Reserve pilgrim housing should be activated early.",
            ram_pct, other_pct
        ))
    } else if ram_pct > 50 {
        Some(format!(
            "Ramadan deficit of {}% against {}% outside it makes Ramadan the highest-pressure season and worth planning separately.",
            ram_pct, other_pct
        ))
    } else if ram_pct > other_pct + 10 {
        Some(format!(
            "Ramadan raises pressure by {} percentage points over the rest of the year; temporary capacity should be secured at least 45 days ahead.",
            ram_pct - other_pct
        ))
    } else {
        None
    }
}

fn worst_month_rule(monthly: &[MonthlyBucket]) -> Option<String> {
    let mut it = monthly.iter();
    // First month wins ties.
    let mut worst = it.next()?;
    for m in it {
        if m.avg_gap > worst.avg_gap {
            worst = m;
        }
    }
    (worst.avg_gap > 0).then(|| {
        format!(
            "The most stressed month is {} with an average deficit of {} beds/day and a deficit on {} of {} days.",
            worst.label,
            format_int(worst.avg_gap),
            worst.def_days,
            worst.total_days
        )
    })
}

fn scenario_rule(scenario: &Scenario) -> Option<String> {
    let active = scenario.active_count();
    (active > 0).then(|| {
        format!(
            "This report reflects {} hypothetical scenario adjustment(s); results are estimates, not observed data.",
            active
        )
    })
}

/// Up to five report insights, in rule order.
pub fn generate_insights(
    kpi: Option<&Kpi>,
    ramadan: &RamadanStats,
    monthly: &[MonthlyBucket],
    scenario: &Scenario,
    period_label: &str,
) -> Vec<String> {
    let mut insights = Vec::new();
    // KPI rules need at least one qualifying day.
    if let Some(kpi) = kpi {
        insights.push(deficit_rule(kpi, period_label));
        insights.extend(critical_rule(kpi));
        insights.extend(gap_rule(kpi));
    }
    insights.extend(ramadan_rule(ramadan));
    insights.extend(worst_month_rule(monthly));
    insights.extend(scenario_rule(scenario));
    insights.truncate(MAX_INSIGHTS);
    insights
}

/// Caveats printed under the report.
pub fn generate_notes(
    kpi: Option<&Kpi>,
    ramadan: &RamadanStats,
    scenario: &Scenario,
    scope: Scope,
) -> Vec<String> {
    let mut notes = Vec::new();
    if kpi.is_none() {
        notes.push("Not enough data for the selected period.".to_string());
    }
    if ramadan.ramadan.days == 0 {
        notes.push("No Ramadan days were observed; check that the data is complete.".to_string());
    }
    if !scenario.is_zero() {
        notes.push(
            "Figures include hypothetical scenario adjustments and are not observed data."
                .to_string(),
        );
    }
    if scope == Scope::Year {
        notes.push("Scenario scope is limited to the selected year(s).".to_string());
    }
    notes.push(
        "Figures are built on daily averages; individual critical days may show larger deficits."
            .to_string(),
    );
    notes
}
