// Aggregation over a projected series.
//
// Every ratio divides by the number of qualifying points (demand and supply
// both non-zero), never by calendar days. Empty inputs produce `None` or
// zeroed buckets, never NaN.
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::calendar;
use crate::types::{
    AdjustedRow, DeficitWindow, DemandSplit, FutureContribution, Kpi, MonthlyBucket, PeakDay,
    RamadanPeriodStats, RamadanStats, SeasonBucket, SeasonalStats, SeriesPoint,
};
use crate::util::{average, month_abbr, pct, round_pct};

const CRITICAL_RATIO: f64 = 0.9;
const ORDINALS: [&str; 3] = ["1st", "2nd", "3rd"];

fn qualifying(series: &[SeriesPoint]) -> Vec<&SeriesPoint> {
    series.iter().filter(|p| p.is_qualifying()).collect()
}

/// First point whose key beats every earlier one under `better`.
fn first_best<'a, F>(points: &[&'a SeriesPoint], better: F) -> Option<&'a SeriesPoint>
where
    F: Fn(&SeriesPoint, &SeriesPoint) -> bool,
{
    let mut it = points.iter();
    let mut best = *it.next()?;
    for p in it {
        if better(*p, best) {
            best = *p;
        }
    }
    Some(best)
}

fn ratio(p: &SeriesPoint) -> f64 {
    p.demand as f64 / p.supply as f64
}

/// Headline KPIs. `None` means there is not enough data to say anything.
pub fn aggregate(series: &[SeriesPoint]) -> Option<Kpi> {
    let v = qualifying(series);
    if v.is_empty() {
        debug!(points = series.len(), "no qualifying points for kpi");
        return None;
    }
    let total = v.len();
    let demands: Vec<f64> = v.iter().map(|p| p.demand as f64).collect();
    let supplies: Vec<f64> = v.iter().map(|p| p.supply as f64).collect();
    let gaps: Vec<f64> = v.iter().map(|p| p.gap as f64).collect();
    let avg_demand = average(&demands);
    let avg_supply = average(&supplies);
    let avg_gap = average(&gaps);

    let def_days = v.iter().filter(|p| p.is_deficit()).count();
    let critical_days = v
        .iter()
        .filter(|p| p.demand as f64 >= CRITICAL_RATIO * p.supply as f64)
        .count();

    // Strict comparisons keep the earliest day on ties.
    let peak_occ = first_best(&v, |a, b| ratio(a) > ratio(b))?;
    let max_deficit = first_best(&v, |a, b| a.gap > b.gap)?;
    let max_surplus = first_best(&v, |a, b| a.gap < b.gap)?;

    // Ratio of averages, not average of ratios.
    let occupancy_pct = if avg_supply > 0.0 {
        (avg_demand / avg_supply * 100.0).round() as i64
    } else {
        0
    };

    Some(Kpi {
        avg_demand,
        avg_supply,
        avg_gap,
        def_days,
        def_pct: pct(def_days, total),
        total,
        critical_days,
        critical_pct: round_pct(critical_days, total),
        occupancy_pct,
        peak_occ_pct: (ratio(peak_occ) * 100.0).round() as i64,
        peak_occ_date: peak_occ.date,
        max_deficit: max_deficit.clone(),
        max_surplus: max_surplus.clone(),
    })
}

/// One bucket per (year, month) present in the series, oldest first.
pub fn aggregate_monthly(series: &[SeriesPoint]) -> Vec<MonthlyBucket> {
    #[derive(Default)]
    struct Acc {
        dem: Vec<f64>,
        sup: Vec<f64>,
        gap: Vec<f64>,
        def_days: usize,
        is_ram: bool,
        is_hajj: bool,
    }

    let mut map: BTreeMap<(i32, u32), Acc> = BTreeMap::new();
    for p in series {
        let e = map.entry((p.date.year(), p.date.month())).or_default();
        // Season flags see every day; the averages only qualifying ones.
        e.is_ram |= p.is_ramadan;
        e.is_hajj |= p.is_hajj;
        if !p.is_qualifying() {
            continue;
        }
        e.dem.push(p.demand as f64);
        e.sup.push(p.supply as f64);
        e.gap.push(p.gap as f64);
        if p.is_deficit() {
            e.def_days += 1;
        }
    }

    let multi_year = map
        .keys()
        .map(|(y, _)| *y)
        .collect::<BTreeSet<_>>()
        .len()
        > 1;

    map.into_iter()
        .map(|((year, month), acc)| MonthlyBucket {
            year,
            month,
            label: if multi_year {
                format!("{} {}", month_abbr(month), year)
            } else {
                month_abbr(month).to_string()
            },
            avg_dem: average(&acc.dem).round() as i64,
            avg_sup: average(&acc.sup).round() as i64,
            avg_gap: average(&acc.gap).round() as i64,
            def_days: acc.def_days,
            total_days: acc.gap.len(),
            is_ram: acc.is_ram,
            is_hajj: acc.is_hajj,
        })
        .collect()
}

/// Deficit share per season. Buckets are disjoint: a day flagged for both
/// seasons is counted as Ramadan.
pub fn seasonal_breakdown(series: &[SeriesPoint]) -> SeasonalStats {
    let mut stats = SeasonalStats::default();
    for p in qualifying(series) {
        let bucket = if p.is_ramadan {
            &mut stats.ramadan
        } else if p.is_hajj {
            &mut stats.hajj
        } else {
            &mut stats.other
        };
        bucket.days += 1;
        if p.is_deficit() {
            bucket.def_days += 1;
        }
    }
    for bucket in [&mut stats.ramadan, &mut stats.hajj, &mut stats.other] {
        finish_bucket(bucket);
    }
    stats
}

fn finish_bucket(bucket: &mut SeasonBucket) {
    bucket.def_pct = round_pct(bucket.def_days, bucket.days);
}

fn deficit_window<'a, I>(points: I) -> DeficitWindow
where
    I: IntoIterator<Item = &'a SeriesPoint>,
{
    let days: Vec<&SeriesPoint> = points.into_iter().collect();
    let def_days = days.iter().filter(|p| p.is_deficit()).count();
    let deficits: Vec<f64> = days.iter().map(|p| p.gap.max(0) as f64).collect();
    DeficitWindow {
        days: days.len(),
        def_pct: pct(def_days, days.len()),
        avg_deficit: average(&deficits),
        peak: first_best(&days, |a, b| a.gap > b.gap).cloned(),
    }
}

/// Ramadan against the rest of the series, plus one entry per calendar
/// Ramadan window of the selected years.
///
/// Windows are matched by date range, so a window that runs past the end of
/// the data only counts the days present.
pub fn ramadan_stats(series: &[SeriesPoint], years: &BTreeSet<i32>) -> RamadanStats {
    let windows: Vec<(i32, calendar::SeasonRange)> = years
        .iter()
        .flat_map(|y| {
            calendar::ramadan_periods(*y)
                .into_iter()
                .map(move |r| (*y, r))
        })
        .collect();
    let multi_year = years.len() > 1;

    let periods = windows
        .iter()
        .enumerate()
        .map(|(i, (year, range))| {
            let same_year = windows.iter().filter(|(y, _)| y == year).count();
            let ordinal = ORDINALS.get(i).copied().unwrap_or("");
            let label = if multi_year {
                if same_year > 1 {
                    format!("Ramadan {} ({})", year, period_ordinal(&windows, i))
                } else {
                    format!("Ramadan {}", year)
                }
            } else if windows.len() > 1 {
                format!("Ramadan {} ({})", year, ordinal)
            } else {
                format!("Ramadan {}", year)
            };
            RamadanPeriodStats {
                index: i + 1,
                year: *year,
                label,
                start: range.start,
                end: range.end,
                window: deficit_window(series.iter().filter(|p| range.contains(p.date))),
            }
        })
        .collect::<Vec<_>>();

    RamadanStats {
        ramadan: deficit_window(series.iter().filter(|p| p.is_ramadan)),
        other: deficit_window(series.iter().filter(|p| !p.is_ramadan)),
        is_dual: periods.len() > 1,
        periods,
    }
}

/// Ordinal of window `i` among the windows sharing its year.
fn period_ordinal(windows: &[(i32, calendar::SeasonRange)], i: usize) -> &'static str {
    let year = windows[i].0;
    let pos = windows[..i].iter().filter(|(y, _)| *y == year).count();
    ORDINALS.get(pos).copied().unwrap_or("")
}

/// How many deficit days the future-projects supply closes.
///
/// `None` when neither series has any demand to compare against.
pub fn future_contribution(
    without: &[SeriesPoint],
    with: &[SeriesPoint],
) -> Option<FutureContribution> {
    if !without.iter().chain(with).any(|p| p.demand > 0) {
        return None;
    }
    let def_without = without.iter().filter(|p| p.is_deficit()).count();
    let def_with = with.iter().filter(|p| p.is_deficit()).count();
    let resolved = def_without.saturating_sub(def_with);
    let supply_without: i64 = without.iter().map(|p| p.supply).sum();
    let supply_with: i64 = with.iter().map(|p| p.supply).sum();
    Some(FutureContribution {
        def_without,
        def_with,
        resolved,
        pct: (def_without > 0).then(|| round_pct(resolved, def_without)),
        has_future: supply_with > supply_without,
    })
}

/// Busiest demand day across all demand categories, ignoring filters.
pub fn peak_demand(rows: &[AdjustedRow]) -> Option<PeakDay> {
    let mut best: Option<PeakDay> = None;
    for r in rows.iter().filter(|r| r.ado.is_some() || r.adi.is_some()) {
        let total = r.ado.unwrap_or(0) + r.adi.unwrap_or(0);
        if best.as_ref().map_or(true, |b| total > b.value) {
            best = Some(peak_day(r.date, total, r.is_ramadan, r.is_hajj));
        }
    }
    best
}

/// Highest-supply day. Days with no supply at all are not candidates, so a
/// series without capacity data has no peak.
pub fn peak_supply(series: &[SeriesPoint]) -> Option<PeakDay> {
    let points: Vec<&SeriesPoint> = series.iter().filter(|p| p.supply > 0).collect();
    first_best(&points, |a, b| a.supply > b.supply)
        .map(|p| peak_day(p.date, p.supply, p.is_ramadan, p.is_hajj))
}

/// Outside vs inside demand over adjusted rows that carry any demand value,
/// optionally narrowed to one calendar month (1-12) and/or Ramadan days.
pub fn demand_split(
    adjusted: &[AdjustedRow],
    month: Option<u32>,
    ramadan_only: bool,
) -> DemandSplit {
    let rows: Vec<&AdjustedRow> = adjusted
        .iter()
        .filter(|r| r.ado.is_some() || r.adi.is_some())
        .filter(|r| !ramadan_only || r.is_ramadan)
        .filter(|r| month.map_or(true, |m| r.date.month() == m))
        .collect();
    // Missing side counts as 0 here; the row still has the other side.
    let outside: Vec<f64> = rows.iter().map(|r| r.ado.unwrap_or(0) as f64).collect();
    let inside: Vec<f64> = rows.iter().map(|r| r.adi.unwrap_or(0) as f64).collect();
    let avg_outside = average(&outside);
    let avg_inside = average(&inside);
    let total = avg_outside + avg_inside;
    let share = |v: f64| {
        if total > 0.0 {
            (v / total * 100.0).round() as i64
        } else {
            0
        }
    };
    DemandSplit {
        days: rows.len(),
        avg_outside: avg_outside.round() as i64,
        avg_inside: avg_inside.round() as i64,
        outside_pct: share(avg_outside),
        inside_pct: share(avg_inside),
    }
}

fn peak_day(date: NaiveDate, value: i64, is_ramadan: bool, is_hajj: bool) -> PeakDay {
    PeakDay {
        date,
        value,
        is_ramadan,
        is_hajj,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(y: i32, m: u32, d: u32, demand: i64, supply: i64) -> SeriesPoint {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        SeriesPoint {
            date,
            demand,
            supply,
            gap: demand - supply,
            is_ramadan: calendar::is_ramadan(date),
            is_hajj: calendar::is_hajj(date),
        }
    }

    #[test]
    fn kpi_for_single_deficit_day() {
        let kpi = aggregate(&[pt(2026, 1, 1, 1000, 500)]).unwrap();
        assert_eq!(kpi.total, 1);
        assert_eq!(kpi.def_days, 1);
        assert_eq!(kpi.def_pct, 100.0);
        assert_eq!(kpi.critical_pct, 100);
        assert_eq!(kpi.occupancy_pct, 200);
        assert_eq!(kpi.peak_occ_pct, 200);
    }

    #[test]
    fn kpi_denominator_skips_one_sided_days() {
        let series = vec![
            pt(2026, 1, 1, 900, 1000),
            pt(2026, 1, 2, 500, 0),
            pt(2026, 1, 3, 0, 700),
            pt(2026, 1, 4, 1200, 1000),
        ];
        let kpi = aggregate(&series).unwrap();
        assert_eq!(kpi.total, 2);
        assert_eq!(kpi.def_days, 1);
        assert_eq!(kpi.def_pct, 50.0);
        assert_eq!(kpi.critical_days, 2);
        assert_eq!(kpi.avg_gap, 50.0);
        assert_eq!(kpi.occupancy_pct, 105);
    }

    #[test]
    fn kpi_is_none_without_qualifying_points() {
        assert!(aggregate(&[]).is_none());
        assert!(aggregate(&[pt(2026, 1, 2, 500, 0)]).is_none());
    }

    #[test]
    fn extremes_prefer_first_occurrence() {
        let series = vec![
            pt(2026, 1, 1, 200, 100),
            pt(2026, 1, 2, 400, 200),
            pt(2026, 1, 3, 300, 200),
            pt(2026, 1, 4, 100, 200),
            pt(2026, 1, 5, 200, 300),
        ];
        let kpi = aggregate(&series).unwrap();
        assert_eq!(kpi.peak_occ_date.day(), 1);
        assert_eq!(kpi.max_deficit.date.day(), 2);
        assert_eq!(kpi.max_surplus.date.day(), 4);
    }

    #[test]
    fn monthly_buckets_are_not_padded() {
        let series = vec![
            pt(2026, 1, 1, 100, 50),
            pt(2026, 1, 2, 100, 150),
            pt(2026, 3, 1, 10, 20),
            pt(2026, 3, 2, 0, 20),
        ];
        let months = aggregate_monthly(&series);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].label, "Jan");
        assert_eq!(months[0].avg_gap, 0);
        assert_eq!(months[0].def_days, 1);
        assert_eq!(months[0].total_days, 2);
        assert_eq!(months[1].month, 3);
        assert_eq!(months[1].total_days, 1);
        assert!(months[1].is_ram);
    }

    #[test]
    fn monthly_labels_carry_year_across_years() {
        let months = aggregate_monthly(&[pt(2026, 12, 1, 1, 1), pt(2027, 1, 1, 1, 1)]);
        assert_eq!(months[0].label, "Dec 2026");
        assert_eq!(months[1].label, "Jan 2027");
    }

    #[test]
    fn seasonal_buckets_are_disjoint() {
        let mut both = pt(2026, 7, 1, 300, 100);
        both.is_ramadan = true;
        both.is_hajj = true;
        let series = vec![
            pt(2026, 2, 20, 300, 100),
            pt(2026, 5, 26, 100, 300),
            pt(2026, 7, 2, 300, 100),
            both,
        ];
        let s = seasonal_breakdown(&series);
        assert_eq!(s.ramadan.days, 2);
        assert_eq!(s.ramadan.def_pct, 100);
        assert_eq!(s.hajj.days, 1);
        assert_eq!(s.hajj.def_pct, 0);
        assert_eq!(s.other.days, 1);
        assert_eq!(s.ramadan.days + s.hajj.days + s.other.days, series.len());
    }

    #[test]
    fn dual_ramadan_periods_sum_to_combined() {
        let mut series = Vec::new();
        let mut date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        while date.year() == 2030 {
            let demand = if date.month() == 1 { 2000 } else { 800 };
            series.push(pt(2030, date.month(), date.day(), demand, 1000));
            date = date.succ_opt().unwrap();
        }
        let stats = ramadan_stats(&series, &[2030].into_iter().collect());
        assert!(stats.is_dual);
        assert_eq!(stats.periods.len(), 2);
        let days: usize = stats.periods.iter().map(|p| p.window.days).sum();
        assert_eq!(stats.ramadan.days, days);
        assert_eq!(stats.periods[0].window.days, 30);
        assert_eq!(stats.periods[1].window.days, 6);
        assert_eq!(stats.periods[0].label, "Ramadan 2030 (1st)");
        assert_eq!(stats.periods[1].label, "Ramadan 2030 (2nd)");
        // Jan 5..=31 are deficit days, Feb 1..=3 are not.
        assert!((stats.periods[0].window.def_pct - 90.0).abs() < 1e-9);
        assert_eq!(stats.periods[1].window.def_pct, 0.0);
        assert_eq!(stats.periods[0].window.avg_deficit, 900.0);
        assert_eq!(stats.periods[0].window.peak.as_ref().unwrap().date.day(), 5);
    }

    #[test]
    fn ramadan_labels_in_multi_year_view() {
        let stats = ramadan_stats(&[], &[2029, 2030].into_iter().collect());
        let labels: Vec<&str> = stats.periods.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Ramadan 2029", "Ramadan 2030 (1st)", "Ramadan 2030 (2nd)"]
        );
        assert_eq!(stats.ramadan.days, 0);
        assert!(stats.ramadan.peak.is_none());
    }

    #[test]
    fn future_contribution_never_negative() {
        let without = vec![pt(2026, 1, 1, 1000, 900), pt(2026, 1, 2, 1000, 1100)];
        let with = vec![pt(2026, 1, 1, 1000, 950), pt(2026, 1, 2, 1000, 900)];
        let c = future_contribution(&without, &with).unwrap();
        assert_eq!(c.def_without, 1);
        assert_eq!(c.def_with, 2);
        assert_eq!(c.resolved, 0);
        assert_eq!(c.pct, Some(0));
    }

    #[test]
    fn future_contribution_without_deficit_has_no_pct() {
        let without = vec![pt(2026, 1, 1, 100, 900)];
        let with = vec![pt(2026, 1, 1, 100, 1000)];
        let c = future_contribution(&without, &with).unwrap();
        assert_eq!(c.pct, None);
        assert!(c.has_future);
        assert!(future_contribution(&[pt(2026, 1, 1, 0, 10)], &[]).is_none());
    }

    #[test]
    fn future_contribution_counts_resolved_days() {
        let without = vec![
            pt(2026, 1, 1, 1000, 500),
            pt(2026, 1, 2, 1000, 800),
            pt(2026, 1, 3, 1000, 900),
        ];
        let with = vec![
            pt(2026, 1, 1, 1000, 700),
            pt(2026, 1, 2, 1000, 1000),
            pt(2026, 1, 3, 1000, 1100),
        ];
        let c = future_contribution(&without, &with).unwrap();
        assert_eq!(c.resolved, 2);
        assert_eq!(c.pct, Some(67));
    }

    fn demand_row(m: u32, d: u32, ado: Option<i64>, adi: Option<i64>) -> AdjustedRow {
        let date = NaiveDate::from_ymd_opt(2026, m, d).unwrap();
        AdjustedRow {
            date,
            asl: Some(1000),
            asf: None,
            ash: None,
            ado,
            adi,
            is_ramadan: calendar::is_ramadan(date),
            is_hajj: calendar::is_hajj(date),
        }
    }

    #[test]
    fn demand_split_averages_rows_with_demand() {
        let rows = vec![
            demand_row(1, 10, Some(300), Some(100)),
            demand_row(1, 11, Some(500), None),
            demand_row(1, 12, None, None),
        ];
        let split = demand_split(&rows, None, false);
        assert_eq!(split.days, 2);
        assert_eq!(split.avg_outside, 400);
        assert_eq!(split.avg_inside, 50);
        assert_eq!(split.outside_pct, 89);
        assert_eq!(split.inside_pct, 11);
    }

    #[test]
    fn demand_split_month_and_ramadan_filters() {
        let rows = vec![
            demand_row(1, 10, Some(100), Some(100)),
            demand_row(2, 20, Some(900), Some(100)),
            demand_row(3, 25, Some(200), Some(200)),
        ];
        let january = demand_split(&rows, Some(1), false);
        assert_eq!(january.days, 1);
        assert_eq!(january.outside_pct, 50);

        // 2026-02-20 is in Ramadan, 2026-03-25 is not.
        let ramadan = demand_split(&rows, None, true);
        assert_eq!(ramadan.days, 1);
        assert_eq!(ramadan.avg_outside, 900);
        assert_eq!(ramadan.outside_pct, 90);

        assert_eq!(demand_split(&rows, Some(3), true).days, 0);
    }

    #[test]
    fn demand_split_of_nothing_is_zeroed() {
        assert_eq!(demand_split(&[], None, false), DemandSplit::default());
        let zeros = vec![demand_row(1, 1, Some(0), Some(0))];
        let split = demand_split(&zeros, None, false);
        assert_eq!(split.days, 1);
        assert_eq!((split.outside_pct, split.inside_pct), (0, 0));
    }

    #[test]
    fn peak_supply_ignores_days_without_capacity() {
        assert!(peak_supply(&[pt(2026, 1, 1, 100, 0)]).is_none());
        let series = vec![pt(2026, 1, 1, 100, 0), pt(2026, 1, 2, 100, 40)];
        assert_eq!(peak_supply(&series).unwrap().value, 40);
    }

    #[test]
    fn peaks_pick_first_maximum() {
        let series = vec![pt(2026, 1, 1, 10, 500), pt(2026, 1, 2, 10, 500)];
        assert_eq!(peak_supply(&series).unwrap().date.day(), 1);
        assert!(peak_supply(&[]).is_none());

        let rows = vec![
            AdjustedRow {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                asl: None,
                asf: None,
                ash: None,
                ado: Some(10),
                adi: None,
                is_ramadan: false,
                is_hajj: false,
            },
            AdjustedRow {
                date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                asl: None,
                asf: None,
                ash: None,
                ado: Some(10),
                adi: Some(5),
                is_ramadan: false,
                is_hajj: false,
            },
        ];
        let peak = peak_demand(&rows).unwrap();
        assert_eq!(peak.value, 15);
        assert_eq!(peak.date.day(), 2);
    }
}
