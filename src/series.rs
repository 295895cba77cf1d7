use std::collections::BTreeSet;
use tracing::debug;

use crate::types::{AdjustedRow, DemandCategory, SeriesPoint, SupplyCategory};

/// Keep the rows whose year is selected, preserving order.
pub fn select_years(adjusted: &[AdjustedRow], years: &BTreeSet<i32>) -> Vec<AdjustedRow> {
    adjusted
        .iter()
        .filter(|r| years.contains(&r.year()))
        .cloned()
        .collect()
}

fn demand_of(r: &AdjustedRow, cats: &BTreeSet<DemandCategory>) -> i64 {
    cats.iter()
        .map(|c| match c {
            DemandCategory::Outside => r.ado,
            DemandCategory::Inside => r.adi,
        })
        .map(|v| v.unwrap_or(0))
        .sum()
}

fn supply_of(r: &AdjustedRow, cats: &BTreeSet<SupplyCategory>) -> i64 {
    cats.iter()
        .map(|c| match c {
            SupplyCategory::Licensed => r.asl,
            SupplyCategory::Future => r.asf,
            SupplyCategory::Hajj => r.ash,
        })
        .map(|v| v.unwrap_or(0))
        .sum()
}

/// Resolve each adjusted row into demand, supply and gap under the active
/// categories.
///
/// Both category sets are assumed non-empty. Missing components count as 0
/// here and only here. Days where both sides resolve to 0 are dropped.
pub fn project(
    adjusted: &[AdjustedRow],
    demand_cats: &BTreeSet<DemandCategory>,
    supply_cats: &BTreeSet<SupplyCategory>,
) -> Vec<SeriesPoint> {
    let series: Vec<SeriesPoint> = adjusted
        .iter()
        .map(|r| {
            let demand = demand_of(r, demand_cats);
            let supply = supply_of(r, supply_cats);
            SeriesPoint {
                date: r.date,
                demand,
                supply,
                gap: demand - supply,
                is_ramadan: r.is_ramadan,
                is_hajj: r.is_hajj,
            }
        })
        .filter(|p| p.demand != 0 || p.supply != 0)
        .collect();
    debug!(
        rows = adjusted.len(),
        points = series.len(),
        "projected series"
    );
    series
}

/// Series under the active supply categories without and with the future
/// projects component, in that order.
pub fn project_future_pair(
    adjusted: &[AdjustedRow],
    demand_cats: &BTreeSet<DemandCategory>,
    supply_cats: &BTreeSet<SupplyCategory>,
) -> (Vec<SeriesPoint>, Vec<SeriesPoint>) {
    let mut without = supply_cats.clone();
    without.remove(&SupplyCategory::Future);
    let mut with = without.clone();
    with.insert(SupplyCategory::Future);
    (
        project(adjusted, demand_cats, &without),
        project(adjusted, demand_cats, &with),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn adj(
        day: u32,
        asl: Option<i64>,
        asf: Option<i64>,
        ado: Option<i64>,
        adi: Option<i64>,
    ) -> AdjustedRow {
        AdjustedRow {
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            asl,
            asf,
            ash: None,
            ado,
            adi,
            is_ramadan: false,
            is_hajj: false,
        }
    }

    fn all_demand() -> BTreeSet<DemandCategory> {
        DemandCategory::ALL.into_iter().collect()
    }

    fn all_supply() -> BTreeSet<SupplyCategory> {
        SupplyCategory::ALL.into_iter().collect()
    }

    #[test]
    fn sums_active_categories_and_signs_gap() {
        let rows = vec![adj(1, Some(1320), Some(100), Some(800), Some(100))];
        let s = project(&rows, &all_demand(), &all_supply());
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].demand, 900);
        assert_eq!(s[0].supply, 1420);
        assert_eq!(s[0].gap, -520);
        assert_eq!(s[0].status().as_str(), "surplus");
    }

    #[test]
    fn inactive_categories_contribute_nothing() {
        let rows = vec![adj(1, Some(500), Some(300), Some(800), Some(100))];
        let demand: BTreeSet<_> = [DemandCategory::Outside].into_iter().collect();
        let supply: BTreeSet<_> = [SupplyCategory::Licensed].into_iter().collect();
        let s = project(&rows, &demand, &supply);
        assert_eq!(s[0].demand, 800);
        assert_eq!(s[0].supply, 500);
        assert!(s[0].is_deficit());
    }

    #[test]
    fn drops_days_without_signal() {
        let rows = vec![
            adj(1, None, None, None, None),
            adj(2, Some(0), None, Some(0), None),
            adj(3, Some(10), None, None, None),
            adj(4, None, Some(50), Some(20), None),
        ];
        let supply: BTreeSet<_> = [SupplyCategory::Licensed].into_iter().collect();
        let s = project(&rows, &all_demand(), &supply);
        let days: Vec<u32> = s.iter().map(|p| chrono::Datelike::day(&p.date)).collect();
        assert_eq!(days, vec![3, 4]);
        assert!(s.len() <= rows.len());
        assert_eq!(s[1].supply, 0);
    }

    #[test]
    fn future_pair_toggles_future_only() {
        let rows = vec![adj(1, Some(500), Some(600), Some(1000), None)];
        let supply: BTreeSet<_> = [SupplyCategory::Licensed].into_iter().collect();
        let (without, with) = project_future_pair(&rows, &all_demand(), &supply);
        assert_eq!(without[0].supply, 500);
        assert_eq!(with[0].supply, 1100);
    }

    #[test]
    fn select_years_keeps_order() {
        let mut rows = vec![adj(1, Some(1), None, None, None), adj(2, Some(2), None, None, None)];
        rows[0].date = NaiveDate::from_ymd_opt(2027, 3, 1).unwrap();
        let picked = select_years(&rows, &[2026].into_iter().collect());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].asl, Some(2));
    }
}
