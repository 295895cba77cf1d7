// What-if scenario deltas and their application to raw rows.
//
// Deltas are whole percentages. A row outside the active scope sees the
// zero scenario, so its values pass through unchanged apart from rounding.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::types::{AdjustedRow, RawRow, Scope};
use crate::util::apply_pct;

pub const MIN_DELTA: i32 = -50;
pub const MAX_DELTA: i32 = 100;

/// Percentage deltas, one per adjustable component. All zero means
/// "no adjustment"; `Scenario::default()` is the reset state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub sl: i32,
    pub sf: i32,
    pub sh: i32,
    /// Beds-per-room ratio. Compounds with licensed capacity only.
    pub br: i32,
    pub do_: i32,
    pub di: i32,
}

/// Headline view of a scenario: how many keys moved, the mean non-zero
/// delta per side and the net supply-minus-demand push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub active: usize,
    pub supply_avg: Option<i32>,
    pub demand_avg: Option<i32>,
    /// Sum of supply deltas minus sum of demand deltas; >= 0 eases pressure.
    pub net_impact: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKey {
    Sl,
    Sf,
    Sh,
    Br,
    Do,
    Di,
}

impl ScenarioKey {
    pub const ALL: [ScenarioKey; 6] = [
        ScenarioKey::Sl,
        ScenarioKey::Sf,
        ScenarioKey::Sh,
        ScenarioKey::Br,
        ScenarioKey::Do,
        ScenarioKey::Di,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenarioKey::Sl => "sl",
            ScenarioKey::Sf => "sf",
            ScenarioKey::Sh => "sh",
            ScenarioKey::Br => "br",
            ScenarioKey::Do => "do_",
            ScenarioKey::Di => "di",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScenarioKey::Sl => "Licensed facilities",
            ScenarioKey::Sf => "Future projects",
            ScenarioKey::Sh => "Pilgrim housing",
            ScenarioKey::Br => "Beds per room",
            ScenarioKey::Do => "Outside visitors",
            ScenarioKey::Di => "Inside visitors",
        }
    }

    pub fn is_supply(self) -> bool {
        matches!(
            self,
            ScenarioKey::Sl | ScenarioKey::Sf | ScenarioKey::Sh | ScenarioKey::Br
        )
    }
}

impl Scenario {
    pub fn get(&self, key: ScenarioKey) -> i32 {
        match key {
            ScenarioKey::Sl => self.sl,
            ScenarioKey::Sf => self.sf,
            ScenarioKey::Sh => self.sh,
            ScenarioKey::Br => self.br,
            ScenarioKey::Do => self.do_,
            ScenarioKey::Di => self.di,
        }
    }

    pub fn set(&mut self, key: ScenarioKey, value: i32) {
        let slot = match key {
            ScenarioKey::Sl => &mut self.sl,
            ScenarioKey::Sf => &mut self.sf,
            ScenarioKey::Sh => &mut self.sh,
            ScenarioKey::Br => &mut self.br,
            ScenarioKey::Do => &mut self.do_,
            ScenarioKey::Di => &mut self.di,
        };
        *slot = value;
    }

    pub fn reset(&mut self) {
        *self = Scenario::default();
    }

    pub fn is_zero(&self) -> bool {
        self.active_count() == 0
    }

    pub fn active_count(&self) -> usize {
        ScenarioKey::ALL
            .iter()
            .filter(|k| self.get(**k) != 0)
            .count()
    }

    pub fn summary(&self) -> ScenarioSummary {
        let supply = self.deltas(true);
        let demand = self.deltas(false);
        ScenarioSummary {
            active: self.active_count(),
            supply_avg: mean_moved(&supply),
            demand_avg: mean_moved(&demand),
            net_impact: supply.iter().sum::<i32>() - demand.iter().sum::<i32>(),
        }
    }

    fn deltas(&self, supply: bool) -> Vec<i32> {
        ScenarioKey::ALL
            .into_iter()
            .filter(|k| k.is_supply() == supply)
            .map(|k| self.get(k))
            .collect()
    }

    /// Range check for callers that take values from outside a bounded
    /// slider. `adjust` itself never validates.
    pub fn validate(&self) -> Result<()> {
        for key in ScenarioKey::ALL {
            let value = self.get(key);
            if !(MIN_DELTA..=MAX_DELTA).contains(&value) {
                return Err(ReportError::Scenario {
                    key: key.name(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// The scenario as seen by a row that is out of scope.
    fn gated(&self, applies: bool) -> Scenario {
        if applies {
            *self
        } else {
            Scenario::default()
        }
    }
}

/// Mean over the keys that actually moved; untouched keys don't dilute it.
fn mean_moved(deltas: &[i32]) -> Option<i32> {
    let moved: Vec<i32> = deltas.iter().copied().filter(|v| *v != 0).collect();
    if moved.is_empty() {
        return None;
    }
    let sum: i32 = moved.iter().sum();
    Some((f64::from(sum) / moved.len() as f64).round() as i32)
}

fn scaled(value: Option<f64>, factors: &[i32]) -> Option<i64> {
    let v = value?;
    let adjusted = factors.iter().fold(v, |acc, pct| apply_pct(acc, *pct));
    Some(adjusted.round() as i64)
}

/// Apply scope-gated scenario deltas to every row.
///
/// Preconditions: every delta is within `-50..=100`. Missing components stay
/// `None`; each present component is rounded half away from zero once.
pub fn adjust(
    rows: &[RawRow],
    sc: &Scenario,
    scope: Scope,
    active_years: &BTreeSet<i32>,
) -> Vec<AdjustedRow> {
    debug!(
        rows = rows.len(),
        active = sc.active_count(),
        ?scope,
        "applying scenario"
    );
    rows.iter()
        .map(|r| {
            let applies = scope == Scope::All || active_years.contains(&r.year());
            let s = sc.gated(applies);
            AdjustedRow {
                date: r.date,
                asl: scaled(r.sl, &[s.sl, s.br]),
                asf: scaled(r.sf, &[s.sf]),
                ash: scaled(r.sh, &[s.sh]),
                ado: scaled(r.do_, &[s.do_]),
                adi: scaled(r.di, &[s.di]),
                is_ramadan: r.is_ramadan,
                is_hajj: r.is_hajj,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(y: i32, sl: Option<f64>, sf: Option<f64>) -> RawRow {
        RawRow {
            sl,
            sf,
            sh: Some(0.0),
            do_: Some(800.0),
            di: None,
            ..RawRow::empty(NaiveDate::from_ymd_opt(y, 1, 1).unwrap())
        }
    }

    fn years(ys: &[i32]) -> BTreeSet<i32> {
        ys.iter().copied().collect()
    }

    #[test]
    fn zero_scenario_is_identity() {
        let rows = vec![row(2026, Some(1000.0), Some(100.0))];
        let out = adjust(&rows, &Scenario::default(), Scope::All, &years(&[2026]));
        assert_eq!(out[0].asl, Some(1000));
        assert_eq!(out[0].asf, Some(100));
        assert_eq!(out[0].ash, Some(0));
        assert_eq!(out[0].ado, Some(800));
        assert_eq!(out[0].adi, None);
    }

    #[test]
    fn beds_per_room_compounds_with_licensed_only() {
        let rows = vec![row(2026, Some(1000.0), Some(100.0))];
        let sc = Scenario {
            sl: 10,
            br: 20,
            ..Scenario::default()
        };
        let out = adjust(&rows, &sc, Scope::All, &years(&[2026]));
        assert_eq!(out[0].asl, Some(1320));
        assert_eq!(out[0].asf, Some(100));

        let br_only = Scenario {
            br: 50,
            ..Scenario::default()
        };
        let out = adjust(&rows, &br_only, Scope::All, &years(&[2026]));
        assert_eq!(out[0].asl, Some(1500));
        assert_eq!(out[0].asf, Some(100));
        assert_eq!(out[0].ash, Some(0));
    }

    #[test]
    fn missing_licensed_stays_missing() {
        let rows = vec![row(2026, None, Some(100.0))];
        let sc = Scenario {
            sl: 100,
            br: 100,
            ..Scenario::default()
        };
        let out = adjust(&rows, &sc, Scope::All, &years(&[2026]));
        assert_eq!(out[0].asl, None);
    }

    #[test]
    fn year_scope_skips_unselected_years() {
        let rows = vec![
            row(2026, Some(1000.0), None),
            row(2027, Some(1000.0), None),
        ];
        let sc = Scenario {
            sl: -50,
            ..Scenario::default()
        };
        let out = adjust(&rows, &sc, Scope::Year, &years(&[2027]));
        assert_eq!(out[0].asl, Some(1000));
        assert_eq!(out[1].asl, Some(500));
    }

    #[test]
    fn rounds_half_away_from_zero_once() {
        let rows = vec![RawRow {
            sf: Some(5.0),
            ..RawRow::empty(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
        }];
        let sc = Scenario {
            sf: 10,
            ..Scenario::default()
        };
        let out = adjust(&rows, &sc, Scope::All, &years(&[2026]));
        assert_eq!(out[0].asf, Some(6));
    }

    #[test]
    fn summary_averages_moved_keys_per_side() {
        let sc = Scenario {
            sl: 10,
            br: 25,
            do_: -20,
            ..Scenario::default()
        };
        let summary = sc.summary();
        assert_eq!(summary.active, 3);
        // (10 + 25) / 2 = 17.5
        assert_eq!(summary.supply_avg, Some(18));
        assert_eq!(summary.demand_avg, Some(-20));
        assert_eq!(summary.net_impact, 55);
    }

    #[test]
    fn summary_of_zero_scenario_is_empty() {
        let summary = Scenario::default().summary();
        assert_eq!(summary, ScenarioSummary::default());
        assert_eq!(summary.supply_avg, None);

        let demand_up = Scenario {
            di: 30,
            ..Scenario::default()
        };
        assert_eq!(demand_up.summary().net_impact, -30);
        assert_eq!(demand_up.summary().supply_avg, None);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut sc = Scenario::default();
        assert!(sc.validate().is_ok());
        sc.set(ScenarioKey::Di, 101);
        assert!(matches!(
            sc.validate(),
            Err(ReportError::Scenario { key: "di", value: 101 })
        ));
        sc.reset();
        assert!(sc.is_zero());
    }
}
