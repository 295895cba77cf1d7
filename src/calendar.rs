// Fixed Ramadan and Hajj windows for the covered years.
//
// Dates are approximate Gregorian equivalents. 2030 carries two Ramadan
// windows because the lunar month starts early in January and again late
// in December.
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use serde::Serialize;

pub const FIRST_YEAR: i32 = 2026;
pub const LAST_YEAR: i32 = 2030;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonRange {
    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

type Ymd = (i32, u32, u32);

const RAMADAN: [(i32, Ymd, Ymd); 6] = [
    (2026, (2026, 2, 18), (2026, 3, 19)),
    (2027, (2027, 2, 8), (2027, 3, 9)),
    (2028, (2028, 1, 28), (2028, 2, 26)),
    (2029, (2029, 1, 16), (2029, 2, 14)),
    (2030, (2030, 1, 5), (2030, 2, 3)),
    (2030, (2030, 12, 26), (2031, 1, 24)),
];

const HAJJ: [(i32, Ymd, Ymd); 5] = [
    (2026, (2026, 5, 25), (2026, 5, 30)),
    (2027, (2027, 5, 14), (2027, 5, 19)),
    (2028, (2028, 5, 3), (2028, 5, 8)),
    (2029, (2029, 4, 22), (2029, 4, 27)),
    (2030, (2030, 4, 11), (2030, 4, 16)),
];

fn build(table: &[(i32, Ymd, Ymd)]) -> Vec<(i32, SeasonRange)> {
    table
        .iter()
        .filter_map(|&(year, (sy, sm, sd), (ey, em, ed))| {
            Some((
                year,
                SeasonRange {
                    start: NaiveDate::from_ymd_opt(sy, sm, sd)?,
                    end: NaiveDate::from_ymd_opt(ey, em, ed)?,
                },
            ))
        })
        .collect()
}

static RAMADAN_RANGES: Lazy<Vec<(i32, SeasonRange)>> = Lazy::new(|| build(&RAMADAN));
static HAJJ_RANGES: Lazy<Vec<(i32, SeasonRange)>> = Lazy::new(|| build(&HAJJ));

pub fn in_covered_years(year: i32) -> bool {
    (FIRST_YEAR..=LAST_YEAR).contains(&year)
}

/// Ramadan windows that belong to `year`, in chronological order.
pub fn ramadan_periods(year: i32) -> Vec<SeasonRange> {
    RAMADAN_RANGES
        .iter()
        .filter(|(y, _)| *y == year)
        .map(|(_, r)| *r)
        .collect()
}

pub fn hajj_period(year: i32) -> Option<SeasonRange> {
    HAJJ_RANGES.iter().find(|(y, _)| *y == year).map(|(_, r)| *r)
}

/// Ramadan membership is looked up against the windows of the date's own year.
pub fn is_ramadan(date: NaiveDate) -> bool {
    ramadan_periods(date.year())
        .iter()
        .any(|r| r.contains(date))
}

pub fn is_hajj(date: NaiveDate) -> bool {
    hajj_period(date.year()).map_or(false, |r| r.contains(date))
}
