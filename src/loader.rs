// Dataset ingestion.
//
// Two sources feed the engine: a prebuilt JSON dataset, or the Supply and
// Demand sheets exported to CSV. CSV headers vary between workbook
// revisions, so columns are found through a declarative pattern table that
// is resolved once per file.
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{info, warn};

use crate::calendar;
use crate::error::{ReportError, Result};
use crate::types::{Dataset, RawRow};
use crate::util::{parse_date_safe, parse_f64_safe};

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
    pub out_of_range: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Licensed,
    Future,
    PilgrimHousing,
    Outside,
    Inside,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Licensed => "sl",
            Field::Future => "sf",
            Field::PilgrimHousing => "sh",
            Field::Outside => "do_",
            Field::Inside => "di",
        }
    }

    fn set(self, row: &mut RawRow, value: Option<f64>) {
        match self {
            Field::Date => {}
            Field::Licensed => row.sl = value,
            Field::Future => row.sf = value,
            Field::PilgrimHousing => row.sh = value,
            Field::Outside => row.do_ = value,
            Field::Inside => row.di = value,
        }
    }
}

const SUPPLY_FIELDS: [Field; 4] = [
    Field::Date,
    Field::Licensed,
    Field::Future,
    Field::PilgrimHousing,
];
const DEMAND_FIELDS: [Field; 3] = [Field::Date, Field::Outside, Field::Inside];

/// Candidate headers per field, most specific first.
static HEADER_PATTERNS: Lazy<HashMap<Field, Vec<String>>> = Lazy::new(|| {
    let table: [(Field, &[&str]); 6] = [
        (Field::Date, &["Date Gregorian", "Date", "التاريخ الميلادي"]),
        (
            Field::Licensed,
            &[
                "Licensed capacity",
                "Licensed beds",
                "الطاقة الاستيعابية للإيواء - مكة المكرمة",
                "الطاقة الاستيعابية للإيواء",
            ],
        ),
        (
            Field::Future,
            &[
                "Future projects",
                "المشاريع المستقبلية للإيواء - مكة المكرمة",
                "المشاريع المستقبلية",
            ],
        ),
        (
            Field::PilgrimHousing,
            &[
                "Pilgrim housing",
                "الطاقة الاستيعابية لمساكن الحجاج - مكة المكرمة",
                "مساكن الحجاج",
            ],
        ),
        (
            Field::Outside,
            &[
                "Outside visitors",
                "Outside demand",
                "المعتمرون من الخارج",
                "معتمري الخارج",
            ],
        ),
        (
            Field::Inside,
            &[
                "Inside visitors",
                "Inside demand",
                "المعتمرون من الداخل مبيت",
                "معتمري الداخل مبيت",
            ],
        ),
    ];
    table
        .into_iter()
        .map(|(field, patterns)| (field, patterns.iter().map(|p| normalize(p)).collect()))
        .collect()
});

/// Collapse whitespace (including NBSP and line breaks) and lowercase.
fn normalize(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{00A0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Index of the header matching `field`: exact match, then a header that
/// contains the pattern, then a pattern that contains a header longer than
/// five characters.
fn find_column(headers: &[String], field: Field) -> Option<usize> {
    let patterns = HEADER_PATTERNS.get(&field)?;
    for pattern in patterns {
        if let Some(i) = headers.iter().position(|h| h == pattern) {
            return Some(i);
        }
        if let Some(i) = headers.iter().position(|h| h.contains(pattern.as_str())) {
            return Some(i);
        }
        if let Some(i) = headers
            .iter()
            .position(|h| h.chars().count() > 5 && pattern.contains(h.as_str()))
        {
            return Some(i);
        }
    }
    None
}

fn resolve_columns(
    headers: &StringRecord,
    fields: &[Field],
    file: &str,
    warnings: &mut Vec<String>,
) -> Result<Vec<(Field, usize)>> {
    let normalized: Vec<String> = headers.iter().map(normalize).collect();
    let mut columns = Vec::new();
    for field in fields {
        match find_column(&normalized, *field) {
            Some(i) => columns.push((*field, i)),
            None if *field == Field::Date => {
                return Err(ReportError::MissingColumn {
                    field: field.name(),
                    file: file.to_string(),
                })
            }
            None => warnings.push(format!("No `{}` column found in {}", field.name(), file)),
        }
    }
    Ok(columns)
}

fn read_sheet(
    path: &Path,
    fields: &[Field],
    by_date: &mut BTreeMap<NaiveDate, RawRow>,
    warnings: &mut Vec<String>,
    report: &mut LoadReport,
) -> Result<()> {
    let file = path.display().to_string();
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let columns = resolve_columns(&headers, fields, &file, warnings)?;
    let date_idx = columns
        .iter()
        .find(|(f, _)| *f == Field::Date)
        .map(|(_, i)| *i)
        .ok_or(ReportError::MissingColumn {
            field: Field::Date.name(),
            file: file.clone(),
        })?;

    for result in rdr.records() {
        report.total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                report.parse_errors += 1;
                continue;
            }
        };
        let Some(date) = parse_date_safe(record.get(date_idx)) else {
            report.parse_errors += 1;
            continue;
        };
        if !calendar::in_covered_years(chrono::Datelike::year(&date)) {
            report.out_of_range += 1;
            continue;
        }
        // Supply and demand sheets share dates; each fills its own fields.
        let row = by_date.entry(date).or_insert_with(|| RawRow::empty(date));
        for (field, idx) in &columns {
            field.set(row, parse_f64_safe(record.get(*idx)));
        }
    }
    Ok(())
}

/// Sorted, deduplicated rows with season flags from the calendar.
fn finalize(
    by_date: BTreeMap<NaiveDate, RawRow>,
    mut warnings: Vec<String>,
    mut report: LoadReport,
) -> (Dataset, LoadReport) {
    let rows: Vec<RawRow> = by_date
        .into_values()
        .map(|mut r| {
            r.is_ramadan = calendar::is_ramadan(r.date);
            r.is_hajj = calendar::is_hajj(r.date);
            r
        })
        .collect();
    if rows.is_empty() {
        warnings.push(format!(
            "No valid rows for {}–{}; check the date column",
            calendar::FIRST_YEAR,
            calendar::LAST_YEAR
        ));
    }
    for w in &warnings {
        warn!("{}", w);
    }
    let years: Vec<i32> = rows
        .iter()
        .map(RawRow::year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    report.kept_rows = rows.len();
    info!(
        total = report.total_rows,
        kept = report.kept_rows,
        parse_errors = report.parse_errors,
        years = ?years,
        "dataset loaded"
    );
    (
        Dataset {
            rows,
            warnings,
            years,
        },
        report,
    )
}

/// Merge the Supply and Demand sheet exports by date.
///
/// A missing sheet is a warning, not an error; a sheet without a date
/// column is an error.
pub fn load_csv_pair(
    supply: Option<&Path>,
    demand: Option<&Path>,
) -> Result<(Dataset, LoadReport)> {
    let mut by_date = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut report = LoadReport::default();

    match supply {
        Some(path) => read_sheet(path, &SUPPLY_FIELDS, &mut by_date, &mut warnings, &mut report)?,
        None => warnings.push("Supply sheet not provided".to_string()),
    }
    match demand {
        Some(path) => read_sheet(path, &DEMAND_FIELDS, &mut by_date, &mut warnings, &mut report)?,
        None => warnings.push("Demand sheet not provided".to_string()),
    }
    Ok(finalize(by_date, warnings, report))
}

/// Load a prebuilt `{rows, warnings, years}` dataset.
///
/// Rows outside the covered years are dropped, duplicate dates keep the last
/// row, and season flags are recomputed from the calendar.
pub fn load_json(path: &Path) -> Result<(Dataset, LoadReport)> {
    let text = std::fs::read_to_string(path)?;
    let data: Dataset = serde_json::from_str(&text)?;
    let mut report = LoadReport {
        total_rows: data.rows.len(),
        ..LoadReport::default()
    };
    let mut by_date = BTreeMap::new();
    for row in data.rows {
        if !calendar::in_covered_years(row.year()) {
            report.out_of_range += 1;
            continue;
        }
        // Last one wins on duplicate dates.
        by_date.insert(row.date, row);
    }
    Ok(finalize(by_date, data.warnings, report))
}
