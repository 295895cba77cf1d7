use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::error::Result;
use crate::types::{MonthlyBucket, MonthlyPreviewRow, SeriesCsvRow, SeriesPoint};
use crate::util::format_int;

fn yes_no(flag: bool) -> String {
    let s = if flag { "yes" } else { "no" };
    s.to_string()
}

/// One export row per series point, in series order.
pub fn series_csv_rows(series: &[SeriesPoint]) -> Vec<SeriesCsvRow> {
    series
        .iter()
        .map(|p| SeriesCsvRow {
            date: p.date.format("%Y-%m-%d").to_string(),
            demand: p.demand,
            supply: p.supply,
            gap: p.gap,
            status: p.status().to_string(),
            is_ramadan: yes_no(p.is_ramadan),
            is_hajj: yes_no(p.is_hajj),
        })
        .collect()
}

pub fn monthly_preview_rows(monthly: &[MonthlyBucket]) -> Vec<MonthlyPreviewRow> {
    monthly
        .iter()
        .map(|m| MonthlyPreviewRow {
            month: m.label.clone(),
            avg_dem: format_int(m.avg_dem),
            avg_sup: format_int(m.avg_sup),
            avg_gap: format_int(m.avg_gap),
            deficit_days: format!("{}/{}", m.def_days, m.total_days),
            season: match (m.is_ram, m.is_hajj) {
                (true, true) => "Ramadan, Hajj",
                (true, false) => "Ramadan",
                (false, true) => "Hajj",
                (false, false) => "",
            }
            .to_string(),
        })
        .collect()
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table(rows, max_rows));
}
