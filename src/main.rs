// Entry point and high-level CLI flow.
//
// One run loads the dataset, resolves the filters and scenario, runs the
// pipeline once and then:
// - writes the per-day series CSV and the JSON report payload,
// - prints markdown previews of the monthly rollup and the insights.
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use tracing::warn;

use housing_report::config::{Cli, DataSource, RunConfig};
use housing_report::types::Dataset;
use housing_report::{loader, logging, output, util};
use housing_report::{build_report_payload, run_pipeline, PipelineInput, ReportPayload};

/// Load the dataset and print a short textual summary of what happened.
fn handle_load(source: &DataSource) -> Result<Dataset> {
    let (data, load_report) = match source {
        DataSource::Json(path) => loader::load_json(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        DataSource::Csv { supply, demand } => {
            loader::load_csv_pair(supply.as_deref(), demand.as_deref())
                .context("failed to load CSV sheets")?
        }
    };
    println!(
        "Processing dataset... ({} rows read, {} days kept for {:?})",
        util::format_int(load_report.total_rows),
        util::format_int(load_report.kept_rows),
        data.years
    );
    if load_report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse errors.",
            util::format_int(load_report.parse_errors)
        );
    }
    for w in &data.warnings {
        println!("Warning: {}", w);
    }
    println!();
    Ok(data)
}

fn print_kpis(payload: &ReportPayload) {
    println!("Summary ({}):", payload.period_label);
    let sc = &payload.scenario_summary;
    if sc.active > 0 {
        // Averages are over the keys that moved, so they can be None per side.
        let side = |v: Option<i32>| v.map_or("-".to_string(), |v| format!("{:+}%", v));
        println!(
            "  Scenario: {} adjustment(s) | supply avg {} | demand avg {} | net {:+} pts",
            sc.active,
            side(sc.supply_avg),
            side(sc.demand_avg),
            sc.net_impact
        );
    }
    println!(
        "  Demand: {} | Supply: {} | Scope: {}",
        payload.demand_label, payload.supply_label, payload.scope_label
    );
    let Some(kpi) = &payload.kpi else {
        println!("  Insufficient data for the selected filters.\n");
        return;
    };
    println!(
        "  Avg demand {} | avg supply {} | avg gap {} beds/day",
        util::format_number(kpi.avg_demand, 0),
        util::format_number(kpi.avg_supply, 0),
        util::format_number(kpi.avg_gap, 0)
    );
    println!(
        "  Deficit days {}/{} ({}%) | critical {}% | occupancy {}% | peak occupancy {}% on {}",
        kpi.def_days,
        kpi.total,
        util::format_number(kpi.def_pct, 1),
        kpi.critical_pct,
        kpi.occupancy_pct,
        kpi.peak_occ_pct,
        kpi.peak_occ_date
    );
    let s = &payload.seasonal;
    println!(
        "  Deficit share: Ramadan {}% ({} days) | Hajj {}% ({} days) | other {}% ({} days)",
        s.ramadan.def_pct,
        s.ramadan.days,
        s.hajj.def_pct,
        s.hajj.days,
        s.other.def_pct,
        s.other.days
    );
    if payload.ramadan.is_dual {
        for p in &payload.ramadan.periods {
            println!(
                "  {}: {} days, deficit {}%",
                p.label,
                p.window.days,
                util::format_number(p.window.def_pct, 0)
            );
        }
    }
    let split = &payload.demand_split;
    if split.days > 0 {
        println!(
            "  Demand split: outside {} ({}%) | inside {} ({}%) visitors/day",
            util::format_int(split.avg_outside),
            split.outside_pct,
            util::format_int(split.avg_inside),
            split.inside_pct
        );
    }
    if let Some(fc) = &payload.future_contribution {
        match fc.pct {
            Some(pct) => println!(
                "  Future projects close {} of {} deficit days ({}%)",
                fc.resolved, fc.def_without, pct
            ),
            None => println!("  No deficit days without future projects."),
        }
    }
    println!();
}

/// Write the CSV export and JSON report, then print previews.
fn handle_generate_report(data: &Dataset, config: &RunConfig) -> Result<()> {
    let years = if config.years.is_empty() {
        data.years.iter().copied().collect()
    } else {
        config.years.clone()
    };
    let input = PipelineInput {
        rows: &data.rows,
        scenario: config.scenario,
        scope: config.scope,
        years,
        demand: config.demand.clone(),
        supply: config.supply.clone(),
    };
    input.validate().context("invalid report selection")?;
    if data.rows.is_empty() {
        warn!("dataset has no rows; writing an insufficient-data report");
    }

    println!("Generating report...");
    let result = run_pipeline(&input);
    let payload = build_report_payload(&input, &result);

    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("cannot create {}", config.out_dir.display()))?;
    // An empty dataset still gets a report; it just has nothing to show.
    let tag = if payload.series_years.is_empty() {
        "empty".to_string()
    } else {
        payload
            .period_label
            .replace(|c: char| matches!(c, '–' | ',' | ' '), "-")
    };
    let csv_path = config.out_dir.join(format!("housing_series_{}.csv", tag));
    let json_path = config.out_dir.join("housing_report.json");

    let rows = output::series_csv_rows(&result.series);
    output::write_csv(&csv_path, &rows)
        .with_context(|| format!("write error: {}", csv_path.display()))?;
    output::write_json(&json_path, &payload)
        .with_context(|| format!("write error: {}", json_path.display()))?;
    println!("Outputs saved to individual files...\n");

    print_kpis(&payload);

    println!("Monthly Supply/Demand Rollup\n");
    output::preview_table_rows(
        &output::monthly_preview_rows(&payload.monthly),
        config.preview_rows,
    );

    println!("Daily Series");
    output::preview_table_rows(&rows, config.preview_rows);
    println!("(Full table exported to {})\n", csv_path.display());

    println!("Insights ({}):", json_path.display());
    for (i, insight) in payload.insights.iter().enumerate() {
        println!("  {}. {}", i + 1, insight);
    }
    for note in &payload.notes {
        println!("  - {}", note);
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init();
    let config = Cli::parse().into_config()?;
    let data = handle_load(&config.source)?;
    handle_generate_report(&data, &config)
}
