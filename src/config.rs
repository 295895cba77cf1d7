// Command-line configuration.
//
// A scenario can come from a JSON file (`{"sl": 10, "br": 20}`), and any
// per-key flag given on the command line overrides the file.
use clap::Parser;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::scenario::{Scenario, ScenarioKey};
use crate::types::{DemandCategory, Scope, SupplyCategory};

pub const DEFAULT_DATASET: &str = "housing.json";

#[derive(Parser, Debug)]
#[command(name = "housing-report")]
#[command(
    about = "Makkah housing supply/demand report for the 2026–2030 seasons",
    long_about = None
)]
pub struct Cli {
    /// Prebuilt JSON dataset ({rows, warnings, years})
    #[arg(long, conflicts_with_all = ["supply_csv", "demand_csv"])]
    pub data: Option<PathBuf>,

    /// Supply sheet exported to CSV
    #[arg(long)]
    pub supply_csv: Option<PathBuf>,

    /// Demand sheet exported to CSV
    #[arg(long)]
    pub demand_csv: Option<PathBuf>,

    /// Years to report on, comma separated (default: every year in the data)
    #[arg(long, value_delimiter = ',')]
    pub years: Vec<i32>,

    /// Apply the scenario to all years or only the selected ones
    #[arg(long, default_value = "all")]
    pub scope: Scope,

    /// Active demand categories: outside, inside (default: both)
    #[arg(long, value_delimiter = ',')]
    pub demand: Vec<DemandCategory>,

    /// Active supply categories: licensed, future, hajj (default: all)
    #[arg(long, value_delimiter = ',')]
    pub supply: Vec<SupplyCategory>,

    /// JSON file with scenario deltas
    #[arg(long)]
    pub scenario_file: Option<PathBuf>,

    /// Licensed facilities delta, percent
    #[arg(long = "sl", allow_negative_numbers = true)]
    pub licensed: Option<i32>,

    /// Future projects delta, percent
    #[arg(long = "sf", allow_negative_numbers = true)]
    pub future: Option<i32>,

    /// Pilgrim housing delta, percent
    #[arg(long = "sh", allow_negative_numbers = true)]
    pub pilgrim_housing: Option<i32>,

    /// Beds-per-room delta, percent (licensed facilities only)
    #[arg(long = "br", allow_negative_numbers = true)]
    pub beds_per_room: Option<i32>,

    /// Outside visitors delta, percent
    #[arg(long = "do", allow_negative_numbers = true)]
    pub outside: Option<i32>,

    /// Inside visitors delta, percent
    #[arg(long = "di", allow_negative_numbers = true)]
    pub inside: Option<i32>,

    /// Directory for the CSV export and JSON report
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Rows shown in each console preview table
    #[arg(long, default_value_t = 6)]
    pub preview_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Json(PathBuf),
    Csv {
        supply: Option<PathBuf>,
        demand: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: DataSource,
    pub scenario: Scenario,
    pub scope: Scope,
    /// Empty means every year present in the dataset.
    pub years: BTreeSet<i32>,
    pub demand: BTreeSet<DemandCategory>,
    pub supply: BTreeSet<SupplyCategory>,
    pub out_dir: PathBuf,
    pub preview_rows: usize,
}

fn load_scenario_file(path: &Path) -> Result<Scenario> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

impl Cli {
    fn overrides(&self) -> [(ScenarioKey, Option<i32>); 6] {
        [
            (ScenarioKey::Sl, self.licensed),
            (ScenarioKey::Sf, self.future),
            (ScenarioKey::Sh, self.pilgrim_housing),
            (ScenarioKey::Br, self.beds_per_room),
            (ScenarioKey::Do, self.outside),
            (ScenarioKey::Di, self.inside),
        ]
    }

    /// Resolve flags and the optional scenario file into a validated config.
    pub fn into_config(self) -> Result<RunConfig> {
        let mut scenario = match &self.scenario_file {
            Some(path) => load_scenario_file(path)?,
            None => Scenario::default(),
        };
        for (key, value) in self.overrides() {
            if let Some(v) = value {
                scenario.set(key, v);
            }
        }
        scenario.validate()?;

        let source = match (self.data, self.supply_csv, self.demand_csv) {
            (Some(path), _, _) => DataSource::Json(path),
            (None, None, None) => DataSource::Json(PathBuf::from(DEFAULT_DATASET)),
            (None, supply, demand) => DataSource::Csv { supply, demand },
        };

        let demand: BTreeSet<DemandCategory> = if self.demand.is_empty() {
            DemandCategory::ALL.into_iter().collect()
        } else {
            self.demand.into_iter().collect()
        };
        let supply: BTreeSet<SupplyCategory> = if self.supply.is_empty() {
            SupplyCategory::ALL.into_iter().collect()
        } else {
            self.supply.into_iter().collect()
        };

        Ok(RunConfig {
            source,
            scenario,
            scope: self.scope,
            years: self.years.into_iter().collect(),
            demand,
            supply,
            out_dir: self.out_dir,
            preview_rows: self.preview_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["housing-report"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_select_everything() {
        let cfg = parse(&[]).into_config().unwrap();
        assert_eq!(cfg.source, DataSource::Json(PathBuf::from(DEFAULT_DATASET)));
        assert_eq!(cfg.scope, Scope::All);
        assert!(cfg.years.is_empty());
        assert_eq!(cfg.demand.len(), 2);
        assert_eq!(cfg.supply.len(), 3);
        assert!(cfg.scenario.is_zero());
    }

    #[test]
    fn parses_filters_and_negative_deltas() {
        let cfg = parse(&[
            "--supply-csv",
            "supply.csv",
            "--years",
            "2027,2028",
            "--scope",
            "year",
            "--demand",
            "outside",
            "--supply",
            "licensed,hajj",
            "--sl",
            "-20",
            "--br",
            "15",
        ])
        .into_config()
        .unwrap();
        assert_eq!(
            cfg.source,
            DataSource::Csv {
                supply: Some(PathBuf::from("supply.csv")),
                demand: None
            }
        );
        assert_eq!(cfg.years, [2027, 2028].into_iter().collect());
        assert_eq!(cfg.scope, Scope::Year);
        assert_eq!(cfg.demand, [DemandCategory::Outside].into_iter().collect());
        assert!(!cfg.supply.contains(&SupplyCategory::Future));
        assert_eq!(cfg.scenario.sl, -20);
        assert_eq!(cfg.scenario.br, 15);
    }

    #[test]
    fn flags_override_scenario_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sl": 10, "do_": 30}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let cfg = parse(&["--scenario-file", &path, "--do", "-10"])
            .into_config()
            .unwrap();
        assert_eq!(cfg.scenario.sl, 10);
        assert_eq!(cfg.scenario.do_, -10);
    }

    #[test]
    fn rejects_out_of_range_delta() {
        let err = parse(&["--sh", "150"]).into_config().unwrap_err();
        assert!(matches!(err, ReportError::Scenario { key: "sh", value: 150 }));
    }

    #[test]
    fn rejects_unknown_category() {
        assert!(Cli::try_parse_from(["housing-report", "--supply", "hotels"]).is_err());
    }
}
