use log::{debug, info, warn};

use gevs_core::tally::{ConstituencyOutcome, ConstituencyResult};
use gevs_core::{ElectionError, ElectionService, MemoryStore, OverallResults};
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::gevs::config_reader::*;
use crate::gevs::script::*;

pub mod config_reader;
pub mod script;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GevsError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a non-negative integer"))]
    ParsingJsonNumber {},
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Election error: {source}"))]
    Election { source: ElectionError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type GevsResult<T> = Result<T, GevsError>;

fn constituency_to_json(r: &ConstituencyResult) -> JSValue {
    let result: Vec<JSValue> = r
        .tally
        .iter()
        .map(|t| json!({"name": t.name, "party": t.party, "vote": t.votes.to_string()}))
        .collect();
    let winner = match &r.outcome {
        ConstituencyOutcome::Won { party, .. } => json!(party),
        ConstituencyOutcome::Tied { .. } | ConstituencyOutcome::NoVotes => JSValue::Null,
    };
    json!({"constituency": r.constituency, "result": result, "winner": winner})
}

fn results_to_json(r: &OverallResults) -> JSValue {
    let seats: Vec<JSValue> = r
        .seats
        .iter()
        .map(|s| json!({"party": s.party, "seat": s.seats.to_string()}))
        .collect();
    json!({"status": r.status.to_string(), "winner": r.winner.to_string(), "seats": seats})
}

fn build_summary_js(
    config: &GevsConfig,
    service: &ElectionService<MemoryStore>,
    operations: Vec<JSValue>,
) -> GevsResult<JSValue> {
    let constituencies: Vec<JSValue> = service
        .all_constituency_results()
        .context(ElectionSnafu {})?
        .iter()
        .map(constituency_to_json)
        .collect();
    let results = service.overall_results().context(ElectionSnafu {})?;
    Ok(json!({
        "config": {
            "election": config.output_settings.election_name,
            "constituencies": config.constituencies.len().to_string(),
        },
        "operations": operations,
        "constituencies": constituencies,
        "results": results_to_json(&results),
    }))
}

// --out wins over the output directory of the configuration, which is
// relative to the configuration file.
fn summary_destination(
    config_path: &str,
    config: &GevsConfig,
    out_path: Option<String>,
) -> GevsResult<Option<String>> {
    if let Some(p) = out_path {
        if p.is_empty() {
            return Ok(None);
        }
        return Ok(Some(p));
    }
    match &config.output_settings.output_directory {
        Some(dir) => {
            let root_p = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {})?;
            let p: PathBuf = root_p.join(dir).join("summary.json");
            Ok(Some(p.display().to_string()))
        }
        None => Ok(None),
    }
}

pub fn run_election(
    config_path: String,
    script_path: Option<String>,
    out_path: Option<String>,
    check_summary_path: Option<String>,
) -> GevsResult<JSValue> {
    let config = read_config(&config_path)?;
    info!("config: {:?}", config);

    // Validate the rules:
    let rules = config.tally_rules()?;
    let setup = config.setup()?;
    let store = MemoryStore::from_setup(&setup).context(ElectionSnafu {})?;
    let service = ElectionService::new(Arc::new(store), rules);
    let events = service.subscribe();

    let operations = match &script_path {
        Some(p) => read_script(p)?,
        None => {
            info!("No script provided, summarizing the provisioned election");
            Vec::new()
        }
    };
    let op_log = replay(&service, &operations);
    for event in events.try_iter() {
        debug!("event: {:?}", event);
    }

    // Assemble the final json
    let result_js = build_summary_js(&config, &service, op_log)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match summary_destination(&config_path, &config, out_path)? {
        Some(p) if p == "stdout" => println!("{}", pretty_js_stats),
        Some(p) => {
            info!("Writing summary to {}", p);
            fs::write(&p, &pretty_js_stats).context(WritingSummarySnafu { path: p.clone() })?;
        }
        None => debug!("summary: {}", pretty_js_stats),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        if summary_ref != result_js {
            let pretty_js_summary_ref =
                serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(result_js)
}

#[cfg(test)]
fn run_election_test(test_name: &str) -> GevsResult<JSValue> {
    let test_dir = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), test_name);
    info!("Running test {}", test_name);
    run_election(
        format!("{}/{}_config.json", test_dir, test_name),
        Some(format!("{}/{}_script.json", test_dir, test_name)),
        None,
        Some(format!("{}/{}_expected_summary.json", test_dir, test_name)),
    )
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) {
    let _ = env_logger::builder().is_test(true).try_init();
    if let Err(e) = run_election_test(test_name) {
        eprintln!("An error occured {}", e);
        if let Some(bt) = snafu::ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        panic!("test {} failed: {}", test_name, e);
    }
}
