use std::sync::Arc;
use std::time::Instant;

use crate::commands::CommandResult;
use athena_core::config::{AppConfig, LoadOptions};
use athena_core::params::DemoParams;
use athena_core::{
    derive_digest, DemoDataset, DemoTiming, GapId, InMemoryNotificationSink, ScenarioController,
};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, _)) => checks.push(SmokeCheck {
            name: "config_validation",
            status: SmokeStatus::Pass,
            elapsed_ms,
            message: "configuration loaded and validated".to_string(),
        }),
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("dataset_integrity"));
            checks.push(skipped("scenario_routing"));
            checks.push(skipped("digest_derivation"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    }

    let dataset = DemoDataset::builtin();
    match timed_check(|| dataset.validate()) {
        Ok((elapsed_ms, ())) => checks.push(SmokeCheck {
            name: "dataset_integrity",
            status: SmokeStatus::Pass,
            elapsed_ms,
            message: format!(
                "{} gaps, {} experts and {} graph areas are consistent",
                dataset.gaps().len(),
                dataset.experts().len(),
                dataset.graph_areas().len()
            ),
        }),
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "dataset_integrity",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("scenario_routing"));
            checks.push(skipped("digest_derivation"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    }

    checks.push(check("scenario_routing", || scenario_routing(&dataset)));
    checks.push(check("digest_derivation", || digest_derivation(&dataset)));

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

/// Every gap deep link lands on the screen its action calls for.
fn scenario_routing(dataset: &DemoDataset) -> Result<String, String> {
    let controller = ScenarioController::new(
        Arc::new(dataset.clone()),
        DemoTiming::instant(),
        Arc::new(InMemoryNotificationSink::default()),
    );

    for gap in dataset.gaps() {
        controller.view_thread(gap.id.as_str());
        let state = controller.snapshot();
        let expected = gap.action.scenario();
        if state.scenario != expected || state.selected_gap.as_ref() != Some(&gap.id) {
            return Err(format!(
                "gap `{}` routed to `{}` instead of `{expected}`",
                gap.id, state.scenario
            ));
        }

        let params = DemoParams::parse(&state.params().to_query_string());
        if params != state.params() {
            return Err(format!("query string for gap `{}` does not round-trip", gap.id));
        }
        controller.reset();
    }

    Ok(format!("{} gap threads route and round-trip", dataset.gaps().len()))
}

fn digest_derivation(dataset: &DemoDataset) -> Result<String, String> {
    let base = dataset.todays_digest();
    let first = dataset.gaps().first().ok_or_else(|| "dataset has no gaps".to_string())?;
    let derived = derive_digest(&base, &[first.id.clone()]);

    if derived.overall_score <= base.overall_score {
        return Err(format!(
            "score did not rise after resolving `{}` ({} -> {})",
            first.id, base.overall_score, derived.overall_score
        ));
    }
    if derive_digest(&base, &[] as &[GapId]) != base {
        return Err("deriving with no resolutions changed the digest".to_string());
    }

    Ok(format!("score {}% -> {}% after one resolution", base.overall_score, derived.overall_score))
}

fn check(
    name: &'static str,
    run_check: impl FnOnce() -> Result<String, String>,
) -> SmokeCheck {
    match timed_check(run_check) {
        Ok((elapsed_ms, message)) => {
            SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message }
        }
        Err((elapsed_ms, message)) => {
            SmokeCheck { name, status: SmokeStatus::Fail, elapsed_ms, message }
        }
    }
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
