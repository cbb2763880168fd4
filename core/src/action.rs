pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::path::Path;

use error::*;

use crate::config::RunConfig;
use crate::style;
use crate::testing::{KcovInvocation, RunSummary, ScriptTestcase, TestRunner};

/// Root dir for per-script kcov output, relative to the working dir.
pub const COVERAGE_OUT_DIR: &str = "coverage";

const KCOV_PROGRAM: &str = "kcov";

/// Discovers the test scripts selected by `cfg` and runs them one by one
/// in discovery order, printing progress as it goes.
///
/// A failing, timing-out, or unlaunchable script never aborts the
/// remaining tests; only discovery problems are fatal. The host interrupt
/// signal stops the loop between tests (an in-flight test is torn down
/// like a timeout) and flags the summary as interrupted.
pub async fn run_tests(cfg: &RunConfig) -> Result<RunSummary> {
    let testcases = ScriptTestcase::discover(&cfg.test_dir, &cfg.patterns, &cfg.tags)?;
    if testcases.is_empty() {
        log::warn!("No test scripts found.");
    } else {
        log::info!("Found {} test scripts.", testcases.len());
    }

    let runner = self::build_runner(cfg);

    let start = tokio::time::Instant::now();
    let mut results = Vec::with_capacity(testcases.len());
    let mut interrupted = false;

    for t in &testcases {
        log::info!("Running: {}", t.name());
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted. Stopping after {} of {} tests.", results.len(), testcases.len());
                interrupted = true;
                break;
            }
            res = runner.run(t) => {
                style::print_test_line(&res);
                results.push(res);
            }
        }
    }

    let summary = RunSummary {
        results,
        total_time: start.elapsed(),
        interrupted,
    };

    summary
        .results
        .iter()
        .filter(|r| !r.status.is_pass())
        .for_each(style::print_failure_detail);

    style::print_run_summary(&summary);
    Ok(summary)
}

fn build_runner(cfg: &RunConfig) -> TestRunner {
    let mut runner = TestRunner::new().timeout(cfg.timeout);
    if let Some(shell) = &cfg.shell {
        runner = runner.shell(shell);
    }
    if cfg.coverage {
        match fsutil::find_in_path(KCOV_PROGRAM) {
            Some(program) => {
                runner = runner.kcov(KcovInvocation {
                    program,
                    out_root: Path::new(COVERAGE_OUT_DIR).to_owned(),
                });
            }
            // Degrades, does not fail: the run proceeds uninstrumented.
            None => log::warn!("Coverage requested but kcov not found. Running without coverage."),
        }
    }
    runner
}
