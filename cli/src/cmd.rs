use std::path::PathBuf;
use std::time::Duration;

use glob::Pattern;
use sht_core::action;
use sht_core::config::{ReportConfig, RunConfig};
use sht_core::report;
use sht_core::testing::RunSummary;

#[derive(Debug, clap::Parser)]
#[command(author, version, about = "Run shell test scripts", long_about = None)]
pub struct Args {
    /// Glob patterns selecting a subset of the discovered tests, matched
    /// against basename and relative path. Empty runs everything.
    #[arg(value_parser = parse_glob)]
    pub patterns: Vec<Pattern>,

    /// Directory containing test scripts
    #[arg(short = 'd', long, default_value = RunConfig::DEFAULT_TEST_DIR)]
    pub directory: PathBuf,

    /// Per-test timeout in seconds
    #[arg(
        short = 't',
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Shell to run every script with (default: each script's own
    /// interpreter line)
    #[arg(long)]
    pub shell: Option<PathBuf>,

    /// Only run tests carrying one of these `# @tag` annotations
    #[arg(long, num_args = 1..)]
    pub tags: Vec<String>,

    /// Collect coverage using kcov if available
    #[arg(long)]
    pub coverage: bool,

    /// Write results to test_results.json
    #[arg(long)]
    pub json: bool,

    /// Write an HTML test summary
    #[arg(long)]
    pub html: bool,

    /// Directory report files are written to
    #[arg(long, default_value = ".")]
    pub report_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_glob(s: &str) -> Result<Pattern, glob::PatternError> {
    Pattern::new(s)
}

impl Args {
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            test_dir: self.directory.clone(),
            patterns: self.patterns.clone(),
            tags: self.tags.clone(),
            shell: self.shell.clone(),
            timeout: Duration::from_secs(self.timeout),
            coverage: self.coverage,
            report: ReportConfig {
                json: self.json,
                html: self.html,
                dir: self.report_dir.clone(),
            },
        }
    }
}

/// Runs the whole invocation and returns the process exit code
/// (0 = all passed and requested reports written, 1 otherwise).
/// Discovery failures propagate as errors; `main` maps them to their own
/// exit code.
pub async fn exec(args: &Args) -> anyhow::Result<i32> {
    let cfg = args.to_run_config();
    let summary = action::run_tests(&cfg).await?;
    let reports_ok = self::write_reports(&summary, &cfg.report);

    Ok(if summary.success() && reports_ok { 0 } else { 1 })
}

fn write_reports(summary: &RunSummary, cfg: &ReportConfig) -> bool {
    let mut ok = true;
    if cfg.json {
        match report::write_json(summary, &cfg.dir) {
            Ok(path) => log::info!("JSON report saved to {}", path.display()),
            Err(e) => {
                log::error!("{:#}", e);
                ok = false;
            }
        }
    }
    if cfg.html {
        match report::write_html(summary, &cfg.dir) {
            Ok(path) => log::info!("HTML report saved to {}", path.display()),
            Err(e) => {
                log::error!("{:#}", e);
                ok = false;
            }
        }
    }
    ok
}
