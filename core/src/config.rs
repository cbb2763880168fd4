use std::path::PathBuf;
use std::time::Duration;

use glob::Pattern;

/// All CLI-derived settings for one run, threaded explicitly into
/// discovery and the test loop.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub test_dir: PathBuf,
    pub patterns: Vec<Pattern>,
    pub tags: Vec<String>,
    pub shell: Option<PathBuf>,
    pub timeout: Duration,
    pub coverage: bool,
    pub report: ReportConfig,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub json: bool,
    pub html: bool,
    pub dir: PathBuf,
}

impl RunConfig {
    pub const DEFAULT_TEST_DIR: &str = "tests";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            test_dir: Self::DEFAULT_TEST_DIR.into(),
            patterns: Vec::new(),
            tags: Vec::new(),
            shell: None,
            timeout: Self::DEFAULT_TIMEOUT,
            coverage: false,
            report: ReportConfig::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            json: false,
            html: false,
            dir: ".".into(),
        }
    }
}
