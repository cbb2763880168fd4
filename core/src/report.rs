use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::testing::{ExecutionResult, RunSummary, TestStatus};

pub const JSON_REPORT_FILENAME: &str = "test_results.json";
pub const HTML_REPORT_FILENAME: &str = "test_results.html";

pub mod error {
    pub type Result<T> = std::result::Result<T, self::Error>;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("Cannot write report: {0}")]
        Write(#[from] fsutil::Error),
    }
}
pub use error::{Error, Result};

/// Field-complete, re-parsable snapshot of a [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub summary: SummaryReport,
    pub tests: Vec<TestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub errored: usize,
    pub success: bool,
    pub total_duration_secs: f64,
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    pub name: String,
    pub status: TestStatus,
    pub exit_code: Option<i32>,
    pub duration_secs: f64,
    pub stdout: String,
    pub stderr: String,
}

impl From<&ExecutionResult> for TestEntry {
    fn from(res: &ExecutionResult) -> Self {
        Self {
            name: res.name.clone(),
            status: res.status,
            exit_code: res.exit_code,
            duration_secs: res.execution_time.as_secs_f64(),
            stdout: res.stdout.clone(),
            stderr: res.stderr.clone(),
        }
    }
}

impl From<&RunSummary> for TestReport {
    fn from(summary: &RunSummary) -> Self {
        let count = summary.count_by_status();
        let n = |status: TestStatus| count.get(&status).copied().unwrap_or(0);
        Self {
            summary: SummaryReport {
                total: summary.results.len(),
                passed: n(TestStatus::Pass),
                failed: n(TestStatus::Fail),
                timed_out: n(TestStatus::Timeout),
                errored: n(TestStatus::Error),
                success: summary.success(),
                total_duration_secs: summary.total_time.as_secs_f64(),
                interrupted: summary.interrupted,
            },
            tests: summary.results.iter().map(TestEntry::from).collect(),
        }
    }
}

/// Writes the JSON report under `dir` and returns its path.
pub fn write_json(summary: &RunSummary, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(JSON_REPORT_FILENAME);
    fsutil::write_json_with_mkdir(&path, &TestReport::from(summary))?;
    Ok(path)
}

/// Writes the static HTML report under `dir` and returns its path.
pub fn write_html(summary: &RunSummary, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(HTML_REPORT_FILENAME);
    let html = self::render_html(&TestReport::from(summary));
    fsutil::write_with_mkdir(&path, html)?;
    Ok(path)
}

impl TestStatus {
    fn html_color(self) -> &'static str {
        use TestStatus::*;
        match self {
            Pass => "green",
            Fail => "red",
            Timeout => "orange",
            Error => "darkred",
        }
    }
}

fn render_html(report: &TestReport) -> String {
    let mut rows = String::new();
    for t in &report.tests {
        let exit_code = t
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_owned());
        let mut output = String::new();
        for (label, text) in [("stdout", &t.stdout), ("stderr", &t.stderr)] {
            if !text.is_empty() {
                output += &format!(
                    "<details><summary>{}</summary><pre>{}</pre></details>",
                    label,
                    escape(text)
                );
            }
        }
        rows += &format!(
            "<tr><td>{name}</td><td style='color:{color}'>{status}</td>\
             <td>{exit_code}</td><td>{duration:.3}</td><td>{output}</td></tr>\n",
            name = escape(&t.name),
            color = t.status.html_color(),
            status = t.status,
            exit_code = exit_code,
            duration = t.duration_secs,
        );
    }

    let s = &report.summary;
    let verdict = if s.success {
        "<p style='color:green'>All tests passed.</p>".to_owned()
    } else {
        format!(
            "<p style='color:red'>{} of {} tests did not pass.{}</p>",
            s.total - s.passed,
            s.total,
            if s.interrupted { " (interrupted)" } else { "" },
        )
    };

    format!(
        "<html><head><meta charset='utf-8'><title>Test Report</title></head><body>\n\
         <h1>Test Report</h1>\n\
         <p>Generated at {generated}</p>\n\
         {verdict}\n\
         <p>Passed: {passed}, Failed: {failed}, Timed out: {timed_out}, \
          Errored: {errored}, Total: {total} ({duration:.3}s)</p>\n\
         <table border='1'>\n\
         <tr><th>Test</th><th>Status</th><th>Exit Code</th>\
         <th>Duration (s)</th><th>Output</th></tr>\n\
         {rows}</table></body></html>\n",
        generated = Local::now().format("%Y-%m-%d %H:%M:%S"),
        passed = s.passed,
        failed = s.failed,
        timed_out = s.timed_out,
        errored = s.errored,
        total = s.total,
        duration = s.total_duration_secs,
        rows = rows,
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn sample_summary() -> RunSummary {
        let result = |name: &str, status, exit_code, ms| ExecutionResult {
            name: name.to_owned(),
            status,
            exit_code,
            execution_time: Duration::from_millis(ms),
            stdout: "out\n".to_owned(),
            stderr: String::new(),
        };
        RunSummary {
            results: vec![
                result("test_a.sh", TestStatus::Pass, Some(0), 12),
                result("test_b.sh", TestStatus::Fail, Some(3), 34),
                result("test_c.sh", TestStatus::Timeout, None, 500),
            ],
            total_time: Duration::from_millis(546),
            interrupted: false,
        }
    }

    #[test]
    fn json_report_round_trips() {
        let report = TestReport::from(&sample_summary());
        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: TestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);

        assert_eq!(parsed.summary.total, 3);
        assert_eq!(parsed.summary.passed, 1);
        assert_eq!(parsed.summary.failed, 1);
        assert_eq!(parsed.summary.timed_out, 1);
        assert!(!parsed.summary.success);
        assert_eq!(parsed.tests[1].exit_code, Some(3));
        assert_eq!(parsed.tests[2].status, TestStatus::Timeout);
        assert_eq!(parsed.tests[2].exit_code, None);
    }

    #[test]
    fn status_serializes_as_uppercase_word() {
        let json = serde_json::to_string(&TestStatus::Timeout).unwrap();
        assert_eq!(json, r#""TIMEOUT""#);
    }

    #[test]
    fn write_json_creates_report_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("reports/nested");
        let path = write_json(&sample_summary(), &dir).unwrap();
        assert_eq!(path, dir.join(JSON_REPORT_FILENAME));

        let parsed: TestReport =
            serde_json::from_str(&fsutil::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.tests.len(), 3);
    }

    #[test]
    fn write_json_into_unwritable_dir_is_err() {
        let tmp = tempfile::tempdir().unwrap();
        let occupied = tmp.path().join("occupied");
        fsutil::write(&occupied, "a file, not a dir").unwrap();
        let res = write_json(&sample_summary(), &occupied);
        assert!(res.is_err());
    }

    #[test]
    fn html_report_lists_every_test() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_html(&sample_summary(), tmp.path()).unwrap();
        let html = fsutil::read_to_string(&path).unwrap();

        for name in ["test_a.sh", "test_b.sh", "test_c.sh"] {
            assert!(html.contains(name));
        }
        for status in ["PASS", "FAIL", "TIMEOUT"] {
            assert!(html.contains(status));
        }
        assert!(html.contains("2 of 3 tests did not pass"));
    }

    #[test]
    fn html_escapes_markup_in_output() {
        let mut summary = sample_summary();
        summary.results[0].stdout = "<script>alert(1)</script>\n".to_owned();
        let html = render_html(&TestReport::from(&summary));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;alert"));
    }
}
