use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

/// Outcome kind of one executed script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    /// Exited with code 0 before the deadline.
    Pass,
    /// Exited with a non-zero code (or was killed by a signal).
    Fail,
    /// Still running when the wall-clock deadline expired.
    Timeout,
    /// Never got to run (interpreter missing, spawn failure, ...).
    Error,
}

impl TestStatus {
    pub fn is_pass(self) -> bool {
        self == TestStatus::Pass
    }
}

/// The recorded outcome of running one test script. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub name: String,
    pub status: TestStatus,
    /// `None` on timeout, pre-execution error, or death by signal.
    pub exit_code: Option<i32>,
    pub execution_time: Duration,
    pub stdout: String,
    pub stderr: String,
}

/// All results of one invocation, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub results: Vec<ExecutionResult>,
    pub total_time: Duration,
    /// Set when the run was stopped by the host interrupt signal.
    pub interrupted: bool,
}

impl RunSummary {
    /// True iff every result passed and the loop ran to completion.
    /// Vacuously true for an empty run.
    pub fn success(&self) -> bool {
        !self.interrupted && self.results.iter().all(|r| r.status.is_pass())
    }

    pub fn count_by_status(&self) -> HashMap<TestStatus, usize> {
        self.results.iter().fold(HashMap::new(), |mut count, r| {
            *count.entry(r.status).or_default() += 1;
            count
        })
    }

    pub fn num_passed(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_pass()).count()
    }
}
