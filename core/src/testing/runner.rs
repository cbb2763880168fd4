use std::{path::PathBuf, process::Stdio, time::Duration};

use anyhow::Context;
use tokio::process::{Child, Command};

use super::{result::*, testcase::ScriptTestcase};
use crate::shebang::{self, Interpreter};

/// How to wrap a script launch with kcov: `<program> <out_root>/<stem>
/// <interpreter> <script>`.
#[derive(Debug, Clone)]
pub struct KcovInvocation {
    pub program: PathBuf,
    pub out_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TestRunner {
    shell: Option<PathBuf>,
    timeout: Duration,
    kcov: Option<KcovInvocation>,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self {
            shell: None,
            timeout: Self::DEFAULT_TIMEOUT,
            kcov: None,
        }
    }

    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = limit;
        self
    }

    pub fn kcov(mut self, kcov: KcovInvocation) -> Self {
        self.kcov = Some(kcov);
        self
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one script to completion, timeout, or launch failure.
    /// Never fails at this level: every problem becomes an outcome kind.
    /// Dropping the returned future mid-flight tears the child's whole
    /// process group down, so cancellation cannot leak processes.
    pub async fn run(&self, testcase: &ScriptTestcase) -> ExecutionResult {
        let start = tokio::time::Instant::now();
        match self.try_run(testcase).await {
            Ok(res) => res,
            Err(e) => ExecutionResult {
                name: testcase.name().to_owned(),
                status: TestStatus::Error,
                exit_code: None,
                execution_time: start.elapsed(),
                stdout: String::new(),
                stderr: format!("{:#}", e),
            },
        }
    }

    async fn try_run(&self, testcase: &ScriptTestcase) -> anyhow::Result<ExecutionResult> {
        let interp = shebang::resolve(testcase.path(), self.shell.as_deref());
        let mut proc = self
            .build_command(&interp, testcase)
            .spawn()
            .with_context(|| format!("Failed to launch '{}'", interp.program.display()))?;

        let guard = GroupKillGuard::new(&proc);
        let mut stdout = proc.stdout.take().context("Failed to open stdout")?;
        let mut stderr = proc.stderr.take().context("Failed to open stderr")?;

        let start = tokio::time::Instant::now();
        let res = tokio::time::timeout(self.timeout, async {
            let mut stdout_buf = Vec::new();
            let mut stderr_buf = Vec::new();
            let fut_stdout = tokio::io::copy(&mut stdout, &mut stdout_buf);
            let fut_stderr = tokio::io::copy(&mut stderr, &mut stderr_buf);
            let fut_exit_status = proc.wait();

            tokio::try_join!(fut_stdout, fut_stderr, fut_exit_status)
                .map(|(_, _, exit_status)| (exit_status, stdout_buf, stderr_buf))
                .context("Failed to communicate with subprocess")
        })
        .await;
        let execution_time = start.elapsed();

        let result = match res {
            Err(_deadline) => {
                guard.terminate();
                if let Err(e) = proc.wait().await {
                    log::warn!("Failed to reap timed out process: {:#}", e);
                }
                ExecutionResult {
                    name: testcase.name().to_owned(),
                    status: TestStatus::Timeout,
                    exit_code: None,
                    execution_time,
                    stdout: String::new(),
                    stderr: format!("Timeout after {}s", self.timeout.as_secs()),
                }
            }

            Ok(Err(e)) => return Err(e),

            Ok(Ok((exit_status, stdout_buf, stderr_buf))) => {
                let exit_code = exit_status.code();
                let status = match exit_code {
                    Some(0) => TestStatus::Pass,
                    _ => TestStatus::Fail,
                };
                ExecutionResult {
                    name: testcase.name().to_owned(),
                    status,
                    exit_code,
                    execution_time,
                    stdout: String::from_utf8_lossy(&stdout_buf).into(),
                    stderr: String::from_utf8_lossy(&stderr_buf).into(),
                }
            }
        };

        // Sweep stragglers the script may have left in its group.
        guard.terminate();
        Ok(result)
    }

    fn build_command(&self, interp: &Interpreter, testcase: &ScriptTestcase) -> Command {
        let mut cmd = match &self.kcov {
            Some(kcov) => {
                let mut c = Command::new(&kcov.program);
                c.arg(kcov.out_root.join(testcase.file_stem()));
                c.arg(&interp.program);
                c.args(&interp.args);
                c
            }
            None => {
                let mut c = Command::new(&interp.program);
                c.args(&interp.args);
                c
            }
        };
        cmd.arg(testcase.path())
            .current_dir(testcase.dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// Terminates the child's whole process group when dropped, so neither a
/// timeout nor cancellation of `run()` can orphan the script's
/// descendants. `terminate` is idempotent; a group that already exited is
/// not an error.
#[derive(Debug)]
struct GroupKillGuard {
    pgid: Option<i32>,
}

impl GroupKillGuard {
    fn new(child: &Child) -> Self {
        Self {
            pgid: child.id().map(|id| id as i32),
        }
    }

    #[cfg(unix)]
    fn terminate(&self) {
        use nix::{
            errno::Errno,
            sys::signal::{killpg, Signal},
            unistd::Pid,
        };
        let Some(pgid) = self.pgid else { return };
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => log::warn!("Failed to kill process group {}: {}", pgid, e),
        }
    }

    // Without process groups we can only reach the direct child; it is
    // covered by `kill_on_drop` on the Command.
    #[cfg(not(unix))]
    fn terminate(&self) {}
}

impl Drop for GroupKillGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}
