use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

/// Interpreter name used when a script declares nothing and no override is
/// given. Resolved against `PATH` by the OS at spawn time.
pub const DEFAULT_SHELL: &str = "bash";

const SHEBANG_MARKER: &str = "#!";

/// The program that should execute a script, plus any arguments the
/// script's interpreter line carries (e.g. `/usr/bin/env bash`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Interpreter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

/// Parses a script's first line as an interpreter declaration.
/// Returns `None` unless the line starts with `#!` and names a program.
pub fn parse(first_line: &str) -> Option<Interpreter> {
    let rest = first_line.trim_end().strip_prefix(SHEBANG_MARKER)?;
    let mut words = rest.split_whitespace();
    let program = words.next()?;
    Some(Interpreter {
        program: program.into(),
        args: words.map(str::to_owned).collect(),
    })
}

/// Determines the interpreter for `script`.
///
/// Priority: `shell_override` verbatim (existence is not validated here;
/// a bad override surfaces as a launch failure), then the script's own
/// interpreter line, then [`DEFAULT_SHELL`].
pub fn resolve(script: &Path, shell_override: Option<&Path>) -> Interpreter {
    if let Some(shell) = shell_override {
        return Interpreter::new(shell);
    }
    match self::first_line(script) {
        Ok(line) => self::parse(&line).unwrap_or_else(|| Interpreter::new(DEFAULT_SHELL)),
        Err(e) => {
            log::debug!(
                "Cannot inspect interpreter line of '{}': {}",
                script.display(),
                e
            );
            Interpreter::new(DEFAULT_SHELL)
        }
    }
}

fn first_line(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_plain_shebang() {
        assert_eq!(
            parse("#!/bin/bash\n"),
            Some(Interpreter::new("/bin/bash"))
        );
        assert_eq!(parse("#!/bin/sh"), Some(Interpreter::new("/bin/sh")));
    }

    #[test]
    fn parse_shebang_with_args() {
        assert_eq!(
            parse("#!/usr/bin/env bash\n"),
            Some(Interpreter {
                program: "/usr/bin/env".into(),
                args: vec!["bash".to_owned()],
            })
        );
        assert_eq!(
            parse("#! /bin/sh -eu"),
            Some(Interpreter {
                program: "/bin/sh".into(),
                args: vec!["-eu".to_owned()],
            })
        );
    }

    #[test]
    fn parse_non_shebang() {
        assert_eq!(parse("echo hello"), None);
        assert_eq!(parse("# comment"), None);
        assert_eq!(parse("#!"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn resolve_override_wins_over_declaration() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("test_x.sh");
        fsutil::write(&script, "#!/bin/bash\nexit 0\n").unwrap();

        let interp = resolve(&script, Some(Path::new("zsh")));
        assert_eq!(interp, Interpreter::new("zsh"));
    }

    #[test]
    fn resolve_reads_declaration() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("test_x.sh");
        fsutil::write(&script, "#!/usr/bin/env dash\nexit 0\n").unwrap();

        let interp = resolve(&script, None);
        assert_eq!(interp.program, Path::new("/usr/bin/env"));
        assert_eq!(interp.args, vec!["dash".to_owned()]);
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("test_x.sh");
        fsutil::write(&script, "echo no shebang here\n").unwrap();

        assert_eq!(resolve(&script, None), Interpreter::new(DEFAULT_SHELL));
        // Unreadable script: resolution still succeeds, launch will fail later.
        assert_eq!(
            resolve(Path::new("/no/such/script.sh"), None),
            Interpreter::new(DEFAULT_SHELL)
        );
    }
}
