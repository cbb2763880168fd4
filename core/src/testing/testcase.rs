use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use glob::Pattern;
use lazy_regex::regex;

pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Test directory '{0}' does not exist or is not a directory")]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Io(#[from] fsutil::Error),
}

/// One discovered test script: absolute path plus the relative path it is
/// reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTestcase {
    name: String,
    path: PathBuf,
}

impl ScriptTestcase {
    const FILENAME_PREFIX: &str = "test_";
    const FILENAME_SUFFIX: &str = ".sh";

    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Relative path from the test root, `/`-separated.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the script runs in.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Basename without the `.sh` suffix, e.g. for per-script coverage dirs.
    pub fn file_stem(&self) -> &OsStr {
        self.path.file_stem().unwrap_or(self.path.as_os_str())
    }

    pub fn is_test_script_name(filename: &str) -> bool {
        filename.starts_with(Self::FILENAME_PREFIX) && filename.ends_with(Self::FILENAME_SUFFIX)
    }

    /// Walks `root` recursively and returns the matching test scripts in
    /// lexicographic order of their relative path.
    ///
    /// `patterns` (when non-empty) keep a script if its basename or its
    /// relative path matches any of them. `tags` (when non-empty) keep a
    /// script if its contents carry any matching `# @tag` annotation.
    pub fn discover(
        root: impl AsRef<Path>,
        patterns: &[Pattern],
        tags: &[String],
    ) -> DiscoveryResult<Vec<Self>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(DiscoveryError::NotADirectory(root.to_owned()));
        }
        let root = fsutil::canonicalize_path(root)?;

        let mut res = Vec::new();
        for path in fsutil::walk_files(&root)? {
            let Some(filename) = path.file_name().and_then(OsStr::to_str) else {
                continue
            };
            if !Self::is_test_script_name(filename) {
                continue;
            }
            let name = self::relative_name(&path, &root);
            if !patterns.is_empty() && !self::matches_any(patterns, filename, &name) {
                continue;
            }
            if !tags.is_empty() {
                let contents = fsutil::read_to_string(&path)?;
                if !self::has_any_tag(&contents, tags) {
                    continue;
                }
            }
            res.push(Self { name, path });
        }
        res.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(res)
    }
}

fn relative_name(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}

fn matches_any(patterns: &[Pattern], filename: &str, rel_path: &str) -> bool {
    patterns
        .iter()
        .any(|p| p.matches(filename) || p.matches(rel_path))
}

/// Extracts `# @tag` annotations from a script's text.
pub fn script_tags(contents: &str) -> Vec<&str> {
    regex!(r"#\s*@(\w+)")
        .captures_iter(contents)
        .map(|cap| cap.get(1).unwrap().as_str())
        .collect()
}

fn has_any_tag(contents: &str, tags: &[String]) -> bool {
    let found = self::script_tags(contents);
    tags.iter().any(|t| found.contains(&t.as_str()))
}
