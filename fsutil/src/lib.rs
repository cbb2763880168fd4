use serde::Serialize;
use std::{
    env,
    fs::{self, ReadDir},
    path::{Path, PathBuf},
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("Failed to canonicalize path '{0}': {1}")]
        CanonicalizePath(PathBuf, #[source] io::Error),

        #[error("Cannot serialize to JSON (dest='{0}'): {1}")]
        SerializeToJson(PathBuf, #[source] serde_json::Error),
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    if let Some(dir) = filepath.as_ref().parent() {
        self::mkdir_all(dir)?;
    }
    self::write(filepath, contents)
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_json_with_mkdir<P, T>(filepath: P, data: &T) -> Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let s = serde_json::to_string_pretty(data)
        .map_err(|e| Error::SerializeToJson(filepath.as_ref().to_owned(), e))?;
    write_with_mkdir(filepath, &s)
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

pub fn canonicalize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    path.canonicalize()
        .map_err(|e| Error::CanonicalizePath(path.to_owned(), e))
}

/// Recursively collects the regular files under `dir`, sorted by path.
/// Entries whose type cannot be determined are skipped.
#[must_use]
pub fn walk_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, acc: &mut Vec<PathBuf>) -> Result<()> {
        for entry in self::read_dir(dir)?.filter_map(std::result::Result::ok) {
            let Ok(ft) = entry.file_type() else {
                continue
            };
            if ft.is_dir() {
                walk(&entry.path(), acc)?;
            } else {
                acc.push(entry.path());
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(dir.as_ref(), &mut files)?;
    files.sort();
    Ok(files)
}

/// Searches the dirs listed in the `PATH` environment variable for an
/// executable named `name`, like `which`.
pub fn find_in_path(name: impl AsRef<str>) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    self::find_in_dirs(name, env::split_paths(&paths))
}

pub fn find_in_dirs<I, P>(name: impl AsRef<str>, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    dirs.into_iter()
        .map(|dir| dir.into().join(name.as_ref()))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn walk_files_recurses_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        mkdir_all(root.join("sub/inner")).unwrap();
        write(root.join("b.txt"), "b").unwrap();
        write(root.join("a.txt"), "a").unwrap();
        write(root.join("sub/inner/c.txt"), "c").unwrap();

        let files = walk_files(root).unwrap();
        assert_eq!(
            files,
            vec![
                root.join("a.txt"),
                root.join("b.txt"),
                root.join("sub/inner/c.txt"),
            ]
        );
    }

    #[test]
    fn walk_files_on_missing_dir_is_err() {
        let res = walk_files("/no/such/dir/anywhere");
        assert!(res.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn find_in_dirs_requires_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let exe = tmp.path().join("mytool");
        write(&exe, "#!/bin/sh\n").unwrap();

        assert_eq!(find_in_dirs("mytool", [tmp.path()]), None);

        let mut perm = exe.metadata().unwrap().permissions();
        perm.set_mode(0o755);
        fs::set_permissions(&exe, perm).unwrap();

        assert_eq!(find_in_dirs("mytool", [tmp.path()]), Some(exe));
    }

    #[test]
    fn find_in_dirs_misses_unknown_name() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_in_dirs("definitely-not-here", [tmp.path()]), None);
    }
}
