//! Explicit `$PATH` search (§4.4).
//!
//! The shell resolves the command name itself, rather than delegating to
//! `execvp`, so that a missing command can be reported as
//! `"<name>: command not found"` before forking (§6, §7).

use std::borrow::Cow;
use std::ffi::OsStr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Resolve `name` against `path_var` (the raw `$PATH` value) the way a
/// typical shell would:
///
/// - a name containing a `/` is used as-is (absolute or relative to cwd);
/// - a bare name is searched for in each `:`-separated directory of `PATH`,
///   in order, returning the first existing, executable match.
pub fn resolve<'a>(path_var: &str, name: &'a str) -> Option<Cow<'a, Path>> {
    let candidate = Path::new(name);

    if name.contains('/') {
        return is_executable_file(candidate).then(|| Cow::Borrowed(candidate));
    }

    search_in_path(OsStr::new(path_var), OsStr::new(name)).map(Cow::Owned)
}

fn search_in_path(path_var: &OsStr, name: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(path_var) {
        let candidate = dir.join(name);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable_file(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}
