use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Identifier the shell sets `$SHELL` to at startup (§6).
pub const SHELL_IDENTIFIER: &str = "posh";

/// Mutable, user-level view of the process environment used by the shell.
///
/// `vars` mirrors the real process environment (`std::env`): every mutation
/// here is also applied to the process environment so that forked children
/// inherit it without the shell having to build an explicit `envp` (§6,
/// "child contract").
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment`, and set
    /// `$SHELL` the way the spec requires at startup.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut env = Self { vars, current_dir };
        env.set_var("SHELL", SHELL_IDENTIFIER);
        env
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned().or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable, visible both to subsequent
    /// lookups and to any external program forked afterward.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        let key = key.into();
        let val = val.into();
        unsafe {
            stdenv::set_var(&key, &val);
        }
        self.vars.insert(key, val);
    }

    /// Change `current_dir` and keep `$PWD`/`$OLDPWD` in sync, the way
    /// `cshell.c` does so that `cd -` can return to the previous directory.
    pub fn set_current_dir(&mut self, new_dir: PathBuf) {
        if let Some(old) = self.current_dir.to_str() {
            self.set_var("OLDPWD", old);
        }
        if let Some(new) = new_dir.to_str() {
            self.set_var("PWD", new);
        }
        self.current_dir = new_dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_var() {
        let mut env = Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
        };

        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);
        env.set_var("KEY", "VALUE");
        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert_eq!(env.get_var("SHELL").as_deref(), Some(SHELL_IDENTIFIER));
    }

    #[test]
    fn set_current_dir_tracks_oldpwd() {
        let mut env = Environment::new();
        let start = env.current_dir.clone();
        env.set_current_dir(PathBuf::from("/tmp"));
        assert_eq!(env.current_dir, PathBuf::from("/tmp"));
        assert_eq!(env.get_var("OLDPWD"), start.to_str().map(|s| s.to_string()));
    }
}
