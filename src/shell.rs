//! The long-lived shell state (§3, §9 "Global mutable state").
//!
//! Everything that used to be a handful of process-global arrays in the
//! originals — the job table, the alias table, the history ring, the
//! environment view — is a field of this one value instead, threaded by
//! reference through the REPL loop and the reaper.

use crate::alias::AliasTable;
use crate::env::Environment;
use crate::history::History;
use crate::job::JobTable;
use crate::userdemo::VirtualFileStore;
use nix::unistd::Pid;

/// Everything the REPL, the builtins, and the reaper all need a handle to.
pub struct Shell {
    pub env: Environment,
    pub aliases: AliasTable,
    pub history: History,
    pub jobs: JobTable,
    /// The shell's own process group id, set once at startup (§4.7). Also
    /// the id the terminal is handed back to after every foreground
    /// pipeline completes.
    pub shell_pgid: Pid,
    /// Set by the `exit` builtin; checked by the REPL after each line.
    pub should_exit: bool,
    /// In-memory key/value store backing the `vfs` demo builtin (§1: a
    /// user built-in, trivial and not part of the job-control core).
    pub vfs: VirtualFileStore,
}

impl Shell {
    pub fn new(shell_pgid: Pid) -> Self {
        Self {
            env: Environment::new(),
            aliases: AliasTable::new(),
            history: History::default(),
            jobs: JobTable::new(),
            shell_pgid,
            should_exit: false,
            vfs: VirtualFileStore::new(),
        }
    }
}
