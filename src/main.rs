//! Entry point: startup per §4.7 (own process group, own the controlling
//! terminal, install signal dispositions), then hand off to the REPL driver.
//!
//! The shell takes no arguments (§6): it reads from standard input, expected
//! to be a terminal, and writes to standard output/error.

use nix::unistd::{self, Pid};
use posh::signals;
use posh::Repl;
use std::os::unix::io::RawFd;

const TTY_FD: RawFd = libc::STDIN_FILENO;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    if unsafe { libc::isatty(TTY_FD) } != 1 {
        eprintln!("posh: warning: stdin is not a terminal; job control is unavailable");
    }

    let shell_pgid = unistd::getpid();
    if let Err(e) = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
        eprintln!("posh: couldn't put the shell into its own process group: {e}");
    }

    let fd = unsafe { std::os::fd::BorrowedFd::borrow_raw(TTY_FD) };
    if let Err(e) = unistd::tcsetpgrp(fd, shell_pgid) {
        eprintln!("posh: couldn't take control of the terminal: {e}");
    }

    let sigchld_pipe = match signals::install_shell_handlers() {
        Ok(pipe) => pipe,
        Err(e) => {
            eprintln!("posh: failed to install signal handlers: {e}");
            return 1;
        }
    };

    match Repl::new(shell_pgid, TTY_FD, sigchld_pipe) {
        Ok(mut repl) => repl.run(),
        Err(e) => {
            eprintln!("posh: failed to start: {e:?}");
            1
        }
    }
}
