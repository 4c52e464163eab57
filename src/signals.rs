//! Signal & terminal controller (§4.7).
//!
//! Installs the shell-level dispositions at startup: `SIGTTIN`/`SIGTTOU` and
//! `SIGTSTP` are ignored (so the shell can call `tcsetpgrp` freely and can
//! never be suspended by Ctrl-Z itself), and `SIGINT`/`SIGCHLD` get handlers.
//!
//! Per the design notes (§9), neither handler does any I/O or job-table work
//! directly — that would not be async-signal-safe. Each handler only stores
//! a flag via an atomic, or (for `SIGCHLD`) writes one byte down a self-pipe;
//! the REPL drains the pipe and reacts between lines.

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

static SIGCHLD_WRITE_FD: AtomicI32 = AtomicI32::new(-1);
static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigchld(_: libc::c_int) {
    let fd = SIGCHLD_WRITE_FD.load(Ordering::Relaxed);
    if fd >= 0 {
        let byte = [0u8; 1];
        unsafe {
            libc::write(fd, byte.as_ptr() as *const libc::c_void, 1);
        }
    }
}

extern "C" fn on_sigint(_: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::Relaxed);
}

/// Self-pipe the REPL polls (non-blocking) between lines to learn that the
/// reaper has work to do, without running any of that work in signal
/// context.
pub struct SelfPipe {
    pub read_fd: RawFd,
}

/// Install the shell's own signal dispositions. Must run once at startup,
/// before the REPL loop starts, and before any children are forked (children
/// reset all of these to defaults in [`crate::executor`]).
pub fn install_shell_handlers() -> nix::Result<SelfPipe> {
    unsafe {
        signal::signal(Signal::SIGTTIN, SigHandler::SigIgn)?;
        signal::signal(Signal::SIGTTOU, SigHandler::SigIgn)?;
        signal::signal(Signal::SIGTSTP, SigHandler::SigIgn)?;
    }

    let (read_fd, write_fd) = unistd::pipe()?;
    set_nonblocking(read_fd);
    SIGCHLD_WRITE_FD.store(write_fd, Ordering::Relaxed);

    let sigchld_action = SigAction::new(
        SigHandler::Handler(on_sigchld),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe {
        signal::sigaction(Signal::SIGCHLD, &sigchld_action)?;
    }

    let sigint_action = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe {
        signal::sigaction(Signal::SIGINT, &sigint_action)?;
    }

    Ok(SelfPipe { read_fd })
}

fn set_nonblocking(fd: RawFd) {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags >= 0 {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
}

/// Drain the self-pipe, returning whether any byte (i.e. at least one
/// `SIGCHLD`) was seen since the last drain.
pub fn drain_sigchld_pipe(pipe: &SelfPipe) -> bool {
    let mut buf = [0u8; 64];
    let mut saw_any = false;
    loop {
        let n = unsafe {
            libc::read(
                pipe.read_fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if n <= 0 {
            break;
        }
        saw_any = true;
    }
    saw_any
}

/// Check and clear the "a `SIGINT` arrived" flag. The REPL uses this to print
/// a newline and redraw the prompt on the next loop iteration (§4.7: the
/// handler does not interrupt the read itself).
pub fn take_sigint() -> bool {
    SIGINT_RECEIVED.swap(false, Ordering::Relaxed)
}

/// Reset `SIGINT`, `SIGTSTP`, `SIGTTIN`, `SIGTTOU`, and `SIGCHLD` to their
/// default dispositions. Called in the child immediately after `fork`, before
/// `execv` (§4.5, §4.7): a child that inherited the shell's "ignore SIGTSTP"
/// could never be suspended by Ctrl-Z.
pub fn reset_child_handlers() -> nix::Result<()> {
    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::SigDfl)?;
        signal::signal(Signal::SIGTSTP, SigHandler::SigDfl)?;
        signal::signal(Signal::SIGTTIN, SigHandler::SigDfl)?;
        signal::signal(Signal::SIGTTOU, SigHandler::SigDfl)?;
        signal::signal(Signal::SIGCHLD, SigHandler::SigDfl)?;
    }
    Ok(())
}
