//! Pipeline executor (§4.5): forks one child per segment, wires pipes and
//! redirections, places every child in a single new process group, and
//! either hands the controlling terminal to that group (foreground) or
//! records it as a background job.
//!
//! The "double `setpgid`" described in §4.5 — both the child and the parent
//! call `setpgid(child, G)` — is implemented exactly as specified: whichever
//! runs first wins the race, the other observes success, and there is no
//! window where the parent could try to place a not-yet-`setpgid`'d child
//! into the terminal's foreground group.

use crate::job::JobState;
use crate::parser::{OutputMode, Pipeline, Segment};
use crate::path;
use crate::shell::Shell;
use crate::signals;
use anyhow::{anyhow, Context, Result};
use nix::fcntl::OFlag;
use nix::sys::signal::{self, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::os::unix::io::RawFd;

/// Run `pipeline`, which has already had alias/variable expansion applied to
/// every word. `command_line` is the original raw input, kept only for
/// display in `jobs`/`history`. `tty_fd` is the controlling terminal's file
/// descriptor, used for the foreground hand-off.
pub fn execute(
    shell: &mut Shell,
    pipeline: &Pipeline,
    background: bool,
    command_line: &str,
    tty_fd: RawFd,
) -> Result<()> {
    let segments = &pipeline.segments;
    let k = segments.len();

    let mut pgid: Option<Pid> = None;
    let mut prev_read_end: Option<RawFd> = None;
    let mut member_pids = Vec::with_capacity(k);
    let mut last_child: Option<Pid> = None;

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i + 1 == k;
        let pipe_ends = if is_last {
            None
        } else {
            Some(unistd::pipe().context("failed to create pipe")?)
        };
        let next_write_end = pipe_ends.map(|(_, w)| w);
        let next_read_end = pipe_ends.map(|(r, _)| r);

        // SAFETY: the child performs only async-signal-safe work (setpgid,
        // dup2, close, execv) between `fork` and `execv`, as required by
        // POSIX for a multithreaded-unsafe `fork` in a process that may have
        // other threads (this shell has none, but the discipline is kept).
        match unsafe { unistd::fork() }.context("fork failed")? {
            ForkResult::Child => {
                run_child(
                    segment,
                    pgid,
                    prev_read_end,
                    next_write_end,
                    &collect_all_pipe_fds(prev_read_end, pipe_ends),
                    shell,
                );
                unreachable!("run_child always exits the process");
            }
            ForkResult::Parent { child } => {
                let group = pgid.unwrap_or(child);
                // Redundant with the child's own setpgid; see module docs.
                let _ = unistd::setpgid(child, group);
                pgid = Some(group);
                member_pids.push(child);
                last_child = Some(child);

                if let Some(r) = prev_read_end {
                    let _ = unistd::close(r);
                }
                if let Some(w) = next_write_end {
                    let _ = unistd::close(w);
                }
                prev_read_end = next_read_end;
            }
        }
    }

    let group = pgid.expect("pipeline has at least one segment");
    let last_child = last_child.expect("pipeline has at least one segment");

    if background {
        let id = shell.jobs.insert(
            group,
            command_line.to_string(),
            JobState::Running,
            member_pids,
        );
        println!("[{}] {}", id, group);
        return Ok(());
    }

    hand_terminal_to(tty_fd, group);
    let wait_result = waitpid(last_child, Some(WaitPidFlag::WUNTRACED));
    reclaim_terminal(tty_fd, shell.shell_pgid);

    match wait_result {
        Ok(WaitStatus::Stopped(_, _)) => {
            let id = shell.jobs.insert(
                group,
                command_line.to_string(),
                JobState::Stopped,
                member_pids,
            );
            println!("[{}] Stopped", id);
        }
        Ok(_) => {
            // Exited normally or by signal: no job is created. Any stages
            // before the last are reaped asynchronously (§4.5).
        }
        Err(e) => {
            eprintln!("posh: wait failed: {e}");
        }
    }

    Ok(())
}

/// Hand the controlling terminal to process group `pgid`. The shell has
/// `SIGTTOU` ignored (§4.7) so this never stops the shell itself.
fn hand_terminal_to(tty_fd: RawFd, pgid: Pid) {
    let fd = unsafe { std::os::fd::BorrowedFd::borrow_raw(tty_fd) };
    let _ = unistd::tcsetpgrp(fd, pgid);
}

/// Reclaim the terminal for the shell's own process group after a foreground
/// pipeline stops or exits (§3 invariant: the shell's group owns the
/// terminal after every completed evaluation).
fn reclaim_terminal(tty_fd: RawFd, shell_pgid: Pid) {
    let fd = unsafe { std::os::fd::BorrowedFd::borrow_raw(tty_fd) };
    let _ = unistd::tcsetpgrp(fd, shell_pgid);
}

/// Resume job `id` in the foreground: `SIGCONT` its process group, hand it
/// the terminal, and wait on its last member exactly as a freshly launched
/// foreground pipeline would (§4.4 `fg`). The job is removed from the table
/// up front and, if it stops again, re-inserted under a fresh id — ids are
/// never reused (§3), so a job that stops twice is two distinct table rows.
pub fn resume_foreground(shell: &mut Shell, id: u32, tty_fd: RawFd) -> Result<()> {
    let job = shell
        .jobs
        .remove(id)
        .ok_or_else(|| anyhow!("fg: {}: no such job", id))?;
    let last = *job
        .member_pids
        .last()
        .ok_or_else(|| anyhow!("fg: {}: job has no running processes", id))?;

    signal::killpg(job.pgid, Signal::SIGCONT).context("fg: failed to send SIGCONT")?;
    println!("{}", job.command_line);
    hand_terminal_to(tty_fd, job.pgid);
    let wait_result = waitpid(last, Some(WaitPidFlag::WUNTRACED));
    reclaim_terminal(tty_fd, shell.shell_pgid);

    match wait_result {
        Ok(WaitStatus::Stopped(_, _)) => {
            let new_id = shell.jobs.insert(
                job.pgid,
                job.command_line.clone(),
                JobState::Stopped,
                job.member_pids,
            );
            println!("[{}] Stopped", new_id);
        }
        Ok(_) => {}
        Err(e) => eprintln!("posh: wait failed: {e}"),
    }

    Ok(())
}

/// Resume job `id` in the background: `SIGCONT` its process group, mark it
/// Running, and return immediately without waiting (§4.4 `bg`). Unlike `fg`
/// this keeps the job's existing id in place.
pub fn resume_background(shell: &mut Shell, id: u32) -> Result<()> {
    let job = shell
        .jobs
        .get_mut(id)
        .ok_or_else(|| anyhow!("bg: {}: no such job", id))?;
    signal::killpg(job.pgid, Signal::SIGCONT).context("bg: failed to send SIGCONT")?;
    job.state = JobState::Running;
    println!("[{}] {}", job.id, job.command_line);
    Ok(())
}

fn collect_all_pipe_fds(
    prev_read_end: Option<RawFd>,
    pipe_ends: Option<(RawFd, RawFd)>,
) -> Vec<RawFd> {
    let mut fds = Vec::new();
    if let Some(r) = prev_read_end {
        fds.push(r);
    }
    if let Some((r, w)) = pipe_ends {
        fds.push(r);
        fds.push(w);
    }
    fds
}

/// Runs entirely in the forked child: reset signal dispositions, join the
/// pipeline's process group, wire stdin/stdout from the pipe (overridden by
/// any explicit redirection), close every fd the child doesn't need, resolve
/// `$PATH`, and `execv`. Never returns — the child always exits.
fn run_child(
    segment: &Segment,
    pgid: Option<Pid>,
    stdin_from_pipe: Option<RawFd>,
    stdout_to_pipe: Option<RawFd>,
    inherited_pipe_fds: &[RawFd],
    shell: &Shell,
) -> ! {
    if let Err(e) = signals::reset_child_handlers() {
        eprintln!("posh: failed to reset signal handlers: {e}");
    }

    let own_pid = unistd::getpid();
    let group = pgid.unwrap_or(own_pid);
    let _ = unistd::setpgid(own_pid, group);

    if let Some(r) = stdin_from_pipe {
        let _ = unistd::dup2(r, libc::STDIN_FILENO);
    }
    if let Some(w) = stdout_to_pipe {
        let _ = unistd::dup2(w, libc::STDOUT_FILENO);
    }

    if let Some(redirect) = &segment.stdin_redirect {
        match open_for_read(&redirect.text) {
            Ok(fd) => {
                let _ = unistd::dup2(fd, libc::STDIN_FILENO);
                let _ = unistd::close(fd);
            }
            Err(e) => {
                eprintln!("posh: {}: {}", redirect.text, e);
                std::process::exit(127);
            }
        }
    }
    if let Some((redirect, mode)) = &segment.stdout_redirect {
        match open_for_write(&redirect.text, *mode) {
            Ok(fd) => {
                let _ = unistd::dup2(fd, libc::STDOUT_FILENO);
                let _ = unistd::close(fd);
            }
            Err(e) => {
                eprintln!("posh: {}: {}", redirect.text, e);
                std::process::exit(127);
            }
        }
    }

    for fd in inherited_pipe_fds {
        let _ = unistd::close(*fd);
    }

    let path_var = shell.env.get_var("PATH").unwrap_or_default();
    let name = segment.name();
    match path::resolve(&path_var, name) {
        Some(resolved) => {
            let argv: Vec<CString> = segment
                .argv
                .iter()
                .map(|w| CString::new(w.text.as_bytes()).unwrap_or_default())
                .collect();
            let prog = CString::new(resolved.as_os_str().as_encoded_bytes()).unwrap_or_default();
            let err = unistd::execv(&prog, &argv).unwrap_err();
            eprintln!("posh: {}: {}", name, err);
            std::process::exit(127);
        }
        None => {
            eprintln!("{}: command not found", name);
            std::process::exit(127);
        }
    }
}

fn open_for_read(path: &str) -> nix::Result<RawFd> {
    nix::fcntl::open(path, OFlag::O_RDONLY, Mode::empty())
}

fn open_for_write(path: &str, mode: OutputMode) -> nix::Result<RawFd> {
    let flags = OFlag::O_WRONLY
        | OFlag::O_CREAT
        | match mode {
            OutputMode::Truncate => OFlag::O_TRUNC,
            OutputMode::Append => OFlag::O_APPEND,
        };
    nix::fcntl::open(path, flags, Mode::from_bits_truncate(0o644))
}
