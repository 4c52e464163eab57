//! Integration-level coverage of the pipeline executor: real forks, real
//! pipes, real redirections, against real external programs on `$PATH`
//! (`echo`, `tr`, `sleep`, `ls`). Builtin- and parser-level behavior is
//! covered by the `#[cfg(test)]` modules alongside each module instead.

use nix::unistd::getpid;
use posh::shell::Shell;
use posh::{alias, executor, job, lexer, parser};
use std::fs;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Not a terminal in the test harness; `tcsetpgrp` failures on a non-tty fd
/// are swallowed by the executor (it only ever logs and carries on), so this
/// is enough to exercise fork/pipe/redirect/wait without a pty.
const TTY_FD: RawFd = 0;

fn run_line(shell: &mut Shell, line: &str, background: bool) {
    let tokens = lexer::tokenize(line);
    let pipeline = parser::parse(tokens).expect("line should parse");
    executor::execute(shell, &pipeline, background, line, TTY_FD).expect("pipeline should run");
}

#[test]
fn redirection_truncate_then_append_round_trip() {
    let mut shell = Shell::new(getpid());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f");
    let path_str = path.to_str().unwrap();

    run_line(&mut shell, &format!("echo one > {path_str}"), false);
    run_line(&mut shell, &format!("echo two >> {path_str}"), false);

    assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[test]
fn two_stage_pipeline_transforms_output() {
    let mut shell = Shell::new(getpid());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out");
    let path_str = path.to_str().unwrap();

    run_line(
        &mut shell,
        &format!("echo hello | tr a-z A-Z > {path_str}"),
        false,
    );

    assert_eq!(fs::read_to_string(&path).unwrap(), "HELLO\n");
}

#[test]
fn background_pipeline_is_tracked_then_disappears_once_reaped() {
    let mut shell = Shell::new(getpid());
    run_line(&mut shell, "sleep 1", true);

    assert_eq!(shell.jobs.iter().count(), 1);
    let registered = shell.jobs.iter().next().unwrap();
    assert_eq!(registered.id, 1);
    assert_eq!(registered.pgid, registered.member_pids[0]);

    std::thread::sleep(Duration::from_millis(1300));
    job::reap(&mut shell.jobs);

    assert!(shell.jobs.is_empty(), "finished background job should be reaped");
}

#[test]
fn command_not_found_reports_and_does_not_abort_the_shell() {
    let mut shell = Shell::new(getpid());
    // Exercises the 127-exit / "command not found" path (§7); the parent
    // just waits normally and creates no job, so nothing here should panic.
    run_line(&mut shell, "definitely_not_a_real_command_xyz", false);
    assert!(shell.jobs.is_empty());
}

#[test]
fn alias_and_variable_expansion_resolve_to_the_real_program() {
    let mut shell = Shell::new(getpid());
    shell.aliases.set("ll", "ls -l");
    shell.env.set_var("DIR", "/tmp");

    let tokens = lexer::tokenize("ll $DIR");
    let tokens = alias::expand(tokens, &shell.aliases, &shell.env);
    let pipeline = parser::parse(tokens).expect("expands to a valid pipeline");

    assert_eq!(pipeline.segments[0].name(), "ls");
    let argv: Vec<&str> = pipeline.segments[0]
        .argv
        .iter()
        .map(|w| w.text.as_str())
        .collect();
    assert_eq!(argv, vec!["ls", "-l", "/tmp"]);

    executor::execute(&mut shell, &pipeline, false, "ll $DIR", TTY_FD)
        .expect("resolved pipeline should execute");
}
