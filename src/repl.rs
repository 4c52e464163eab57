//! The REPL driver (§4.8): prompt, read, history append, parse, execute,
//! repeat, until end of input.

use crate::alias;
use crate::builtin;
use crate::executor;
use crate::job;
use crate::lexer;
use crate::parser;
use crate::shell::Shell;
use crate::signals::{self, SelfPipe};
use nix::unistd::Pid;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::os::unix::io::RawFd;

/// Owns the long-lived [`Shell`] state together with the line editor and the
/// file descriptors the signal controller set up at startup.
pub struct Repl {
    shell: Shell,
    editor: DefaultEditor,
    tty_fd: RawFd,
    sigchld_pipe: SelfPipe,
}

impl Repl {
    pub fn new(shell_pgid: Pid, tty_fd: RawFd, sigchld_pipe: SelfPipe) -> anyhow::Result<Self> {
        Ok(Self {
            shell: Shell::new(shell_pgid),
            editor: DefaultEditor::new()?,
            tty_fd,
            sigchld_pipe,
        })
    }

    /// Run until EOF or an `exit` builtin. Both paths return status 0 (§6).
    pub fn run(&mut self) -> i32 {
        println!("posh -- a small job-control shell. Type `exit` or Ctrl-D to leave.");

        loop {
            // Drain any SIGCHLD the reaper's self-pipe recorded since the
            // last iteration before doing anything else this turn (§9: the
            // reaper does no work in signal context, the main loop does).
            if signals::drain_sigchld_pipe(&self.sigchld_pipe) {
                job::reap(&mut self.shell.jobs);
            }
            // Covers the narrow window where SIGINT arrives while the shell
            // is the foreground group but not inside `readline` (e.g. while
            // a builtin is running); rustyline's `Interrupted` error handles
            // the far more common case of Ctrl-C during line editing itself.
            if signals::take_sigint() {
                println!();
            }

            let prompt = format!("[my_shell:{}]$ ", self.shell.env.current_dir.display());
            match self.editor.readline(&prompt) {
                Ok(raw) => {
                    let (line, background) = strip_trailing_background(&raw);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);
                    self.shell.history.push(line);
                    self.eval(line, background);
                    if self.shell.should_exit {
                        break;
                    }
                }
                // rustyline owns the terminal during readline and turns a
                // Ctrl-C keypress into this error rather than an actual
                // SIGINT to the shell (§4.7's raw-read model assumed no line
                // editor; with one, this is the idiomatic equivalent: print
                // a newline and let the loop redraw the prompt).
                Err(ReadlineError::Interrupted) => {
                    println!();
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye.");
                    break;
                }
                Err(e) => {
                    eprintln!("posh: {e}");
                    break;
                }
            }
        }

        0
    }

    fn eval(&mut self, line: &str, background: bool) {
        let tokens = lexer::tokenize(line);
        let tokens = alias::expand(tokens, &self.shell.aliases, &self.shell.env);
        let pipeline = match parser::parse(tokens) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{e}");
                return;
            }
        };

        if pipeline.segments.len() == 1 {
            let segment = &pipeline.segments[0];
            let argv: Vec<String> = segment.argv.iter().map(|w| w.text.clone()).collect();
            if let Some(result) =
                builtin::dispatch(&mut self.shell, self.tty_fd, segment.name(), &argv)
            {
                if let Err(e) = result {
                    eprintln!("{e}");
                }
                return;
            }
        }

        if let Err(e) = executor::execute(&mut self.shell, &pipeline, background, line, self.tty_fd)
        {
            eprintln!("posh: {e}");
        }
    }
}

/// Strip a single trailing `&` (after trailing whitespace) from the raw line
/// and report whether one was present. An `&` anywhere else in the line is
/// left as a literal character for the tokenizer (§4.3).
fn strip_trailing_background(line: &str) -> (&str, bool) {
    let trimmed = line.trim_end();
    match trimmed.strip_suffix('&') {
        Some(rest) => (rest.trim_end(), true),
        None => (trimmed, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_ampersand_sets_background_and_is_stripped() {
        assert_eq!(strip_trailing_background("sleep 30 &"), ("sleep 30", true));
        assert_eq!(strip_trailing_background("sleep 30&"), ("sleep 30", true));
    }

    #[test]
    fn ampersand_elsewhere_is_left_alone() {
        assert_eq!(
            strip_trailing_background("echo a & b"),
            ("echo a & b", false)
        );
    }

    #[test]
    fn no_ampersand_is_unaffected() {
        assert_eq!(strip_trailing_background("echo hi"), ("echo hi", false));
    }
}
