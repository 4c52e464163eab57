//! Built-in dispatcher (§4.4).
//!
//! Each built-in is a small [`argh::FromArgs`] struct, exactly the way the
//! teacher crate parses its own built-ins — only the execution context
//! changed: a built-in here gets `&mut Shell` instead of a lone
//! `&mut Environment`, because `cd`/`history`/`jobs`/`fg`/`bg`/`alias`/`set`
//! all need more of the shell's state than a single command ever did.
//!
//! Built-ins never fork (§8) and run with no redirection support (§4.4,
//! §9: "documented limitation" carried over unchanged from the originals).

use crate::executor;
use crate::job::JobState;
use crate::shell::Shell;
use crate::userdemo::{self, VirtualFileStore};
use anyhow::{anyhow, Context, Result};
use argh::FromArgs;
use std::os::unix::io::RawFd;

/// Names recognized by the dispatcher. A pipeline of more than one segment
/// never reaches here (§4.4: built-ins can't be part of a pipe stage).
const NAMES: &[&str] = &[
    "cd", "pwd", "exit", "history", "jobs", "fg", "bg", "alias", "set", "rr", "fcfs", "vfs",
];

pub fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

/// Run `name argv[1..]` as a built-in. Returns `None` if `name` isn't one;
/// callers fall back to the pipeline executor in that case.
pub fn dispatch(shell: &mut Shell, tty_fd: RawFd, name: &str, argv: &[String]) -> Option<Result<()>> {
    if !is_builtin(name) {
        return None;
    }
    let args: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();
    Some(run(shell, tty_fd, name, &args))
}

fn run(shell: &mut Shell, tty_fd: RawFd, name: &str, args: &[&str]) -> Result<()> {
    match name {
        "cd" => Cd::from_args(&[name], args)
            .map_err(usage_error(name))?
            .run(shell),
        "pwd" => {
            Pwd::from_args(&[name], args).map_err(usage_error(name))?;
            println!("{}", shell.env.current_dir.display());
            Ok(())
        }
        "exit" => {
            Exit::from_args(&[name], args).map_err(usage_error(name))?;
            shell.should_exit = true;
            Ok(())
        }
        "history" => {
            History::from_args(&[name], args).map_err(usage_error(name))?;
            for (n, line) in shell.history.iter() {
                println!("{:>5}  {}", n, line);
            }
            Ok(())
        }
        "jobs" => {
            Jobs::from_args(&[name], args).map_err(usage_error(name))?;
            for job in shell.jobs.iter() {
                let state = match job.state {
                    JobState::Running => "Running",
                    JobState::Stopped => "Stopped",
                };
                println!("[{}] {} {}", job.id, state, job.command_line);
            }
            Ok(())
        }
        "fg" => {
            let cmd = Fg::from_args(&[name], args).map_err(usage_error(name))?;
            let id = parse_job_spec(&cmd.spec)?;
            executor::resume_foreground(shell, id, tty_fd)
        }
        "bg" => {
            let cmd = Bg::from_args(&[name], args).map_err(usage_error(name))?;
            let id = parse_job_spec(&cmd.spec)?;
            executor::resume_background(shell, id)
        }
        "alias" => {
            let cmd = Alias::from_args(&[name], args).map_err(usage_error(name))?;
            run_alias(shell, cmd)
        }
        "set" => {
            let cmd = Set::from_args(&[name], args).map_err(usage_error(name))?;
            run_set(shell, cmd)
        }
        "rr" => {
            let cmd = Rr::from_args(&[name], args).map_err(usage_error(name))?;
            print!("{}", userdemo::round_robin(&cmd.bursts, cmd.quantum));
            Ok(())
        }
        "fcfs" => {
            let cmd = Fcfs::from_args(&[name], args).map_err(usage_error(name))?;
            print!("{}", userdemo::fcfs(&cmd.bursts));
            Ok(())
        }
        "vfs" => {
            let cmd = Vfs::from_args(&[name], args).map_err(usage_error(name))?;
            run_vfs(&mut shell.vfs, cmd.command)
        }
        _ => unreachable!("checked by is_builtin"),
    }
}

/// `argh`'s `EarlyExit` (bad flags, `--help`) carries its own message; print
/// it and turn it into an error the caller reports uniformly.
fn usage_error(name: &str) -> impl Fn(argh::EarlyExit) -> anyhow::Error + '_ {
    move |exit| anyhow!("{}: {}", name, exit.output.trim_end())
}

fn parse_job_spec(spec: &str) -> Result<u32> {
    spec.strip_prefix('%')
        .ok_or_else(|| anyhow!("bad job spec {:?}: expected %N", spec))?
        .parse::<u32>()
        .map_err(|_| anyhow!("bad job spec {:?}: expected %N", spec))
}

#[derive(FromArgs)]
/// change the working directory
struct Cd {
    #[argh(positional)]
    /// target directory; defaults to $HOME (or `-` for $OLDPWD)
    target: Option<String>,
}

impl Cd {
    fn run(self, shell: &mut Shell) -> Result<()> {
        use std::path::PathBuf;

        let target = match self.target.as_deref() {
            Some("-") => shell
                .env
                .get_var("OLDPWD")
                .ok_or_else(|| anyhow!("cd: OLDPWD not set"))?,
            Some(t) if !t.is_empty() => t.to_string(),
            _ => shell
                .env
                .get_var("HOME")
                .unwrap_or_else(|| "/".to_string()),
        };

        let candidate = PathBuf::from(&target);
        let new_dir = if candidate.is_absolute() {
            candidate
        } else {
            shell.env.current_dir.join(candidate)
        };

        std::env::set_current_dir(&new_dir)
            .with_context(|| format!("cd: {}: No such file or directory", target))?;
        let canonical = std::fs::canonicalize(&new_dir).unwrap_or(new_dir);
        shell.env.set_current_dir(canonical);
        Ok(())
    }
}

#[derive(FromArgs)]
/// print the current working directory
struct Pwd {}

#[derive(FromArgs)]
/// terminate the shell
struct Exit {}

#[derive(FromArgs)]
/// print numbered command history, oldest first
struct History {}

#[derive(FromArgs)]
/// list background and stopped jobs
struct Jobs {}

#[derive(FromArgs)]
/// resume a stopped or backgrounded job in the foreground
struct Fg {
    #[argh(positional)]
    /// job spec of the form %N
    spec: String,
}

#[derive(FromArgs)]
/// resume a stopped job in the background
struct Bg {
    #[argh(positional)]
    /// job spec of the form %N
    spec: String,
}

#[derive(FromArgs)]
/// set or list aliases
struct Alias {
    #[argh(positional)]
    /// `NAME=VALUE`; omit to list all aliases
    definition: Option<String>,
}

fn run_alias(shell: &mut Shell, cmd: Alias) -> Result<()> {
    match cmd.definition {
        None => {
            for (name, value) in shell.aliases.iter() {
                println!("alias {}=\"{}\"", name, value);
            }
            Ok(())
        }
        Some(def) => {
            let (name, value) = def
                .split_once('=')
                .ok_or_else(|| anyhow!("alias: bad format, expected NAME=VALUE"))?;
            if name.is_empty() {
                return Err(anyhow!("alias: bad format, expected NAME=VALUE"));
            }
            // Quoting (§4.4: "VALUE may be quoted") is already resolved by
            // the lexer before this word ever reaches the builtin.
            shell.aliases.set(name, value);
            Ok(())
        }
    }
}

#[derive(FromArgs)]
/// set an environment variable
struct Set {
    #[argh(positional)]
    /// `NAME=VALUE`
    assignment: String,
}

fn run_set(shell: &mut Shell, cmd: Set) -> Result<()> {
    let (name, value) = cmd
        .assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("set: bad format, expected NAME=VALUE"))?;
    if name.is_empty() {
        return Err(anyhow!("set: bad format, expected NAME=VALUE"));
    }
    shell.env.set_var(name, value);
    Ok(())
}

#[derive(FromArgs)]
/// simulate round-robin CPU scheduling over a list of burst times
struct Rr {
    #[argh(option, default = "2")]
    /// time quantum (default 2)
    quantum: u32,

    #[argh(positional, greedy)]
    /// burst time for each simulated process, P1..Pn in argument order
    bursts: Vec<u32>,
}

#[derive(FromArgs)]
/// simulate first-come-first-served CPU scheduling over a list of burst times
struct Fcfs {
    #[argh(positional, greedy)]
    /// burst time for each simulated process, P1..Pn in argument order
    bursts: Vec<u32>,
}

#[derive(FromArgs)]
/// in-memory, per-session key/value file store demo
struct Vfs {
    #[argh(subcommand)]
    command: VfsCommand,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum VfsCommand {
    Put(VfsPut),
    Get(VfsGet),
    Ls(VfsLs),
    Rm(VfsRm),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "put")]
/// store TEXT under NAME
struct VfsPut {
    #[argh(positional)]
    name: String,
    #[argh(positional, greedy)]
    text: Vec<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "get")]
/// print the contents stored under NAME
struct VfsGet {
    #[argh(positional)]
    name: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "ls")]
/// list the names currently stored
struct VfsLs {}

#[derive(FromArgs)]
#[argh(subcommand, name = "rm")]
/// remove the entry stored under NAME
struct VfsRm {
    #[argh(positional)]
    name: String,
}

fn run_vfs(vfs: &mut VirtualFileStore, command: VfsCommand) -> Result<()> {
    match command {
        VfsCommand::Put(cmd) => {
            vfs.put(cmd.name, cmd.text.join(" "));
            Ok(())
        }
        VfsCommand::Get(cmd) => match vfs.get(&cmd.name) {
            Some(text) => {
                println!("{}", text);
                Ok(())
            }
            None => Err(anyhow!("vfs: {}: no such entry", cmd.name)),
        },
        VfsCommand::Ls(_) => {
            for name in vfs.list() {
                println!("{}", name);
            }
            Ok(())
        }
        VfsCommand::Rm(cmd) => {
            if vfs.remove(&cmd.name) {
                Ok(())
            } else {
                Err(anyhow!("vfs: {}: no such entry", cmd.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_builtin_recognizes_the_fixed_set() {
        assert!(is_builtin("cd"));
        assert!(is_builtin("fg"));
        assert!(is_builtin("vfs"));
        assert!(!is_builtin("ls"));
        assert!(!is_builtin(""));
    }

    #[test]
    fn parse_job_spec_accepts_percent_n() {
        assert_eq!(parse_job_spec("%1").unwrap(), 1);
        assert_eq!(parse_job_spec("%42").unwrap(), 42);
        assert!(parse_job_spec("1").is_err());
        assert!(parse_job_spec("%").is_err());
        assert!(parse_job_spec("%x").is_err());
    }

    #[test]
    fn alias_set_and_list_roundtrip() {
        let mut shell = Shell::new(nix::unistd::getpid());
        run_alias(
            &mut shell,
            Alias {
                definition: Some(r#"ll=ls -l"#.to_string()),
            },
        )
        .unwrap();
        assert_eq!(shell.aliases.get("ll"), Some("ls -l"));
    }

    #[test]
    fn alias_value_quoting_is_resolved_upstream_by_the_lexer() {
        // The builtin sees whatever the lexer already unquoted; `alias
        // ll="ls -l"` tokenizes to a single word `ll=ls -l` (§4.1) before
        // `run_alias` ever runs.
        let mut shell = Shell::new(nix::unistd::getpid());
        let tokens = crate::lexer::tokenize(r#"alias ll="ls -l""#);
        let crate::lexer::Token::Word(def, _) = &tokens[1] else {
            panic!("expected a word token");
        };
        run_alias(
            &mut shell,
            Alias {
                definition: Some(def.clone()),
            },
        )
        .unwrap();
        assert_eq!(shell.aliases.get("ll"), Some("ls -l"));
    }

    #[test]
    fn set_bad_format_is_an_error() {
        let mut shell = Shell::new(nix::unistd::getpid());
        assert!(run_set(
            &mut shell,
            Set {
                assignment: "NO_EQUALS".to_string()
            }
        )
        .is_err());
    }

    #[test]
    fn set_mutates_environment() {
        let mut shell = Shell::new(nix::unistd::getpid());
        run_set(
            &mut shell,
            Set {
                assignment: "DIR=/tmp".to_string(),
            },
        )
        .unwrap();
        assert_eq!(shell.env.get_var("DIR"), Some("/tmp".to_string()));
    }

    #[test]
    fn vfs_put_get_rm_roundtrip() {
        let mut vfs = VirtualFileStore::new();
        run_vfs(
            &mut vfs,
            VfsCommand::Put(VfsPut {
                name: "a".to_string(),
                text: vec!["hello".to_string(), "world".to_string()],
            }),
        )
        .unwrap();
        assert_eq!(vfs.get("a"), Some("hello world"));
        assert!(run_vfs(
            &mut vfs,
            VfsCommand::Get(VfsGet {
                name: "missing".to_string()
            })
        )
        .is_err());
        run_vfs(
            &mut vfs,
            VfsCommand::Rm(VfsRm {
                name: "a".to_string(),
            }),
        )
        .unwrap();
        assert!(vfs.get("a").is_none());
    }
}
