//! `posh` — a small interactive job-control shell.
//!
//! The crate is organized the way the spec's component list reads: a
//! tokenizer, an alias/variable expansion pass, a parser, a built-in
//! dispatcher, a job table with an asynchronous reaper, a pipeline executor,
//! and a signal/terminal controller, all wired together by a REPL driver.
//!
//! [`Shell`] is the single long-lived value threaded through the REPL; it
//! owns the environment, alias table, history, and job table that both the
//! reaper and the builtins need to see.

pub mod alias;
pub mod builtin;
pub mod env;
pub mod executor;
pub mod history;
pub mod job;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod repl;
pub mod shell;
pub mod signals;
pub mod userdemo;

pub use repl::Repl;
pub use shell::Shell;
