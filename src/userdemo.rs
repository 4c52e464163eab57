//! The two sample in-shell demonstrations and the toy in-memory file store
//! (§1: "user built-ins reached through the same dispatch; their internal
//! algorithms are trivial and not specified beyond their command surface").
//!
//! None of this participates in job control or process management; it
//! exists to show that a user built-in is dispatched exactly like `cd` or
//! `pwd`, with no special casing in the executor.

use indexmap::IndexMap;
use std::fmt::Write as _;

/// A single simulated process's burst time, paired with the id assigned by
/// its position in the argument list (`P1`, `P2`, ...).
#[derive(Debug, Clone, Copy)]
struct Proc {
    id: usize,
    burst: u32,
}

#[derive(Debug, Clone, Copy)]
struct ProcResult {
    id: usize,
    waiting: u32,
    turnaround: u32,
}

/// Render the standard table: one row per process plus an averages row.
fn render_table(results: &[ProcResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6}{:>10}{:>14}", "PID", "Waiting", "Turnaround");
    let mut total_wait = 0u64;
    let mut total_turn = 0u64;
    for r in results {
        let _ = writeln!(out, "P{:<5}{:>10}{:>14}", r.id, r.waiting, r.turnaround);
        total_wait += r.waiting as u64;
        total_turn += r.turnaround as u64;
    }
    let n = results.len().max(1) as f64;
    let _ = writeln!(
        out,
        "\naverage waiting time:    {:.2}\naverage turnaround time: {:.2}",
        total_wait as f64 / n,
        total_turn as f64 / n
    );
    out
}

/// First-come-first-served: processes run in argument order with no
/// preemption.
pub fn fcfs(bursts: &[u32]) -> String {
    let mut clock = 0u32;
    let mut results = Vec::with_capacity(bursts.len());
    for (i, &burst) in bursts.iter().enumerate() {
        let waiting = clock;
        clock += burst;
        results.push(ProcResult {
            id: i + 1,
            waiting,
            turnaround: waiting + burst,
        });
    }
    render_table(&results)
}

/// Round-robin with the given time quantum: processes are served in a
/// rotating queue, each getting at most `quantum` time units per turn.
pub fn round_robin(bursts: &[u32], quantum: u32) -> String {
    let quantum = quantum.max(1);
    let mut remaining: Vec<Proc> = bursts
        .iter()
        .enumerate()
        .map(|(i, &burst)| Proc {
            id: i + 1,
            burst,
        })
        .collect();
    let mut queue: std::collections::VecDeque<Proc> = remaining.drain(..).collect();
    let mut finish_time = vec![0u32; bursts.len()];
    let mut clock = 0u32;

    while let Some(mut p) = queue.pop_front() {
        let slice = p.burst.min(quantum);
        clock += slice;
        p.burst -= slice;
        if p.burst == 0 {
            finish_time[p.id - 1] = clock;
        } else {
            queue.push_back(p);
        }
    }

    let results: Vec<ProcResult> = bursts
        .iter()
        .enumerate()
        .map(|(i, &burst)| {
            let turnaround = finish_time[i];
            ProcResult {
                id: i + 1,
                waiting: turnaround - burst,
                turnaround,
            }
        })
        .collect();
    render_table(&results)
}

/// The `vfs` demo's in-memory key/value store. Lost on process exit, per
/// the Non-goals in §1 ("no persistence ... across invocations").
#[derive(Debug, Default)]
pub struct VirtualFileStore {
    entries: IndexMap<String, String>,
}

impl VirtualFileStore {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn put(&mut self, name: String, content: String) {
        self.entries.insert(name, content);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.shift_remove(name).is_some()
    }

    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
