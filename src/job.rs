//! Job table (§3, §5): tracks background and stopped process groups.

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: u32,
    pub pgid: Pid,
    pub command_line: String,
    pub state: JobState,
    /// Pids of every process in the group not yet reaped. The reaper drops
    /// entries as children change status, and removes the job once the list
    /// is empty (§4.6, §8: "background job absent from `jobs` once fully
    /// reaped").
    pub member_pids: Vec<Pid>,
}

/// Jobs keyed by id. Ids are monotonically increasing and never reused, and
/// at most one job exists per `pgid` at any time (§5 invariants).
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: BTreeMap<u32, Job>,
    next_id: u32,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register a newly-backgrounded or newly-stopped process group and
    /// return the id assigned to it. `pgid` is the pid of the pipeline's
    /// first process, per the invariant in §3.
    pub fn insert(
        &mut self,
        pgid: Pid,
        command_line: String,
        state: JobState,
        member_pids: Vec<Pid>,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.insert(
            id,
            Job {
                id,
                pgid,
                command_line,
                state,
                member_pids,
            },
        );
        id
    }

    pub fn get(&self, id: u32) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Job> {
        self.jobs.remove(&id)
    }

    pub fn remove_by_pgid(&mut self, pgid: Pid) -> Option<Job> {
        let id = self.jobs.values().find(|j| j.pgid == pgid)?.id;
        self.jobs.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn job_containing_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.jobs
            .values_mut()
            .find(|j| j.member_pids.contains(&pid))
    }
}

/// Drain all currently-available child status changes (§4.6).
///
/// Called from the main loop after the self-pipe signals that at least one
/// `SIGCHLD` arrived; never called from signal context itself. Uses
/// `WNOHANG` so it never blocks, and stops as soon as `waitpid` reports no
/// more children are ready.
///
/// - Exit or signal-termination: the pid is dropped from its job's member
///   list; the job is removed once the list is empty.
/// - Stop: the job (if any) is marked `Stopped`.
/// - Continue: the job (if any) is marked `Running`.
pub fn reap(jobs: &mut JobTable) {
    loop {
        let status = match waitpid(
            None,
            Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED),
        ) {
            Ok(status) => status,
            Err(_) => break,
        };

        match status {
            WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, _, _) => {
                let mut emptied_pgid = None;
                if let Some(job) = jobs.job_containing_pid_mut(pid) {
                    job.member_pids.retain(|&p| p != pid);
                    if job.member_pids.is_empty() {
                        emptied_pgid = Some(job.pgid);
                    }
                }
                if let Some(pgid) = emptied_pgid {
                    jobs.remove_by_pgid(pgid);
                }
            }
            WaitStatus::Stopped(pid, _) => {
                if let Some(job) = jobs.job_containing_pid_mut(pid) {
                    job.state = JobState::Stopped;
                }
            }
            WaitStatus::Continued(pid) => {
                if let Some(job) = jobs.job_containing_pid_mut(pid) {
                    job.state = JobState::Running;
                }
            }
            WaitStatus::StillAlive => break,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_not_reused() {
        let mut t = JobTable::new();
        let a = t.insert(
            Pid::from_raw(100),
            "sleep 1".into(),
            JobState::Running,
            vec![Pid::from_raw(100)],
        );
        let b = t.insert(
            Pid::from_raw(200),
            "sleep 2".into(),
            JobState::Running,
            vec![Pid::from_raw(200)],
        );
        assert_eq!((a, b), (1, 2));
        t.remove(a);
        let c = t.insert(
            Pid::from_raw(300),
            "sleep 3".into(),
            JobState::Running,
            vec![Pid::from_raw(300)],
        );
        assert_eq!(c, 3);
    }

    #[test]
    fn remove_by_pgid() {
        let mut t = JobTable::new();
        let pgid = Pid::from_raw(42);
        t.insert(pgid, "cmd".into(), JobState::Running, vec![pgid]);
        let removed = t.remove_by_pgid(pgid).unwrap();
        assert_eq!(removed.pgid, pgid);
        assert!(t.remove_by_pgid(pgid).is_none());
    }

    #[test]
    fn job_with_no_members_is_not_auto_removed_until_reap_runs() {
        // sanity: inserting with an empty member list is legal (a job whose
        // processes all exited between launch and the first reap pass would
        // look like this transiently); reap() is what removes it.
        let mut t = JobTable::new();
        let id = t.insert(Pid::from_raw(7), "x".into(), JobState::Running, vec![]);
        assert!(t.get(id).is_some());
    }
}
