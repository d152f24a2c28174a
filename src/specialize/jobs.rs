//! Cooperative job scheduling for recursive type inference.
//!
//! Mutually recursive functions cannot be typed in one downward pass: while
//! specializing one branch, the return type of a sibling may still be
//! unknown. Branch bodies are therefore queued as jobs and processed FIFO
//! by the single mutator. A job that needs a not-yet-typed function drains
//! the remaining queue (which lets peers merge their return types) and then
//! asks again.
//!
//! Jobs run to completion on the regular call stack; the queue drain in
//! `wait_for_return_type` is reentrant, which makes the schedule equivalent
//! to a coroutine transfer without needing one.

use std::collections::VecDeque;

use crate::ast::value::ValueId;
use crate::error::Result;
use crate::session::Session;
use crate::specialize::context::SpecContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    Runnable,
    /// Suspended inside a queue drain, waiting for a function's return
    /// type.
    WaitingOn(ValueId),
    Done,
}

pub(crate) struct Job {
    pub ctx: SpecContext,
    pub node: ValueId,
    pub state: JobState,
    pub result: Option<Result<ValueId>>,
}

pub(crate) struct JobQueue {
    pub(crate) jobs: Vec<Job>,
    pub(crate) pending: VecDeque<usize>,
    /// Index of the job currently executing, if any.
    pub(crate) current: Option<usize>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self { jobs: Vec::new(), pending: VecDeque::new(), current: None }
    }
}

impl Session {
    /// Specializes `nodes` as cooperative jobs under a shared context and
    /// returns their results in order. The first failing job's error is
    /// propagated.
    pub(crate) fn specialize_jobs(
        &mut self,
        ctx: SpecContext,
        nodes: &[ValueId],
    ) -> Result<Vec<ValueId>> {
        let start = self.jobs.jobs.len();
        for &node in nodes {
            let index = self.jobs.jobs.len();
            self.jobs.jobs.push(Job {
                ctx,
                node,
                state: JobState::Runnable,
                result: None,
            });
            self.jobs.pending.push_back(index);
        }
        self.process_jobs();

        let mut results = Vec::with_capacity(nodes.len());
        for index in start..start + nodes.len() {
            let job = &mut self.jobs.jobs[index];
            debug_assert_eq!(job.state, JobState::Done);
            let result = job
                .result
                .take()
                .expect("job finished without storing a result");
            results.push(result?);
        }
        Ok(results)
    }

    /// Runs pending jobs until the queue is empty. Returns the number of
    /// jobs processed. May be entered reentrantly from a waiting job.
    pub(crate) fn process_jobs(&mut self) -> usize {
        let mut processed = 0;
        while let Some(index) = self.jobs.pending.pop_front() {
            let previous = self.jobs.current.replace(index);
            let (ctx, node) = {
                let job = &self.jobs.jobs[index];
                (job.ctx, job.node)
            };
            let result = self.specialize_node(ctx, node);
            let job = &mut self.jobs.jobs[index];
            job.result = Some(result);
            job.state = JobState::Done;
            self.jobs.current = previous;
            processed += 1;
        }
        processed
    }

    /// Lets sibling jobs run, then reports whether `function` has acquired
    /// a return type.
    pub(crate) fn wait_for_return_type(&mut self, function: ValueId) -> bool {
        if let Some(index) = self.jobs.current {
            self.jobs.jobs[index].state = JobState::WaitingOn(function);
        }
        self.process_jobs();
        if let Some(index) = self.jobs.current {
            self.jobs.jobs[index].state = JobState::Runnable;
        }
        self.function_data(function).return_type.is_some()
    }
}
