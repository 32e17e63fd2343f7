// src/miner/worker.rs
//! Solve worker thread
//!
//! Each miner owns one worker. The engine submits a job per search; the
//! worker solves it off the participant's message loop and posts the result
//! back to the participant's inbox. Jobs whose search has been replaced are
//! skipped, and results that went stale while solving are dropped.

use crate::miner::solver::{CancelToken, ProofSolver, Solution};
use crate::network::message::Message;
use crate::utils::error::MinerError;
use crossbeam_channel::{Sender, unbounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A puzzle to solve for one search
#[derive(Debug, Clone)]
pub struct SolveJob {
    /// Identifies the search and reports cancellation
    pub token: CancelToken,
    /// Serialized puzzle
    pub puzzle: String,
}

/// Result of one job, delivered as [`Message::SolveFinished`]
#[derive(Debug)]
pub struct SolveOutcome {
    /// Search the job belonged to
    pub search_id: u64,
    /// Solution or recoverable solve error
    pub result: Result<Solution, MinerError>,
}

/// Handle to a miner's solve thread
pub struct SolveWorker {
    /// Channel for submitting jobs
    job_sender: Sender<SolveJob>,
    /// Thread handle, joined on drop of the last sender
    handle: Option<JoinHandle<()>>,
}

impl SolveWorker {
    /// Spawns the worker thread
    ///
    /// # Arguments
    /// * `name` - Participant name, used for the thread name and logs
    /// * `solver` - Solver run for every job
    /// * `results` - Participant inbox receiving [`Message::SolveFinished`]
    ///
    /// # Errors
    /// `MinerError::IoError` if the thread cannot be spawned
    pub fn spawn(
        name: &str,
        solver: Arc<dyn ProofSolver>,
        results: Sender<Message>,
    ) -> Result<Self, MinerError> {
        let (job_sender, job_receiver) = unbounded::<SolveJob>();
        let label = name.to_string();
        log::debug!("{}: starting {} solve worker", name, solver.name());

        let handle = thread::Builder::new()
            .name(format!("{}-solver", name))
            .spawn(move || {
                for job in job_receiver {
                    if job.token.is_cancelled() {
                        log::debug!("{}: skipping superseded search {}", label, job.token.id());
                        continue;
                    }

                    let result = solver.solve(&job.puzzle, &job.token);

                    if job.token.is_cancelled() {
                        log::debug!(
                            "{}: discarding result of superseded search {}",
                            label,
                            job.token.id()
                        );
                        continue;
                    }

                    let outcome = SolveOutcome {
                        search_id: job.token.id(),
                        result,
                    };
                    if results.send(Message::SolveFinished(outcome)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(SolveWorker {
            job_sender,
            handle: Some(handle),
        })
    }

    /// Queues a job
    ///
    /// # Errors
    /// `MinerError::ChannelError` if the worker thread has exited
    pub fn submit(&self, job: SolveJob) -> Result<(), MinerError> {
        self.job_sender.send(job)?;
        Ok(())
    }
}

impl Drop for SolveWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop once the current job returns.
        let (closed, _) = unbounded();
        self.job_sender = closed;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Solve worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::solver::{BacktrackSolver, PacedSolver};
    use crate::puzzle::Puzzle;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[test]
    fn live_job_result_reaches_the_inbox() {
        let (inbox, rx) = unbounded();
        let worker = SolveWorker::spawn("w", Arc::new(BacktrackSolver::new()), inbox).unwrap();
        let live = Arc::new(AtomicU64::new(1));
        worker
            .submit(SolveJob {
                token: CancelToken::new(1, live),
                puzzle: Puzzle::generate(1, 3, 0.5).serialize(),
            })
            .unwrap();

        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(Message::SolveFinished(outcome)) => {
                assert_eq!(outcome.search_id, 1);
                assert!(outcome.result.unwrap().solved.is_valid_solution());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn superseded_jobs_produce_nothing() {
        let (inbox, rx) = unbounded();
        let solver = PacedSolver::new(BacktrackSolver::new(), Duration::from_millis(5));
        let worker = SolveWorker::spawn("w", Arc::new(solver), inbox).unwrap();
        let live = Arc::new(AtomicU64::new(1));
        let puzzle = Puzzle::generate(2, 3, 0.5).serialize();

        worker
            .submit(SolveJob {
                token: CancelToken::new(1, live.clone()),
                puzzle: puzzle.clone(),
            })
            .unwrap();
        live.store(2, Ordering::Release);
        worker
            .submit(SolveJob {
                token: CancelToken::new(2, live.clone()),
                puzzle,
            })
            .unwrap();

        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(Message::SolveFinished(outcome)) => assert_eq!(outcome.search_id, 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn solver_errors_are_delivered_not_fatal() {
        let (inbox, rx) = unbounded();
        let worker = SolveWorker::spawn("w", Arc::new(BacktrackSolver::new()), inbox).unwrap();
        worker
            .submit(SolveJob {
                token: CancelToken::detached(),
                puzzle: "not a puzzle".into(),
            })
            .unwrap();

        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(Message::SolveFinished(outcome)) => {
                assert!(matches!(outcome.result, Err(MinerError::PuzzleError(_))))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
