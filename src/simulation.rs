// src/simulation.rs
//! Simulation driver
//!
//! Builds the network described by a [`Config`], runs every participant on
//! its own thread and drives the timeline (late joiners, scheduled
//! transfers, overall duration, Ctrl-C) on the tokio runtime.

use crate::chain::{Block, ChainDump, ChainParams};
use crate::config::Config;
use crate::miner::solver::{BacktrackSolver, PacedSolver, ProofSolver};
use crate::network::{FakeNet, JoinContext, Message, Participant, ParticipantReport};
use crate::stats::{MiningStats, StatsReporter};
use crate::types::{Address, Role};
use crate::utils::error::MinerError;
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Final state of a simulation run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Rules the run was mined under
    pub params: ChainParams,
    /// One report per participant that exited cleanly
    pub participants: Vec<ParticipantReport>,
    /// Aggregated mining counters
    pub stats: MiningStats,
    /// Whether the run was cut short by Ctrl-C
    pub interrupted: bool,
}

impl SimulationReport {
    /// The participant holding the longest chain
    pub fn longest(&self) -> Option<&ParticipantReport> {
        self.participants.iter().max_by_key(|p| p.chain_length)
    }

    /// Logs per-participant chain state and the block tally of the longest
    /// chain
    pub fn log_summary(&self) {
        for p in &self.participants {
            log::info!(
                "{} ({}): chain length {}, tip {}, {} pending, {} orphaned",
                p.name,
                p.role,
                p.chain_length,
                &p.tip[..12],
                p.pending,
                p.orphans
            );
        }
        if let Some(longest) = self.longest() {
            for miner in self.participants.iter().filter(|p| p.role == Role::Miner) {
                log::info!(
                    "{} mined {} of {} blocks on the longest chain",
                    miner.name,
                    longest.blocks_mined_by(&miner.address),
                    longest.chain_length
                );
            }
        }
        log::info!(
            "{} proofs found (avg {:.0} ms), {} block acceptances, {} reorgs, {} stale results, {} failed solves",
            self.stats.blocks_found,
            self.stats.avg_solve_ms,
            self.stats.blocks_accepted,
            self.stats.reorgs,
            self.stats.stale_results,
            self.stats.solve_failures
        );
    }

    /// Writes the longest chain as an auditable JSON dump
    pub fn dump_longest(&self, path: &Path) -> Result<(), MinerError> {
        let longest = self
            .longest()
            .ok_or_else(|| MinerError::TaskError("no participant finished".into()))?;
        let blocks: Vec<Block> = longest.chain.iter().map(|b| (**b).clone()).collect();
        ChainDump::new(&self.params, blocks).save(path)?;
        log::info!("Wrote {} blocks to {}", longest.chain.len(), path.display());
        Ok(())
    }
}

/// Something scheduled on the timeline
enum Step {
    Join(usize),
    Transfer(usize),
}

/// A running participant
struct Running {
    address: Address,
    inbox: Sender<Message>,
    handle: JoinHandle<Result<ParticipantReport, MinerError>>,
}

/// Runs a full simulation
///
/// # Arguments
/// * `config` - Validated simulation configuration
///
/// # Errors
/// Configuration errors up front; otherwise the first fatal participant
/// error, after every participant has been shut down and joined
pub async fn run(config: &Config) -> Result<SimulationReport, MinerError> {
    config.validate()?;

    let params = ChainParams {
        base: config.base,
        policy: config.difficulty.clone(),
    };
    let reporter = StatsReporter::new(Duration::from_secs(config.report_interval_secs.max(1)));
    if config.report_interval_secs > 0 {
        reporter.start_reporting();
    }
    let ctx = JoinContext {
        genesis: Arc::new(Block::genesis()),
        params: params.clone(),
        net: Arc::new(FakeNet::new()),
        events: Some(reporter.event_sender()),
    };

    let mut timeline: Vec<(u64, Step)> = config
        .participants
        .iter()
        .enumerate()
        .map(|(i, p)| (p.join_after_ms, Step::Join(i)))
        .chain(
            config
                .transfers
                .iter()
                .enumerate()
                .map(|(i, t)| (t.at_ms, Step::Transfer(i))),
        )
        .collect();
    // Stable sort keeps joins ahead of transfers scheduled for the same instant.
    timeline.sort_by_key(|(at, _)| *at);

    log::info!(
        "Simulating {} participants for {} ms (base {})",
        config.participants.len(),
        config.duration_ms,
        config.base
    );

    let start = Instant::now();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut running: HashMap<String, Running> = HashMap::new();

    for (at, step) in timeline {
        if at >= config.duration_ms {
            break;
        }
        tokio::select! {
            _ = sleep_until(start + Duration::from_millis(at)) => {}
            _ = &mut ctrl_c => {
                interrupted = true;
                break;
            }
        }

        match step {
            Step::Join(i) => {
                let p = &config.participants[i];
                let solver: Option<Arc<dyn ProofSolver>> = match p.role {
                    Role::Miner => Some(Arc::new(PacedSolver::new(
                        BacktrackSolver::new(),
                        Duration::from_millis(p.ms_per_blank),
                    ))),
                    Role::Client => None,
                };
                let (participant, inbox) = Participant::join(&p.name, p.role, solver, &ctx)?;
                let address = participant.address().clone();
                let handle = participant.spawn()?;
                if p.role == Role::Miner {
                    inbox.send(Message::StartMining)?;
                }
                running.insert(
                    p.name.clone(),
                    Running {
                        address,
                        inbox,
                        handle,
                    },
                );
            }
            Step::Transfer(i) => {
                let t = &config.transfers[i];
                match (running.get(&t.from), running.get(&t.to)) {
                    (Some(from), Some(to)) => {
                        log::info!("{} pays {} {} gold", t.from, t.to, t.amount);
                        from.inbox.send(Message::Transfer {
                            to: to.address.clone(),
                            amount: t.amount,
                            fee: t.fee,
                        })?;
                    }
                    _ => log::warn!(
                        "Skipping transfer {} -> {}: both parties must have joined",
                        t.from,
                        t.to
                    ),
                }
            }
        }
    }

    if !interrupted {
        tokio::select! {
            _ = sleep_until(start + Duration::from_millis(config.duration_ms)) => {}
            _ = &mut ctrl_c => interrupted = true,
        }
    }
    if interrupted {
        log::warn!("Interrupted; shutting down participants");
    }

    for r in running.values() {
        // A participant that already exited has nothing left to shut down.
        let _ = r.inbox.send(Message::Shutdown);
    }

    let mut participants = Vec::with_capacity(running.len());
    let mut first_error = None;
    for (name, r) in running {
        let joined = tokio::task::spawn_blocking(move || r.handle.join()).await?;
        let result = joined
            .map_err(|_| MinerError::TaskError(format!("participant {} panicked", name)))
            .and_then(|result| result);
        match result {
            Ok(report) => participants.push(report),
            Err(e) => {
                log::error!("{} stopped with an error: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    participants.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(SimulationReport {
        params,
        participants,
        stats: reporter.get_stats(),
        interrupted,
    })
}
