// src/stats/reporter.rs
use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{Components, System};

/// Statistics related to mining progress across all local miners
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    /// Blocks whose proof a local miner found
    pub blocks_found: u64,
    /// Blocks accepted into some participant's store
    pub blocks_accepted: u64,
    /// Chain switches that abandoned stored blocks
    pub reorgs: u64,
    /// Solve results discarded because their search was no longer live
    pub stale_results: u64,
    /// Solves that failed and were restarted
    pub solve_failures: u64,
    /// Mean solve time of found blocks (milliseconds)
    pub avg_solve_ms: f64,
    /// Blocks found per minute since start
    pub blocks_per_minute: f64,
}

/// Statistics related to hardware performance
#[derive(Debug, Clone)]
pub struct HardwareStats {
    /// Current CPU usage percentage (0-100)
    pub cpu_usage: f32,
    /// Memory currently used (in bytes)
    pub memory_used: u64,
    /// CPU temperature in Celsius, `None` where no sensor is exposed
    pub temperature: Option<f32>,
}

/// Something worth counting that happened inside a mining engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningEvent {
    /// A local miner found a proof
    BlockFound {
        /// Time from search start to proof
        solve_ms: u64,
    },
    /// A block was accepted into a miner's store
    BlockAccepted,
    /// A chain switch abandoned blocks already on the local chain
    Reorg,
    /// A solve result arrived for a search that was no longer live
    StaleResult,
    /// A solve failed and a new search was started
    SolveFailed,
}

impl fmt::Display for HardwareStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU: {:.1}% | Mem: {} MiB",
            self.cpu_usage,
            self.memory_used / (1024 * 1024)
        )?;
        match self.temperature {
            Some(t) => write!(f, " | Temp: {:.1}°C", t),
            None => Ok(()),
        }
    }
}

/// Collects and reports mining and hardware statistics
pub struct StatsReporter {
    /// Atomic counters for mining statistics
    stats: Arc<MiningStatsAtomic>,
    /// System information collector
    system: System,
    /// Hardware component information collector
    components: Components,
    /// Interval at which stats are reported
    report_interval: Duration,
}

/// Atomic version of MiningStats for thread-safe operations
struct MiningStatsAtomic {
    found: AtomicU64,
    accepted: AtomicU64,
    reorgs: AtomicU64,
    stale: AtomicU64,
    failures: AtomicU64,
    solve_ms_total: AtomicU64,
    start_time: Instant,
}

impl StatsReporter {
    /// Creates a new StatsReporter with the specified reporting interval
    ///
    /// # Arguments
    /// * `report_interval` - How often to log statistics
    pub fn new(report_interval: Duration) -> Self {
        StatsReporter {
            stats: Arc::new(MiningStatsAtomic {
                found: AtomicU64::new(0),
                accepted: AtomicU64::new(0),
                reorgs: AtomicU64::new(0),
                stale: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                solve_ms_total: AtomicU64::new(0),
                start_time: Instant::now(),
            }),
            system: System::new_all(),
            components: Components::new_with_refreshed_list(),
            report_interval,
        }
    }

    /// Creates and returns a channel sender for mining events
    ///
    /// The returned sender can be cloned into every mining engine.
    /// The reporter will automatically listen for these events on a background thread.
    pub fn event_sender(&self) -> Sender<MiningEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.start_event_listener(rx);
        tx
    }

    /// Gets the current mining statistics
    ///
    /// # Returns
    /// A snapshot of the current mining statistics
    pub fn get_stats(&self) -> MiningStats {
        let minutes = self.stats.start_time.elapsed().as_secs_f64() / 60.0;
        let found = self.stats.found.load(Ordering::Relaxed);
        let solve_total = self.stats.solve_ms_total.load(Ordering::Relaxed);

        MiningStats {
            blocks_found: found,
            blocks_accepted: self.stats.accepted.load(Ordering::Relaxed),
            reorgs: self.stats.reorgs.load(Ordering::Relaxed),
            stale_results: self.stats.stale.load(Ordering::Relaxed),
            solve_failures: self.stats.failures.load(Ordering::Relaxed),
            avg_solve_ms: if found == 0 {
                0.0
            } else {
                solve_total as f64 / found as f64
            },
            blocks_per_minute: found as f64 / minutes.max(1.0 / 60.0),
        }
    }

    /// Gets the current hardware statistics
    ///
    /// This refreshes system information before returning the stats.
    ///
    /// # Returns
    /// A snapshot of the current hardware statistics
    pub fn get_hardware_stats(&mut self) -> HardwareStats {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        self.components.refresh(true);

        let cpu_usage = self
            .system
            .cpus()
            .iter()
            .map(|c| c.cpu_usage())
            .sum::<f32>()
            / self.system.cpus().len().max(1) as f32;

        let temperature = self
            .components
            .iter()
            .find(|c| c.label().contains("CPU"))
            .and_then(|c| c.temperature());

        HardwareStats {
            cpu_usage,
            memory_used: self.system.used_memory(),
            temperature,
        }
    }

    /// Starts the periodic reporting of statistics
    ///
    /// This spawns a background thread that logs stats at the configured interval.
    pub fn start_reporting(&self) {
        let stats = self.stats.clone();
        let interval = self.report_interval;

        std::thread::spawn(move || {
            let mut reporter = StatsReporter {
                stats,
                system: System::new_all(),
                components: Components::new_with_refreshed_list(),
                report_interval: interval,
            };

            loop {
                std::thread::sleep(interval);
                let mining_stats = reporter.get_stats();
                let hw_stats = reporter.get_hardware_stats();

                log::info!(
                    "Blocks: {} found ({:.1}/min, avg solve {:.0} ms), {} accepted | Reorgs: {} | Stale/Failed: {}/{} | {}",
                    mining_stats.blocks_found,
                    mining_stats.blocks_per_minute,
                    mining_stats.avg_solve_ms,
                    mining_stats.blocks_accepted,
                    mining_stats.reorgs,
                    mining_stats.stale_results,
                    mining_stats.solve_failures,
                    hw_stats
                );
            }
        });
    }

    /// Starts a listener for mining events on a background thread
    fn start_event_listener(&self, receiver: Receiver<MiningEvent>) {
        let stats = self.stats.clone();

        std::thread::spawn(move || {
            for event in receiver {
                match event {
                    MiningEvent::BlockFound { solve_ms } => {
                        stats.found.fetch_add(1, Ordering::Relaxed);
                        stats.solve_ms_total.fetch_add(solve_ms, Ordering::Relaxed);
                    }
                    MiningEvent::BlockAccepted => {
                        stats.accepted.fetch_add(1, Ordering::Relaxed);
                    }
                    MiningEvent::Reorg => {
                        stats.reorgs.fetch_add(1, Ordering::Relaxed);
                    }
                    MiningEvent::StaleResult => {
                        stats.stale.fetch_add(1, Ordering::Relaxed);
                    }
                    MiningEvent::SolveFailed => {
                        stats.failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_counted() {
        let reporter = StatsReporter::new(Duration::from_secs(60));
        let sender = reporter.event_sender();
        sender.send(MiningEvent::BlockFound { solve_ms: 40 }).unwrap();
        sender.send(MiningEvent::BlockFound { solve_ms: 60 }).unwrap();
        sender.send(MiningEvent::BlockAccepted).unwrap();
        sender.send(MiningEvent::Reorg).unwrap();
        sender.send(MiningEvent::StaleResult).unwrap();
        drop(sender);

        let deadline = Instant::now() + Duration::from_secs(5);
        while reporter.get_stats().stale_results == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        let stats = reporter.get_stats();
        assert_eq!(stats.blocks_found, 2);
        assert_eq!(stats.blocks_accepted, 1);
        assert_eq!(stats.reorgs, 1);
        assert_eq!(stats.stale_results, 1);
        assert_eq!(stats.avg_solve_ms, 50.0);
    }

    #[test]
    fn hardware_line_shows_temperature_only_when_known() {
        let mut hw = HardwareStats {
            cpu_usage: 12.5,
            memory_used: 3 * 1024 * 1024,
            temperature: None,
        };
        assert_eq!(hw.to_string(), "CPU: 12.5% | Mem: 3 MiB");

        hw.temperature = Some(48.0);
        assert_eq!(hw.to_string(), "CPU: 12.5% | Mem: 3 MiB | Temp: 48.0°C");
    }
}
