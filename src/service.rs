//! Stats Service
//!
//! [`StatsService`] samples an [`InterfaceSource`] on a fixed interval and
//! publishes the result as an immutable [`Snapshot`]. Two snapshots are kept:
//! the current one, served to readers, and the previous one.
//!
//! ```no_run
//! use ifwatch::{StatsConfig, StatsService, SystemSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = StatsService::new(SystemSource::new(), &StatsConfig::default())?;
//!
//! for iface in service.interfaces() {
//!     println!("{}: ↓{:.1} B/s ↑{:.1} B/s",
//!         iface.name,
//!         iface.speed_received,
//!         iface.speed_sent
//!     );
//! }
//!
//! service.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A single background thread is the only writer. Each refresh cycle queries
//! the source and computes rates without holding any lock, then takes the
//! write lock just long enough to rotate `current` into `previous` and install
//! the new snapshot. Readers take the read lock only to clone the `Arc` of the
//! current snapshot, so a reader always sees one complete cycle.

use crate::config::StatsConfig;
use crate::error::Result;
use crate::source::{config_or_default, link_up_or_default, InterfaceConfig, InterfaceSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default refresh interval
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Statistics for one interface within a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceStats {
    /// Interface name, unique within a snapshot
    pub name: String,
    /// Static configuration
    pub config: InterfaceConfig,
    /// Interface is up
    pub link_up: bool,
    /// Packets transmitted
    pub packets_sent: u64,
    /// Packets received
    pub packets_received: u64,
    /// Bytes transmitted
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Transmit rate since the previous sample (bytes/sec)
    pub speed_sent: f64,
    /// Receive rate since the previous sample (bytes/sec)
    pub speed_received: f64,
}

/// Point-in-time sample of all interfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the sample was taken
    pub taken_at: DateTime<Utc>,
    /// Interface name to stats
    pub interfaces: HashMap<String, InterfaceStats>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            taken_at: Utc::now(),
            interfaces: HashMap::new(),
        }
    }

    /// Stats for interface `name`
    pub fn get(&self, name: &str) -> Option<&InterfaceStats> {
        self.interfaces.get(name)
    }

    /// Number of interfaces in the sample
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Whether the sample holds no interfaces
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

struct SnapshotPair {
    current: Arc<Snapshot>,
    previous: Arc<Snapshot>,
}

struct Shared {
    source: Box<dyn InterfaceSource>,
    interval: Duration,
    log_interfaces: bool,
    snapshots: RwLock<SnapshotPair>,
}

impl Shared {
    fn current(&self) -> Arc<Snapshot> {
        let pair = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&pair.current)
    }

    fn previous(&self) -> Arc<Snapshot> {
        let pair = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&pair.previous)
    }

    /// Run one refresh cycle
    ///
    /// On a source failure both snapshots are left untouched.
    fn refresh(&self) -> Result<()> {
        let counters = self.source.list_counters().map_err(|e| {
            log::error!("Error getting interface counters: {}", e);
            e
        })?;

        // Only this routine writes, so the prior snapshot cannot change underneath us
        let prior = self.current();
        let secs = self.interval.as_secs_f64();

        let mut interfaces = HashMap::with_capacity(counters.len());
        for counter in counters {
            let name = counter.name;
            let config = config_or_default(&*self.source, &name);
            let link_up = link_up_or_default(&*self.source, &name);

            let (speed_sent, speed_received) = match prior.get(&name) {
                Some(prev) => (
                    rate(&name, "sent", prev.bytes_sent, counter.bytes_sent, secs),
                    rate(&name, "received", prev.bytes_received, counter.bytes_recv, secs),
                ),
                None => (0.0, 0.0),
            };

            interfaces.insert(
                name.clone(),
                InterfaceStats {
                    name,
                    config,
                    link_up,
                    packets_sent: counter.packets_sent,
                    packets_received: counter.packets_recv,
                    bytes_sent: counter.bytes_sent,
                    bytes_received: counter.bytes_recv,
                    speed_sent,
                    speed_received,
                },
            );
        }

        let snapshot = Arc::new(Snapshot {
            taken_at: Utc::now(),
            interfaces,
        });

        if self.log_interfaces {
            for (name, iface) in &snapshot.interfaces {
                log::debug!("Interface {}: {:?}", name, iface);
            }
        }

        self.publish(snapshot);
        Ok(())
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        let stale = {
            let mut pair = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
            let current = std::mem::replace(&mut pair.current, snapshot);
            std::mem::replace(&mut pair.previous, current)
        };
        drop(stale);
    }
}

/// Bytes/sec between two counter readings; a decrease is treated as a reset and yields 0
fn rate(name: &str, direction: &str, old: u64, new: u64, secs: f64) -> f64 {
    if new < old {
        log::warn!(
            "Counter anomaly on {}: bytes {} went from {} to {}, reporting 0",
            name,
            direction,
            old,
            new
        );
        return 0.0;
    }
    (new - old) as f64 / secs
}

/// Periodic interface sampler with concurrent read access
///
/// Construct once at startup and share behind an `Arc`.
pub struct StatsService {
    shared: Arc<Shared>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StatsService {
    /// Create the service, run one synchronous refresh, and start the refresh thread
    ///
    /// A failing first refresh is logged and leaves the snapshot empty until
    /// the next tick.
    pub fn new<S>(source: S, config: &StatsConfig) -> Result<Self>
    where
        S: InterfaceSource + 'static,
    {
        config.validate()?;

        let shared = Arc::new(Shared {
            source: Box::new(source),
            interval: config.interval(),
            log_interfaces: config.log_interfaces,
            snapshots: RwLock::new(SnapshotPair {
                current: Arc::new(Snapshot::empty()),
                previous: Arc::new(Snapshot::empty()),
            }),
        });

        if shared.refresh().is_ok() {
            log::info!(
                "Initial sample collected ({} interfaces)",
                shared.current().len()
            );
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("ifwatch-refresh".to_string())
            .spawn(move || run_refresh_loop(worker_shared, shutdown_rx))?;

        log::info!(
            "Stats service started (refresh every {:?})",
            shared.interval
        );

        Ok(Self {
            shared,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Independent copy of every interface in the current snapshot
    ///
    /// Order is not meaningful.
    pub fn interfaces(&self) -> Vec<InterfaceStats> {
        self.shared.current().interfaces.values().cloned().collect()
    }

    /// Copy of a single interface from the current snapshot
    pub fn interface(&self, name: &str) -> Option<InterfaceStats> {
        self.shared.current().get(name).cloned()
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.current()
    }

    /// The snapshot that preceded the current one
    pub fn previous_snapshot(&self) -> Arc<Snapshot> {
        self.shared.previous()
    }

    /// Refresh interval
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Whether the refresh thread is still running
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop the refresh thread and wait for it to exit
    ///
    /// The last published snapshot stays readable. Calling this more than once
    /// is a no-op.
    pub fn shutdown(&self) {
        let tx = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(tx) = tx else {
            return;
        };
        let _ = tx.send(());

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                log::error!("Refresh thread panicked");
            }
        }
        log::info!("Stats service stopped");
    }
}

impl Drop for StatsService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for StatsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsService")
            .field("interval", &self.shared.interval)
            .field("interfaces", &self.shared.current().len())
            .finish()
    }
}

fn run_refresh_loop(shared: Arc<Shared>, shutdown: mpsc::Receiver<()>) {
    let mut next_tick = Instant::now() + shared.interval;
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match shutdown.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {
                // Errors are already logged; retry happens on the next tick
                let _ = shared.refresh();

                next_tick += shared.interval;
                let now = Instant::now();
                if next_tick < now {
                    // Missed ticks are dropped rather than replayed back to back
                    next_tick = now + shared.interval;
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
