//! Stats service behavior with a live refresh thread

use ifwatch::{
    Error, InterfaceConfig, InterfaceCounters, InterfaceSource, Result, StatsConfig, StatsService,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn counters(name: &str, sent: u64, recv: u64) -> InterfaceCounters {
    InterfaceCounters {
        name: name.to_string(),
        bytes_sent: sent,
        bytes_recv: recv,
        packets_sent: 1,
        packets_recv: 1,
    }
}

fn config(interval_ms: u64) -> StatsConfig {
    StatsConfig {
        refresh_interval_ms: interval_ms,
        log_interfaces: false,
    }
}

fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Replays scripted samples; `None` and an exhausted script fail the bulk query
struct ScriptedSource {
    samples: Mutex<VecDeque<Option<Vec<InterfaceCounters>>>>,
    calls: Arc<AtomicU64>,
}

impl ScriptedSource {
    fn new(samples: Vec<Option<Vec<InterfaceCounters>>>) -> (Self, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        (
            Self {
                samples: Mutex::new(samples.into()),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl InterfaceSource for ScriptedSource {
    fn list_counters(&self) -> Result<Vec<InterfaceCounters>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.samples.lock().unwrap().pop_front() {
            Some(Some(sample)) => Ok(sample),
            _ => Err(Error::SourceUnavailable("scripted failure".to_string())),
        }
    }

    fn config(&self, _name: &str) -> Result<InterfaceConfig> {
        Ok(InterfaceConfig::default())
    }

    fn is_link_up(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }
}

#[test]
fn first_read_is_populated() {
    let (source, calls) = ScriptedSource::new(vec![Some(vec![counters("eth0", 1000, 2000)])]);
    let service = StatsService::new(source, &config(60_000)).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let eth0 = service.interface("eth0").unwrap();
    assert_eq!(eth0.bytes_sent, 1000);
    assert_eq!(eth0.speed_sent, 0.0);
}

#[test]
fn background_refresh_computes_rates() {
    let (source, _) = ScriptedSource::new(vec![
        Some(vec![counters("eth0", 1000, 2000)]),
        Some(vec![counters("eth0", 1500, 2600)]),
    ]);
    // Rates divide by the configured interval, independent of wall-clock jitter
    let service = StatsService::new(source, &config(50)).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        service
            .interface("eth0")
            .map(|i| i.bytes_sent == 1500)
            .unwrap_or(false)
    }));

    let eth0 = service.interface("eth0").unwrap();
    assert_eq!(eth0.speed_sent, 500.0 / 0.05);
    assert_eq!(eth0.speed_received, 600.0 / 0.05);
}

#[test]
fn failed_cycle_serves_stale_snapshot() {
    let (source, calls) = ScriptedSource::new(vec![
        Some(vec![counters("eth0", 1000, 2000)]),
        None,
        None,
    ]);
    let service = StatsService::new(source, &config(20)).unwrap();
    let before = service.snapshot();

    assert!(wait_until(Duration::from_secs(5), || calls.load(Ordering::SeqCst) >= 3));

    let after = service.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(service.interfaces().len(), 1);
    assert_eq!(service.interface("eth0").unwrap().bytes_received, 2000);
}

#[test]
fn shutdown_stops_sampling() {
    let (source, calls) = ScriptedSource::new(vec![Some(vec![counters("eth0", 1, 1)])]);
    let service = StatsService::new(source, &config(10)).unwrap();

    assert!(wait_until(Duration::from_secs(5), || calls.load(Ordering::SeqCst) >= 2));
    service.shutdown();
    assert!(!service.is_running());

    let stopped_at = calls.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), stopped_at);
}

#[test]
fn drop_joins_refresh_thread() {
    let (source, calls) = ScriptedSource::new(vec![]);
    let service = StatsService::new(source, &config(10)).unwrap();
    drop(service);

    let stopped_at = calls.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), stopped_at);
}

/// Alternates between two disjoint interface sets; every interface in one
/// generation carries the generation number as its byte counter.
struct AlternatingSource {
    generation: AtomicU64,
}

const SET_SIZE: usize = 32;

impl InterfaceSource for AlternatingSource {
    fn list_counters(&self) -> Result<Vec<InterfaceCounters>> {
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let prefix = if gen % 2 == 0 { "even" } else { "odd" };
        Ok((0..SET_SIZE)
            .map(|i| counters(&format!("{}{}", prefix, i), gen, gen))
            .collect())
    }

    fn config(&self, _name: &str) -> Result<InterfaceConfig> {
        Ok(InterfaceConfig::default())
    }

    fn is_link_up(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }
}

#[test]
fn readers_never_see_torn_snapshots() {
    let source = AlternatingSource {
        generation: AtomicU64::new(0),
    };
    let service = Arc::new(StatsService::new(source, &config(1)).unwrap());
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut reads = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let ifaces = service.interfaces();
                    assert_eq!(ifaces.len(), SET_SIZE);

                    let gen = ifaces[0].bytes_sent;
                    let prefix = if gen % 2 == 0 { "even" } else { "odd" };
                    for iface in &ifaces {
                        assert_eq!(iface.bytes_sent, gen, "mixed generations");
                        assert!(iface.name.starts_with(prefix), "mixed interface sets");
                        // Disjoint sets: nothing is ever present in consecutive cycles
                        assert_eq!(iface.speed_sent, 0.0);
                    }
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(300));
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    service.shutdown();
}
