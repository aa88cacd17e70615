//! Engine loop: ties the gate and the pipeline together.
//!
//! One task owns everything. Screen events arrive on a channel, pass the
//! gate, and arm a scan deadline; when it fires the pipeline runs to
//! completion (harvest, parse, decide, dispatch) and the gate cools down
//! before reopening. Nothing inside a scan can take the engine down:
//! every stage failure collapses into "no decision this scan".

use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::dispatcher;
use crate::gate::{Admission, EventGate};
use crate::geofence::GeofenceIndex;
use crate::harvester;
use crate::host::AutomationHost;
use crate::parser::parse_offer;
use crate::policy::decide;
use crate::types::{Decision, ScanOutcome, ScreenEvent};

/// Running totals for observability.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub scans: u64,
    pub offers: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub last_scan_at: Option<DateTime<Utc>>,
}

/// The autopilot engine: gate, pipeline, and shared collaborator state.
///
/// Configuration and the blacklist sit behind locks so settings and map
/// UIs can swap them while the engine runs; the engine takes a fresh
/// snapshot per event and per scan and never holds a guard across an
/// await.
pub struct AutopilotEngine {
    config: Arc<RwLock<EngineConfig>>,
    blacklist: Arc<RwLock<GeofenceIndex>>,
    host: Arc<dyn AutomationHost>,
    gate: EventGate,
    stats: ScanStats,
}

impl AutopilotEngine {
    pub fn new(
        config: Arc<RwLock<EngineConfig>>,
        blacklist: Arc<RwLock<GeofenceIndex>>,
        host: Arc<dyn AutomationHost>,
    ) -> Self {
        let gate = {
            let config = read_lock(&config);
            EventGate::new(
                &config.sources.watched,
                Duration::from_millis(config.timing.scan_delay_ms),
                Duration::from_millis(config.timing.cooldown_ms),
            )
        };

        Self {
            config,
            blacklist,
            host,
            gate,
            stats: ScanStats::default(),
        }
    }

    /// Drive the engine until the event channel closes.
    /// Returns the accumulated stats on shutdown.
    pub async fn run(mut self, mut events: mpsc::Receiver<ScreenEvent>) -> ScanStats {
        info!("Autopilot engine started");

        let mut scan_at: Option<Instant> = None;
        let mut reopen_at: Option<Instant> = None;

        loop {
            tokio::select! {
                maybe_event = events.recv() => {
                    match maybe_event {
                        Some(event) => self.on_event(&event, &mut scan_at),
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(deadline_or_far(scan_at)), if scan_at.is_some() => {
                    scan_at = None;
                    self.gate.begin_scan();
                    self.scan_once().await;
                    let cooldown = self.gate.finish_scan();
                    reopen_at = Some(Instant::now() + cooldown);
                }
                _ = tokio::time::sleep_until(deadline_or_far(reopen_at)), if reopen_at.is_some() => {
                    reopen_at = None;
                    self.gate.cooldown_elapsed();
                    trace!("Cooldown over, gate open");
                }
            }
        }

        info!(
            scans = self.stats.scans,
            accepted = self.stats.accepted,
            rejected = self.stats.rejected,
            "Event channel closed, engine stopping"
        );
        self.stats
    }

    fn on_event(&mut self, event: &ScreenEvent, scan_at: &mut Option<Instant>) {
        let enabled = read_lock(&self.config).general.service_enabled;

        match self.gate.admit(event, enabled) {
            Admission::Scheduled(delay) => {
                debug!(source = %event.source_id, "Scan scheduled in {:?}", delay);
                *scan_at = Some(Instant::now() + delay);
            }
            Admission::Dropped(reason) => {
                trace!(source = %event.source_id, ?reason, "Event dropped");
            }
        }
    }

    /// Run one full pipeline pass against the current screen.
    pub async fn scan_once(&mut self) -> ScanOutcome {
        self.stats.scans += 1;
        self.stats.last_scan_at = Some(Utc::now());

        let timing = read_lock(&self.config).timing.clone();
        let lines = harvester::harvest(self.host.as_ref(), &timing).await;

        if lines.is_empty() {
            debug!("Scan found no text");
            return ScanOutcome::NoText;
        }

        let Some(offer) = parse_offer(&lines) else {
            debug!("No offer among {} text fragments", lines.len());
            return ScanOutcome::NoOffer;
        };

        info!(
            count = offer.call_count,
            price = offer.total_price,
            distance_km = offer.distance_km,
            address = %offer.address,
            per_call = offer.average_price(),
            est_hourly = offer.estimated_hourly_income(),
            "Offer detected"
        );

        let (decision, labels) = {
            let config = read_lock(&self.config);
            let blacklist = read_lock(&self.blacklist);
            let decision = decide(&offer, &config, &blacklist);
            let labels = match decision {
                Decision::Accept => config.actions.accept_labels.clone(),
                Decision::Reject(_) => config.actions.reject_labels.clone(),
            };
            (decision, labels)
        };

        self.stats.offers += 1;
        match decision {
            Decision::Accept => self.stats.accepted += 1,
            Decision::Reject(_) => self.stats.rejected += 1,
        }

        let performed = dispatcher::perform(self.host.as_ref(), &labels).await;

        if performed {
            info!(?decision, "Decision dispatched");
        } else {
            warn!(?decision, "Decision made but no control could be activated");
        }

        ScanOutcome::Decided {
            offer,
            decision,
            performed,
        }
    }

    pub fn stats(&self) -> ScanStats {
        self.stats.clone()
    }
}

/// Read a shared lock, recovering from poisoning: a panicked writer must
/// not take the decision path down with it.
fn read_lock<T>(lock: &Arc<RwLock<T>>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `select!` evaluates every branch expression, so a disabled deadline
/// still needs a real (far away) instant behind it.
fn deadline_or_far(deadline: Option<Instant>) -> Instant {
    deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::UiNode;
    use crate::types::{ScanError, ScreenEventKind};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Host with no tree and no OCR text, counting how often the engine
    /// asks for the screen.
    struct CountingHost {
        roots_requested: AtomicU32,
    }

    #[async_trait::async_trait]
    impl AutomationHost for CountingHost {
        async fn active_root(&self) -> Option<Box<dyn UiNode>> {
            self.roots_requested.fetch_add(1, Ordering::SeqCst);
            None
        }

        async fn recognize_text(&self) -> Result<Vec<String>, ScanError> {
            Ok(Vec::new())
        }

        async fn tap(&self, _x: i32, _y: i32) -> bool {
            false
        }
    }

    fn enabled_config() -> Arc<RwLock<EngineConfig>> {
        let mut config = EngineConfig::default();
        config.general.service_enabled = true;
        Arc::new(RwLock::new(config))
    }

    fn empty_blacklist() -> Arc<RwLock<GeofenceIndex>> {
        struct NullStore;
        impl crate::geofence::AreaStore for NullStore {
            fn load(&self) -> std::io::Result<String> {
                Ok(String::new())
            }
            fn persist(&self, _blob: &str) -> std::io::Result<()> {
                Ok(())
            }
        }
        Arc::new(RwLock::new(GeofenceIndex::load(Box::new(NullStore))))
    }

    fn content_changed() -> ScreenEvent {
        ScreenEvent::new("com.sampleapp", ScreenEventKind::ContentChanged)
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_burst_runs_exactly_one_scan() {
        let host = Arc::new(CountingHost {
            roots_requested: AtomicU32::new(0),
        });

        let engine = AutopilotEngine::new(enabled_config(), empty_blacklist(), host.clone());
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(engine.run(rx));

        // A burst of notifications inside one debounce window
        tx.send(content_changed()).await.unwrap();
        tx.send(content_changed()).await.unwrap();
        tx.send(content_changed()).await.unwrap();

        // Let the scan deadline and the cooldown pass
        tokio::time::sleep(Duration::from_secs(3)).await;

        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.scans, 1);
        assert_eq!(host.roots_requested.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_reopens_after_cooldown() {
        let host = Arc::new(CountingHost {
            roots_requested: AtomicU32::new(0),
        });

        let engine = AutopilotEngine::new(enabled_config(), empty_blacklist(), host.clone());
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(engine.run(rx));

        tx.send(content_changed()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        tx.send(content_changed()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.scans, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_service_never_scans() {
        let host = Arc::new(CountingHost {
            roots_requested: AtomicU32::new(0),
        });

        let engine = AutopilotEngine::new(
            Arc::new(RwLock::new(EngineConfig::default())),
            empty_blacklist(),
            host.clone(),
        );
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(engine.run(rx));

        tx.send(content_changed()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.scans, 0);
        assert_eq!(host.roots_requested.load(Ordering::SeqCst), 0);
    }
}
