//! Screen-event gate.
//!
//! A burst of accessibility notifications must collapse into at most one
//! scan. The gate is an explicit four-state machine (idle, armed,
//! scanning, cooling down) with no timer of its own: the engine loop owns
//! the clock and reports deadline expiry back into the gate, which keeps
//! every transition unit-testable.

use std::time::Duration;

use tracing::warn;

use crate::types::{ScreenEvent, ScreenEventKind};

/// Lifecycle of one debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Waiting for a qualifying event
    Idle,
    /// Event admitted, scan scheduled
    Armed,
    /// Pipeline running
    Scanning,
    /// Absorbing events caused by our own action
    Cooldown,
}

/// What the gate decided about one incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Run a scan after this delay
    Scheduled(Duration),
    /// Event discarded
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The service toggle is off
    Disabled,
    /// Source id not on the watched list
    UnwatchedSource,
    /// Notification kind that never triggers a scan
    IgnoredKind,
    /// A scan is already pending, running, or cooling down
    Busy,
}

/// Matches source identifiers against the watched list.
///
/// Entries may be exact ids or glob patterns; invalid patterns are logged
/// and skipped.
pub struct SourceFilter {
    patterns: Vec<glob::Pattern>,
}

impl SourceFilter {
    pub fn new(watched: &[String]) -> Self {
        let patterns = watched
            .iter()
            .filter_map(|entry| {
                glob::Pattern::new(entry)
                    .map_err(|e| {
                        warn!("Invalid watched source pattern '{}': {}", entry, e);
                        e
                    })
                    .ok()
            })
            .collect();

        Self { patterns }
    }

    pub fn matches(&self, source_id: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(source_id))
    }
}

/// The debounce / re-entrancy state machine.
pub struct EventGate {
    state: GateState,
    sources: SourceFilter,
    scan_delay: Duration,
    cooldown: Duration,
}

impl EventGate {
    pub fn new(watched_sources: &[String], scan_delay: Duration, cooldown: Duration) -> Self {
        Self {
            state: GateState::Idle,
            sources: SourceFilter::new(watched_sources),
            scan_delay,
            cooldown,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Filter one incoming event.
    ///
    /// Arms the gate and returns the scan delay when the event qualifies
    /// and the gate is idle; otherwise reports why the event was dropped.
    pub fn admit(&mut self, event: &ScreenEvent, service_enabled: bool) -> Admission {
        if !service_enabled {
            return Admission::Dropped(DropReason::Disabled);
        }

        if !self.sources.matches(&event.source_id) {
            return Admission::Dropped(DropReason::UnwatchedSource);
        }

        if !matches!(
            event.kind,
            ScreenEventKind::ContentChanged | ScreenEventKind::WindowStateChanged
        ) {
            return Admission::Dropped(DropReason::IgnoredKind);
        }

        if self.state != GateState::Idle {
            return Admission::Dropped(DropReason::Busy);
        }

        self.state = GateState::Armed;
        Admission::Scheduled(self.scan_delay)
    }

    /// The scan deadline fired; the pipeline is about to run.
    pub fn begin_scan(&mut self) {
        debug_assert_eq!(self.state, GateState::Armed);
        self.state = GateState::Scanning;
    }

    /// The pipeline finished (decision made or failure absorbed).
    /// Returns the cooldown delay before the gate reopens.
    pub fn finish_scan(&mut self) -> Duration {
        debug_assert_eq!(self.state, GateState::Scanning);
        self.state = GateState::Cooldown;
        self.cooldown
    }

    /// The cooldown deadline fired; the gate is open again.
    pub fn cooldown_elapsed(&mut self) {
        debug_assert_eq!(self.state, GateState::Cooldown);
        self.state = GateState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watched() -> Vec<String> {
        vec![
            "com.woowahan.baemin".to_string(),
            "com.woowahan.*".to_string(),
        ]
    }

    fn gate() -> EventGate {
        EventGate::new(
            &watched(),
            Duration::from_millis(1000),
            Duration::from_millis(500),
        )
    }

    fn event(kind: ScreenEventKind) -> ScreenEvent {
        ScreenEvent::new("com.woowahan.baemin", kind)
    }

    #[test]
    fn test_qualifying_event_schedules_scan() {
        let mut gate = gate();
        let admission = gate.admit(&event(ScreenEventKind::ContentChanged), true);

        assert_eq!(admission, Admission::Scheduled(Duration::from_millis(1000)));
        assert_eq!(gate.state(), GateState::Armed);
    }

    #[test]
    fn test_window_state_change_also_qualifies() {
        let mut gate = gate();
        assert!(matches!(
            gate.admit(&event(ScreenEventKind::WindowStateChanged), true),
            Admission::Scheduled(_)
        ));
    }

    #[test]
    fn test_disabled_service_drops_event() {
        let mut gate = gate();
        let admission = gate.admit(&event(ScreenEventKind::ContentChanged), false);

        assert_eq!(admission, Admission::Dropped(DropReason::Disabled));
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_unwatched_source_drops_event() {
        let mut gate = gate();
        let foreign = ScreenEvent::new("com.example.other", ScreenEventKind::ContentChanged);

        assert_eq!(
            gate.admit(&foreign, true),
            Admission::Dropped(DropReason::UnwatchedSource)
        );
    }

    #[test]
    fn test_glob_pattern_matches_source_family() {
        let mut gate = gate();
        let rider = ScreenEvent::new("com.woowahan.baeminrider", ScreenEventKind::ContentChanged);

        assert!(matches!(gate.admit(&rider, true), Admission::Scheduled(_)));
    }

    #[test]
    fn test_other_kind_drops_event() {
        let mut gate = gate();
        assert_eq!(
            gate.admit(&event(ScreenEventKind::Other), true),
            Admission::Dropped(DropReason::IgnoredKind)
        );
    }

    #[test]
    fn test_second_event_in_window_is_dropped() {
        let mut gate = gate();

        assert!(matches!(
            gate.admit(&event(ScreenEventKind::ContentChanged), true),
            Admission::Scheduled(_)
        ));
        // Still armed: exactly one scan may be scheduled per window
        assert_eq!(
            gate.admit(&event(ScreenEventKind::ContentChanged), true),
            Admission::Dropped(DropReason::Busy)
        );
    }

    #[test]
    fn test_events_dropped_while_scanning_and_cooling() {
        let mut gate = gate();

        gate.admit(&event(ScreenEventKind::ContentChanged), true);
        gate.begin_scan();
        assert_eq!(
            gate.admit(&event(ScreenEventKind::ContentChanged), true),
            Admission::Dropped(DropReason::Busy)
        );

        let cooldown = gate.finish_scan();
        assert_eq!(cooldown, Duration::from_millis(500));
        assert_eq!(
            gate.admit(&event(ScreenEventKind::ContentChanged), true),
            Admission::Dropped(DropReason::Busy)
        );
    }

    #[test]
    fn test_full_cycle_reopens_the_gate() {
        let mut gate = gate();

        gate.admit(&event(ScreenEventKind::ContentChanged), true);
        gate.begin_scan();
        gate.finish_scan();
        gate.cooldown_elapsed();

        assert_eq!(gate.state(), GateState::Idle);
        assert!(matches!(
            gate.admit(&event(ScreenEventKind::ContentChanged), true),
            Admission::Scheduled(_)
        ));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let filter = SourceFilter::new(&["[invalid".to_string(), "com.ok.app".to_string()]);
        assert!(filter.matches("com.ok.app"));
        assert!(!filter.matches("[invalid"));
    }
}
