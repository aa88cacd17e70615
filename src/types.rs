//! Core types used throughout the autopilot engine.
//!
//! This module defines the fundamental data structures for screen events,
//! parsed offers, policy decisions, and scan-level errors.

use serde::{Deserialize, Serialize};

/// Notification kinds delivered by the host accessibility layer.
///
/// Only `ContentChanged` and `WindowStateChanged` can arm a scan; every
/// other notification is ignored at the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenEventKind {
    /// Visible content of the active window changed
    ContentChanged,
    /// A different window came to the foreground
    WindowStateChanged,
    /// Anything else the host reports (focus, announcements, ...)
    Other,
}

/// A screen-change notification from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenEvent {
    /// Source application identifier (package / bundle id)
    pub source_id: String,
    /// What kind of change was reported
    pub kind: ScreenEventKind,
}

impl ScreenEvent {
    pub fn new(source_id: impl Into<String>, kind: ScreenEventKind) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
        }
    }
}

/// On-screen bounding rectangle of a UI element.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl NodeBounds {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point of the element
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width as i32 / 2),
            self.y + (self.height as i32 / 2),
        )
    }
}

/// One dispatch offer extracted from a single screen snapshot.
///
/// Built once per successful parse, consumed by the policy within the same
/// scan, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    /// Number of bundled calls (1, 2 or 3)
    pub call_count: u32,
    /// Total fee in currency minor units
    pub total_price: u32,
    /// Delivery distance in kilometers
    pub distance_km: f64,
    /// Destination text as shown on screen (may be empty)
    pub address: String,
}

impl Offer {
    /// An offer is usable when the count is a known bundle size and both
    /// numeric fields are positive.
    pub fn is_valid(&self) -> bool {
        (1..=3).contains(&self.call_count) && self.total_price > 0 && self.distance_km > 0.0
    }

    /// Fee per bundled call (integer division).
    pub fn average_price(&self) -> u32 {
        self.total_price / self.call_count
    }

    /// Rough hourly income estimate: ride time is assumed to be
    /// distance * 10 minutes plus a 10 minute base.
    pub fn estimated_hourly_income(&self) -> u32 {
        let estimated_minutes = self.distance_km * 10.0 + 10.0;
        ((self.total_price as f64 / estimated_minutes) * 60.0) as u32
    }
}

/// Why an offer was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The service toggle is off (or configuration was unavailable)
    ServiceDisabled,
    /// The destination matched a blacklisted area
    BlacklistedDestination,
    /// Distance above the configured maximum
    TooFar,
    /// Call count outside the supported 1..=3 range
    UnsupportedCallCount,
    /// Fee below the minimum for this bundle size
    BelowMinimum,
}

/// Outcome of evaluating one offer against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(RejectReason),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Result of one full scan of the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Harvesting produced no text at all
    NoText,
    /// Text was harvested but no offer could be parsed from it
    NoOffer,
    /// An offer was parsed and decided on; `performed` reports whether the
    /// matching control was found and activated
    Decided {
        offer: Offer,
        decision: Decision,
        performed: bool,
    },
}

/// Errors that can occur while scanning the screen.
///
/// These never escape a pipeline stage: node access failures degrade to
/// "no text from this node", recognition failures to an empty line set.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("node access failed: {0}")]
    NodeAccess(String),

    #[error("screen text recognition failed: {0}")]
    Recognition(String),
}
