//! Offer Autopilot - automated dispatch-offer decision engine
//!
//! This crate watches a delivery-dispatch application through the host's
//! UI-automation layer and accepts or rejects incoming offers without
//! human input:
//!
//! - **Harvest**: walk the accessibility tree of the active window, then
//!   append OCR fallback text for anything the tree misses
//! - **Parse**: recover a structured offer (fee, distance, bundle size,
//!   destination) from the noisy text fragments
//! - **Decide**: apply fee/distance thresholds and a polygon-backed
//!   destination blacklist
//! - **Act**: find the matching accept/reject control and press it
//!
//! # Architecture
//!
//! A single engine task owns the whole pipeline. Incoming screen events
//! are debounced by an explicit four-state gate so at most one scan is in
//! flight; the embedding host supplies the UI tree, OCR, and gesture
//! primitives behind the traits in [`host`].

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod gate;
pub mod geofence;
pub mod harvester;
pub mod host;
pub mod parser;
pub mod policy;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{AutopilotEngine, ScanStats};
pub use gate::{Admission, DropReason, EventGate, GateState, SourceFilter};
pub use geofence::{
    parse_areas, serialize_areas, AreaStore, FileAreaStore, GeoPoint, GeofenceArea, GeofenceIndex,
};
pub use harvester::{harvest, harvest_tree};
pub use host::{AutomationHost, UiNode};
pub use parser::parse_offer;
pub use policy::decide;
pub use types::{
    Decision, NodeBounds, Offer, RejectReason, ScanError, ScanOutcome, ScreenEvent,
    ScreenEventKind,
};
