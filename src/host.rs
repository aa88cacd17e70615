//! Host automation boundary.
//!
//! The engine never talks to a platform accessibility API directly; the
//! embedding host supplies the UI tree, the OCR fallback, and the gesture
//! primitive through the traits in this module.

use crate::types::{NodeBounds, ScanError};

/// One element of the host's UI-automation tree.
///
/// Handles are owned: dropping a box releases the underlying platform
/// resource, so early returns during a search never leak nodes. Every
/// accessor may fail independently (stale handles are normal while the
/// screen is animating); callers treat a failure as "nothing here" and
/// keep going.
pub trait UiNode: Send + Sync {
    /// Visible text of the element, if any.
    fn label(&self) -> Result<Option<String>, ScanError>;

    /// Accessibility description of the element, if any.
    fn description(&self) -> Result<Option<String>, ScanError>;

    /// Whether the host flags this element as accepting input.
    fn actionable(&self) -> Result<bool, ScanError>;

    /// Screen-space bounding rectangle.
    fn bounds(&self) -> Result<NodeBounds, ScanError>;

    /// Child elements in their natural order.
    fn children(&self) -> Result<Vec<Box<dyn UiNode>>, ScanError>;

    /// Ask the host to activate this element directly.
    ///
    /// Returns `Ok(false)` when the element does not support direct
    /// activation; the caller falls back to a synthesized tap.
    fn activate(&self) -> Result<bool, ScanError>;
}

/// Capabilities the embedding host must provide.
#[async_trait::async_trait]
pub trait AutomationHost: Send + Sync {
    /// Root of the active window's element tree, if one is available.
    async fn active_root(&self) -> Option<Box<dyn UiNode>>;

    /// OCR fallback: recognized text lines for the current screen.
    ///
    /// An empty result is legitimate (nothing recognizable on screen).
    async fn recognize_text(&self) -> Result<Vec<String>, ScanError>;

    /// Synthesize a single-point, near-zero-duration tap gesture.
    async fn tap(&self, x: i32, y: i32) -> bool;
}
