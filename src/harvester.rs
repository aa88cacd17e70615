//! Screen text harvesting.
//!
//! Collects every visible text fragment for one scan: a pre-order walk of
//! the host's UI-element tree followed by the OCR fallback lines. Nothing
//! in here fails outward; a dead node, a stale tree, or a broken OCR call
//! all degrade to "less text".

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::config::TimingConfig;
use crate::host::{AutomationHost, UiNode};

/// Walk the element tree, collecting trimmed non-blank labels and
/// descriptions in pre-order.
pub fn harvest_tree(root: &dyn UiNode) -> Vec<String> {
    let mut lines = Vec::new();
    walk(root, &mut lines);
    lines
}

fn walk(node: &dyn UiNode, lines: &mut Vec<String>) {
    if let Ok(Some(label)) = node.label() {
        let label = label.trim();
        if !label.is_empty() {
            lines.push(label.to_string());
        }
    }

    if let Ok(Some(description)) = node.description() {
        let description = description.trim();
        if !description.is_empty() {
            lines.push(description.to_string());
        }
    }

    match node.children() {
        Ok(children) => {
            for child in children {
                walk(child.as_ref(), lines);
            }
        }
        Err(e) => {
            // Inaccessible subtree: keep whatever the rest of the tree has
            trace!("Skipping subtree: {}", e);
        }
    }
}

/// Collect all text visible on the current screen.
///
/// Tree acquisition and the OCR call are both bounded; a timeout on either
/// contributes no lines rather than failing the scan.
pub async fn harvest(host: &dyn AutomationHost, timing: &TimingConfig) -> Vec<String> {
    let mut lines = match tokio::time::timeout(
        Duration::from_millis(timing.harvest_timeout_ms),
        host.active_root(),
    )
    .await
    {
        Ok(Some(root)) => harvest_tree(root.as_ref()),
        Ok(None) => {
            debug!("No active window root");
            Vec::new()
        }
        Err(_) => {
            warn!(
                "UI tree acquisition exceeded {}ms",
                timing.harvest_timeout_ms
            );
            Vec::new()
        }
    };

    match tokio::time::timeout(
        Duration::from_millis(timing.ocr_timeout_ms),
        host.recognize_text(),
    )
    .await
    {
        Ok(Ok(ocr_lines)) => lines.extend(ocr_lines),
        Ok(Err(e)) => debug!("OCR fallback failed: {}", e),
        Err(_) => warn!("OCR fallback exceeded {}ms", timing.ocr_timeout_ms),
    }

    lines
}
