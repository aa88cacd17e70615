//! UI action dispatch.
//!
//! Once the policy has spoken, the matching on-screen control has to be
//! found and pressed. The search is a pre-order walk for the first
//! actionable node whose text matches any of the target labels; direct
//! activation is preferred, a synthesized tap at the node's center is the
//! fallback.

use tracing::{debug, warn};

use crate::host::{AutomationHost, UiNode};

/// Find the target control and activate it.
///
/// Returns `false` when no matching actionable node exists anywhere in the
/// active tree; no gesture is attempted in that case and the caller does
/// not retry.
pub async fn perform(host: &dyn AutomationHost, target_labels: &[String]) -> bool {
    let Some(root) = host.active_root().await else {
        debug!("No active window to act on");
        return false;
    };

    let Some(target) = find_control(root, target_labels) else {
        warn!("No actionable control matched {:?}", target_labels);
        return false;
    };

    match target.activate() {
        Ok(true) => {
            debug!("Activated control directly");
            true
        }
        Ok(false) => tap_center(host, target.as_ref()).await,
        Err(e) => {
            debug!("Direct activation failed ({}), synthesizing tap", e);
            tap_center(host, target.as_ref()).await
        }
    }
}

async fn tap_center(host: &dyn AutomationHost, node: &dyn UiNode) -> bool {
    match node.bounds() {
        Ok(bounds) => {
            let (x, y) = bounds.center();
            debug!("Tapping at ({}, {})", x, y);
            host.tap(x, y).await
        }
        Err(e) => {
            warn!("Cannot tap, bounds unavailable: {}", e);
            false
        }
    }
}

/// Pre-order depth-first search for the first actionable node whose label
/// or description contains any of the target labels.
fn find_control(node: Box<dyn UiNode>, target_labels: &[String]) -> Option<Box<dyn UiNode>> {
    if node_matches(node.as_ref(), target_labels) {
        return Some(node);
    }

    let children = match node.children() {
        Ok(children) => children,
        Err(_) => return None,
    };

    for child in children {
        if let Some(hit) = find_control(child, target_labels) {
            return Some(hit);
        }
    }

    None
}

fn node_matches(node: &dyn UiNode, target_labels: &[String]) -> bool {
    if !node.actionable().unwrap_or(false) {
        return false;
    }

    let label = node.label().ok().flatten();
    let description = node.description().ok().flatten();

    target_labels.iter().any(|target| {
        label.as_deref().is_some_and(|t| t.contains(target.as_str()))
            || description
                .as_deref()
                .is_some_and(|t| t.contains(target.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeBounds, ScanError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct TestNode {
        label: Option<String>,
        description: Option<String>,
        actionable: bool,
        supports_activation: bool,
        bounds: Option<NodeBounds>,
        activated: Arc<AtomicBool>,
        children: Vec<TestNode>,
    }

    impl TestNode {
        fn text(label: &str) -> Self {
            Self {
                label: Some(label.to_string()),
                ..Default::default()
            }
        }

        fn button(label: &str) -> Self {
            Self {
                label: Some(label.to_string()),
                actionable: true,
                supports_activation: true,
                bounds: Some(NodeBounds::new(0, 0, 100, 40)),
                ..Default::default()
            }
        }
    }

    impl UiNode for TestNode {
        fn label(&self) -> Result<Option<String>, ScanError> {
            Ok(self.label.clone())
        }

        fn description(&self) -> Result<Option<String>, ScanError> {
            Ok(self.description.clone())
        }

        fn actionable(&self) -> Result<bool, ScanError> {
            Ok(self.actionable)
        }

        fn bounds(&self) -> Result<NodeBounds, ScanError> {
            self.bounds
                .ok_or_else(|| ScanError::NodeAccess("no bounds".into()))
        }

        fn children(&self) -> Result<Vec<Box<dyn UiNode>>, ScanError> {
            Ok(self
                .children
                .iter()
                .map(|c| Box::new(c.clone()) as Box<dyn UiNode>)
                .collect())
        }

        fn activate(&self) -> Result<bool, ScanError> {
            if !self.supports_activation {
                return Ok(false);
            }
            self.activated.store(true, Ordering::SeqCst);
            Ok(true)
        }
    }

    struct TestHost {
        root: Option<TestNode>,
        taps: Mutex<Vec<(i32, i32)>>,
    }

    impl TestHost {
        fn with_root(root: TestNode) -> Self {
            Self {
                root: Some(root),
                taps: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl AutomationHost for TestHost {
        async fn active_root(&self) -> Option<Box<dyn UiNode>> {
            self.root
                .as_ref()
                .map(|r| Box::new(r.clone()) as Box<dyn UiNode>)
        }

        async fn recognize_text(&self) -> Result<Vec<String>, ScanError> {
            Ok(Vec::new())
        }

        async fn tap(&self, x: i32, y: i32) -> bool {
            self.taps.lock().unwrap().push((x, y));
            true
        }
    }

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_activates_matching_button() {
        let button = TestNode::button("수락");
        let activated = button.activated.clone();

        let root = TestNode {
            children: vec![TestNode::text("5,000원"), button],
            ..Default::default()
        };
        let host = TestHost::with_root(root);

        assert!(perform(&host, &labels(&["수락", "확인", "OK"])).await);
        assert!(activated.load(Ordering::SeqCst));
        assert!(host.taps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_substring_match_on_description() {
        let mut button = TestNode::button("");
        button.label = None;
        button.description = Some("주문 수락 버튼".to_string());

        let host = TestHost::with_root(TestNode {
            children: vec![button],
            ..Default::default()
        });

        assert!(perform(&host, &labels(&["수락"])).await);
    }

    #[tokio::test]
    async fn test_text_match_without_actionable_flag_is_skipped() {
        // The fee line mentions the same word as the button; only the
        // actionable node may be chosen
        let decoy = TestNode::text("수락 대기중");
        let button = TestNode::button("수락");
        let activated = button.activated.clone();

        let host = TestHost::with_root(TestNode {
            children: vec![decoy, button],
            ..Default::default()
        });

        assert!(perform(&host, &labels(&["수락"])).await);
        assert!(activated.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_tap_fallback_when_direct_activation_unsupported() {
        let mut button = TestNode::button("거절");
        button.supports_activation = false;
        button.bounds = Some(NodeBounds::new(100, 200, 200, 100));

        let host = TestHost::with_root(TestNode {
            children: vec![button],
            ..Default::default()
        });

        assert!(perform(&host, &labels(&["거절"])).await);
        assert_eq!(*host.taps.lock().unwrap(), vec![(200, 250)]);
    }

    #[tokio::test]
    async fn test_no_match_returns_false_without_gesture() {
        let host = TestHost::with_root(TestNode {
            children: vec![TestNode::text("배달 완료")],
            ..Default::default()
        });

        assert!(!perform(&host, &labels(&["수락"])).await);
        assert!(host.taps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_active_window_returns_false() {
        let host = TestHost {
            root: None,
            taps: Mutex::new(Vec::new()),
        };

        assert!(!perform(&host, &labels(&["수락"])).await);
    }

    #[tokio::test]
    async fn test_preorder_first_match_wins() {
        let first = TestNode::button("취소");
        let first_activated = first.activated.clone();
        let second = TestNode::button("패스");
        let second_activated = second.activated.clone();

        let host = TestHost::with_root(TestNode {
            children: vec![
                TestNode {
                    children: vec![first],
                    ..Default::default()
                },
                second,
            ],
            ..Default::default()
        });

        assert!(perform(&host, &labels(&["거절", "취소", "패스"])).await);
        assert!(first_activated.load(Ordering::SeqCst));
        assert!(!second_activated.load(Ordering::SeqCst));
    }
}
