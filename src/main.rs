//! Offer Autopilot - simulation entry point
//!
//! Drives the full pipeline without a device: blank-line-separated screen
//! "frames" read from stdin become the visible text of a fake host, and
//! every frame fires one content-changed event. Useful for trying parser
//! and policy settings against captured screen dumps:
//!
//! ```text
//! printf '묶음 2건\n8,500원\n1.2km\n서울 송파구 방이동\n' | offer-autopilot
//! ```

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use offer_autopilot::{
    AutomationHost, AutopilotEngine, EngineConfig, FileAreaStore, GeofenceIndex, NodeBounds,
    ScanError, ScreenEvent, ScreenEventKind, UiNode,
};

/// One element of the simulated screen.
#[derive(Clone)]
struct SimNode {
    label: Option<String>,
    actionable: bool,
    bounds: NodeBounds,
    children: Vec<SimNode>,
}

impl SimNode {
    fn text(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            actionable: false,
            bounds: NodeBounds::default(),
            children: Vec::new(),
        }
    }

    fn button(label: &str, bounds: NodeBounds) -> Self {
        Self {
            label: Some(label.to_string()),
            actionable: true,
            bounds,
            children: Vec::new(),
        }
    }
}

impl UiNode for SimNode {
    fn label(&self) -> Result<Option<String>, ScanError> {
        Ok(self.label.clone())
    }

    fn description(&self) -> Result<Option<String>, ScanError> {
        Ok(None)
    }

    fn actionable(&self) -> Result<bool, ScanError> {
        Ok(self.actionable)
    }

    fn bounds(&self) -> Result<NodeBounds, ScanError> {
        Ok(self.bounds)
    }

    fn children(&self) -> Result<Vec<Box<dyn UiNode>>, ScanError> {
        Ok(self
            .children
            .iter()
            .map(|c| Box::new(c.clone()) as Box<dyn UiNode>)
            .collect())
    }

    fn activate(&self) -> Result<bool, ScanError> {
        info!(
            "[sim] control '{}' activated",
            self.label.as_deref().unwrap_or("")
        );
        Ok(true)
    }
}

/// Host whose screen is the most recent stdin frame plus the two offer
/// buttons.
struct SimHost {
    frame: Mutex<Vec<String>>,
    accept_label: String,
    reject_label: String,
}

#[async_trait::async_trait]
impl AutomationHost for SimHost {
    async fn active_root(&self) -> Option<Box<dyn UiNode>> {
        let frame = self.frame.lock().unwrap_or_else(|p| p.into_inner());
        if frame.is_empty() {
            return None;
        }

        let mut children: Vec<SimNode> = frame.iter().map(|line| SimNode::text(line)).collect();
        children.push(SimNode::button(
            &self.accept_label,
            NodeBounds::new(40, 1700, 480, 140),
        ));
        children.push(SimNode::button(
            &self.reject_label,
            NodeBounds::new(560, 1700, 480, 140),
        ));

        Some(Box::new(SimNode {
            label: None,
            actionable: false,
            bounds: NodeBounds::new(0, 0, 1080, 1920),
            children,
        }))
    }

    async fn recognize_text(&self) -> Result<Vec<String>, ScanError> {
        // The simulated tree already carries every line
        Ok(Vec::new())
    }

    async fn tap(&self, x: i32, y: i32) -> bool {
        info!("[sim] tap at ({}, {})", x, y);
        true
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting Offer Autopilot simulation");

    let mut config = EngineConfig::load();
    if !config.general.service_enabled {
        warn!("Service disabled in configuration; enabling for the simulation");
        config.general.service_enabled = true;
    }

    let source_id = config
        .sources
        .watched
        .first()
        .cloned()
        .unwrap_or_else(|| "com.sampleapp".to_string());
    let frame_gap =
        Duration::from_millis(config.timing.scan_delay_ms + config.timing.cooldown_ms + 200);

    let host = Arc::new(SimHost {
        frame: Mutex::new(Vec::new()),
        accept_label: config
            .actions
            .accept_labels
            .first()
            .cloned()
            .unwrap_or_else(|| "수락".to_string()),
        reject_label: config
            .actions
            .reject_labels
            .first()
            .cloned()
            .unwrap_or_else(|| "거절".to_string()),
    });

    let blacklist = GeofenceIndex::load(Box::new(FileAreaStore::new(FileAreaStore::default_path())));
    info!("Blacklist loaded with {} areas", blacklist.len());

    let engine = AutopilotEngine::new(
        Arc::new(RwLock::new(config)),
        Arc::new(RwLock::new(blacklist)),
        host.clone(),
    );

    let (event_tx, event_rx) = mpsc::channel::<ScreenEvent>(32);
    let engine_handle = tokio::spawn(engine.run(event_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut frame: Vec<String> = Vec::new();

    loop {
        let line = lines.next_line().await?;
        let flush = match &line {
            Some(l) if l.trim().is_empty() => !frame.is_empty(),
            Some(l) => {
                frame.push(l.to_string());
                false
            }
            None => !frame.is_empty(),
        };

        if flush {
            info!("[sim] presenting frame of {} lines", frame.len());
            *host.frame.lock().unwrap_or_else(|p| p.into_inner()) = std::mem::take(&mut frame);

            event_tx
                .send(ScreenEvent::new(
                    source_id.clone(),
                    ScreenEventKind::ContentChanged,
                ))
                .await?;

            // Give the debounce and cooldown time to play out so every
            // frame gets its scan
            tokio::time::sleep(frame_gap).await;
        }

        if line.is_none() {
            break;
        }
    }

    drop(event_tx);
    let stats = engine_handle.await?;

    info!(
        "Simulation done: {} scans, {} offers, {} accepted, {} rejected",
        stats.scans, stats.offers, stats.accepted, stats.rejected
    );
    Ok(())
}
