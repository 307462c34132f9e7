//! Host notification bus / 宿主通知总线

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::blackboard::{Artifact, ArtifactType};

/// New artifacts produced by a module / 模块产生的新结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDataEvent {
    pub module: String,
    pub artifact_type: ArtifactType,
    pub artifacts: Vec<Artifact>,
}

/// Fire-and-forget event sink / 事件接收端（发出即忘）
pub trait EventSink: Send + Sync {
    fn fire(&self, event: ServiceDataEvent);
}

/// Broadcast sink, any number of subscribers / 广播事件接收端
#[derive(Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<ServiceDataEvent>,
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events / 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceDataEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn fire(&self, event: ServiceDataEvent) {
        tracing::debug!("{} new {:?} artifacts from {}", event.artifacts.len(), event.artifact_type, event.module);
        // No subscribers is fine / 没有订阅者也无妨
        let _ = self.sender.send(event);
    }
}
