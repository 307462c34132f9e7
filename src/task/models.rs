use std::sync::atomic::{AtomicBool, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::types::WriterStatus;
use crate::blackboard::Artifact;

/// 写入任务控制标志（协作式取消）与当前状态
#[derive(Debug, Default)]
pub struct WriterControl {
    cancelled: AtomicBool,
    status: RwLock<WriterStatus>,
}

impl WriterControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn status(&self) -> WriterStatus {
        *self.status.read()
    }

    /// 终态不会被覆盖
    pub fn set_status(&self, status: WriterStatus) {
        let mut current = self.status.write();
        if !current.is_terminal() {
            *current = status;
        }
    }
}

/// 写入任务结果
#[derive(Debug, Clone)]
pub struct WriterOutcome {
    pub writer_id: String,
    pub status: WriterStatus,
    /// 已写入的结果
    pub artifacts: Vec<Artifact>,
    /// 因索引不可用而提前结束
    pub aborted: bool,
    /// 是否已向宿主发送通知
    pub notified: bool,
}

/// 轻量级写入任务信息（用于事件推送）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterSummary {
    pub writer_id: String,
    pub display_name: String,
    pub status: WriterStatus,
    pub total_terms: usize,
    pub processed_terms: usize,
    pub artifact_count: usize,
    pub aborted: bool,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_cancel() {
        let control = WriterControl::new();
        assert!(!control.is_cancelled());
        control.cancel();
        control.cancel();
        assert!(control.is_cancelled());
    }

    #[test]
    fn test_status_transitions() {
        let control = WriterControl::new();
        assert_eq!(control.status(), WriterStatus::Created);
        control.set_status(WriterStatus::Running);
        assert_eq!(control.status(), WriterStatus::Running);
        control.set_status(WriterStatus::Cancelled);
        control.set_status(WriterStatus::Running);
        assert_eq!(control.status(), WriterStatus::Cancelled);
    }

    #[test]
    fn test_summary_serialization() {
        let summary = WriterSummary {
            writer_id: "w1".into(),
            display_name: "Saving results: maytag".into(),
            status: WriterStatus::Cancelled,
            total_terms: 2,
            processed_terms: 1,
            artifact_count: 0,
            aborted: false,
            created_at: Utc::now(),
            finished_at: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "cancelled");
    }
}
