use serde::{Deserialize, Serialize};

use super::models::WriterSummary;

/// 结果写入任务状态
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriterStatus {
    #[default]
    Created,
    Running,
    Completed,
    Cancelled,
}

impl WriterStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WriterStatus::Completed | WriterStatus::Cancelled)
    }
}

/// 写入进度事件（广播给订阅者）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WriterEvent {
    WriterStarted {
        writer_id: String,
        display_name: String,
        total_terms: usize,
        total_hits: usize,
    },
    WriterProgress {
        writer_id: String,
        term: String,
        processed_terms: usize,
        total_terms: usize,
    },
    WriterFinished { summary: WriterSummary },
}
