//! Annotation store - typed records attached to content / 标注存储
//!
//! - `AnnotationStore`: create artifacts and append attributes / 创建结果并追加属性
//! - `MemoryBlackboard`: in-process store / 进程内实现
//! - `KeywordHit`: read a keyword-hit artifact back / 读取关键字命中结果

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::MemoryBlackboard;

/// Artifact kind / 结果类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    KeywordHit,
}

/// Attribute kind / 属性类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Matched term / 匹配词项
    Keyword,
    /// Keyword list name / 关键字列表名
    KeywordSet,
    /// Preview snippet / 预览片段
    KeywordPreview,
    /// Original pattern, empty for literal queries / 原始模式（字面查询为空）
    KeywordRegexp,
}

/// Typed attribute value / 属性值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub attr_type: AttributeType,
    /// Module that produced the value / 产生该值的模块
    pub module: String,
    pub value: String,
}

impl Attribute {
    pub fn new(attr_type: AttributeType, module: impl Into<String>, value: impl Into<String>) -> Self {
        Self { attr_type, module: module.into(), value: value.into() }
    }
}

/// Record attached to a content item / 附加在内容上的结果记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: i64,
    pub artifact_type: ArtifactType,
    pub content_id: i64,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Artifact {
    pub fn attribute(&self, attr_type: AttributeType) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.attr_type == attr_type)
            .map(|a| a.value.as_str())
    }
}

/// Annotation store interface / 标注存储接口
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Create an empty artifact on a content item / 在内容上创建空结果
    async fn create_artifact(&self, content_id: i64, artifact_type: ArtifactType) -> Result<Artifact>;

    /// Append attributes to an artifact / 追加属性
    async fn add_attributes(&self, artifact_id: i64, attributes: Vec<Attribute>) -> Result<()>;

    /// Delete an artifact whose attributes could not be written / 删除属性写入失败的结果
    async fn remove_artifact(&self, artifact_id: i64) -> Result<()>;

    /// Artifacts attached to a content item / 内容上的所有结果
    async fn artifacts_for(&self, content_id: i64) -> Result<Vec<Artifact>>;
}

/// Keyword hit read back from an artifact / 关键字命中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordHit {
    pub content_id: i64,
    pub keyword: String,
    pub list_name: String,
    pub preview: String,
    pub pattern: String,
}

impl KeywordHit {
    /// None if the artifact is not a keyword hit / 非关键字命中时返回 None
    pub fn from_artifact(artifact: &Artifact) -> Option<Self> {
        if artifact.artifact_type != ArtifactType::KeywordHit {
            return None;
        }
        let value = |t| artifact.attribute(t).unwrap_or_default().to_string();
        Some(Self {
            content_id: artifact.content_id,
            keyword: artifact.attribute(AttributeType::Keyword)?.to_string(),
            list_name: value(AttributeType::KeywordSet),
            preview: value(AttributeType::KeywordPreview),
            pattern: value(AttributeType::KeywordRegexp),
        })
    }

    pub fn is_regex(&self) -> bool {
        !self.pattern.is_empty()
    }
}
