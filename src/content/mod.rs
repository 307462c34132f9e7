//! Content model interface - read/identify access to evidence files / 内容模型接口
//!
//! The subsystem only references content, it never owns it / 本子系统只引用内容，不拥有内容
//! - identify: id, name, size, four timestamps / 标识信息
//! - read: async byte stream / 异步字节流
//! - resolve owning container (image) / 解析所属镜像

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use tokio::io::AsyncRead;

pub mod local;
pub mod memory;
pub mod strings;

pub use local::LocalContentModel;
pub use memory::MemoryContentModel;
pub use strings::extract_strings;

/// Upper bound on the ownership chain length / 所属链最大深度
const MAX_CHAIN_DEPTH: usize = 64;

/// File content item / 文件内容项
///
/// Equality and hashing use the id only / 相等与哈希仅比较 id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsContent {
    pub id: i64,
    pub name: String,
    /// Display path inside the image / 镜像内显示路径
    pub path: String,
    pub size: u64,
    /// Modification time (Unix timestamp) / 修改时间
    pub mtime: i64,
    /// Metadata change time / 元数据变更时间
    pub ctime: i64,
    /// Access time / 访问时间
    pub atime: i64,
    /// Creation time / 创建时间
    pub crtime: i64,
    /// Owning file system / 所属文件系统
    pub fs_id: i64,
}

impl PartialEq for FsContent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FsContent {}

impl Hash for FsContent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Node of the content ownership chain / 内容所属链节点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentNode {
    File(i64),
    FileSystem(i64),
    Volume(i64),
    VolumeSystem(i64),
    Image(i64),
}

/// Top-level container (disk image) / 顶层容器（磁盘镜像）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: i64,
    pub name: String,
    /// UTC offset of the image time zone (seconds) / 镜像时区偏移
    pub utc_offset_secs: i32,
}

impl ImageInfo {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), utc_offset_secs: 0 }
    }

    pub fn with_utc_offset(mut self, secs: i32) -> Self {
        self.utc_offset_secs = secs;
        self
    }

    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(utc_offset)
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Content model interface (provides only primitive operations) / 内容模型接口
#[async_trait]
pub trait ContentModel: Send + Sync {
    /// Look up content by id / 按 id 查找内容
    async fn content_by_id(&self, id: i64) -> Result<Option<FsContent>>;

    /// Open content reader / 打开内容读取器
    async fn open_reader(&self, content: &FsContent) -> Result<Box<dyn AsyncRead + Unpin + Send>>;

    /// Direct parent of a node in the ownership chain / 所属链中的直接父节点
    fn parent_of(&self, node: ContentNode) -> Option<ContentNode>;

    /// Image details / 镜像信息
    fn image(&self, id: i64) -> Option<ImageInfo>;

    /// Resolve the owning image of a file / 解析文件所属镜像
    fn owning_image(&self, content: &FsContent) -> Option<ImageInfo> {
        let mut node = ContentNode::File(content.id);
        for _ in 0..MAX_CHAIN_DEPTH {
            match node {
                ContentNode::Image(id) => return self.image(id),
                other => node = self.parent_of(other)?,
            }
        }
        tracing::warn!("Ownership chain of content {} is too deep", content.id);
        None
    }

    /// Time zone used to display this file's timestamps / 文件时间显示所用时区
    fn timezone_of(&self, content: &FsContent) -> FixedOffset {
        self.owning_image(content)
            .map(|image| image.timezone())
            .unwrap_or_else(utc_offset)
    }
}

/// Format a Unix timestamp in the given zone / 按时区格式化时间戳
pub fn format_time(secs: i64, tz: &FixedOffset) -> String {
    match DateTime::<Utc>::from_timestamp(secs, 0) {
        Some(dt) => dt.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "0000-00-00 00:00:00".to_string(),
    }
}

/// ISO-8601 UTC form used for index document fields / 索引字段使用的时间格式
pub fn index_time(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}
