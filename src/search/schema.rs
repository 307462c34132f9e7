//! Index document schema definition / 索引文档 Schema 定义

use serde::{Deserialize, Serialize};

use crate::content::{index_time, FsContent};

/// Index document - field map derived from a content item / 索引文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Content id / 内容 id
    pub id: i64,
    /// File name / 文件名
    pub file_name: String,
    /// Change time / 变更时间
    pub ctime: String,
    /// Access time / 访问时间
    pub atime: String,
    /// Modification time / 修改时间
    pub mtime: String,
    /// Creation time / 创建时间
    pub crtime: String,
}

impl IndexDocument {
    /// Build the document from a content item / 从内容项生成文档
    pub fn from_content(content: &FsContent) -> Self {
        Self {
            id: content.id,
            file_name: content.name.clone(),
            ctime: index_time(content.ctime),
            atime: index_time(content.atime),
            mtime: index_time(content.mtime),
            crtime: index_time(content.crtime),
        }
    }

    /// Field name/value pairs, in submission order / 字段列表
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.to_string()),
            ("file_name", self.file_name.clone()),
            ("ctime", self.ctime.clone()),
            ("atime", self.atime.clone()),
            ("mtime", self.mtime.clone()),
            ("crtime", self.crtime.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_from_content() {
        let content = FsContent {
            id: 12,
            name: "report.pdf".into(),
            path: "/docs/report.pdf".into(),
            size: 2048,
            mtime: 86400,
            ctime: 0,
            atime: 0,
            crtime: 3600,
            fs_id: 1,
        };
        let doc = IndexDocument::from_content(&content);
        let fields = doc.fields();
        assert_eq!(fields[0], ("id", "12".to_string()));
        assert_eq!(fields[1], ("file_name", "report.pdf".to_string()));
        assert_eq!(doc.mtime, "1970-01-02T00:00:00Z");
        assert_eq!(doc.crtime, "1970-01-01T01:00:00Z");
    }
}
