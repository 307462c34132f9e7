//! Keyword lists / 关键字列表

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::Keyword;

/// Named keyword list / 命名关键字列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordList {
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

impl KeywordList {
    pub fn new(name: impl Into<String>, keywords: Vec<Keyword>) -> Self {
        let now = Utc::now();
        Self { name: name.into(), created: now, modified: now, keywords }
    }

    /// Match on the query string only / 仅按查询字符串匹配
    pub fn has_keyword(&self, query: &str) -> bool {
        self.keywords.iter().any(|k| k.query == query)
    }
}

/// All keyword lists of a session / 会话中的全部关键字列表
#[derive(Debug, Clone, Default)]
pub struct KeywordLists {
    lists: Vec<KeywordList>,
}

impl KeywordLists {
    pub fn new(lists: Vec<KeywordList>) -> Self {
        Self { lists }
    }

    pub fn lists(&self) -> &[KeywordList] {
        &self.lists
    }

    pub fn get(&self, name: &str) -> Option<&KeywordList> {
        self.lists.iter().find(|l| l.name == name)
    }

    /// Add or replace a list by name / 按名称添加或替换列表
    pub fn save(&mut self, mut list: KeywordList) {
        match self.lists.iter_mut().find(|l| l.name == list.name) {
            Some(existing) => {
                list.created = existing.created;
                list.modified = Utc::now();
                *existing = list;
            }
            None => self.lists.push(list),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.lists.len();
        self.lists.retain(|l| l.name != name);
        self.lists.len() != before
    }

    /// First list containing the keyword / 第一个包含该关键字的列表
    pub fn list_with_keyword(&self, query: &str) -> Option<&KeywordList> {
        self.lists.iter().find(|l| l.has_keyword(query))
    }
}
