//! Term to matching content mapping / 词项到匹配内容的映射

use std::collections::{BTreeMap, HashSet};

use crate::content::FsContent;

/// Result of one query execution / 单次查询结果
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    hits: BTreeMap<String, Vec<FsContent>>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the items of a term, duplicates dropped / 添加词项的匹配内容（去重）
    pub fn insert(&mut self, term: impl Into<String>, items: impl IntoIterator<Item = FsContent>) {
        let entry = self.hits.entry(term.into()).or_default();
        let mut seen: HashSet<i64> = entry.iter().map(|c| c.id).collect();
        for item in items {
            if seen.insert(item.id) {
                entry.push(item);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.hits.keys().map(|t| t.as_str())
    }

    pub fn get(&self, term: &str) -> Option<&[FsContent]> {
        self.hits.get(term).map(|items| items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FsContent])> {
        self.hits.iter().map(|(t, items)| (t.as_str(), items.as_slice()))
    }

    /// Terms that matched this item / 匹配该内容的词项
    pub fn terms_for(&self, content: &FsContent) -> Vec<&str> {
        self.iter()
            .filter(|(_, items)| items.contains(content))
            .map(|(term, _)| term)
            .collect()
    }

    /// Distinct items over all terms, in term order / 所有词项的不重复内容
    pub fn distinct_contents(&self) -> Vec<FsContent> {
        let mut seen = HashSet::new();
        self.hits
            .values()
            .flatten()
            .filter(|c| seen.insert(c.id))
            .cloned()
            .collect()
    }

    /// Total number of (term, item) pairs / (词项, 内容) 对总数
    pub fn hit_count(&self) -> usize {
        self.hits.values().map(|items| items.len()).sum()
    }
}
