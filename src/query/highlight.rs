//! Highlight query for presenting a hit / 展示命中时使用的高亮查询

use super::{escape_lucene_query, KeywordQuery, MatchSet};
use crate::content::FsContent;

/// Build the highlight query of one matching file / 构造单个文件的高亮查询
///
/// - literal: the original query / 字面查询：原始查询
/// - regex with one term: that term / 单词项：该词项
/// - regex with several terms: the terms hitting this file, quoted and escaped, each after
///   the first prefixed with the terms field / 多词项：命中该文件的词项，加引号并转义
pub fn highlight_query(query: &KeywordQuery, matches: &MatchSet, content: &FsContent, terms_field: &str) -> String {
    if query.is_literal() {
        return query.query_string().to_string();
    }

    if matches.len() == 1 {
        return matches.terms().next().unwrap_or_default().to_string();
    }

    matches
        .terms_for(content)
        .into_iter()
        .map(|term| format!("\"{}\"", escape_lucene_query(term, true, false)))
        .collect::<Vec<_>>()
        .join(&format!(" {}:", terms_field))
}
