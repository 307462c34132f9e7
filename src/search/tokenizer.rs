//! Tokenizers for the two indexed content fields / 两个内容字段的分词器
//!
//! - standard: split on non-alphanumeric, lowercase (field `content`) / 标准分词
//! - white-space: split on white space only, case kept (field `content_ws`) / 空白分词

/// Standard tokenizer / 标准分词
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// White-space tokenizer / 空白分词
pub fn tokenize_ws(text: &str) -> Vec<String> {
    text.split_whitespace().map(|t| t.to_string()).collect()
}

/// Tokenize with the analyzer of the given field / 按字段分词
pub fn tokenize_field(field: &str, text: &str, ws_field: &str) -> Vec<String> {
    if field == ws_field {
        tokenize_ws(text)
    } else {
        tokenize(text)
    }
}

/// Remove query escaping backslashes / 去除查询转义
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
