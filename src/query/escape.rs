//! Query escaping / 查询转义

/// Characters with a meaning in the index query syntax / 查询语法中的特殊字符
const LUCENE_SPECIAL: &[char] = &[
    '/', '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
];

/// Escape a string for use inside an index query / 转义查询字符串
///
/// - `escape_chars`: backslash-escape special characters / 反斜杠转义特殊字符
/// - `encode`: URL-encode the result / URL 编码结果
pub fn escape_lucene_query(query: &str, escape_chars: bool, encode: bool) -> String {
    let escaped = if escape_chars {
        let mut out = String::with_capacity(query.len() * 2);
        for c in query.chars() {
            if LUCENE_SPECIAL.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    } else {
        query.to_string()
    };

    if encode {
        urlencoding::encode(&escaped).into_owned()
    } else {
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_special_chars() {
        assert_eq!(escape_lucene_query("maytag", true, false), "maytag");
        assert_eq!(escape_lucene_query("a+b-c", true, false), r"a\+b\-c");
        assert_eq!(escape_lucene_query(r#"x:"y"\z"#, true, false), r#"x\:\"y\"\\z"#);
        assert_eq!(escape_lucene_query("(a|b)*?", true, false), r"\(a\|b\)\*\?");
    }

    #[test]
    fn test_encode() {
        assert_eq!(escape_lucene_query("a b", false, true), "a%20b");
        assert_eq!(escape_lucene_query("a:b", true, true), "a%5C%3Ab");
        assert_eq!(escape_lucene_query("a:b", false, false), "a:b");
    }
}
