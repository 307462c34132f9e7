//! Extension filter - which files are sent to the extractor / 扩展名过滤

/// Suffixes the content extractor handles / 可抽取内容的文件后缀
pub const INGESTIBLE_EXTENSIONS: &[&str] = &[
    // archives / 压缩包
    "tar", "jar", "zip", "gzip", "bzip2", "gz", "tgz",
    // office / 办公文档
    "odf", "doc", "xls", "ppt", "rtf", "pdf",
    // text / 文本
    "html", "htm", "xhtml", "txt", "log", "manifest",
    // images / 图片
    "bmp", "gif", "png", "jpeg", "tiff",
    // audio / 音频
    "mp3", "aiff", "au", "midi", "wav",
    // other / 其他
    "pst", "xml", "class", "dwg",
];

/// Check whether a file name is ingestible / 检查文件名是否可索引
///
/// Plain suffix match on the lower-cased name, no dot required / 小写后缀匹配，不要求点号
pub fn is_ingestible(name: &str) -> bool {
    let lower = name.to_lowercase();
    INGESTIBLE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
