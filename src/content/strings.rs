//! Printable string extraction for content the index cannot parse / 不可解析内容的可打印字符串提取

/// Default minimum run length / 默认最短长度
pub const DEFAULT_MIN_LEN: usize = 4;

/// Extract printable ASCII runs of at least `min_len` chars, one per line / 提取可打印 ASCII 串，每行一个
pub fn extract_strings(data: &[u8], min_len: usize) -> String {
    let min_len = min_len.max(1);
    let mut out = String::new();
    let mut run = String::new();

    for &b in data {
        if b == b'\t' || (0x20..0x7f).contains(&b) {
            run.push(b as char);
            continue;
        }
        flush_run(&mut out, &mut run, min_len);
    }
    flush_run(&mut out, &mut run, min_len);

    out
}

fn flush_run(out: &mut String, run: &mut String, min_len: usize) {
    if run.len() >= min_len {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(run);
    }
    run.clear();
}
