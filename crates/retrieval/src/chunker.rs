//! Line-greedy chunking of corpus text.
//!
//! Lines are trimmed and packed into a running buffer. The buffer is flushed
//! on blank lines and whenever the next line would push it past the target
//! size. Sizes are measured in characters. A single line longer than the
//! target is never split.

/// Default target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Split `text` into chunks of roughly `target_size` characters.
///
/// Returns an empty vector for empty or whitespace-only input.
pub fn chunk(text: &str, target_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for raw in text.split('\n') {
        let line = raw.trim();

        if line.is_empty() {
            if !buf.is_empty() {
                chunks.push(std::mem::take(&mut buf));
                buf_len = 0;
            }
            continue;
        }

        let line_len = line.chars().count();

        if !buf.is_empty() && buf_len + line_len + 1 > target_size {
            chunks.push(std::mem::take(&mut buf));
            buf_len = 0;
        }

        if !buf.is_empty() {
            buf.push(' ');
            buf_len += 1;
        }
        buf.push_str(line);
        buf_len += line_len;
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}
