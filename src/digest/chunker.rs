//! Greedy packing of per-user blocks into messages.

pub const SEPARATOR: &str = "\n\n";

/// Pack `blocks` in order, joining with [`SEPARATOR`], so that no message
/// exceeds `limit` characters. A block that cannot fit even on its own is
/// dropped.
pub fn chunk(blocks: Vec<String>, limit: usize) -> Vec<String> {
    let separator_len = SEPARATOR.chars().count();
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for block in blocks {
        let len = block.chars().count();
        if len > limit {
            tracing::warn!(
                "Dropping a block of {} characters, over the {} character limit",
                len,
                limit
            );
            continue;
        }

        if current.is_empty() {
            current = block;
            current_len = len;
        } else if current_len + separator_len + len <= limit {
            current.push_str(SEPARATOR);
            current.push_str(&block);
            current_len += separator_len + len;
        } else {
            chunks.push(std::mem::replace(&mut current, block));
            current_len = len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
