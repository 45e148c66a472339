//! Incremental server-sent-events parsing shared by completion adapters.

/// Accumulates raw body chunks and yields complete `data:` payloads.
///
/// Upstreams flush frames at arbitrary byte boundaries, so a chunk may end
/// mid-line or mid-codepoint; bytes stay buffered until a newline arrives
/// and only complete lines are decoded. Comment lines and non-`data`
/// fields are dropped.
#[derive(Debug, Default)]
pub(crate) struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Feed one body chunk and drain every completed `data:` payload.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(payload) = line.strip_prefix("data:") {
                payloads.push(payload.trim_start().to_owned());
            }
        }
        payloads
    }
}

/// Compact single-line preview of an upstream error body.
pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
