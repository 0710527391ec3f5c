use bytes::{BufMut, BytesMut};

/// Line terminator used on the wire in both directions.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Initial capacity of a [`LineBuffer`].
pub const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// One extracted inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A command with trailing CR/LF removed.
    Command(String),
    /// A line that was empty once CR/LF were trimmed.
    Blank,
}

/// Encode a payload as one wire frame.
///
/// Wire format:
/// ```text
/// ┌──────────────────────────┬──────┐
/// │ Payload (UTF-8 text)     │ '\n' │
/// └──────────────────────────┴──────┘
/// ```
///
/// The terminator is appended only when the payload does not already end
/// with one. Embedded newlines are not escaped; structured payloads must be
/// serialized so none remain.
pub fn encode_line(payload: &str, dst: &mut BytesMut) {
    let bytes = payload.as_bytes();
    let needs_terminator = bytes.last() != Some(&LINE_TERMINATOR);
    dst.reserve(bytes.len() + usize::from(needs_terminator));
    dst.put_slice(bytes);
    if needs_terminator {
        dst.put_u8(LINE_TERMINATOR);
    }
}

/// Extract the first complete line from `src`.
///
/// Returns `None` and leaves `src` untouched if no terminator has arrived
/// yet. Otherwise consumes the line and its terminator.
pub fn decode_line(src: &mut BytesMut) -> Option<Line> {
    let newline = src.iter().position(|&b| b == LINE_TERMINATOR)?;
    let raw = src.split_to(newline + 1);

    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\r' | b'\n') {
        end -= 1;
    }

    if end == 0 {
        return Some(Line::Blank);
    }
    Some(Line::Command(
        String::from_utf8_lossy(&raw[..end]).into_owned(),
    ))
}

/// Residual buffer for inbound bytes that have not formed a line yet.
///
/// Bytes are appended as they are read and split off the front as lines
/// complete, so partial input survives across polls.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append newly read bytes. Does not parse.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extract the next complete line, blank or not.
    pub fn try_extract_one(&mut self) -> Option<Line> {
        decode_line(&mut self.buf)
    }

    /// Extract the next non-blank command, discarding blank lines on the way.
    pub fn next_command(&mut self) -> Option<String> {
        loop {
            match self.try_extract_one()? {
                Line::Command(command) => return Some(command),
                Line::Blank => continue,
            }
        }
    }

    /// Whether a terminator is buffered.
    pub fn has_complete_line(&self) -> bool {
        self.buf.contains(&LINE_TERMINATOR)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop everything buffered, including any partial line.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
