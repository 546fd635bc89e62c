//! Incremental OSC (Operating System Command) scanner.
//!
//! Terminal output arrives in arbitrarily split chunks, so an escape sequence
//! can start at the end of one chunk and finish in the next. [`OscScanner`]
//! keeps the partial state between calls and yields complete OSC payloads
//! (the bytes between `ESC ]` and the `BEL` / `ESC \` terminator).
//!
//! The scanner only observes the stream; it never strips or rewrites bytes.

/// Payloads longer than this are discarded. Shell-integration markers are
/// tiny; anything larger is an image or clipboard transfer we do not decode.
pub const MAX_OSC_LEN: usize = 4096;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;
const CAN: u8 = 0x18;
const SUB: u8 = 0x1a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Ground,
    Escape,
    Osc,
    OscEscape,
}

/// Stateful OSC payload extractor
#[derive(Debug)]
pub struct OscScanner {
    state: ScanState,
    buffer: Vec<u8>,
    /// Set when the current payload exceeded `MAX_OSC_LEN`
    overflowed: bool,
}

impl Default for OscScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl OscScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Ground,
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Whether the scanner is in the middle of an escape sequence
    pub fn is_mid_sequence(&self) -> bool {
        self.state != ScanState::Ground
    }

    /// Drop any partial sequence.
    pub fn reset(&mut self) {
        self.state = ScanState::Ground;
        self.buffer.clear();
        self.overflowed = false;
    }

    /// Feed a chunk of output and return the OSC payloads it completed.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.feed_indexed(data)
            .into_iter()
            .map(|(_, payload)| payload)
            .collect()
    }

    /// Like [`feed`](Self::feed), pairing each payload with the offset in
    /// `data` just past its terminator.
    pub fn feed_indexed(&mut self, data: &[u8]) -> Vec<(usize, Vec<u8>)> {
        let mut completed = Vec::new();

        for (offset, &byte) in data.iter().enumerate() {
            let end = offset + 1;
            match self.state {
                ScanState::Ground => {
                    if byte == ESC {
                        self.state = ScanState::Escape;
                    }
                }
                ScanState::Escape => self.after_escape(byte),
                ScanState::Osc => match byte {
                    BEL => self.finish(end, &mut completed),
                    ESC => self.state = ScanState::OscEscape,
                    CAN | SUB => self.reset(),
                    _ => self.push(byte),
                },
                ScanState::OscEscape => {
                    if byte == b'\\' {
                        self.finish(end, &mut completed);
                    } else {
                        // Unterminated OSC: the ESC starts a new sequence
                        log::trace!("Discarding unterminated OSC ({} bytes)", self.buffer.len());
                        self.buffer.clear();
                        self.overflowed = false;
                        self.after_escape(byte);
                    }
                }
            }
        }

        completed
    }

    fn after_escape(&mut self, byte: u8) {
        self.state = match byte {
            b']' => {
                self.buffer.clear();
                self.overflowed = false;
                ScanState::Osc
            }
            ESC => ScanState::Escape,
            _ => ScanState::Ground,
        };
    }

    fn push(&mut self, byte: u8) {
        if self.buffer.len() >= MAX_OSC_LEN {
            self.overflowed = true;
            return;
        }
        self.buffer.push(byte);
    }

    fn finish(&mut self, end: usize, completed: &mut Vec<(usize, Vec<u8>)>) {
        if self.overflowed {
            log::trace!("Dropping oversized OSC payload");
        } else {
            completed.push((end, std::mem::take(&mut self.buffer)));
        }
        self.reset();
    }
}
