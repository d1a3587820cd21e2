use crate::combat_log::{CombatEvent, LineOutcome, LogParser, TokenizeError};
use crate::registry::Registry;
use encoding_rs::UTF_8;
use memchr::memchr;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenizerStats {
    /// Lines read so far, blank ones included.
    pub total_lines: u64,
    /// Non-blank lines that could not be parsed.
    pub skipped_lines: u64,
    pub event_count: u64,
}

impl TokenizerStats {
    pub fn skipped_ratio(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            self.skipped_lines as f64 / self.total_lines as f64
        }
    }
}

/// Lazy event stream over the bytes of one upload.
///
/// Lines are located with `memchr` and decoded one at a time, so the upload
/// may be a memory map. Construct a new tokenizer to start over.
pub struct Tokenizer<'a> {
    bytes: &'a [u8],
    pos: usize,
    parser: LogParser<'a>,
    stats: TokenizerStats,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(
        bytes: &'a [u8],
        registry: &'a Registry,
        max_file_size_bytes: u64,
    ) -> Result<Self, TokenizeError> {
        let size = bytes.len() as u64;
        if size > max_file_size_bytes {
            return Err(TokenizeError::TooLarge {
                size,
                limit: max_file_size_bytes,
            });
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(TokenizeError::EmptyInput);
        }

        Ok(Self {
            bytes,
            pos: 0,
            parser: LogParser::new(registry),
            stats: TokenizerStats::default(),
            cancel: None,
        })
    }

    /// Stop yielding events once `flag` is set.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let rest = &self.bytes[self.pos..];
        let line = match memchr(b'\n', rest) {
            Some(end) => {
                self.pos += end + 1;
                &rest[..end]
            }
            None => {
                self.pos = self.bytes.len();
                rest
            }
        };
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = CombatEvent;

    fn next(&mut self) -> Option<CombatEvent> {
        loop {
            if self.is_cancelled() {
                return None;
            }
            let raw = self.next_line()?;
            self.stats.total_lines += 1;

            let (line, _, _) = UTF_8.decode(raw);
            match self.parser.parse_line(self.stats.total_lines, &line) {
                LineOutcome::Event(event) => {
                    self.stats.event_count += 1;
                    return Some(event);
                }
                LineOutcome::Blank => {}
                LineOutcome::Malformed => {
                    self.stats.skipped_lines += 1;
                    tracing::trace!(line = self.stats.total_lines, "skipping malformed line");
                }
            }
        }
    }
}
