//! Code-fence reassembly filter.
//!
//! Provider streams chop text at arbitrary byte positions, so a markdown
//! fence marker (```) can arrive split across two deltas. This filter
//! re-chunks the stream: every emitted unit is either plain text outside
//! any fence, or one complete fence span from opening marker to closing
//! marker. It never alters content — concatenating all emitted units (plus
//! the [`FenceFilter::finish`] flush) reproduces the input exactly.

const MARKER: &str = "```";

/// Stateful re-chunking filter for one stream session.
///
/// Feed each incoming delta to [`push`](FenceFilter::push) and forward the
/// returned units in order. Call [`finish`](FenceFilter::finish) when the
/// stream ends to flush whatever is still buffered (an unterminated fence
/// is surfaced verbatim rather than dropped).
#[derive(Debug, Default)]
pub struct FenceFilter {
    buffer: String,
}

impl FenceFilter {
    pub fn new() -> Self {
        FenceFilter {
            buffer: String::new(),
        }
    }

    /// Append one incoming delta and drain every unit that is now
    /// resolvable, in order.
    ///
    /// Plain text before an unterminated opening marker is flushed
    /// immediately; the fence body is withheld until its closing marker
    /// arrives. A single delta may close one fence and open another, so
    /// the scan loops until the buffer holds no further complete unit.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);
        let mut out = Vec::new();

        loop {
            let Some(open) = self.buffer.find(MARKER) else {
                // No marker. Emit everything except a trailing run of
                // backticks that could still grow into one.
                let keep = trailing_backtick_run(&self.buffer);
                let emit_to = self.buffer.len() - keep;
                if emit_to > 0 {
                    out.push(self.buffer[..emit_to].to_string());
                    self.buffer.drain(..emit_to);
                }
                break;
            };

            match self.buffer[open + MARKER.len()..].find(MARKER) {
                None => {
                    // Fence opened but not yet closed: the prefix cannot be
                    // part of the fence, so it goes out now.
                    if open > 0 {
                        out.push(self.buffer[..open].to_string());
                        self.buffer.drain(..open);
                    }
                    break;
                }
                Some(rel) => {
                    let close_end = open + MARKER.len() + rel + MARKER.len();
                    if open > 0 {
                        out.push(self.buffer[..open].to_string());
                    }
                    out.push(self.buffer[open..close_end].to_string());
                    self.buffer.drain(..close_end);
                }
            }
        }

        out
    }

    /// End of stream: flush any remainder verbatim.
    ///
    /// Malformed output from the model (an unbalanced fence) is surfaced
    /// as-is here, not corrected.
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }
}

/// Length of the run of backticks at the end of `s`.
///
/// In the no-marker branch this is at most 2, since three in a row would
/// have matched as a marker.
fn trailing_backtick_run(s: &str) -> usize {
    s.bytes().rev().take_while(|&b| b == b'`').count()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
