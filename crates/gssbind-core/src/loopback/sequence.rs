use crate::status::{GSS_S_DUPLICATE_TOKEN, GSS_S_GAP_TOKEN, GSS_S_OLD_TOKEN, GSS_S_UNSEQ_TOKEN};

const WINDOW: u128 = 64;

/// Receive-side sequence tracking for per-message tokens.
///
/// Produces supplementary status bits only; a token is never rejected for
/// its sequence number. Replay detection reports duplicates, sequencing
/// reports gaps and late tokens.
#[derive(Debug)]
pub(super) struct SequenceWindow {
    replay: bool,
    sequence: bool,
    /// Next expected sequence number; one past `u64::MAX` once that arrives.
    next: u128,
    /// Bit `i` set: `next - 1 - i` has been seen.
    seen: u64,
}
impl SequenceWindow {
    pub fn new(replay: bool, sequence: bool) -> Self {
        Self {
            replay,
            sequence,
            next: 0,
            seen: 0,
        }
    }

    pub fn check(&mut self, seq: u64) -> u32 {
        if !self.replay && !self.sequence {
            return 0;
        }
        let seq = u128::from(seq);
        if seq >= self.next {
            let advance = seq - self.next + 1;
            self.seen = if advance >= WINDOW { 0 } else { self.seen << advance };
            self.seen |= 1;
            let gap = seq != self.next;
            self.next = seq + 1;
            return if gap && self.sequence { GSS_S_GAP_TOKEN } else { 0 };
        }
        let age = self.next - 1 - seq;
        if age >= WINDOW {
            return GSS_S_OLD_TOKEN;
        }
        let bit = 1u64 << age;
        if self.seen & bit != 0 {
            return if self.replay { GSS_S_DUPLICATE_TOKEN } else { 0 };
        }
        self.seen |= bit;
        if self.sequence {
            GSS_S_UNSEQ_TOKEN
        } else {
            0
        }
    }
}
