use std::collections::VecDeque;
use std::time::Instant;

/// Severity bucket produced by the (external, out-of-crate) moderation classifier for one
/// message. `ChatHistory` only reacts to the bucket, never the text itself.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Moderation {
    Clean,
    Censored,
    Severe,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChatVerdict {
    Allow,
    Block,
}

const RECENT_LENGTH_WINDOW: usize = 6;
const FREQUENCY_BLOCK_THRESHOLD: f32 = 10.0;
const INAPPROPRIATE_RATIO_THRESHOLD: f32 = 0.20;
const INAPPROPRIATE_MIN_COUNT: f32 = 3.0;
const REPETITION_BLOCK_THRESHOLD: u32 = 4;

/// A rolling spam/abuse throttle, one per player. Counters fade continuously with elapsed time
/// rather than resetting on a fixed window, so a quiet player's history cools off gradually.
pub struct ChatHistory {
    total: f32,
    inappropriate: f32,
    last_update: Instant,
    recent_lengths: VecDeque<usize>,
}

impl ChatHistory {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            total: 0.0,
            inappropriate: 0.0,
            last_update: now,
            recent_lengths: VecDeque::with_capacity(RECENT_LENGTH_WINDOW),
        }
    }

    fn fade(&mut self, now: Instant) {
        let elapsed = (now - self.last_update).as_secs_f32().max(0.0);
        self.last_update = now;
        if elapsed == 0.0 {
            return;
        }
        // a history with a low inappropriate ratio fades faster: being clean earns faster
        // forgiveness, being dirty keeps the record "hot" for longer.
        let ratio = if self.total > 0.0 { self.inappropriate / self.total } else { 0.0 };
        let decay_per_second = 0.35 - 0.25 * ratio;
        let factor = (-decay_per_second * elapsed).exp();
        self.total *= factor;
        self.inappropriate *= factor;
    }

    fn repeated_length_count(&self, length: usize) -> u32 {
        self.recent_lengths.iter().filter(|&&l| l.abs_diff(length) <= 1).count() as u32
    }

    /// Records one message and returns whether it should actually be delivered.
    pub fn record(&mut self, message_len: usize, moderation: Moderation, now: Instant) -> ChatVerdict {
        self.fade(now);

        self.total += 1.0;
        if moderation != Moderation::Clean {
            self.inappropriate += 1.0;
        }

        let repetition = self.repeated_length_count(message_len);
        if self.recent_lengths.len() == RECENT_LENGTH_WINDOW {
            self.recent_lengths.pop_front();
        }
        self.recent_lengths.push_back(message_len);

        let frequency_fires = self.total >= FREQUENCY_BLOCK_THRESHOLD;
        let inappropriate_fires =
            self.inappropriate >= INAPPROPRIATE_MIN_COUNT && self.inappropriate / self.total > INAPPROPRIATE_RATIO_THRESHOLD;
        let repetition_fires = repetition >= REPETITION_BLOCK_THRESHOLD;

        if moderation == Moderation::Severe || frequency_fires || inappropriate_fires || repetition_fires {
            ChatVerdict::Block
        } else {
            ChatVerdict::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_messages_are_allowed() {
        let mut history = ChatHistory::new(Instant::now());
        let now = Instant::now();
        assert_eq!(history.record(20, Moderation::Clean, now), ChatVerdict::Allow);
    }

    #[test]
    fn severe_message_always_blocks() {
        let mut history = ChatHistory::new(Instant::now());
        assert_eq!(history.record(5, Moderation::Severe, Instant::now()), ChatVerdict::Block);
    }

    #[test]
    fn high_frequency_eventually_blocks() {
        let mut history = ChatHistory::new(Instant::now());
        let now = Instant::now();
        let mut last = ChatVerdict::Allow;
        for i in 0..12 {
            last = history.record(8 + i, Moderation::Clean, now);
        }
        assert_eq!(last, ChatVerdict::Block);
    }

    #[test]
    fn repeated_identical_length_blocks() {
        let mut history = ChatHistory::new(Instant::now());
        let now = Instant::now();
        let mut last = ChatVerdict::Allow;
        for _ in 0..6 {
            last = history.record(42, Moderation::Clean, now);
        }
        assert_eq!(last, ChatVerdict::Block);
    }
}
