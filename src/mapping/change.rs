//! Change detection for sampled channels
//!
//! Turns a continuously sampled value into a sparse stream: a value is only
//! emitted when it differs from the last one emitted on the same channel.

use crate::config::ChannelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Sent(u8),
    /// The last send failed; downstream state is unknown
    Stale,
}

/// Last emitted value per channel, keyed directly by [`ChannelId`]
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    last: [Slot; ChannelId::COUNT],
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self {
            last: [Slot::Sent(0); ChannelId::COUNT],
        }
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `value` should go out on `channel`; commits it if so
    pub fn should_emit(&mut self, channel: ChannelId, value: u8) -> bool {
        let slot = &mut self.last[channel.index()];
        if *slot == Slot::Sent(value) {
            return false;
        }
        *slot = Slot::Sent(value);
        true
    }

    /// Commit a value emitted without going through [`Self::should_emit`]
    pub fn record(&mut self, channel: ChannelId, value: u8) {
        self.last[channel.index()] = Slot::Sent(value);
    }

    /// Force the next sample of `channel` to be emitted
    pub fn mark_stale(&mut self, channel: ChannelId) {
        self.last[channel.index()] = Slot::Stale;
    }

    /// Last value emitted on `channel`, `None` when stale
    pub fn last_sent(&self, channel: ChannelId) -> Option<u8> {
        match self.last[channel.index()] {
            Slot::Sent(value) => Some(value),
            Slot::Stale => None,
        }
    }

    /// Channels that may still be non-zero downstream
    pub fn engaged(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.last
            .iter()
            .enumerate()
            .filter(|(_, slot)| !matches!(slot, Slot::Sent(0)))
            .filter_map(|(index, _)| u8::try_from(index).ok().and_then(ChannelId::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(id: u8) -> ChannelId {
        ChannelId::new(id).unwrap()
    }

    #[test]
    fn test_initial_zero_is_not_emitted() {
        let mut detector = ChangeDetector::new();
        assert!(!detector.should_emit(ch(1), 0));
        assert_eq!(detector.last_sent(ch(1)), Some(0));
    }

    #[test]
    fn test_emits_each_transition_once() {
        let mut detector = ChangeDetector::new();
        assert!(detector.should_emit(ch(1), 63));
        assert!(!detector.should_emit(ch(1), 63));
        assert!(detector.should_emit(ch(1), 64));
        assert!(detector.should_emit(ch(1), 0));
        assert!(!detector.should_emit(ch(1), 0));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut detector = ChangeDetector::new();
        assert!(detector.should_emit(ch(1), 10));
        assert!(detector.should_emit(ch(2), 10));
        assert!(!detector.should_emit(ch(1), 10));
        assert_eq!(detector.last_sent(ch(3)), Some(0));
    }

    #[test]
    fn test_no_consecutive_duplicates_over_random_walk() {
        let mut detector = ChangeDetector::new();
        let samples = [0u8, 0, 5, 5, 5, 7, 0, 0, 127, 127, 126, 0];
        let mut accepted = Vec::new();
        for value in samples {
            if detector.should_emit(ch(9), value) {
                accepted.push(value);
            }
        }
        assert_eq!(accepted, vec![5, 7, 0, 127, 126, 0]);
        assert!(accepted.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_stale_channel_is_resent() {
        let mut detector = ChangeDetector::new();
        assert!(detector.should_emit(ch(4), 40));
        detector.mark_stale(ch(4));
        assert_eq!(detector.last_sent(ch(4)), None);
        assert!(detector.should_emit(ch(4), 40));
        assert!(!detector.should_emit(ch(4), 40));
    }

    #[test]
    fn test_engaged_lists_nonzero_and_stale() {
        let mut detector = ChangeDetector::new();
        detector.record(ch(20), 127);
        detector.record(ch(5), 31);
        detector.record(ch(6), 0);
        detector.mark_stale(ch(70));
        let engaged: Vec<u8> = detector.engaged().map(ChannelId::get).collect();
        assert_eq!(engaged, vec![5, 20, 70]);
    }
}
