//! Directional pad tracking
//!
//! The pad has exactly one active direction at a time (or centre). A move
//! switches the old direction off before switching the new one on, so
//! downstream consumers never see two directions held at once.

use crate::config::DpadChannels;
use crate::controller::HatDirection;
use crate::output::CcMessage;
use tracing::debug;

/// Messages produced by one pad motion, in send order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HatTransition {
    pub off: Option<CcMessage>,
    pub on: Option<CcMessage>,
}

impl HatTransition {
    pub fn messages(&self) -> impl Iterator<Item = CcMessage> {
        self.off.into_iter().chain(self.on)
    }

    pub fn is_empty(&self) -> bool {
        self.off.is_none() && self.on.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct HatTracker {
    channels: DpadChannels,
    // Starts centred regardless of what the hardware reports at rest
    current: HatDirection,
}

impl HatTracker {
    pub fn new(channels: DpadChannels) -> Self {
        Self {
            channels,
            current: HatDirection::Center,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> HatDirection {
        self.current
    }

    /// Move to `direction` and return what has to be sent
    pub fn on_motion(&mut self, direction: HatDirection) -> HatTransition {
        if direction == self.current {
            debug!("D-pad already {}, nothing to send", direction);
            return HatTransition::default();
        }

        let transition = HatTransition {
            off: self.channels.get(self.current).map(CcMessage::off),
            on: self.channels.get(direction).map(CcMessage::on),
        };
        debug!("D-pad {} -> {}", self.current, direction);
        self.current = direction;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelMap;

    fn tracker() -> HatTracker {
        HatTracker::new(ChannelMap::default().dpad)
    }

    fn sent(t: HatTransition) -> Vec<(u8, u8)> {
        t.messages().map(|m| (m.channel.get(), m.value)).collect()
    }

    #[test]
    fn test_starts_centered() {
        assert_eq!(tracker().current(), HatDirection::Center);
    }

    #[test]
    fn test_center_to_direction_only_turns_on() {
        let mut hat = tracker();
        assert_eq!(sent(hat.on_motion(HatDirection::North)), vec![(70, 127)]);
        assert_eq!(hat.current(), HatDirection::North);
    }

    #[test]
    fn test_direction_change_turns_old_off_first() {
        let mut hat = tracker();
        hat.on_motion(HatDirection::North);
        assert_eq!(
            sent(hat.on_motion(HatDirection::East)),
            vec![(70, 0), (73, 127)]
        );
    }

    #[test]
    fn test_release_to_center_only_turns_off() {
        let mut hat = tracker();
        hat.on_motion(HatDirection::SouthWest);
        assert_eq!(sent(hat.on_motion(HatDirection::Center)), vec![(77, 0)]);
        assert_eq!(hat.current(), HatDirection::Center);
    }

    #[test]
    fn test_self_transition_is_silent() {
        let mut hat = tracker();
        hat.on_motion(HatDirection::West);
        assert!(hat.on_motion(HatDirection::West).is_empty());
        assert!(tracker().on_motion(HatDirection::Center).is_empty());
    }

    #[test]
    fn test_every_move_between_directions_is_a_pair() {
        for from in HatDirection::ALL {
            for to in HatDirection::ALL {
                if from == to {
                    continue;
                }
                let mut hat = tracker();
                hat.on_motion(from);
                let msgs: Vec<CcMessage> = hat.on_motion(to).messages().collect();
                assert_eq!(msgs.len(), 2);
                assert_eq!(msgs[0].value, 0);
                assert_eq!(Some(msgs[0].channel), ChannelMap::default().dpad.get(from));
                assert_eq!(msgs[1].value, 127);
                assert_eq!(Some(msgs[1].channel), ChannelMap::default().dpad.get(to));
            }
        }
    }
}
