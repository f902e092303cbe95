//! Adapter settings and channel assignment tables
//!
//! Settings come from [`AdapterSettings::default`] with optional environment
//! overrides. The channel tables are static; [`ChannelMap::validate`] must
//! pass before the poll loop starts, since every tracker relies on no two
//! controls sharing a channel.

use crate::controller::{HatDirection, JoystickType, StickDirection, TriggerType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_PORT: &str = "GAMEPAD_MIDI_PORT";
pub const ENV_DEADZONE: &str = "GAMEPAD_MIDI_DEADZONE";
pub const ENV_RATE_HZ: &str = "GAMEPAD_MIDI_RATE_HZ";
pub const ENV_CHANNEL: &str = "GAMEPAD_MIDI_CHANNEL";
pub const ENV_SWEEP: &str = "GAMEPAD_MIDI_SWEEP";
pub const ENV_ON_SEND_FAILURE: &str = "GAMEPAD_MIDI_ON_SEND_FAILURE";

// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Channel {channel} is assigned to both {first} and {second}")]
    DuplicateChannel {
        channel: ChannelId,
        first: Control,
        second: Control,
    },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Address of one control in the output message space (0-127)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelId(u8);

impl ChannelId {
    pub const MAX: u8 = 127;
    pub const COUNT: usize = Self::MAX as usize + 1;

    pub fn new(id: u8) -> Option<Self> {
        (id <= Self::MAX).then_some(Self(id))
    }

    /// For the built-in tables; fails at compile time when used in a const
    pub const fn fixed(id: u8) -> Self {
        assert!(id <= Self::MAX, "channel id out of range");
        Self(id)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Names a logical control, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Stick(JoystickType, StickDirection),
    Trigger(TriggerType),
    Button(usize),
    Dpad(HatDirection),
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Stick(stick, direction) => {
                write!(f, "{:?} stick {:?}", stick, direction)
            }
            Control::Trigger(trigger) => write!(f, "{:?} trigger", trigger),
            Control::Button(index) => write!(f, "button {}", index),
            Control::Dpad(direction) => write!(f, "d-pad {}", direction),
        }
    }
}

/// The four unidirectional channels of one stick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickChannels {
    pub right: ChannelId,
    pub left: ChannelId,
    pub up: ChannelId,
    pub down: ChannelId,
}

impl StickChannels {
    pub fn get(&self, direction: StickDirection) -> ChannelId {
        match direction {
            StickDirection::Right => self.right,
            StickDirection::Left => self.left,
            StickDirection::Up => self.up,
            StickDirection::Down => self.down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpadChannels {
    pub north: ChannelId,
    pub north_east: ChannelId,
    pub east: ChannelId,
    pub south_east: ChannelId,
    pub south: ChannelId,
    pub south_west: ChannelId,
    pub west: ChannelId,
    pub north_west: ChannelId,
}

impl DpadChannels {
    /// Channel for `direction`; centre has none
    pub fn get(&self, direction: HatDirection) -> Option<ChannelId> {
        match direction {
            HatDirection::Center => None,
            HatDirection::North => Some(self.north),
            HatDirection::NorthEast => Some(self.north_east),
            HatDirection::East => Some(self.east),
            HatDirection::SouthEast => Some(self.south_east),
            HatDirection::South => Some(self.south),
            HatDirection::SouthWest => Some(self.south_west),
            HatDirection::West => Some(self.west),
            HatDirection::NorthWest => Some(self.north_west),
        }
    }
}

/// Every channel assignment of the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    pub left_stick: StickChannels,
    pub right_stick: StickChannels,
    pub left_trigger: ChannelId,
    pub right_trigger: ChannelId,
    /// Indexed by button number; `None` leaves the button unmapped
    pub buttons: Vec<Option<ChannelId>>,
    pub dpad: DpadChannels,
}

impl Default for ChannelMap {
    fn default() -> Self {
        let mut buttons: Vec<Option<ChannelId>> =
            (20..30).map(|id| Some(ChannelId::fixed(id))).collect();
        buttons.resize(20, None);

        Self {
            left_stick: StickChannels {
                right: ChannelId::fixed(1),
                left: ChannelId::fixed(2),
                down: ChannelId::fixed(3),
                up: ChannelId::fixed(4),
            },
            right_stick: StickChannels {
                right: ChannelId::fixed(10),
                left: ChannelId::fixed(11),
                down: ChannelId::fixed(12),
                up: ChannelId::fixed(13),
            },
            left_trigger: ChannelId::fixed(5),
            right_trigger: ChannelId::fixed(6),
            buttons,
            dpad: DpadChannels {
                north: ChannelId::fixed(70),
                south: ChannelId::fixed(71),
                west: ChannelId::fixed(72),
                east: ChannelId::fixed(73),
                north_east: ChannelId::fixed(74),
                south_east: ChannelId::fixed(75),
                north_west: ChannelId::fixed(76),
                south_west: ChannelId::fixed(77),
            },
        }
    }
}

impl ChannelMap {
    pub fn stick(&self, stick: JoystickType) -> &StickChannels {
        match stick {
            JoystickType::Left => &self.left_stick,
            JoystickType::Right => &self.right_stick,
        }
    }

    pub fn trigger(&self, trigger: TriggerType) -> ChannelId {
        match trigger {
            TriggerType::Left => self.left_trigger,
            TriggerType::Right => self.right_trigger,
        }
    }

    /// Every mapped control with its channel, in a stable order
    pub fn assignments(&self) -> Vec<(Control, ChannelId)> {
        let mut out = Vec::new();
        for stick in [JoystickType::Left, JoystickType::Right] {
            for direction in [
                StickDirection::Right,
                StickDirection::Left,
                StickDirection::Up,
                StickDirection::Down,
            ] {
                out.push((
                    Control::Stick(stick, direction),
                    self.stick(stick).get(direction),
                ));
            }
        }
        for trigger in [TriggerType::Left, TriggerType::Right] {
            out.push((Control::Trigger(trigger), self.trigger(trigger)));
        }
        for (index, channel) in self.buttons.iter().enumerate() {
            if let Some(channel) = channel {
                out.push((Control::Button(index), *channel));
            }
        }
        for direction in HatDirection::ALL {
            if let Some(channel) = self.dpad.get(direction) {
                out.push((Control::Dpad(direction), channel));
            }
        }
        out
    }

    /// Reject any channel shared by two controls
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashMap<ChannelId, Control> = HashMap::new();
        for (control, channel) in self.assignments() {
            if let Some(first) = seen.insert(channel, control) {
                return Err(ConfigError::DuplicateChannel {
                    channel,
                    first,
                    second: control,
                });
            }
        }
        debug!("Channel map valid: {} controls assigned", seen.len());
        Ok(())
    }

    /// The assignment table as TOML, for the startup log
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let table: BTreeMap<String, ChannelId> = self
            .assignments()
            .into_iter()
            .map(|(control, channel)| (control.to_string(), channel))
            .collect();
        Ok(toml::to_string(&table)?)
    }
}

/// What to do when the output refuses a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendFailurePolicy {
    /// Drop the message and mark the channel stale. Stick and trigger channels
    /// are re-sent on the next tick; button and hat channels wait for the
    /// shutdown sweep.
    Drop,
    /// Retry once, then behave like `Drop`
    #[default]
    RetryOnce,
    /// Finish the current tick, then stop the adapter with the first error
    Fatal,
}

impl std::str::FromStr for SendFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(SendFailurePolicy::Drop),
            "retry" | "retry-once" => Ok(SendFailurePolicy::RetryOnce),
            "fatal" => Ok(SendFailurePolicy::Fatal),
            other => Err(format!("expected drop, retry or fatal, got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdapterSettings {
    /// Stick magnitude below which an axis counts as centred
    pub deadzone: f32,
    /// Trigger readings at or below this count as released
    pub trigger_rest_threshold: f32,
    pub poll_rate_hz: u32,
    /// MIDI channel, 0-15
    pub midi_channel: u8,
    /// Case-insensitive substring of the desired output port name
    pub port_name: String,
    /// Send 0 to every engaged channel on shutdown
    pub zero_on_shutdown: bool,
    pub send_failure_policy: SendFailurePolicy,
    pub stats_interval_secs: i64,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            deadzone: 0.15,
            trigger_rest_threshold: -0.8,
            poll_rate_hz: 200,
            midi_channel: 0,
            port_name: "Xbox In".to_string(),
            zero_on_shutdown: true,
            send_failure_policy: SendFailurePolicy::default(),
            stats_interval_secs: 10,
        }
    }
}

fn parse_env<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnv {
            key,
            value: value.clone(),
            reason: e.to_string(),
        })
}

fn parse_flag(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}

impl AdapterSettings {
    /// Defaults overridden by `GAMEPAD_MIDI_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(port) = lookup(ENV_PORT) {
            settings.port_name = port;
        }
        if let Some(value) = lookup(ENV_DEADZONE) {
            settings.deadzone = parse_env(ENV_DEADZONE, value)?;
        }
        if let Some(value) = lookup(ENV_RATE_HZ) {
            settings.poll_rate_hz = parse_env(ENV_RATE_HZ, value)?;
        }
        if let Some(value) = lookup(ENV_CHANNEL) {
            settings.midi_channel = parse_env(ENV_CHANNEL, value)?;
        }
        if let Some(value) = lookup(ENV_SWEEP) {
            settings.zero_on_shutdown = parse_flag(ENV_SWEEP, value)?;
        }
        if let Some(value) = lookup(ENV_ON_SEND_FAILURE) {
            settings.send_failure_policy = parse_env(ENV_ON_SEND_FAILURE, value)?;
        }

        settings.validate()?;
        info!("Loaded adapter settings: {:?}", settings);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.deadzone) {
            return Err(ConfigError::InvalidSettings(format!(
                "deadzone must be in [0, 1), got {}",
                self.deadzone
            )));
        }
        if !(-1.0..1.0).contains(&self.trigger_rest_threshold) {
            return Err(ConfigError::InvalidSettings(format!(
                "trigger rest threshold must be in [-1, 1), got {}",
                self.trigger_rest_threshold
            )));
        }
        if !(1..=1000).contains(&self.poll_rate_hz) {
            return Err(ConfigError::InvalidSettings(format!(
                "poll rate must be 1-1000 Hz, got {}",
                self.poll_rate_hz
            )));
        }
        if self.midi_channel > 15 {
            return Err(ConfigError::InvalidSettings(format!(
                "MIDI channel must be 0-15, got {}",
                self.midi_channel
            )));
        }
        if self.stats_interval_secs <= 0 {
            return Err(ConfigError::InvalidSettings(
                "stats interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.poll_rate_hz.max(1)))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_default_map_is_valid() {
        let map = ChannelMap::default();
        assert!(map.validate().is_ok());
        // 8 stick directions, 2 triggers, 10 buttons, 8 pad directions
        assert_eq!(map.assignments().len(), 28);
        assert_eq!(map.buttons.len(), 20);
        assert_eq!(map.buttons[3], ChannelId::new(23));
        assert_eq!(map.buttons[15], None);
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let mut map = ChannelMap::default();
        map.buttons[12] = Some(ChannelId::fixed(5));
        match map.validate() {
            Err(ConfigError::DuplicateChannel {
                channel,
                first,
                second,
            }) => {
                assert_eq!(channel.get(), 5);
                assert_eq!(first, Control::Trigger(TriggerType::Left));
                assert_eq!(second, Control::Button(12));
            }
            other => panic!("expected duplicate channel error, got {:?}", other),
        }
    }

    #[test]
    fn test_channel_id_range() {
        assert!(ChannelId::new(127).is_some());
        assert!(ChannelId::new(128).is_none());
    }

    #[test]
    fn test_dpad_center_has_no_channel() {
        let map = ChannelMap::default();
        assert_eq!(map.dpad.get(HatDirection::Center), None);
        assert_eq!(map.dpad.get(HatDirection::East), ChannelId::new(73));
        assert_eq!(map.dpad.get(HatDirection::SouthWest), ChannelId::new(77));
    }

    #[test]
    fn test_map_dump_lists_controls() {
        let dump = ChannelMap::default().to_toml().unwrap();
        assert!(dump.contains("\"button 0\" = 20"));
        assert!(dump.contains("\"d-pad north\" = 70"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = AdapterSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, AdapterSettings::default());
        assert_eq!(settings.tick_interval(), Duration::from_millis(5));
        assert!(settings.to_toml().unwrap().contains("send_failure_policy = \"retry-once\""));
    }

    #[test]
    fn test_settings_env_overrides() {
        let settings = AdapterSettings::from_lookup(lookup_from(&[
            (ENV_PORT, "loopMIDI"),
            (ENV_DEADZONE, "0.2"),
            (ENV_RATE_HZ, "100"),
            (ENV_CHANNEL, "3"),
            (ENV_SWEEP, "off"),
            (ENV_ON_SEND_FAILURE, "fatal"),
        ]))
        .unwrap();
        assert_eq!(settings.port_name, "loopMIDI");
        assert_eq!(settings.deadzone, 0.2);
        assert_eq!(settings.poll_rate_hz, 100);
        assert_eq!(settings.midi_channel, 3);
        assert!(!settings.zero_on_shutdown);
        assert_eq!(settings.send_failure_policy, SendFailurePolicy::Fatal);
    }

    #[test]
    fn test_settings_reject_bad_values() {
        assert!(matches!(
            AdapterSettings::from_lookup(lookup_from(&[(ENV_DEADZONE, "abc")])),
            Err(ConfigError::InvalidEnv { .. })
        ));
        assert!(matches!(
            AdapterSettings::from_lookup(lookup_from(&[(ENV_CHANNEL, "16")])),
            Err(ConfigError::InvalidSettings(_))
        ));
        assert!(matches!(
            AdapterSettings::from_lookup(lookup_from(&[(ENV_RATE_HZ, "0")])),
            Err(ConfigError::InvalidSettings(_))
        ));
        assert!(matches!(
            AdapterSettings::from_lookup(lookup_from(&[(ENV_SWEEP, "maybe")])),
            Err(ConfigError::InvalidEnv { .. })
        ));
    }
}
