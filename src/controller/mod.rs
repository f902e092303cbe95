//! Controller subsystem for gamepad input
//!
//! The poll loop consumes any [`InputSource`]: a drainable queue of discrete
//! [`PadEvent`]s plus an on-demand [`AnalogSnapshot`] of the six continuous
//! readings. [`event_collector`] implements it on top of gilrs.
//!
//! # Conventions
//!
//! ```text
//! stick x   -1.0 (left)  ..  1.0 (right)
//! stick y   -1.0 (up)    ..  1.0 (down)
//! trigger   -1.0 (rest)  ..  1.0 (fully pressed)
//! ```

pub mod event_collector;

use serde::Serialize;
use std::fmt;

// Stick type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoystickType {
    Left,
    Right,
}

// Trigger type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TriggerType {
    Left,
    Right,
}

/// One unidirectional half of a stick axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StickDirection {
    Right,
    Left,
    Up,
    Down,
}

/// Directional pad position: centre or one of eight directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum HatDirection {
    #[default]
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl HatDirection {
    pub const ALL: [HatDirection; 8] = [
        HatDirection::North,
        HatDirection::NorthEast,
        HatDirection::East,
        HatDirection::SouthEast,
        HatDirection::South,
        HatDirection::SouthWest,
        HatDirection::West,
        HatDirection::NorthWest,
    ];

    /// Direction from hat axes, `y` positive meaning up
    pub fn from_axes(x: i8, y: i8) -> Self {
        match (x.signum(), y.signum()) {
            (0, 1) => HatDirection::North,
            (1, 1) => HatDirection::NorthEast,
            (1, 0) => HatDirection::East,
            (1, -1) => HatDirection::SouthEast,
            (0, -1) => HatDirection::South,
            (-1, -1) => HatDirection::SouthWest,
            (-1, 0) => HatDirection::West,
            (-1, 1) => HatDirection::NorthWest,
            _ => HatDirection::Center,
        }
    }
}

impl fmt::Display for HatDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HatDirection::Center => "center",
            HatDirection::North => "north",
            HatDirection::NorthEast => "north-east",
            HatDirection::East => "east",
            HatDirection::SouthEast => "south-east",
            HatDirection::South => "south",
            HatDirection::SouthWest => "south-west",
            HatDirection::West => "west",
            HatDirection::NorthWest => "north-west",
        };
        f.write_str(name)
    }
}

/// Discrete input event, already decoded from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadEvent {
    ButtonPressed(usize),
    ButtonReleased(usize),
    HatMotion(HatDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickReading {
    pub x: f32,
    pub y: f32,
}

/// Raw readings of every continuous control at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogSnapshot {
    pub left_stick: StickReading,
    pub right_stick: StickReading,
    pub left_trigger: f32,
    pub right_trigger: f32,
}

impl Default for AnalogSnapshot {
    fn default() -> Self {
        Self {
            left_stick: StickReading::default(),
            right_stick: StickReading::default(),
            left_trigger: -1.0,
            right_trigger: -1.0,
        }
    }
}

impl AnalogSnapshot {
    pub fn stick(&self, stick: JoystickType) -> StickReading {
        match stick {
            JoystickType::Left => self.left_stick,
            JoystickType::Right => self.right_stick,
        }
    }

    pub fn trigger(&self, trigger: TriggerType) -> f32 {
        match trigger {
            TriggerType::Left => self.left_trigger,
            TriggerType::Right => self.right_trigger,
        }
    }
}

/// Everything the poll loop needs from the input device
pub trait InputSource: fmt::Debug {
    /// All pending discrete events, in arrival order
    fn drain_events(&mut self) -> Vec<PadEvent>;

    /// Current raw reading of the sticks and triggers
    fn snapshot(&self) -> AnalogSnapshot;
}
