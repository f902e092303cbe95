use super::{AnalogSnapshot, HatDirection, InputSource, PadEvent, StickReading};
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use std::fmt;
use tracing::{debug, error, info, warn};

// Input errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to initialize gamepad backend: {0}")]
    InitializationError(String),

    #[error("No gamepad connected")]
    NoGamepad,
}

/// Held state of the four d-pad buttons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DpadState {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl DpadState {
    fn direction(&self) -> HatDirection {
        let x = i8::from(self.right) - i8::from(self.left);
        let y = i8::from(self.up) - i8::from(self.down);
        HatDirection::from_axes(x, y)
    }

    /// Apply a d-pad button edge; false when `button` is not a d-pad button
    fn set_button(&mut self, button: Button, pressed: bool) -> bool {
        match button {
            Button::DPadUp => self.up = pressed,
            Button::DPadDown => self.down = pressed,
            Button::DPadLeft => self.left = pressed,
            Button::DPadRight => self.right = pressed,
            _ => return false,
        }
        true
    }

    /// Apply a d-pad axis change; false when `axis` is not a d-pad axis
    fn set_axis(&mut self, axis: Axis, value: f32) -> bool {
        match axis {
            Axis::DPadX => {
                self.right = value > 0.5;
                self.left = value < -0.5;
            }
            Axis::DPadY => {
                self.up = value > 0.5;
                self.down = value < -0.5;
            }
            _ => return false,
        }
        true
    }
}

/// Gamepad input through gilrs, bound to the first connected gamepad
pub struct GilrsSource {
    // Gilrs context
    gilrs: Gilrs,

    // Active gamepad
    active_gamepad: GamepadId,

    dpad: DpadState,
}

impl fmt::Debug for GilrsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GilrsSource")
            .field("active_gamepad", &self.active_gamepad)
            .field("dpad", &self.dpad)
            .finish()
    }
}

impl GilrsSource {
    pub fn create() -> Result<Self, InputError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(InputError::InitializationError(e.to_string()));
            }
        };

        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = gilrs.gamepads().collect();
        if gamepads.is_empty() {
            error!("No gamepad found!");
            return Err(InputError::NoGamepad);
        }

        info!("Found {} gamepads:", gamepads.len());
        for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
            info!(
                "  [{}] ID: {}, Name: {}, UUID: {:?}",
                idx,
                id,
                gamepad.name(),
                gamepad.uuid()
            );
        }

        let (active_gamepad, gamepad) = &gamepads[0];
        let active_gamepad = *active_gamepad;
        info!("Gamepad: {} ({})", gamepad.name(), active_gamepad);
        drop(gamepads);

        Ok(Self {
            gilrs,
            active_gamepad,
            dpad: DpadState::default(),
        })
    }

    fn convert_gilrs_event(&mut self, event: EventType) -> Option<PadEvent> {
        match event {
            EventType::ButtonPressed(button, _) | EventType::ButtonReleased(button, _) => {
                let pressed = matches!(event, EventType::ButtonPressed(..));
                if self.dpad.set_button(button, pressed) {
                    return Some(PadEvent::HatMotion(self.dpad.direction()));
                }
                match button_index(button) {
                    Some(index) if pressed => Some(PadEvent::ButtonPressed(index)),
                    Some(index) => Some(PadEvent::ButtonReleased(index)),
                    None => {
                        debug!("Ignoring unmapped button: {:?}", button);
                        None
                    }
                }
            }
            EventType::AxisChanged(axis, value, _) => {
                if self.dpad.set_axis(axis, value) {
                    Some(PadEvent::HatMotion(self.dpad.direction()))
                } else {
                    // Sticks and triggers are sampled, not evented
                    None
                }
            }
            EventType::ButtonRepeated(button, _) => {
                debug!("Button repeat ignored: {:?}", button);
                None
            }
            EventType::Connected => {
                info!("Controller connected event detected");
                None
            }
            EventType::Disconnected => {
                warn!("Controller disconnected event detected");
                None
            }
            _ => None,
        }
    }
}

impl InputSource for GilrsSource {
    fn drain_events(&mut self) -> Vec<PadEvent> {
        let mut events = Vec::new();
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if id != self.active_gamepad {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                continue;
            }
            if let Some(pad_event) = self.convert_gilrs_event(event) {
                debug!("Captured event: {:?}", pad_event);
                events.push(pad_event);
            }
        }
        events
    }

    fn snapshot(&self) -> AnalogSnapshot {
        let Some(pad) = self.gilrs.connected_gamepad(self.active_gamepad) else {
            return AnalogSnapshot::default();
        };

        // gilrs reports up as positive; the mapping expects the hardware sign
        AnalogSnapshot {
            left_stick: StickReading {
                x: pad.value(Axis::LeftStickX),
                y: -pad.value(Axis::LeftStickY),
            },
            right_stick: StickReading {
                x: pad.value(Axis::RightStickX),
                y: -pad.value(Axis::RightStickY),
            },
            left_trigger: trigger_reading(&pad, Button::LeftTrigger2, Axis::LeftZ),
            right_trigger: trigger_reading(&pad, Button::RightTrigger2, Axis::RightZ),
        }
    }
}

/// Trigger position rescaled from gilrs' 0..1 to -1 (rest) ..1
fn trigger_reading(pad: &Gamepad<'_>, button: Button, axis: Axis) -> f32 {
    let pressed = pad
        .button_data(button)
        .map(|data| data.value())
        .or_else(|| pad.axis_data(axis).map(|data| data.value()))
        .unwrap_or(0.0);
    pressed.clamp(0.0, 1.0) * 2.0 - 1.0
}

/// Button numbering of the usual XInput layout
fn button_index(button: Button) -> Option<usize> {
    match button {
        Button::South => Some(0),
        Button::East => Some(1),
        Button::West => Some(2),
        Button::North => Some(3),
        Button::LeftTrigger => Some(4),
        Button::RightTrigger => Some(5),
        Button::Select => Some(6),
        Button::Start => Some(7),
        Button::LeftThumb => Some(8),
        Button::RightThumb => Some(9),
        Button::Mode => Some(10),
        _ => None,
    }
}
