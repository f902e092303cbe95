//! Translation of controller state into control messages.
//!
//! - [`analog`]: pure stick and trigger mapping
//! - [`change`]: per-channel change detection for sampled values
//! - [`hat`]: exclusive directional pad state
//! - [`buttons`]: edge-triggered button lookup

pub mod analog;
pub mod buttons;
pub mod change;
pub mod hat;

pub use analog::{map_axis, map_trigger, StickValues};
pub use buttons::ButtonTracker;
pub use change::ChangeDetector;
pub use hat::{HatTracker, HatTransition};
