//! Button mapping
//!
//! Buttons arrive as press/release edges, so they bypass change detection:
//! a press cannot repeat without a release in between.

use crate::config::ChannelId;
use crate::output::CcMessage;

#[derive(Debug, Clone)]
pub struct ButtonTracker {
    table: Vec<Option<ChannelId>>,
}

impl ButtonTracker {
    pub fn new(table: Vec<Option<ChannelId>>) -> Self {
        Self { table }
    }

    pub fn channel(&self, index: usize) -> Option<ChannelId> {
        self.table.get(index).copied().flatten()
    }

    /// Message for a press or release of button `index`, if it is mapped
    pub fn on_button(&self, index: usize, pressed: bool) -> Option<CcMessage> {
        self.channel(index).map(|channel| {
            if pressed {
                CcMessage::on(channel)
            } else {
                CcMessage::off(channel)
            }
        })
    }
}
