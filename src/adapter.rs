//! Poll loop driving the adapter
//!
//! One tick drains the discrete events (buttons, d-pad) and forwards their
//! messages directly, then samples sticks and triggers and forwards only
//! the values that changed. Ticks run at a fixed rate on a tokio interval;
//! cancellation is checked between ticks only, so a d-pad off/on pair is
//! never split.
//!
//! ```text
//! InputSource ──► ButtonTracker / HatTracker ───────────────┐
//!             └─► map_axis / map_trigger ──► ChangeDetector ─┴─► MessageSink
//! ```

use crate::config::{AdapterSettings, ChannelMap, ConfigError, SendFailurePolicy};
use crate::controller::event_collector::InputError;
use crate::controller::{InputSource, JoystickType, PadEvent, StickDirection, TriggerType};
use crate::mapping::{map_axis, map_trigger, ButtonTracker, ChangeDetector, HatTracker};
use crate::output::{CcMessage, MessageSink, SinkError};
use chrono::{DateTime, Local};
use statum::{machine, state};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Input error: {0}")]
    InputError(#[from] InputError),

    #[error("Output error: {0}")]
    SinkError(#[from] SinkError),
}

/// Message counts for the periodic stats line
#[derive(Debug, Clone)]
struct TickStats {
    ticks: u64,
    messages: u64,
    last_log_time: DateTime<Local>,
    log_interval: chrono::Duration,
}

impl TickStats {
    fn new(interval_secs: i64) -> Self {
        Self {
            ticks: 0,
            messages: 0,
            last_log_time: Local::now(),
            log_interval: chrono::Duration::seconds(interval_secs),
        }
    }

    fn record(&mut self, messages: usize) {
        self.ticks += 1;
        self.messages += messages as u64;

        let now = Local::now();
        if now - self.last_log_time > self.log_interval {
            info!(
                "Adapter stats: {} ticks, {} messages in last {} seconds (avg {:.2} msg/sec)",
                self.ticks,
                self.messages,
                self.log_interval.num_seconds(),
                self.messages as f64 / self.log_interval.num_seconds() as f64
            );
            self.ticks = 0;
            self.messages = 0;
            self.last_log_time = now;
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum LoopState {
    Idle,
    Running,
}

#[machine]
#[derive(Debug)]
pub struct PollLoop<S: LoopState> {
    source: Box<dyn InputSource>,
    sink: Box<dyn MessageSink>,
    settings: AdapterSettings,
    channels: ChannelMap,

    // Owned by the loop; nothing else touches them
    detector: ChangeDetector,
    hat: HatTracker,
    buttons: ButtonTracker,

    stats: TickStats,
}

impl PollLoop<Idle> {
    /// Validate settings and channel tables and build an idle loop
    pub fn create(
        source: Box<dyn InputSource>,
        sink: Box<dyn MessageSink>,
        settings: AdapterSettings,
        channels: ChannelMap,
    ) -> Result<Self, AdapterError> {
        settings.validate()?;
        channels.validate()?;
        debug!("Effective settings:\n{}", settings.to_toml()?);
        debug!("Channel assignments:\n{}", channels.to_toml()?);

        let hat = HatTracker::new(channels.dpad);
        let buttons = ButtonTracker::new(channels.buttons.clone());
        let stats = TickStats::new(settings.stats_interval_secs);

        Ok(Self::new(
            source,
            sink,
            settings,
            channels,
            ChangeDetector::new(),
            hat,
            buttons,
            stats,
        ))
    }

    pub fn start(self) -> PollLoop<Running> {
        info!("Gamepad → Momentary MIDI CC READY! (all sticks + triggers are momentary)");
        self.transition()
    }
}

impl PollLoop<Running> {
    /// Run ticks until `cancel` fires, then optionally zero every engaged channel
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), AdapterError> {
        let mut ticker = interval(self.settings.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Starting poll loop at {} Hz", self.settings.poll_rate_hz);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancellation received, stopping poll loop");
                    break;
                }
                _ = ticker.tick() => {
                    let sent = self.tick()?;
                    self.stats.record(sent);
                }
            }
        }

        if self.settings.zero_on_shutdown {
            let swept = self.shutdown_sweep()?;
            info!("Shutdown sweep zeroed {} channels", swept);
        }
        info!("Bye!");
        Ok(())
    }

    /// One pass over events and samples; returns the number of messages sent
    ///
    /// A fatal send failure does not cut the tick short: the remaining events
    /// and samples are still sent, then the first failure is returned.
    pub fn tick(&mut self) -> Result<usize, AdapterError> {
        let mut sent = 0;
        let mut failed = None;

        for event in self.source.drain_events() {
            match event {
                PadEvent::ButtonPressed(index) | PadEvent::ButtonReleased(index) => {
                    let pressed = matches!(event, PadEvent::ButtonPressed(_));
                    if let Some(message) = self.buttons.on_button(index, pressed) {
                        sent += settle(self.emit(message), &mut failed);
                    } else {
                        debug!("Button {} is unmapped", index);
                    }
                }
                PadEvent::HatMotion(direction) => {
                    let transition = self.hat.on_motion(direction);
                    if transition.is_empty() {
                        continue;
                    }
                    for message in transition.messages() {
                        sent += settle(self.emit(message), &mut failed);
                    }
                }
            }
        }

        let snapshot = self.source.snapshot();
        let deadzone = self.settings.deadzone;
        for stick in [JoystickType::Left, JoystickType::Right] {
            let reading = snapshot.stick(stick);
            let values = map_axis(reading.x, reading.y, deadzone);
            let channels = *self.channels.stick(stick);
            for (direction, value) in [
                (StickDirection::Right, values.right),
                (StickDirection::Left, values.left),
                (StickDirection::Down, values.down),
                (StickDirection::Up, values.up),
            ] {
                let message = CcMessage::new(channels.get(direction), value);
                sent += settle(self.emit_if_changed(message), &mut failed);
            }
        }

        let threshold = self.settings.trigger_rest_threshold;
        for trigger in [TriggerType::Left, TriggerType::Right] {
            let value = map_trigger(snapshot.trigger(trigger), threshold);
            let message = CcMessage::new(self.channels.trigger(trigger), value);
            sent += settle(self.emit_if_changed(message), &mut failed);
        }

        match failed {
            Some(e) => Err(e.into()),
            None => Ok(sent),
        }
    }

    /// Send 0 to every channel that may still be engaged downstream
    pub fn shutdown_sweep(&mut self) -> Result<usize, AdapterError> {
        let engaged: Vec<_> = self.detector.engaged().collect();
        let mut sent = 0;
        let mut failed = None;
        for channel in engaged {
            debug!(
                "Zeroing channel {} (last sent {:?})",
                channel,
                self.detector.last_sent(channel)
            );
            sent += settle(self.emit(CcMessage::off(channel)), &mut failed);
        }

        match failed {
            Some(e) => Err(e.into()),
            None => Ok(sent),
        }
    }

    fn emit_if_changed(&mut self, message: CcMessage) -> Result<bool, SinkError> {
        if !self.detector.should_emit(message.channel, message.value) {
            return Ok(false);
        }
        self.emit(message)
    }

    /// Send through the sink under the configured failure policy.
    ///
    /// A message that could not be delivered leaves its channel stale. Sampled
    /// channels are then re-sent on the next tick; button and hat channels are
    /// only cleared by the shutdown sweep.
    fn emit(&mut self, message: CcMessage) -> Result<bool, SinkError> {
        debug!("Emitting {}", message);
        let policy = self.settings.send_failure_policy;
        let mut result = self.sink.send(message);

        if let Err(e) = &result {
            if policy == SendFailurePolicy::RetryOnce {
                warn!("Send of {} failed ({}), retrying once", message, e);
                result = self.sink.send(message);
            }
        }

        match result {
            Ok(()) => {
                self.detector.record(message.channel, message.value);
                Ok(true)
            }
            Err(e) => {
                self.detector.mark_stale(message.channel);
                if policy == SendFailurePolicy::Fatal {
                    error!("Send of {} failed: {}", message, e);
                    Err(e)
                } else {
                    warn!("Dropping {}: {}", message, e);
                    Ok(false)
                }
            }
        }
    }
}

/// Count a send, keeping only the first fatal failure of the pass
fn settle(result: Result<bool, SinkError>, failed: &mut Option<SinkError>) -> usize {
    match result {
        Ok(sent) => usize::from(sent),
        Err(e) => {
            failed.get_or_insert(e);
            0
        }
    }
}
