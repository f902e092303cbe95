pub mod adapter;
pub mod config;
pub mod controller;
pub mod mapping;
pub mod output;

use crate::adapter::PollLoop;
use crate::config::{AdapterSettings, ChannelMap};
use crate::controller::event_collector::GilrsSource;
use crate::output::midi::MidiSink;
use color_eyre::{eyre::eyre, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let settings = AdapterSettings::from_env()?;
    let channels = ChannelMap::default();
    channels.validate()?;

    // Both ends must exist before the loop starts
    let source = GilrsSource::create().map_err(|e| eyre!("Failed to open gamepad: {}", e))?;
    let sink = MidiSink::connect(&settings.port_name, settings.midi_channel)
        .map_err(|e| eyre!("Failed to open MIDI output: {}", e))?;
    info!(
        "Sending on MIDI channel {} to '{}'",
        settings.midi_channel,
        sink.port_name()
    );

    let poll_loop = PollLoop::create(Box::new(source), Box::new(sink), settings, channels)?.start();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received"),
            Err(e) => error!("Unable to listen for interrupt: {}", e),
        }
        shutdown.cancel();
    });

    poll_loop.run(cancel).await?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = match std::env::var("RUST_LOG").as_deref() {
        Ok("trace") => Level::TRACE,
        Ok("debug") => Level::DEBUG,
        Ok("warn") => Level::WARN,
        Ok("error") => Level::ERROR,
        _ => Level::INFO,
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
