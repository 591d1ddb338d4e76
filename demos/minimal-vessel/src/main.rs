//!
//! A minimal vessel: a simulated wind sensor feeds a wind state estimator,
//! and a logger records both, all connected through the message bus.
//!
//! Run with an optional configuration file and stop with Ctrl-C:
//!
//! ```text
//! cargo run -p minimal-vessel -- demos/minimal-vessel/vessel.toml
//! ```
//!

#![deny(missing_docs)]

use std::{env, fs, sync::Arc, thread, time::Duration};

use anyhow::{anyhow, Context};
use crossbeam::channel::unbounded;

use sailbus::nodes::{ConfigTable, LoggerNode, SensorReadNode};
use sailbus::prelude::*;

pub mod console_store;
use console_store::ConsoleStore;

pub mod wind_sensor;
use wind_sensor::SimulatedWindSensor;

pub mod wind_state;
use wind_state::WindStateNode;

fn load_config() -> anyhow::Result<StaticConfig> {
    let Some(path) = env::args().nth(1) else {
        return Ok(StaticConfig::new());
    };
    let text = fs::read_to_string(&path).with_context(|| format!("could not read {path}"))?;
    let table: ConfigTable = toml::from_str(&text).with_context(|| format!("could not parse {path}"))?;
    Ok(StaticConfig::from_table(table)?)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config: Arc<dyn ConfigSource> = Arc::new(load_config()?);
    let mut bus = MessageBus::new();
    let handle = bus.handle();

    let wind_sensor = Arc::new(
        SensorReadNode::new(
            NodeId::CanWindSensor,
            SimulatedWindSensor::new(),
            handle.clone(),
            Duration::from_millis(100),
        )
        .with_config(config.clone()),
    );
    let wind_state = Arc::new(WindStateNode::new(handle.clone()));
    let logger = Arc::new(
        LoggerNode::new(ConsoleStore, 10, Duration::from_millis(500)).with_config(config),
    );

    let mut active_nodes = ActiveNodeSet::new();
    initialise_node(&*wind_state, NodeImportance::Critical)?;
    active_nodes.initialise(wind_sensor.clone(), NodeImportance::Critical)?;
    let logging = active_nodes.initialise(logger.clone(), NodeImportance::NotCritical)?;

    bus.register_node_for(wind_sensor, MessageType::ServerConfigsReceived)?;
    bus.register_node_for(wind_state, MessageType::WindData)?;
    if logging {
        for message_type in [
            MessageType::WindData,
            MessageType::WindState,
            MessageType::ServerConfigsReceived,
        ] {
            bus.register_node_for(logger.clone(), message_type)?;
        }
    }

    let (interrupt_tx, interrupt_rx) = unbounded();
    ctrlc::set_handler(move || {
        // The receiver only goes away once shutdown has begun
        let _ = interrupt_tx.send(());
    })
    .context("could not set the Ctrl-C handler")?;

    let dispatcher = thread::Builder::new()
        .name("message-bus".into())
        .spawn(move || bus.run())
        .context("could not spawn the message bus thread")?;

    let outcome = active_nodes.start_all();
    if outcome.is_ok() {
        log::info!("Vessel running, press Ctrl-C to stop");
        if interrupt_rx.recv().is_err() {
            log::warn!("Interrupt handler went away, shutting down");
        }
        active_nodes.stop_all();
    }

    handle.stop();
    dispatcher
        .join()
        .map_err(|_| anyhow!("the message bus thread panicked"))?;
    outcome?;

    log::info!("Vessel stopped");
    Ok(())
}
