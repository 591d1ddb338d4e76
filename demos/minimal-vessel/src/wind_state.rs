//!
//! Turns raw wind sensor readings into a wind state.
//!
//! The demo vessel is moored, so the true wind equals the apparent wind
//! and the estimate is just a smoothed copy of the sensor.
//!

use std::sync::Mutex;

use sailbus::prelude::*;

/// Weight of the newest reading in the running average
const SMOOTHING: f32 = 0.3;

/// Passive node estimating the wind state from `WindData`
pub struct WindStateNode {
    bus: BusHandle,
    estimate: Mutex<Option<(f32, f32)>>,
}

impl WindStateNode {
    /// Create a node publishing its estimates on `bus`
    pub fn new(bus: BusHandle) -> Self {
        Self {
            bus,
            estimate: Mutex::new(None),
        }
    }
}

impl Node for WindStateNode {
    fn id(&self) -> NodeId {
        NodeId::WindState
    }

    fn init(&self) -> Result<(), NodeError> {
        Ok(())
    }

    fn process_message(&self, message: &Message) {
        let Some(payload) = message.payload() else {
            return;
        };
        if !payload.has_data() {
            log::debug!("Skipping out of range wind reading from {}", message.source());
            return;
        }
        let Payload::WindData {
            direction, speed, ..
        } = payload
        else {
            return;
        };

        let (direction, speed) = {
            let mut estimate = self.estimate.lock().unwrap_or_else(|err| err.into_inner());
            let (old_direction, old_speed) = estimate.unwrap_or((*direction, *speed));
            // Blend the directions along the shorter arc
            let turn = (direction - old_direction + 540.0).rem_euclid(360.0) - 180.0;
            let next = (
                (old_direction + SMOOTHING * turn).rem_euclid(360.0),
                old_speed + SMOOTHING * (speed - old_speed),
            );
            *estimate = Some(next);
            next
        };

        self.bus.send_message(Message::with_payload(
            Payload::WindState {
                true_speed: speed,
                true_direction: direction,
                apparent_speed: speed,
                apparent_direction: direction,
            },
            self.id(),
            NodeId::None,
        ));
    }
}
