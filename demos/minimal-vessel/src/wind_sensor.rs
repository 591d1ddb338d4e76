//!
//! A wind sensor that makes its readings up.
//!
//! The wind direction and speed wander randomly around a starting value,
//! which is enough to see messages flow without any hardware attached.
//! Gusts beyond the sensor's range are reported as out of range, the way
//! the masthead unit does.
//!

use rand::{rngs::StdRng, Rng, SeedableRng};

use sailbus::core::DATA_OUT_OF_RANGE;
use sailbus::nodes::SensorSource;
use sailbus::prelude::*;

/// Fastest wind the simulated sensor can measure, in m/s
const MAX_SPEED: f32 = 20.0;

/// Simulated masthead wind sensor
pub struct SimulatedWindSensor {
    direction: f32,
    speed: f32,
    rng: StdRng,
}

impl SimulatedWindSensor {
    /// Create a sensor reporting a gentle northerly breeze
    pub fn new() -> Self {
        Self {
            direction: 0.0,
            speed: 4.0,
            rng: StdRng::from_entropy(),
        }
    }
}

impl SensorSource for SimulatedWindSensor {
    fn open(&mut self) -> Result<(), NodeError> {
        log::info!("Simulated wind sensor connected");
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Payload>, NodeError> {
        self.direction = (self.direction + self.rng.gen_range(-5.0..5.0)).rem_euclid(360.0);
        self.speed = (self.speed + self.rng.gen_range(-0.3..0.3)).clamp(0.0, 25.0);
        let speed = if self.speed > MAX_SPEED {
            DATA_OUT_OF_RANGE
        } else {
            self.speed
        };

        Ok(Some(Payload::WindData {
            direction: self.direction,
            speed,
            temperature: 15.0,
        }))
    }
}
