//!
//! Messages exchanged over the bus.
//!
//! A Message is an immutable typed event that names the node it came from
//! and, optionally, the node it is addressed to.  Messages with a
//! destination of [`NodeId::None`] are broadcasts and reach every node
//! subscribed to their type; any other destination is a directed message
//! that reaches exactly that node.
//!
//! Messages are moved into the bus when they are sent.  Receivers only ever
//! see a `&Message` for the duration of the delivery call.
//!

use sailbus_utils::{ByteReader, ByteWriter, PackingError};

use crate::ids::{MessageType, NodeId};

/// Sentinel used by sensor payloads for readings outside the sensor's range
pub const DATA_OUT_OF_RANGE: f32 = -2000.0;

/// Sentinel used by actuator commands that carry no command
pub const NO_COMMAND: f32 = -1000.0;

/// Packed length of a message header (type, source, destination)
pub const HEADER_LEN: usize = 3;

/// A GPS fix
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpsFix {
    /// Whether the receiver has a fix
    pub has_fix: bool,
    /// Whether the receiver is online
    pub online: bool,
    /// Latitude in degrees, north positive
    pub latitude: f64,
    /// Longitude in degrees, east positive
    pub longitude: f64,
    /// Unix time reported by the receiver
    pub unix_time: f64,
    /// Speed over ground in m/s
    pub speed: f64,
    /// Course over ground in degrees [0, 360)
    pub course: f64,
    /// Satellites in view
    pub satellites: u8,
}

/// Typed data carried by a message.
///
/// Each variant belongs to exactly one [`MessageType`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Apparent wind from the wind sensor
    WindData {
        /// Direction in degrees, vessel frame
        direction: f32,
        /// Speed in m/s
        speed: f32,
        /// Air temperature in degrees Celsius
        temperature: f32,
    },
    /// Compass reading
    CompassData {
        /// Heading in degrees [0, 360)
        heading: f32,
        /// Pitch in degrees
        pitch: f32,
        /// Roll in degrees
        roll: f32,
    },
    /// GPS fix
    GpsData(GpsFix),
    /// True and apparent wind
    WindState {
        /// True wind speed in m/s
        true_speed: f32,
        /// True wind direction in degrees, north-east frame
        true_direction: f32,
        /// Apparent wind speed in m/s
        apparent_speed: f32,
        /// Apparent wind direction in degrees, vessel frame
        apparent_direction: f32,
    },
    /// Rudder set point
    RudderCommand {
        /// Angle in degrees [-30, 30), vessel frame
        angle: f32,
    },
    /// Wing sail tail set point
    WingSailCommand {
        /// Tail angle in degrees
        tail_angle: f32,
    },
    /// Battery charge and consumption
    PowerTrack {
        /// Current in amperes
        current: f32,
        /// Voltage in volts
        voltage: f32,
    },
    /// Water quality sample
    MarineSensorData {
        /// Water temperature in degrees Celsius
        temperature: f32,
        /// Conductivity in uS/cm
        conductivity: f32,
        /// pH
        ph: f32,
        /// Salinity in PSU
        salinity: f32,
    },
    /// Current sensor sample
    CurrentSensorData {
        /// Current in amperes
        current: f32,
        /// Voltage in volts
        voltage: f32,
        /// The sensed element
        element: u8,
    },
}

impl Payload {
    /// The message type this payload belongs to
    pub const fn message_type(&self) -> MessageType {
        match self {
            Payload::WindData { .. } => MessageType::WindData,
            Payload::CompassData { .. } => MessageType::CompassData,
            Payload::GpsData(_) => MessageType::GpsData,
            Payload::WindState { .. } => MessageType::WindState,
            Payload::RudderCommand { .. } => MessageType::RudderCommand,
            Payload::WingSailCommand { .. } => MessageType::WingSailCommand,
            Payload::PowerTrack { .. } => MessageType::PowerTrack,
            Payload::MarineSensorData { .. } => MessageType::MarineSensorData,
            Payload::CurrentSensorData { .. } => MessageType::CurrentSensorData,
        }
    }

    /// Whether every value in the payload is a real reading or command.
    ///
    /// Sensors report readings outside their range as [`DATA_OUT_OF_RANGE`]
    /// and command payloads that command nothing carry [`NO_COMMAND`].
    pub fn has_data(&self) -> bool {
        let is_real = |value: &f32| *value != DATA_OUT_OF_RANGE && *value != NO_COMMAND;
        match self {
            Payload::WindData {
                direction,
                speed,
                temperature,
            } => [direction, speed, temperature].into_iter().all(is_real),
            Payload::CompassData {
                heading,
                pitch,
                roll,
            } => [heading, pitch, roll].into_iter().all(is_real),
            Payload::GpsData(fix) => fix.online,
            Payload::WindState {
                true_speed,
                true_direction,
                apparent_speed,
                apparent_direction,
            } => [true_speed, true_direction, apparent_speed, apparent_direction]
                .into_iter()
                .all(is_real),
            Payload::RudderCommand { angle } => is_real(angle),
            Payload::WingSailCommand { tail_angle } => is_real(tail_angle),
            Payload::PowerTrack { current, voltage } => [current, voltage].into_iter().all(is_real),
            Payload::MarineSensorData {
                temperature,
                conductivity,
                ph,
                salinity,
            } => [temperature, conductivity, ph, salinity].into_iter().all(is_real),
            Payload::CurrentSensorData {
                current, voltage, ..
            } => [current, voltage].into_iter().all(is_real),
        }
    }
}

/// An immutable event carried by the bus.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    message_type: MessageType,
    source: NodeId,
    destination: NodeId,
    payload: Option<Payload>,
    valid: bool,
}

impl Message {
    /// Create a message of a given type from `source` addressed to
    /// `destination`.
    ///
    /// Use a destination of [`NodeId::None`] for a broadcast.
    pub fn new(message_type: MessageType, source: NodeId, destination: NodeId) -> Self {
        Self {
            message_type,
            source,
            destination,
            payload: None,
            valid: true,
        }
    }

    /// Create a broadcast message of a given type from `source`.
    pub fn with_source(message_type: MessageType, source: NodeId) -> Self {
        Self::new(message_type, source, NodeId::None)
    }

    /// Create a broadcast message of a given type with no particular source.
    pub fn of_type(message_type: MessageType) -> Self {
        Self::new(message_type, NodeId::None, NodeId::None)
    }

    /// Create a message carrying `payload`.  The message type is the
    /// payload's type.
    pub fn with_payload(payload: Payload, source: NodeId, destination: NodeId) -> Self {
        Self {
            message_type: payload.message_type(),
            source,
            destination,
            payload: Some(payload),
            valid: true,
        }
    }

    /// Decode a message header from a byte buffer.
    ///
    /// A buffer that is too short or names an unknown type or node still
    /// produces a message, but one whose [`Message::is_valid`] is false.
    /// Fields that could not be decoded are left as [`MessageType::Unknown`]
    /// and [`NodeId::None`].
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut message = Self::new(MessageType::Unknown, NodeId::None, NodeId::None);
        let mut reader = ByteReader::new(data);

        let decoded = (|| -> Result<bool, PackingError> {
            let message_type = MessageType::from_code(reader.read::<u8>()?);
            if let Some(message_type) = message_type {
                message.message_type = message_type;
            }

            let source = NodeId::from_code(reader.read::<u8>()?);
            if let Some(source) = source {
                message.source = source;
            }

            let destination = NodeId::from_code(reader.read::<u8>()?);
            if let Some(destination) = destination {
                message.destination = destination;
            }

            Ok(message_type.is_some() && source.is_some() && destination.is_some())
        })();

        message.valid = matches!(decoded, Ok(true));
        message
    }

    /// Encode the message header (type, source, destination) into bytes.
    ///
    /// Payloads are not part of the header; links that carry payloads
    /// append them after it.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer
            .write(self.message_type.code())
            .write(self.source.code())
            .write(self.destination.code());
        writer.into_bytes()
    }

    /// The type of this message
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The node that produced this message
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// The node this message is addressed to ([`NodeId::None`] for broadcasts)
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Whether this message is a broadcast
    pub fn is_broadcast(&self) -> bool {
        self.destination.is_none()
    }

    /// The typed data carried by this message, if any
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Whether the message was constructed correctly
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_default_to_none() {
        let message = Message::of_type(MessageType::WindData);
        assert_eq!(message.source(), NodeId::None);
        assert_eq!(message.destination(), NodeId::None);
        assert!(message.is_broadcast());
        assert!(message.is_valid());

        let message = Message::with_source(MessageType::CompassData, NodeId::Compass);
        assert_eq!(message.source(), NodeId::Compass);
        assert_eq!(message.destination(), NodeId::None);

        let message = Message::new(MessageType::RudderCommand, NodeId::CourseRegulator, NodeId::ActuatorAspire);
        assert_eq!(message.destination(), NodeId::ActuatorAspire);
        assert!(!message.is_broadcast());
        assert!(message.payload().is_none());
    }

    #[test]
    fn test_payload_sets_message_type() {
        let message = Message::with_payload(
            Payload::RudderCommand { angle: 12.5 },
            NodeId::CourseRegulator,
            NodeId::None,
        );
        assert_eq!(message.message_type(), MessageType::RudderCommand);
        assert_eq!(message.payload(), Some(&Payload::RudderCommand { angle: 12.5 }));
    }

    #[test]
    fn test_sentinels_mark_payloads_without_data() {
        let reading = Payload::WindData {
            direction: 270.0,
            speed: 8.0,
            temperature: 12.0,
        };
        let gust = Payload::WindData {
            direction: 270.0,
            speed: DATA_OUT_OF_RANGE,
            temperature: 12.0,
        };
        assert!(reading.has_data());
        assert!(!gust.has_data());

        assert!(Payload::RudderCommand { angle: -12.0 }.has_data());
        assert!(!Payload::WingSailCommand { tail_angle: NO_COMMAND }.has_data());
        assert!(!Payload::CurrentSensorData {
            current: 1.5,
            voltage: DATA_OUT_OF_RANGE,
            element: 2,
        }
        .has_data());
    }

    #[test]
    fn test_header_bytes() {
        let message = Message::new(MessageType::WingSailCommand, NodeId::WingSailControl, NodeId::ActuatorAspire);
        let bytes = message.to_bytes();
        assert_eq!(bytes, vec![8, 18, 11]);
        assert_eq!(bytes.len(), HEADER_LEN);

        let decoded = Message::from_bytes(&bytes);
        assert!(decoded.is_valid());
        assert_eq!(decoded.message_type(), MessageType::WingSailCommand);
        assert_eq!(decoded.source(), NodeId::WingSailControl);
        assert_eq!(decoded.destination(), NodeId::ActuatorAspire);
    }

    #[test]
    fn test_truncated_buffer_is_invalid() {
        let decoded = Message::from_bytes(&[5, 12]);
        assert!(!decoded.is_valid());
        assert_eq!(decoded.message_type(), MessageType::WindState);
        assert_eq!(decoded.source(), NodeId::WindState);
        assert_eq!(decoded.destination(), NodeId::None);

        assert!(!Message::from_bytes(&[]).is_valid());
    }

    #[test]
    fn test_unknown_codes_are_invalid() {
        let decoded = Message::from_bytes(&[250, 1, 0]);
        assert!(!decoded.is_valid());
        assert_eq!(decoded.message_type(), MessageType::Unknown);
        assert_eq!(decoded.source(), NodeId::AutopilotRead);
    }
}
