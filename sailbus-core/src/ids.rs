//!
//! Node identities and message kinds.
//!
//! Both are closed enumerations with a stable numeric code (used in
//! packed message headers and the diagnostic message log) and a display
//! name.
//!

use std::fmt;

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident = $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[allow(missing_docs)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$variant_meta])* $variant ),+
        }

        impl $name {
            /// Every variant, in code order
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// The stable numeric code of this variant
            pub const fn code(self) -> u8 {
                match self {
                    $( $name::$variant => $code ),+
                }
            }

            /// Look a variant up by its numeric code
            pub const fn from_code(code: u8) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// The display name of this variant
            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),+
                }
            }

            /// Look a variant up by its display name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( stringify!($variant) => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

coded_enum! {
    /// Identity of a node on the bus.
    ///
    /// `NodeId::None` is reserved: it is the destination of broadcast
    /// messages and the source of messages with no particular origin.
    /// It is never the identity of a registered node.
    pub enum NodeId {
        /// No specific node
        None = 0,
        AutopilotRead = 1,
        AutopilotWrite = 2,
        ArduPilotRead = 3,
        CanWindSensor = 4,
        CanArduino = 5,
        CanCurrentSensor = 6,
        MarineSensorCanReceiver = 7,
        MarineSensorCanTransmission = 8,
        Gpsd = 9,
        Compass = 10,
        ActuatorAspire = 11,
        WindState = 12,
        StateEstimation = 13,
        WaypointMgr = 14,
        LineFollow = 15,
        LocalNavigation = 16,
        CourseRegulator = 17,
        WingSailControl = 18,
        SailControl = 19,
        SailSpeedRegulator = 20,
        LowLevelControllerAspire = 21,
        PowerTrack = 22,
        AisProcessing = 23,
        CameraProcessing = 24,
        DbLogger = 25,
        HttpSync = 26,
        LocalWebServer = 27,
        Simulator = 28,
    }
}

coded_enum! {
    /// The kinds of event carried by the bus.
    pub enum MessageType {
        /// Placeholder kind of a message whose header failed to decode
        Unknown = 0,
        WindData = 1,
        CompassData = 2,
        GpsData = 3,
        StateMessage = 4,
        WindState = 5,
        VesselState = 6,
        RudderCommand = 7,
        WingSailCommand = 8,
        SailCommand = 9,
        ActuatorPosition = 10,
        NavigationControl = 11,
        CourseRequest = 12,
        WaypointData = 13,
        ServerConfigsReceived = 14,
        ServerWaypointsReceived = 15,
        LocalConfigChange = 16,
        LocalWaypointChange = 17,
        MarineSensorData = 18,
        CurrentSensorData = 19,
        PowerTrack = 20,
        PowerOffCommand = 21,
        AisData = 22,
        DataRequest = 23,
    }
}

impl NodeId {
    /// Whether this is the reserved "no specific node" identity
    pub const fn is_none(self) -> bool {
        matches!(self, NodeId::None)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_for_every_variant() {
        for id in NodeId::ALL {
            assert_eq!(NodeId::from_code(id.code()), Some(*id));
        }
        for ty in MessageType::ALL {
            assert_eq!(MessageType::from_code(ty.code()), Some(*ty));
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(NodeId::from_code(200), None);
        assert_eq!(MessageType::from_code(255), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(NodeId::WindState.name(), "WindState");
        assert_eq!(MessageType::ServerConfigsReceived.to_string(), "ServerConfigsReceived");
        assert!(NodeId::None.is_none());
        assert!(!NodeId::DbLogger.is_none());
        assert_eq!(NodeId::from_name("CanWindSensor"), Some(NodeId::CanWindSensor));
        assert_eq!(MessageType::from_name("windData"), None);
    }
}
