//! Hardware readings that reserve an all-ones value for "not available".
//!
//! The agent reports a missing reading by filling the field with the
//! all-ones pattern of the width the value was sampled at, independent of
//! the integer type that carries it on the wire. Each width gets its own
//! newtype so the sentinel is checked in exactly one place.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! integer_reading {
    ($(#[$meta:meta])* $name:ident, $sentinel:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(pub u64);

        impl $name {
            pub const SENTINEL: u64 = $sentinel;

            pub const fn unavailable() -> Self {
                Self(Self::SENTINEL)
            }

            pub fn value(self) -> Option<u64> {
                if self.0 == Self::SENTINEL {
                    None
                } else {
                    Some(self.0)
                }
            }

            /// The reading when it is both available and non-zero.
            pub fn shown(self) -> Option<u64> {
                self.value().filter(|v| *v != 0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.value().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = Option::<u64>::deserialize(deserializer)?;
                Ok(Self(raw.unwrap_or(Self::SENTINEL)))
            }
        }
    };
}

integer_reading!(
    /// Value sampled as 16 bits; 0xffff means not available.
    Reading16,
    0xffff
);
integer_reading!(
    /// Value sampled as 32 bits; 0xffff_ffff means not available.
    Reading32,
    0xffff_ffff
);
integer_reading!(
    /// Value sampled as 64 bits; all ones means not available.
    Reading64,
    u64::MAX
);

/// Analog sensor reading (temperatures); 65535.0 means not available.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnalogReading(pub f32);

impl AnalogReading {
    pub const SENTINEL: f32 = 65535.0;

    pub const fn unavailable() -> Self {
        Self(Self::SENTINEL)
    }

    pub fn value(self) -> Option<f32> {
        if self.0 == Self::SENTINEL {
            None
        } else {
            Some(self.0)
        }
    }

    pub fn shown(self) -> Option<f32> {
        self.value().filter(|v| *v != 0.0)
    }
}

impl From<f32> for AnalogReading {
    fn from(raw: f32) -> Self {
        Self(raw)
    }
}

impl Serialize for AnalogReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnalogReading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<f32>::deserialize(deserializer)?;
        Ok(Self(raw.unwrap_or(Self::SENTINEL)))
    }
}
