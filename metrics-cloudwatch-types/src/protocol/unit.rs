use std::fmt;
use std::str;

use serde::Serialize;
use thiserror::Error;

/// An error used when parsing `StandardUnit`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid standard unit: {0}")]
pub struct ParseStandardUnitError(String);

macro_rules! standard_units {
    ($($(#[$attr:meta])* $variant:ident => $name:literal,)*) => {
        /// The unit of a metric datum, as understood by CloudWatch.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Default)]
        pub enum StandardUnit {
            $(
                $(#[$attr])*
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl StandardUnit {
            /// Returns the wire name of the unit.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(StandardUnit::$variant => $name,)*
                }
            }
        }

        impl str::FromStr for StandardUnit {
            type Err = ParseStandardUnitError;

            fn from_str(string: &str) -> Result<Self, Self::Err> {
                Ok(match string {
                    $($name => StandardUnit::$variant,)*
                    _ => return Err(ParseStandardUnitError(string.to_owned())),
                })
            }
        }
    };
}

standard_units! {
    /// Seconds.
    Seconds => "Seconds",
    /// Microseconds.
    Microseconds => "Microseconds",
    /// Milliseconds.
    Milliseconds => "Milliseconds",
    /// Bytes.
    Bytes => "Bytes",
    /// Kilobytes.
    Kilobytes => "Kilobytes",
    /// Megabytes.
    Megabytes => "Megabytes",
    /// Gigabytes.
    Gigabytes => "Gigabytes",
    /// Terabytes.
    Terabytes => "Terabytes",
    /// Bits.
    Bits => "Bits",
    /// Kilobits.
    Kilobits => "Kilobits",
    /// Megabits.
    Megabits => "Megabits",
    /// Gigabits.
    Gigabits => "Gigabits",
    /// Terabits.
    Terabits => "Terabits",
    /// Percent.
    Percent => "Percent",
    /// A plain count of events.
    Count => "Count",
    /// Bytes per second.
    BytesPerSecond => "Bytes/Second",
    /// Kilobytes per second.
    KilobytesPerSecond => "Kilobytes/Second",
    /// Megabytes per second.
    MegabytesPerSecond => "Megabytes/Second",
    /// Gigabytes per second.
    GigabytesPerSecond => "Gigabytes/Second",
    /// Terabytes per second.
    TerabytesPerSecond => "Terabytes/Second",
    /// Bits per second.
    BitsPerSecond => "Bits/Second",
    /// Kilobits per second.
    KilobitsPerSecond => "Kilobits/Second",
    /// Megabits per second.
    MegabitsPerSecond => "Megabits/Second",
    /// Gigabits per second.
    GigabitsPerSecond => "Gigabits/Second",
    /// Terabits per second.
    TerabitsPerSecond => "Terabits/Second",
    /// Events per second.
    CountPerSecond => "Count/Second",
    /// Untyped value.
    #[default]
    None => "None",
}

impl fmt::Display for StandardUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
