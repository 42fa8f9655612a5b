/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::time::Duration;

/// Units of measurement
pub mod unit;

/// Atomic counters
pub mod instruments;

mod aggregators;

pub use aggregators::{OperationCounters, OperationSnapshot, ResultAggregator};

use unit::ByteUnit;

/// Measured bytes transferred over some duration
#[derive(Debug, Clone, Copy)]
pub struct Throughput {
    bytes_transferred: u64,
    elapsed: Duration,
}

impl Throughput {
    /// Create a new throughput measurement with the given bytes transferred and time elapsed
    pub const fn new(bytes_transferred: u64, elapsed: Duration) -> Throughput {
        Throughput {
            bytes_transferred,
            elapsed,
        }
    }

    /// Convert this throughput into a specific unit per second
    ///
    /// A measurement over zero elapsed time is reported as zero.
    pub fn as_unit_per_sec(&self, unit: ByteUnit) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        unit.convert(self.bytes_transferred as f64) / secs
    }

    /// Convert this throughput into bytes / sec
    pub fn as_bytes_per_sec(&self) -> f64 {
        self.as_unit_per_sec(ByteUnit::Byte)
    }

    /// Total bytes transferred
    pub const fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Time over which the bytes were transferred
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns a type that can be used to format/display this throughput in a particular unit
    pub fn display_as(&self, unit: ByteUnit) -> ThroughputDisplayContext<'_> {
        ThroughputDisplayContext {
            throughput: self,
            unit,
        }
    }
}

impl PartialEq for Throughput {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes_per_sec() == other.as_bytes_per_sec()
    }
}

impl PartialOrd for Throughput {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.as_bytes_per_sec()
            .partial_cmp(&other.as_bytes_per_sec())
    }
}

/// Formats in the largest binary unit the rate fills at least once
impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = ByteUnit::best_fit(self.as_bytes_per_sec() as u64);
        fmt::Display::fmt(&self.display_as(unit), f)
    }
}

/// Display context to format throughput in a particular unit
#[derive(Debug)]
pub struct ThroughputDisplayContext<'a> {
    /// The throughput measurement to display
    pub throughput: &'a Throughput,
    /// The precise unit to display the throughput as
    pub unit: ByteUnit,
}

impl fmt::Display for ThroughputDisplayContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(precision) = f.precision() {
            write!(
                f,
                "{1:.*} {2:}/s",
                precision,
                self.throughput.as_unit_per_sec(self.unit),
                self.unit.as_str()
            )
        } else {
            write!(
                f,
                "{} {}/s",
                self.throughput.as_unit_per_sec(self.unit),
                self.unit.as_str()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{unit::ByteUnit, Throughput};

    #[test]
    fn test_throughput_display() {
        let t = Throughput::new(1_048_576, Duration::from_secs(1));
        assert_eq!("1 MiB/s", format!("{t}"));
        assert_eq!("1048576 B/s", format!("{}", t.display_as(ByteUnit::Byte)));
        assert_eq!("1024 KiB/s", format!("{}", t.display_as(ByteUnit::Kibibyte)));
        assert_eq!(
            "0.001 GiB/s",
            format!("{:.3}", t.display_as(ByteUnit::Gibibyte))
        );

        let t = Throughput::new(3 * 1_048_576, Duration::from_secs(2));
        assert_eq!("1.5 MiB/s", format!("{t:.1}"));
    }

    #[test]
    fn test_zero_elapsed() {
        let t = Throughput::new(1024, Duration::ZERO);
        assert_eq!(0.0, t.as_bytes_per_sec());
        assert_eq!("0.0 B/s", format!("{t:.1}"));
    }
}
