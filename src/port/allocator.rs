use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Inclusive range of host ports servers may be published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl PortRange {
    /// Default Minecraft port and the hundred above it.
    pub const DEFAULT: PortRange = PortRange {
        min: 25565,
        max: 25665,
    };

    pub fn new(min: u16, max: u16) -> Result<Self> {
        if min > max {
            return Err(Error::Config(format!(
                "Port range is empty: min {} is greater than max {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.min..=self.max).contains(&port)
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        usize::from(self.max - self.min) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Pick the lowest port in `range` that is not in `used`.
///
/// Pure and deterministic; nothing is reserved. Callers that need the port
/// to stay free must persist it under a uniqueness constraint in the same
/// transaction (see `ServerStore::create`).
pub fn allocate(used: &BTreeSet<u16>, range: PortRange) -> Result<u16> {
    (range.min..=range.max)
        .find(|port| !used.contains(port))
        .ok_or(Error::PortsExhausted {
            min: range.min,
            max: range.max,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: u16, max: u16) -> PortRange {
        PortRange::new(min, max).unwrap()
    }

    #[test]
    fn returns_first_gap() {
        let used = BTreeSet::from([25565, 25566, 25568]);
        assert_eq!(allocate(&used, range(25565, 25570)).unwrap(), 25567);
    }

    #[test]
    fn starts_at_min_when_nothing_used() {
        assert_eq!(allocate(&BTreeSet::new(), range(25565, 25570)).unwrap(), 25565);
    }

    #[test]
    fn ignores_used_ports_outside_range() {
        let used = BTreeSet::from([80, 443, 30000]);
        assert_eq!(allocate(&used, range(25565, 25570)).unwrap(), 25565);
    }

    #[test]
    fn full_range_is_exhausted() {
        let used: BTreeSet<u16> = (25565..=25570).collect();
        let err = allocate(&used, range(25565, 25570)).unwrap_err();
        assert!(matches!(
            err,
            Error::PortsExhausted {
                min: 25565,
                max: 25570
            }
        ));
    }

    #[test]
    fn range_ending_at_u16_max_does_not_overflow() {
        let used = BTreeSet::from([u16::MAX - 1]);
        assert_eq!(allocate(&used, range(u16::MAX - 1, u16::MAX)).unwrap(), u16::MAX);

        let used = BTreeSet::from([u16::MAX - 1, u16::MAX]);
        assert!(allocate(&used, range(u16::MAX - 1, u16::MAX)).is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(PortRange::new(10, 9), Err(Error::Config(_))));
        assert_eq!(range(10, 10).len(), 1);
    }
}
