use core::fmt;

/// A result type defaulting to the crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Which half of the machine identity was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Datacenter,
    Worker,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Datacenter => f.write_str("datacenter id"),
            Self::Worker => f.write_str("worker id"),
        }
    }
}

/// All error variants that `snowmint` can emit.
///
/// Only [`Error::ClockRollback`] and [`Error::SequenceExhausted`] are raised
/// while minting; both are transient and resolve once the clock moves forward.
/// The remaining variants are raised while constructing a worker and are fatal
/// to startup.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The clock reports a time earlier than the last successful mint.
    ///
    /// `now` and `last` are milliseconds since the worker's epoch. A wall
    /// clock that falls behind the epoch itself is reported with `now = 0`.
    #[error("clock moved backwards: now {now}ms is behind last mint at {last}ms")]
    ClockRollback { last: u64, now: u64 },

    /// Every sequence value for the current millisecond has been issued.
    #[error("sequence exhausted for millisecond {timestamp}")]
    SequenceExhausted { timestamp: u64 },

    /// A datacenter or worker id does not fit in its 5-bit field.
    #[error("{kind} {value} is out of range (max {max})")]
    InvalidIdentity {
        kind: IdentityKind,
        value: u64,
        max: u64,
    },

    /// The epoch could not be parsed, or lies outside the usable range.
    #[error("invalid epoch {input:?}: {reason}")]
    InvalidEpoch { input: String, reason: String },

    /// The elapsed time since the epoch no longer fits the 41-bit timestamp.
    #[error("timestamp {timestamp}ms exceeds the 41-bit range of the epoch")]
    TimestampOverflow { timestamp: u64 },
}

impl Error {
    /// Returns `true` for failures that a retry may resolve once the clock
    /// advances.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ClockRollback { .. } | Self::SequenceExhausted { .. }
        )
    }
}
