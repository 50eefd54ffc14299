use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default epoch: Friday, January 1, 2016 00:00:00 UTC
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_451_606_400_000);

/// Default layout for [`parse_epoch`], e.g. `2016-01-01 00:00:00 +0000`.
pub const DEFAULT_EPOCH_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// Workers subtract their configured epoch themselves, so a time source only
/// has to report absolute time. Implementations must not smooth over backward
/// jumps: the worker relies on seeing them to refuse minting.
///
/// # Example
///
/// ```
/// use snowmint::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_451_606_400_123
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1_451_606_400_123);
/// ```
pub trait TimeSource {
    /// Returns the current time in whole milliseconds since 1970-01-01 UTC.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as 0, which every worker treats as a
        // rollback behind its epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}

/// Parses an absolute timestamp carrying a UTC offset into an epoch.
///
/// `format` uses `chrono` strftime syntax; see [`DEFAULT_EPOCH_FORMAT`].
/// Fractional seconds below one millisecond are truncated.
///
/// # Errors
///
/// Returns [`Error::InvalidEpoch`] if the input does not match the format or
/// lies before 1970-01-01 UTC.
///
/// # Example
///
/// ```
/// use snowmint::{parse_epoch, DEFAULT_EPOCH, DEFAULT_EPOCH_FORMAT};
///
/// let epoch = parse_epoch("2016-01-01 00:00:00 +0000", DEFAULT_EPOCH_FORMAT).unwrap();
/// assert_eq!(epoch, DEFAULT_EPOCH);
/// ```
pub fn parse_epoch(input: &str, format: &str) -> Result<Duration> {
    let invalid = |reason: String| Error::InvalidEpoch {
        input: input.to_string(),
        reason,
    };

    let parsed = DateTime::<FixedOffset>::parse_from_str(input, format)
        .map_err(|e| invalid(e.to_string()))?;
    let millis = parsed.timestamp_millis();
    if millis < 0 {
        return Err(invalid("epoch precedes 1970-01-01 UTC".to_string()));
    }
    Ok(Duration::from_millis(millis as u64))
}
