use core::{cmp::Ordering, time::Duration};
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::{Error, IdentityKind, Result},
    generator::Mint,
    id::SnowflakeId,
    time::{SystemClock, TimeSource},
};

/// Mutable generation state, only ever touched under the worker's lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct State {
    /// Milliseconds since the epoch at the last successful mint; `None` until
    /// the first one.
    pub(crate) last_timestamp: Option<u64>,
    pub(crate) sequence: u64,
}

/// A lock-based Snowflake ID worker with a fixed datacenter/worker identity.
///
/// Every mint reads the clock, compares it with the last issued timestamp and
/// updates the sequence inside one critical section, so concurrent callers
/// can never observe the same `(timestamp, sequence)` pair.
///
/// Unlike a spinning generator, a worker never waits: when the current
/// millisecond is full it fails with [`Error::SequenceExhausted`], and when
/// the clock has moved backwards it fails with [`Error::ClockRollback`].
/// Retrying is the caller's decision (see [`Issuer`]).
///
/// ## Features
/// - ✅ Thread-safe (`Send + Sync` whenever the time source is)
/// - ✅ Detects clock rollback instead of reissuing past timestamps
/// - ✅ Bounded: each call completes without waiting on the clock
///
/// [`Issuer`]: crate::Issuer
pub struct IdWorker<T = SystemClock>
where
    T: TimeSource,
{
    datacenter_id: u64,
    worker_id: u64,
    epoch: Duration,
    epoch_millis: u64,
    pub(crate) state: Mutex<State>,
    time: T,
}

impl<T> IdWorker<T>
where
    T: TimeSource,
{
    /// Creates a worker for the given identity.
    ///
    /// # Parameters
    ///
    /// - `datacenter_id`, `worker_id`: identity encoded into every ID. Each
    ///   must fit in 5 bits (0-31).
    /// - `epoch`: zero point of the timestamp field, as a [`Duration`] since
    ///   1970-01-01 UTC.
    /// - `time`: the [`TimeSource`] read on every mint.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidIdentity`] if either identity is out of range.
    /// - [`Error::InvalidEpoch`] if `epoch` lies in the future according to
    ///   `time`.
    ///
    /// # Example
    /// ```
    /// use snowmint::{IdWorker, SystemClock, DEFAULT_EPOCH};
    ///
    /// let worker = IdWorker::new(1, 1, DEFAULT_EPOCH, SystemClock).unwrap();
    /// let id = loop {
    ///     match worker.mint() {
    ///         Ok(id) => break id,
    ///         Err(e) if e.is_transient() => std::thread::yield_now(),
    ///         Err(e) => panic!("{e}"),
    ///     }
    /// };
    /// assert_eq!(id.datacenter_id(), 1);
    /// assert_eq!(id.worker_id(), 1);
    /// ```
    pub fn new(datacenter_id: u64, worker_id: u64, epoch: Duration, time: T) -> Result<Self> {
        if datacenter_id > SnowflakeId::MAX_DATACENTER_ID {
            return Err(Error::InvalidIdentity {
                kind: IdentityKind::Datacenter,
                value: datacenter_id,
                max: SnowflakeId::MAX_DATACENTER_ID,
            });
        }
        if worker_id > SnowflakeId::MAX_WORKER_ID {
            return Err(Error::InvalidIdentity {
                kind: IdentityKind::Worker,
                value: worker_id,
                max: SnowflakeId::MAX_WORKER_ID,
            });
        }

        let epoch_millis = u64::try_from(epoch.as_millis()).map_err(|_| Error::InvalidEpoch {
            input: format!("{epoch:?}"),
            reason: "epoch does not fit in 64-bit milliseconds".to_string(),
        })?;
        let now = time.current_millis();
        if epoch_millis > now {
            return Err(Error::InvalidEpoch {
                input: format!("{epoch_millis}ms"),
                reason: format!("epoch is {}ms in the future", epoch_millis - now),
            });
        }

        Ok(Self {
            datacenter_id,
            worker_id,
            epoch,
            epoch_millis,
            state: Mutex::new(State::default()),
            time,
        })
    }

    pub fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// The epoch timestamps are measured from, since 1970-01-01 UTC.
    pub fn epoch(&self) -> Duration {
        self.epoch
    }

    /// Attempts to mint the next ID.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRollback`]: the clock is behind the last mint.
    /// - [`Error::SequenceExhausted`]: 4096 IDs were already minted this
    ///   millisecond.
    /// - [`Error::TimestampOverflow`]: the epoch's 41-bit range is used up.
    ///
    /// No state changes on failure.
    pub fn mint(&self) -> Result<SnowflakeId> {
        self.mint_with_tag(None)
    }

    /// Same as [`Self::mint`], recording `tag` in the trace span.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "trace",
            skip(self),
            fields(datacenter_id = self.datacenter_id, worker_id = self.worker_id)
        )
    )]
    pub fn mint_with_tag(&self, tag: Option<&str>) -> Result<SnowflakeId> {
        // Audit metadata only; never part of the bit pattern.
        let _ = tag;

        let mut state = self.state.lock();

        let Some(now) = self.time.current_millis().checked_sub(self.epoch_millis) else {
            return Err(Self::cold_clock_behind(state.last_timestamp.unwrap_or(0), 0));
        };

        match state.last_timestamp.map(|last| now.cmp(&last)) {
            Some(Ordering::Equal) => {
                if state.sequence >= SnowflakeId::MAX_SEQUENCE {
                    return Err(Error::SequenceExhausted { timestamp: now });
                }
                state.sequence += 1;
            }
            Some(Ordering::Greater) | None => {
                if now > SnowflakeId::MAX_TIMESTAMP {
                    return Err(Error::TimestampOverflow { timestamp: now });
                }
                state.last_timestamp = Some(now);
                state.sequence = 0;
            }
            Some(Ordering::Less) => {
                return Err(Self::cold_clock_behind(
                    state.last_timestamp.unwrap_or(0),
                    now,
                ));
            }
        }

        Ok(SnowflakeId::from_components(
            now,
            self.datacenter_id,
            self.worker_id,
            state.sequence,
        ))
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(last: u64, now: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(last, now, "clock moved backwards, refusing to mint");
        Error::ClockRollback { last, now }
    }
}

impl<T> Mint for IdWorker<T>
where
    T: TimeSource,
{
    fn try_mint(&self, tag: Option<&str>) -> Result<SnowflakeId> {
        self.mint_with_tag(tag)
    }
}

impl<T> core::fmt::Debug for IdWorker<T>
where
    T: TimeSource,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdWorker")
            .field("datacenter_id", &self.datacenter_id)
            .field("worker_id", &self.worker_id)
            .field("epoch_millis", &self.epoch_millis)
            .finish_non_exhaustive()
    }
}
