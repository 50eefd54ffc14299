//! Retry and batch policies layered over a [`Mint`] implementation.
//!
//! The worker underneath never waits for the clock. [`Issuer`] turns its
//! transient failures into a bounded number of immediate re-attempts, and
//! builds all-or-nothing batches out of single issues.

use core::num::NonZeroUsize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Error, Mint, Result, SnowflakeId};

/// Number of attempts per ID when none is configured.
pub const DEFAULT_RETRY: usize = 5;

/// Number of IDs in a batch when the caller does not ask for a size.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// How many times a single issue may call the generator before giving up.
///
/// Always at least one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetryBudget(NonZeroUsize);

impl RetryBudget {
    /// Creates a budget of `attempts`, treating `0` as `1`.
    pub const fn new(attempts: usize) -> Self {
        match NonZeroUsize::new(attempts) {
            Some(n) => Self(n),
            None => Self(NonZeroUsize::MIN),
        }
    }

    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY)
    }
}

impl From<NonZeroUsize> for RetryBudget {
    fn from(attempts: NonZeroUsize) -> Self {
        Self(attempts)
    }
}

/// Issues single IDs and batches with a bounded retry policy.
///
/// Retries run back to back with no sleep in between; each re-attempt simply
/// hopes to observe a later millisecond. A value is only ever returned from a
/// successful mint; when the budget runs out the last error is returned as is.
///
/// # Example
///
/// ```
/// use core::num::NonZeroUsize;
/// use snowmint::{IdWorker, Issuer, RetryBudget, SystemClock, DEFAULT_EPOCH};
///
/// let worker = IdWorker::new(1, 1, DEFAULT_EPOCH, SystemClock).unwrap();
/// let issuer = Issuer::new(worker, RetryBudget::new(5));
///
/// let ids = issuer.issue_batch(NonZeroUsize::new(3).unwrap(), None).unwrap();
/// assert_eq!(ids.len(), 3);
/// assert!(ids[0] < ids[1] && ids[1] < ids[2]);
/// ```
#[derive(Debug)]
pub struct Issuer<G>
where
    G: Mint,
{
    generator: G,
    retry: RetryBudget,
}

impl<G> Issuer<G>
where
    G: Mint,
{
    pub fn new(generator: G, retry: RetryBudget) -> Self {
        Self { generator, retry }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn retry_budget(&self) -> RetryBudget {
        self.retry
    }

    /// Issues one ID, retrying transient failures up to the budget.
    ///
    /// # Errors
    ///
    /// Returns the most recent generator error once every attempt has failed,
    /// or immediately if the error is not transient.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn issue_one(&self, tag: Option<&str>) -> Result<SnowflakeId> {
        let budget = self.retry.get();
        let mut attempt = 1;
        loop {
            match self.generator.try_mint(tag) {
                Ok(id) => return Ok(id),
                Err(e) if e.is_transient() && attempt < budget => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(attempt, budget, error = %e, "retrying mint");
                    attempt += 1;
                }
                Err(e) => return Err(Self::cold_give_up(e, attempt)),
            }
        }
    }

    /// Issues `count` IDs in generation order.
    ///
    /// No lock is held across the batch, so IDs issued to other callers may
    /// interleave with these.
    ///
    /// # Errors
    ///
    /// Fails as a whole, discarding every ID already issued, if any single
    /// issue fails.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn issue_batch(&self, count: NonZeroUsize, tag: Option<&str>) -> Result<Vec<SnowflakeId>> {
        let mut ids = Vec::with_capacity(count.get());
        for _ in 0..count.get() {
            ids.push(self.issue_one(tag)?);
        }
        Ok(ids)
    }

    #[cold]
    #[inline(never)]
    fn cold_give_up(e: Error, _attempts: usize) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(attempts = _attempts, error = %e, "giving up on mint");
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_EPOCH, IdWorker, SystemClock, TimeSource};
    use parking_lot::Mutex;
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed script of outcomes, then keeps failing.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<SnowflakeId>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(outcomes: impl IntoIterator<Item = Result<SnowflakeId>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Mint for Scripted {
        fn try_mint(&self, _tag: Option<&str>) -> Result<SnowflakeId> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or(Err(Error::SequenceExhausted { timestamp: 0 }))
        }
    }

    /// Succeeds for the first `ok` calls, then fails forever.
    struct FailAfter {
        ok: usize,
        calls: AtomicUsize,
    }

    impl Mint for FailAfter {
        fn try_mint(&self, _tag: Option<&str>) -> Result<SnowflakeId> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.ok {
                Ok(SnowflakeId::from_components(1, 1, 1, call as u64))
            } else {
                Err(Error::ClockRollback { last: 1, now: 0 })
            }
        }
    }

    fn rollback() -> Error {
        Error::ClockRollback { last: 10, now: 9 }
    }

    fn exhausted() -> Error {
        Error::SequenceExhausted { timestamp: 10 }
    }

    #[test]
    fn retry_budget_clamps_zero() {
        assert_eq!(RetryBudget::new(0).get(), 1);
        assert_eq!(RetryBudget::new(3).get(), 3);
        assert_eq!(RetryBudget::default().get(), DEFAULT_RETRY);
    }

    #[test]
    fn issue_one_returns_first_success() {
        let id = SnowflakeId::from_components(10, 1, 1, 0);
        let issuer = Issuer::new(Scripted::new([Ok(id)]), RetryBudget::new(5));
        assert_eq!(issuer.issue_one(None), Ok(id));
        assert_eq!(issuer.generator().calls(), 1);
    }

    #[test]
    fn issue_one_retries_transient_failures() {
        let id = SnowflakeId::from_components(11, 1, 1, 0);
        let issuer = Issuer::new(
            Scripted::new([Err(exhausted()), Err(rollback()), Ok(id)]),
            RetryBudget::new(5),
        );
        assert_eq!(issuer.issue_one(Some("client")), Ok(id));
        assert_eq!(issuer.generator().calls(), 3);
    }

    #[test]
    fn issue_one_surfaces_last_error_when_budget_exhausted() {
        let issuer = Issuer::new(
            Scripted::new([Err(exhausted()), Err(exhausted()), Err(rollback())]),
            RetryBudget::new(3),
        );
        assert_eq!(issuer.issue_one(None), Err(rollback()));
        assert_eq!(issuer.generator().calls(), 3);
    }

    #[test]
    fn issue_one_never_exceeds_budget() {
        let id = SnowflakeId::from_components(12, 1, 1, 0);
        let issuer = Issuer::new(
            Scripted::new([Err(exhausted()), Err(exhausted()), Ok(id)]),
            RetryBudget::new(2),
        );
        assert_eq!(issuer.issue_one(None), Err(exhausted()));
        assert_eq!(issuer.generator().calls(), 2);
    }

    #[test]
    fn issue_one_with_zero_budget_still_attempts_once() {
        let id = SnowflakeId::from_components(13, 1, 1, 0);
        let issuer = Issuer::new(Scripted::new([Ok(id)]), RetryBudget::new(0));
        assert_eq!(issuer.issue_one(None), Ok(id));
    }

    #[test]
    fn issue_one_does_not_retry_fatal_errors() {
        let overflow = Error::TimestampOverflow { timestamp: 1 << 41 };
        let issuer = Issuer::new(
            Scripted::new([Err(overflow.clone())]),
            RetryBudget::new(5),
        );
        assert_eq!(issuer.issue_one(None), Err(overflow));
        assert_eq!(issuer.generator().calls(), 1);
    }

    #[test]
    fn issue_batch_returns_distinct_increasing_ids() {
        let worker = IdWorker::new(1, 1, DEFAULT_EPOCH, SystemClock).unwrap();
        let issuer = Issuer::new(worker, RetryBudget::new(5));

        let ids = issuer
            .issue_batch(NonZeroUsize::new(5).unwrap(), None)
            .unwrap();
        assert_eq!(ids.len(), 5);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn issue_batch_is_all_or_nothing() {
        let issuer = Issuer::new(
            FailAfter {
                ok: 2,
                calls: AtomicUsize::new(0),
            },
            RetryBudget::new(5),
        );

        let result = issuer.issue_batch(NonZeroUsize::new(5).unwrap(), None);
        assert_eq!(result, Err(Error::ClockRollback { last: 1, now: 0 }));
        // Two successes, then the third ID burned its whole budget.
        assert_eq!(issuer.generator().calls.load(Ordering::SeqCst), 2 + 5);
    }

    #[test]
    fn issue_batch_shares_worker_with_single_issues() {
        struct Frozen;
        impl TimeSource for Frozen {
            fn current_millis(&self) -> u64 {
                DEFAULT_EPOCH.as_millis() as u64 + 1
            }
        }

        let worker = IdWorker::new(1, 1, DEFAULT_EPOCH, Frozen).unwrap();
        let issuer = Issuer::new(&worker, RetryBudget::new(1));

        let first = issuer.issue_one(None).unwrap();
        let batch = issuer
            .issue_batch(NonZeroUsize::new(3).unwrap(), None)
            .unwrap();
        assert_eq!(first.sequence(), 0);
        assert_eq!(
            batch.iter().map(SnowflakeId::sequence).collect::<Vec<_>>(),
            [1, 2, 3]
        );
    }
}
