//! Time source for control loops.
//!
//! Every wait and deadline in cephroll goes through a [`Clock`], so tests can
//! drive hours of polling in virtual time with [`ManualClock`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

/// Wall-clock reads plus sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);

    /// Current time as fractional Unix seconds.
    fn epoch_secs(&self) -> f64 {
        epoch_secs_of(self.now())
    }

    /// Time elapsed since `earlier`, saturating at zero.
    fn elapsed_since(&self, earlier: SystemTime) -> Duration {
        self.now().duration_since(earlier).unwrap_or_default()
    }
}

/// Fractional Unix seconds for a `SystemTime`.
pub fn epoch_secs_of(t: SystemTime) -> f64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

/// The real clock: `SystemTime::now` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock for tests. Sleeping advances time instantly.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    now: SystemTime,
    slept: Vec<Duration>,
}

impl ManualClock {
    /// Start the clock at `epoch_secs` seconds after the Unix epoch.
    pub fn starting_at(epoch_secs: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                now: UNIX_EPOCH + Duration::from_secs(epoch_secs),
                slept: Vec::new(),
            })),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.now += by;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().slept.clone()
    }

    /// Total virtual time spent sleeping.
    pub fn total_slept(&self) -> Duration {
        self.lock().slept.iter().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // A poisoned clock only happens after a test already panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.now += duration;
        state.slept.push(duration);
    }
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> SystemTime {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::starting_at(1_000);
        assert_eq!(clock.epoch_secs(), 1_000.0);

        clock.sleep(Duration::from_secs(30)).await;
        clock.sleep(Duration::from_secs(5)).await;

        assert_eq!(clock.epoch_secs(), 1_035.0);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(30), Duration::from_secs(5)]
        );
        assert_eq!(clock.total_slept(), Duration::from_secs(35));
    }

    #[test]
    fn manual_clock_advance_is_not_a_sleep() {
        let clock = ManualClock::starting_at(0);
        let start = clock.now();
        clock.advance(Duration::from_secs(600));
        assert_eq!(clock.elapsed_since(start), Duration::from_secs(600));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn clones_share_time() {
        let a = ManualClock::starting_at(10);
        let b = a.clone();
        a.advance(Duration::from_secs(5));
        assert_eq!(b.epoch_secs(), 15.0);
    }
}
