//! Shared tokens-per-window tracker.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use super::clock::{Clock, SystemClock};
use super::window::{BudgetWindow, DEFAULT_WINDOW, Reservation, Reserve};
use crate::Result;

/// Process-wide quota accounting for one provider.
///
/// Share it behind an `Arc` between every dispatcher that draws on the same
/// quota. Reserve, send and commit for a request all happen while holding a
/// [`BudgetPermit`], so concurrent queries cannot jointly overshoot.
#[derive(Debug)]
pub struct BudgetTracker {
    window: Mutex<BudgetWindow>,
    clock: Arc<dyn Clock>,
}

impl BudgetTracker {
    pub fn new(limit: u64, buffer: u64) -> Result<Self> {
        Self::with_clock(limit, buffer, DEFAULT_WINDOW, Arc::new(SystemClock))
    }

    pub fn with_clock(
        limit: u64,
        buffer: u64,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let window = BudgetWindow::new(limit, buffer, window, clock.now())?;
        Ok(Self {
            window: Mutex::new(window),
            clock,
        })
    }

    /// Waits for exclusive access to the window.
    pub async fn acquire(&self) -> BudgetPermit<'_> {
        BudgetPermit {
            window: self.window.lock().await,
            clock: self.clock.as_ref(),
        }
    }

    pub async fn snapshot(&self) -> BudgetSnapshot {
        self.acquire().await.snapshot()
    }
}

/// Exclusive handle on the budget window for one request.
pub struct BudgetPermit<'a> {
    window: MutexGuard<'a, BudgetWindow>,
    clock: &'a dyn Clock,
}

impl BudgetPermit<'_> {
    /// Asks for room for `estimated` tokens.
    ///
    /// On [`Reserve::Wait`] the caller sleeps for the returned duration, calls
    /// [`reset`](Self::reset), and asks again.
    pub fn reserve(&mut self, estimated: u64) -> Result<Reserve> {
        let now = self.clock.now();
        let reserve = self.window.reserve(estimated, now)?;
        if let Reserve::Wait(wait) = &reserve {
            tracing::debug!(
                estimated,
                consumed = self.window.consumed(),
                capacity = self.window.capacity(),
                wait_ms = wait.as_millis() as u64,
                "Token budget exhausted for current window"
            );
        }
        Ok(reserve)
    }

    /// Starts a fresh window now.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.window.reset(now);
        tracing::debug!("Token budget window reset");
    }

    /// Records the tokens of a request that was actually sent.
    pub fn commit(&mut self, reservation: Reservation) {
        self.window.commit(reservation);
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        let now = self.clock.now();
        BudgetSnapshot {
            consumed: self.window.consumed(),
            limit: self.window.limit(),
            buffer: self.window.buffer(),
            capacity: self.window.capacity(),
            elapsed: self.window.elapsed(now),
            window: self.window.length(),
        }
    }
}

impl std::fmt::Debug for BudgetPermit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetPermit")
            .field("window", &*self.window)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetSnapshot {
    pub consumed: u64,
    pub limit: u64,
    pub buffer: u64,
    pub capacity: u64,
    pub elapsed: Duration,
    pub window: Duration,
}

impl BudgetSnapshot {
    pub fn remaining(&self) -> u64 {
        self.capacity.saturating_sub(self.consumed)
    }

    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.consumed as f64 / self.capacity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::ManualClock;

    fn tracker(clock: Arc<ManualClock>) -> BudgetTracker {
        BudgetTracker::with_clock(6000, 500, DEFAULT_WINDOW, clock).unwrap()
    }

    #[tokio::test]
    async fn test_two_requests_then_wait() {
        let clock = Arc::new(ManualClock::new());
        let tracker = tracker(clock.clone());

        for _ in 0..2 {
            let mut permit = tracker.acquire().await;
            match permit.reserve(2500).unwrap() {
                Reserve::Granted(r) => permit.commit(r),
                Reserve::Wait(d) => panic!("unexpected wait {:?}", d),
            }
            clock.advance(Duration::from_secs(5));
        }

        let mut permit = tracker.acquire().await;
        let wait = permit.reserve(2500).unwrap().wait();
        assert_eq!(wait, Duration::from_secs(50));

        clock.advance(wait);
        permit.reset();
        assert!(permit.reserve(2500).unwrap().is_granted());
        assert_eq!(permit.snapshot().consumed, 0);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let clock = Arc::new(ManualClock::new());
        let tracker = tracker(clock.clone());
        {
            let mut permit = tracker.acquire().await;
            if let Reserve::Granted(r) = permit.reserve(1100).unwrap() {
                permit.commit(r);
            }
        }
        clock.advance(Duration::from_secs(3));

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.consumed, 1100);
        assert_eq!(snapshot.capacity, 5500);
        assert_eq!(snapshot.remaining(), 4400);
        assert_eq!(snapshot.elapsed, Duration::from_secs(3));
        assert!((snapshot.utilization() - 0.2).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_permit_serializes_access() {
        let clock = Arc::new(ManualClock::new());
        let tracker = Arc::new(tracker(clock));

        let permit = tracker.acquire().await;
        let contender = {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                let mut permit = tracker.acquire().await;
                permit.reserve(3000).unwrap().wait()
            })
        };

        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        let mut permit = permit;
        if let Reserve::Granted(r) = permit.reserve(3000).unwrap() {
            permit.commit(r);
        }
        drop(permit);

        let wait = contender.await.unwrap();
        assert_eq!(wait, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_budget() {
        assert!(BudgetTracker::new(100, 100).is_err());
    }
}
