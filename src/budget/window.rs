use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Length of one provider quota window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of asking the window for room.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub enum Reserve {
    /// The request fits; send it and commit the reservation.
    Granted(Reservation),
    /// The window is full; sleep this long, reset, then ask again.
    Wait(Duration),
}

impl Reserve {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    pub fn wait(&self) -> Duration {
        match self {
            Self::Granted(_) => Duration::ZERO,
            Self::Wait(d) => *d,
        }
    }
}

/// Room granted for exactly one request.
///
/// Not `Clone`: a reservation is committed at most once, and only after a
/// reserve call that did not ask the caller to wait.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a granted reservation must be committed once the request is sent"]
pub struct Reservation {
    tokens: u64,
}

impl Reservation {
    pub fn tokens(&self) -> u64 {
        self.tokens
    }
}

/// Fixed-window token accounting.
#[derive(Debug, Clone)]
pub struct BudgetWindow {
    limit: u64,
    buffer: u64,
    length: Duration,
    window_start: Instant,
    consumed: u64,
}

impl BudgetWindow {
    pub fn new(limit: u64, buffer: u64, length: Duration, now: Instant) -> Result<Self> {
        if buffer >= limit {
            return Err(Error::Config(format!(
                "budget buffer ({}) must be smaller than the limit ({})",
                buffer, limit
            )));
        }
        if length.is_zero() {
            return Err(Error::Config("budget window must be longer than zero".into()));
        }
        Ok(Self {
            limit,
            buffer,
            length,
            window_start: now,
            consumed: 0,
        })
    }

    /// Tokens a single window admits: `limit - buffer`.
    pub fn capacity(&self) -> u64 {
        self.limit - self.buffer
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn buffer(&self) -> u64 {
        self.buffer
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn remaining(&self) -> u64 {
        self.capacity().saturating_sub(self.consumed)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.window_start)
    }

    pub fn reserve(&mut self, estimated: u64, now: Instant) -> Result<Reserve> {
        if estimated > self.capacity() {
            return Err(Error::RequestTooLarge {
                estimated,
                capacity: self.capacity(),
            });
        }

        let elapsed = self.elapsed(now);
        if elapsed >= self.length {
            self.reset(now);
        } else if self.consumed + estimated > self.capacity() {
            return Ok(Reserve::Wait(self.length - elapsed));
        }

        Ok(Reserve::Granted(Reservation { tokens: estimated }))
    }

    pub fn reset(&mut self, now: Instant) {
        self.consumed = 0;
        self.window_start = now;
    }

    pub fn commit(&mut self, reservation: Reservation) {
        debug_assert!(
            self.consumed + reservation.tokens <= self.capacity(),
            "commit would exceed window capacity"
        );
        self.consumed += reservation.tokens;
    }
}
