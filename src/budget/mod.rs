//! Tokens-per-window quota tracking.

mod clock;
mod estimator;
mod tracker;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use estimator::{TokenEstimator, WordCountEstimator};
pub use tracker::{BudgetPermit, BudgetSnapshot, BudgetTracker};
pub use window::{BudgetWindow, DEFAULT_WINDOW, Reservation, Reserve};
