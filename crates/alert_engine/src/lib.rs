//! Alert-decision engine crate.
//!
//! Decides whether a price move warrants a notification and runs the
//! per-tick sweep over the watched symbols.

pub mod clock;
pub mod engine;
pub mod sweep;

pub use clock::SessionClock;
pub use engine::{evaluate, expiry_for, next_record, AlertDecisionEngine, EvaluationError};
pub use sweep::{
    handle_invocation, InvocationResponse, SkipReason, SweepConfig, SweepSummary, Sweeper,
    SymbolOutcome,
};
