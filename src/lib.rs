//! Keeps a sleep-prone hosted backend reachable.
//!
//! The pieces, bottom-up: [`probe`] issues and classifies health probes,
//! [`wakeup`] coordinates bounded retry cycles, [`api`] wraps outbound calls
//! so that a sleeping backend is woken and the call retried once, and
//! [`scheduler`] keeps the backend warm from a separate process.

pub mod api;
pub mod config;
mod error;
pub mod paths;
pub mod probe;
pub mod scheduler;
pub mod wakeup;

pub use config::{load_config, AppConfig, SchedulerConfig, WakePolicy};
pub use error::{AppError, ErrorKind, Result};
pub use scheduler::{KeepAlive, KeepAliveReport};
pub use wakeup::{StatusReporter, WakeCoordinator, WakeEvent, WakeOutcome, WakePhase, WakeStatus};
