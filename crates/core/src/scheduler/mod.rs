//! Scheduler module - the periodic tick driving time-based transitions.

mod scheduler_service;


pub use scheduler_service::{SchedulerService, TickSummary};
