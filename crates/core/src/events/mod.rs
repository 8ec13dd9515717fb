//! Domain events emitted by the pact engines.

mod domain_event;
mod sink;

pub use domain_event::DomainEvent;
pub use sink::{DomainEventSink, MockDomainEventSink, NoOpDomainEventSink};
