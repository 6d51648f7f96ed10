//! Observability setup for MergeBots: subscriber installation and the
//! span field names shared by the engine and the adapters.

pub mod attrs;
pub mod tracing_setup;
