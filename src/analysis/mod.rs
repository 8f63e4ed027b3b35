//! Read-only structural queries over the graph.
pub mod telemetry;
pub mod topology;


pub use telemetry::GraphTelemetry;
