// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:    Configuration structs loaded from JSON
// - schema:    Runtime snapshot payload served by each endpoint
// - fields:    Flattening of a snapshot into measurement fields
// - sink:      Accumulator contract and the bundled sinks
// - collector: Concurrent per-endpoint fetch, decode and emit
// - error:     Endpoint-local error types
// - metrics:   Counters describing the collector itself
//
pub mod collector;
pub mod config;
pub mod error;
pub mod fields;
pub mod metrics;
pub mod schema;
pub mod sink;
