/// Collector module
///
/// Polls every configured runtime endpoint once per cycle:
/// - `client` builds the shared HTTP client (TLS, proxy, timeout)
/// - `runner` fans out one task per endpoint and joins them
///
/// Per-endpoint failures are reported to the accumulator and never
/// stop sibling endpoints.
pub mod client;
pub mod runner;

pub use runner::{GatherReport, GoRuntime};
