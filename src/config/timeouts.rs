//! Timeout configuration

/// Upstream handshake ceiling for API requests.
pub const HANDSHAKE_TIMEOUT_SECS: u64 = 60;

/// Default idle window before a silent orchestration stream is failed.
/// The backend emits keepalives at 120s, so the default sits above that.
pub const STREAM_IDLE_TIMEOUT_MS: u64 = 150_000;

/// Per-request timeout for plain (non-streaming) API calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;
