//! System limits and capacity configuration

/// Minimum dataset size the backend accepts for an orchestration run.
pub const MIN_ORCHESTRATION_EXAMPLES: usize = 5;

/// Ceiling on a single decoded SSE event payload.
pub const MAX_EVENT_BYTES: usize = 256 * 1024; // 256 KiB

/// History listing default cap when the caller passes no limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
