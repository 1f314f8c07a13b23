//! Error code constants

/// CLI error codes (0600-0699)
pub const ERR_MISSING_COMMAND: &str = "E-PES-0600";
pub const ERR_UNKNOWN_COMMAND: &str = "E-PES-0601";
pub const ERR_MISSING_ARG: &str = "E-PES-0602";

/// Dataset validation error codes (0400-0499)
pub const DETAIL_DATASET_PARSE: &str = "E-PES-0401";
pub const DETAIL_DATASET_SHAPE: &str = "E-PES-0402";
pub const DETAIL_DATASET_TOO_SMALL: &str = "E-PES-0403";

/// Run controller error codes (0500-0599)
pub const ERR_STREAM_IDLE: &str = "E-PES-0501";
pub const ERR_STREAM_TRANSPORT: &str = "E-PES-0502";
