//! Path and directory configuration

/// Database constants
pub const STUDIO_DB: &str = "studio.db";

/// Schema bookkeeping
pub const SCHEMA_COMPONENT: &str = "studio";
pub const SCHEMA_VERSION: i64 = 1;
