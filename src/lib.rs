pub mod api;
pub mod config;
pub mod core;
pub mod dataset;
pub mod events;
pub mod net;
pub mod run;
pub mod steps;
pub mod store;

pub use api::{ApiClient, ApiError};
pub use core::{
    build_http_client, configure_sqlite, init_database, open_database, studio_db_path,
    StudioConfig, DATA_DIR, LOGS_DIR,
};
pub use dataset::{ensure_orchestration_size, fingerprint, parse_examples, DatasetExample};
pub use events::{decode_event, OrchestratorEvent, StepEvent, StepStatus};
pub use run::{OrchestrateRequest, RunController, RunHandle, RunStatus, RunView};
pub use steps::{fail_last_running, init_step, reconcile, resolve_running, INIT_STEP_ID};
pub use store::{
    GenerationRecord, HistoryStats, HistoryStore, LocalTemplate, SettingsStore, StoreError,
    StudioSettings, TemplateDraft, TemplateStore,
};
