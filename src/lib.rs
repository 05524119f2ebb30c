// src/lib.rs

pub mod backend;
pub mod commands;
pub mod db;
pub mod models;
pub mod settings;
pub mod shell;
pub mod state;
pub mod store;
pub mod transcript;
pub mod types;

pub use backend::{BackendError, ChatAdapter, HttpResponse, HttpTransport, ReqwestTransport};
pub use settings::{AppSettings, BackendConfig, BackendKind, Language};
pub use state::AppState;
pub use store::{KeyValueStore, MemoryStore};
pub use transcript::Transcript;
pub use types::{Attachment, ChatMsg, ConversationContext, Role};

// ==================== App Entry Point ====================

pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let state = AppState::open()?;
        shell::run_shell(&state).await
    })
}
