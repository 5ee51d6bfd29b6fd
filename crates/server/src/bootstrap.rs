use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use savor_agent::backend::BackendError;
use savor_agent::helpdesk::{Helpdesk, Knowledge};
use savor_agent::ollama::OllamaBackend;
use savor_core::config::{AppConfig, ConfigError, LoadOptions};
use savor_core::{Menu, MenuParseError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub helpdesk: Arc<Helpdesk>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not read knowledge file `{path}`: {source}")]
    ReadKnowledge { path: PathBuf, source: std::io::Error },
    #[error("menu file could not be parsed: {0}")]
    Menu(#[from] MenuParseError),
    #[error("completion backend client failed to initialize: {0}")]
    Backend(#[from] BackendError),
}

#[allow(dead_code)] // main loads config first for logging; this is the one-call path
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        "starting application bootstrap"
    );

    let knowledge = load_knowledge(&config)?;
    info!(
        event_name = "system.bootstrap.knowledge_loaded",
        menu_items = knowledge.menu.len(),
        menu_source = if config.knowledge.menu_path.is_some() { "file" } else { "builtin" },
        docs_source = if config.knowledge.docs_dir.is_some() { "dir" } else { "builtin" },
        "helpdesk knowledge assembled"
    );

    let backend = OllamaBackend::new(&config.backend)?;
    let helpdesk = Arc::new(Helpdesk::new(Arc::new(backend), knowledge));

    Ok(Application { config, helpdesk })
}

/// Start from the embedded defaults and overlay whatever files are
/// configured; a missing optional document inside `docs_dir` keeps its
/// builtin text, a missing configured file is an error.
fn load_knowledge(config: &AppConfig) -> Result<Knowledge, BootstrapError> {
    let mut knowledge = Knowledge::builtin();

    if let Some(menu_path) = &config.knowledge.menu_path {
        let raw = read_file(menu_path)?;
        knowledge.menu = Menu::parse_csv(&raw)?;
    }

    if let Some(docs_dir) = &config.knowledge.docs_dir {
        if let Some(text) = read_optional(&docs_dir.join("ordering.txt"))? {
            knowledge.ordering_doc = text;
        }
        if let Some(text) = read_optional(&docs_dir.join("promotions.txt"))? {
            knowledge.promo_doc = text;
        }
        if let Some(text) = read_optional(&docs_dir.join("stores.txt"))? {
            knowledge.store_doc = text;
        }
    }

    Ok(knowledge)
}

fn read_file(path: &Path) -> Result<String, BootstrapError> {
    fs::read_to_string(path)
        .map_err(|source| BootstrapError::ReadKnowledge { path: path.to_path_buf(), source })
}

fn read_optional(path: &Path) -> Result<Option<String>, BootstrapError> {
    if !path.exists() {
        return Ok(None);
    }
    read_file(path).map(Some)
}
