use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use savor_agent::helpdesk::{Helpdesk, Knowledge};
use savor_agent::ollama::OllamaBackend;
use savor_core::config::{AppConfig, LoadOptions};
use savor_core::Menu;

use crate::commands::CommandResult;

/// One helpdesk turn from the terminal: classify, stream the answer to
/// stdout as it arrives, then print a JSON outcome line.
pub fn run(question: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "config_validation",
                format!("configuration failed to load: {error}"),
                2,
            );
        }
    };

    let knowledge = match load_knowledge(&config) {
        Ok(knowledge) => knowledge,
        Err(message) => return CommandResult::failure("ask", "knowledge", message, 3),
    };

    let backend = match OllamaBackend::new(&config.backend) {
        Ok(backend) => backend,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "backend",
                format!("failed to build backend client: {error}"),
                4,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let helpdesk = Helpdesk::new(Arc::new(backend), knowledge);

    runtime.block_on(async {
        let (route, mut fragments) = match helpdesk.respond(question, &[]).await {
            Ok(answer) => answer,
            Err(error) => {
                return CommandResult::failure(
                    "ask",
                    "backend",
                    format!("helpdesk dispatch failed: {error}"),
                    4,
                );
            }
        };

        let mut fragment_count = 0usize;
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    fragment_count += 1;
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
                Err(error) => {
                    println!();
                    return CommandResult::failure(
                        "ask",
                        "backend",
                        format!("answer stream failed after {fragment_count} fragments: {error}"),
                        4,
                    );
                }
            }
        }
        println!();

        CommandResult::success(
            "ask",
            format!("answer complete (route: {route}, fragments: {fragment_count})"),
        )
    })
}

fn load_knowledge(config: &AppConfig) -> Result<Knowledge, String> {
    let mut knowledge = Knowledge::builtin();

    if let Some(path) = &config.knowledge.menu_path {
        let raw = fs::read_to_string(path)
            .map_err(|error| format!("could not read menu file `{}`: {error}", path.display()))?;
        knowledge.menu = Menu::parse_csv(&raw)
            .map_err(|error| format!("could not parse menu file `{}`: {error}", path.display()))?;
    }

    if let Some(docs_dir) = &config.knowledge.docs_dir {
        if let Some(text) = read_optional_doc(&docs_dir.join("ordering.txt"))? {
            knowledge.ordering_doc = text;
        }
        if let Some(text) = read_optional_doc(&docs_dir.join("promotions.txt"))? {
            knowledge.promo_doc = text;
        }
        if let Some(text) = read_optional_doc(&docs_dir.join("stores.txt"))? {
            knowledge.store_doc = text;
        }
    }

    Ok(knowledge)
}

fn read_optional_doc(path: &Path) -> Result<Option<String>, String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(format!("could not read document `{}`: {error}", path.display())),
    }
}
