use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use qachat_llm_api::{BackendType, ClientFactory, ClientOptions, DEFAULT_TIMEOUT_SECS};
use qachat_logging::{ensure_logs_dir, ConversationLogger};
use qachat_store::{CredentialStore, HistoryStore};
use qachat_types::DEFAULT_CONTEXT_TURNS;

use crate::cli::Cli;
use crate::config::helpers::{first_env_var, parse_qachat_env, qachat_env};
use crate::config::StorePaths;
use crate::session::SessionController;

/// Application configuration derived from CLI arguments and environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub paths: StorePaths,
    pub backend: BackendType,
    pub client_options: ClientOptions,
    pub context_turns: usize,
    pub web_addr: String,
    /// Idle time after which a web session is dropped
    pub session_idle: Duration,
    pub verbose: bool,
}

impl AppConfig {
    pub fn web_socket_addr(&self) -> Result<SocketAddr> {
        self.web_addr
            .parse()
            .with_context(|| format!("Invalid web bind address: {}", self.web_addr))
    }
}

/// Set up application configuration from CLI arguments.
///
/// Precedence: CLI flags > QACHAT_* env > legacy env > defaults
pub fn setup_from_cli(cli: &Cli) -> Result<AppConfig> {
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| qachat_env("DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let mut paths = StorePaths::in_data_dir(&data_dir);
    if let Some(users_file) = cli.users_file.clone().or_else(|| qachat_env("USERS_FILE").map(PathBuf::from)) {
        paths.users_file = users_file;
    }
    if let Some(history_dir) = cli.history_dir.clone().or_else(|| qachat_env("HISTORY_DIR").map(PathBuf::from)) {
        paths.history_dir = history_dir;
    }

    let backend = match cli.backend.clone().or_else(|| qachat_env("BACKEND")) {
        Some(name) => name.parse::<BackendType>().map_err(anyhow::Error::msg)?,
        None => BackendType::default(),
    };

    let model = cli
        .model
        .clone()
        .or_else(|| qachat_env("MODEL"))
        .unwrap_or_else(|| backend.default_model().to_string());

    let api_url = cli.api_url.clone().or_else(|| qachat_env("API_URL"));

    let api_key = cli
        .api_key
        .clone()
        .or_else(|| qachat_env("API_KEY"))
        .or_else(|| first_env_var(backend.api_key_env_vars()));

    let api_key = match api_key {
        Some(key) => key,
        None => anyhow::bail!(
            "No API key for the {} backend. Set {} (or QACHAT_API_KEY), or pass --api-key.",
            backend.display_name(),
            backend.api_key_env_vars().join(" or ")
        ),
    };

    let context_turns = match cli.context_turns {
        Some(n) => n,
        None => parse_qachat_env("CONTEXT_TURNS")?.unwrap_or(DEFAULT_CONTEXT_TURNS),
    };

    let timeout_secs = match cli.timeout_secs {
        Some(secs) => secs,
        None => parse_qachat_env("TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
    };

    let mut client_options = ClientOptions::new(api_key, model);
    client_options.api_url = api_url;
    client_options.timeout = Duration::from_secs(timeout_secs);
    client_options.verbose = cli.verbose;

    Ok(AppConfig {
        paths,
        backend,
        client_options,
        context_turns,
        web_addr: format!("{}:{}", cli.web_bind, cli.web_port),
        session_idle: Duration::from_secs(cli.session_idle_mins.max(1) * 60),
        verbose: cli.verbose,
    })
}

/// Open the stores, build the completion client and start the conversation log
pub async fn build_controller(config: &AppConfig) -> Result<SessionController> {
    let paths = &config.paths;

    let credentials = CredentialStore::open(&paths.users_file)
        .with_context(|| format!("Failed to open credential store {}", paths.users_file.display()))?;
    let history = HistoryStore::new(&paths.history_dir)
        .with_context(|| format!("Failed to open history directory {}", paths.history_dir.display()))?;

    let mut client_options = config.client_options.clone();
    let logs_dir = match ensure_logs_dir(&paths.data_dir) {
        Ok(dir) => Some(dir),
        Err(e) => {
            eprintln!("{} Request logging disabled: {:#}", "⚠️".yellow(), e);
            None
        }
    };
    client_options.logs_dir = logs_dir.clone();

    let client = ClientFactory::create(config.backend, client_options)?;

    let mut controller = SessionController::new(credentials, history, client)
        .with_context_turns(config.context_turns);

    if let Some(dir) = logs_dir {
        match ConversationLogger::new(&dir).await {
            Ok(logger) => controller = controller.with_logger(logger),
            Err(e) => eprintln!("{} Conversation logging disabled: {}", "⚠️".yellow(), e),
        }
    }

    Ok(controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use std::env;

    const VARS: &[&str] = &[
        "QACHAT_DATA_DIR",
        "QACHAT_USERS_FILE",
        "QACHAT_HISTORY_DIR",
        "QACHAT_BACKEND",
        "QACHAT_MODEL",
        "QACHAT_API_URL",
        "QACHAT_API_KEY",
        "QACHAT_CONTEXT_TURNS",
        "QACHAT_TIMEOUT_SECS",
        "QACHAT_WEB_PORT",
        "QACHAT_SESSION_IDLE_MINS",
        "QACHAT_WEB_BIND",
        "GOOGLE_API_KEY",
        "GEMINI_API_KEY",
        "OPENAI_API_KEY",
    ];

    fn clear_env() {
        for name in VARS {
            env::remove_var(name);
        }
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("qachat").chain(args.iter().copied()))
    }

    #[test]
    #[serial]
    fn test_defaults_with_google_key() {
        clear_env();
        env::set_var("GOOGLE_API_KEY", "google-key");

        let config = setup_from_cli(&parse(&[])).unwrap();

        assert_eq!(config.backend, BackendType::Gemini);
        assert_eq!(config.client_options.model, "gemini-pro");
        assert_eq!(config.client_options.api_key, "google-key");
        assert_eq!(config.client_options.timeout, Duration::from_secs(60));
        assert_eq!(config.context_turns, DEFAULT_CONTEXT_TURNS);
        assert_eq!(config.paths, StorePaths::in_data_dir("."));
        assert_eq!(config.web_addr, "127.0.0.1:8080");
        assert_eq!(config.session_idle, Duration::from_secs(30 * 60));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_gemini_key_fallback() {
        clear_env();
        env::set_var("GEMINI_API_KEY", "gemini-key");

        let config = setup_from_cli(&parse(&[])).unwrap();

        assert_eq!(config.client_options.api_key, "gemini-key");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_cli_beats_qachat_env_beats_legacy_env() {
        clear_env();
        env::set_var("GOOGLE_API_KEY", "legacy");
        env::set_var("QACHAT_API_KEY", "qachat");
        env::set_var("QACHAT_MODEL", "gemini-1.5-flash");
        env::set_var("QACHAT_CONTEXT_TURNS", "4");

        let config = setup_from_cli(&parse(&[])).unwrap();
        assert_eq!(config.client_options.api_key, "qachat");
        assert_eq!(config.client_options.model, "gemini-1.5-flash");
        assert_eq!(config.context_turns, 4);

        let config = setup_from_cli(&parse(&[
            "--api-key",
            "cli",
            "--model",
            "gemini-pro",
            "--context-turns",
            "0",
        ]))
        .unwrap();
        assert_eq!(config.client_options.api_key, "cli");
        assert_eq!(config.client_options.model, "gemini-pro");
        assert_eq!(config.context_turns, 0);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_openai_backend_uses_its_own_key_and_model() {
        clear_env();
        env::set_var("GOOGLE_API_KEY", "google-key");
        env::set_var("OPENAI_API_KEY", "sk-openai");

        let config = setup_from_cli(&parse(&["--backend", "openai"])).unwrap();

        assert_eq!(config.backend, BackendType::OpenAI);
        assert_eq!(config.client_options.api_key, "sk-openai");
        assert_eq!(config.client_options.model, "gpt-4o-mini");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_key_names_the_variables() {
        clear_env();

        let err = setup_from_cli(&parse(&[])).unwrap_err();

        assert!(err.to_string().contains("GOOGLE_API_KEY or GEMINI_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_unknown_backend_is_rejected() {
        clear_env();
        env::set_var("QACHAT_API_KEY", "k");

        assert!(setup_from_cli(&parse(&["--backend", "groq"])).is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_paths_follow_data_dir_unless_overridden() {
        clear_env();
        env::set_var("QACHAT_API_KEY", "k");
        env::set_var("QACHAT_DATA_DIR", "/var/lib/qachat");

        let config = setup_from_cli(&parse(&["--history-dir", "/tmp/histories"])).unwrap();

        assert_eq!(config.paths.users_file, PathBuf::from("/var/lib/qachat/user_data.csv"));
        assert_eq!(config.paths.history_dir, PathBuf::from("/tmp/histories"));
        clear_env();
    }
}
