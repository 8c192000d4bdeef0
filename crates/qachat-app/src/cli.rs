use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

/// CLI arguments for qachat
#[derive(Parser, Debug)]
#[command(name = "qachat")]
#[command(about = "Sign up, log in, and ask a hosted language model questions")]
#[command(version)]
pub struct Cli {
    /// Generate shell completions
    #[arg(long, value_enum)]
    pub generate: Option<Shell>,

    /// Directory holding the credential file, histories and logs (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Credential CSV file (default: <data-dir>/user_data.csv)
    #[arg(long, value_name = "PATH")]
    pub users_file: Option<PathBuf>,

    /// Directory for per-user history files (default: <data-dir>/chat_histories)
    #[arg(long, value_name = "DIR")]
    pub history_dir: Option<PathBuf>,

    /// Completion backend (gemini, openai)
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Model name (default: gemini-pro, or gpt-4o-mini for openai)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Override the backend's API URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// API key (default: QACHAT_API_KEY, then GOOGLE_API_KEY / GEMINI_API_KEY or OPENAI_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Earlier turns sent along with each question (0 = question only)
    #[arg(long, value_name = "N")]
    pub context_turns: Option<usize>,

    /// Completion request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Enable verbose debug output (shows HTTP requests and responses)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Serve the web front end instead of the terminal REPL
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub web: bool,

    /// Web server port
    #[arg(long, default_value = "8080", env = "QACHAT_WEB_PORT")]
    pub web_port: u16,

    /// Web server bind address
    #[arg(long, default_value = "127.0.0.1", env = "QACHAT_WEB_BIND")]
    pub web_bind: String,

    /// Forget web sessions idle for this many minutes
    #[arg(long, default_value = "30", env = "QACHAT_SESSION_IDLE_MINS", value_name = "MINS")]
    pub session_idle_mins: u64,
}
