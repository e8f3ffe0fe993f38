use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::backend::SESSION_HEADER;
use crate::chat::{DEFAULT_ATTACH_GRACE, DEFAULT_ERROR_MESSAGE, DEFAULT_GREETING, ViewOptions};

/// Config file picked up from the working directory when none is given.
const CWD_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Full URL of the backend chat endpoint
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Seconds a page has to open its event stream before its view is closed.
    pub attach_grace_secs: u64,
}

impl ServerConfig {
    #[must_use]
    pub fn attach_grace(&self) -> Duration {
        Duration::from_secs(self.attach_grace_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Full URL the chat request is posted to.
    pub endpoint: String,
    /// Response header carrying the session token.
    pub session_header: String,
    pub connect_timeout_secs: u64,
}

impl BackendConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UiConfig {
    pub title: String,
    pub greeting: String,
    pub error_message: String,
    pub placeholder: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "Python Tutor".to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            placeholder: "Ask about Python...".to_string(),
        }
    }
}

impl From<&UiConfig> for ViewOptions {
    fn from(ui: &UiConfig) -> Self {
        Self {
            greeting: ui.greeting.clone(),
            error_message: ui.error_message.clone(),
            ..Self::default()
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag > CLI env var > `TUTOR_*` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let ui = UiConfig::default();
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.attach_grace_secs", DEFAULT_ATTACH_GRACE.as_secs())?
            .set_default("backend.endpoint", "http://127.0.0.1:8000/api/chat")?
            .set_default("backend.session_header", SESSION_HEADER)?
            .set_default("backend.connect_timeout_secs", 10)?
            .set_default("ui.title", ui.title)?
            .set_default("ui.greeting", ui.greeting)?
            .set_default("ui.error_message", ui.error_message)?
            .set_default("ui.placeholder", ui.placeholder)?;

        // Explicit file must exist; the cwd fallback is optional.
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(CWD_CONFIG_FILE).exists() {
            builder = builder.add_source(File::from(Path::new(CWD_CONFIG_FILE)));
        }

        // E.g. TUTOR_SERVER__PORT=8080, TUTOR_BACKEND__ENDPOINT=...
        builder = builder.add_source(
            Environment::with_prefix("TUTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(url) = cli.backend_url {
            builder = builder.set_override("backend.endpoint", url)?;
        }

        builder.build()?.try_deserialize()
    }
}
