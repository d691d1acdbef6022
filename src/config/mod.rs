mod validation;

use crate::cli::Args;
use crate::error::{McpSnagError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub use validation::{expand_env_var_in_string, parse_bool, parse_duration, parse_header};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What the run should do once the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Send the body verbatim, no handshake.
    Raw(String),
    /// Handshake and print the session id.
    InitOnly,
    /// Handshake (unless resuming a session), then send `{method, params}`.
    Request(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub headers: BTreeMap<String, String>,
    pub session_id: Option<String>,
    pub timeout: Duration,
    pub compact: bool,
    pub verbose: bool,
    pub stream: bool,
    pub mode: Mode,
}

/// Contents of `.mcpsnag.yaml` (or `.yml` / `.json`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub compact: Option<bool>,
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub stream: Option<bool>,
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> anyhow::Result<Self> {
        let file = FileConfig::load()?;
        let config = Self::resolve(args, file, &|name: &str| env::var(name).ok())?;
        Ok(config)
    }

    /// Merges the sources: CLI flag > environment > config file > default.
    pub fn resolve(
        args: &Args,
        file: FileConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let endpoint = args
            .url
            .clone()
            .or_else(|| env("MCPSNAG_URL"))
            .or(file.endpoint)
            .ok_or_else(|| McpSnagError::Config("URL is required".to_string()))?;

        let timeout = match args
            .timeout
            .clone()
            .or_else(|| env("MCPSNAG_TIMEOUT"))
            .or(file.timeout)
        {
            Some(value) => parse_duration(&value)?,
            None => DEFAULT_TIMEOUT,
        };

        let compact = args.compact
            || env("MCPSNAG_COMPACT")
                .map(|v| parse_bool(&v))
                .or(file.compact)
                .unwrap_or(false);

        let verbose = args.verbose
            || env("MCPSNAG_VERBOSE")
                .map(|v| parse_bool(&v))
                .or(file.verbose)
                .unwrap_or(false);

        let stream = if args.no_stream {
            false
        } else {
            match env("MCPSNAG_NO_STREAM") {
                Some(v) => !parse_bool(&v),
                None => file.stream.unwrap_or(true),
            }
        };

        let mut headers = BTreeMap::new();
        for (name, value) in file.headers {
            headers.insert(name, expand_env_var_in_string(&value, env)?);
        }
        for flag in &args.headers {
            match parse_header(flag) {
                Some((name, value)) => {
                    headers.insert(name, value);
                }
                None => warn!("invalid header format {:?} (expected 'Key: Value')", flag),
            }
        }

        let mode = Self::resolve_mode(args)?;

        Ok(Config {
            endpoint,
            headers,
            session_id: args.session.clone().filter(|s| !s.is_empty()),
            timeout,
            compact,
            verbose,
            stream,
            mode,
        })
    }

    fn resolve_mode(args: &Args) -> Result<Mode> {
        let data = args.data.clone().filter(|d| !d.is_empty());
        match (args.raw, args.init_only, data) {
            (true, _, Some(data)) => Ok(Mode::Raw(data)),
            (true, _, None) => Err(McpSnagError::Config(
                "-d/--data is required with --raw".to_string(),
            )),
            (false, true, _) => Ok(Mode::InitOnly),
            (false, false, Some(data)) => Ok(Mode::Request(data)),
            (false, false, None) => Err(McpSnagError::Config(
                "-d/--data is required (or use --init-only)".to_string(),
            )),
        }
    }
}

impl FileConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::get_config_paths())
    }

    /// Reads the first existing file among `paths`.
    pub fn load_from(paths: &[PathBuf]) -> anyhow::Result<Self> {
        for path in paths {
            if path.exists() {
                return Self::read(path);
            }
        }
        Ok(FileConfig::default())
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            serde_yaml::from_str(&contents).with_context(|| {
                format!("Failed to parse YAML config file: {}", path.display())
            })?
        } else {
            serde_json::from_str(&contents).with_context(|| {
                format!("Failed to parse JSON config file: {}", path.display())
            })?
        };
        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".mcpsnag.yaml"),
            PathBuf::from(".mcpsnag.yml"),
            PathBuf::from(".mcpsnag.json"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("mcpsnag");
            paths.push(config_dir.join("mcpsnag.yaml"));
            paths.push(config_dir.join("mcpsnag.yml"));
            paths.push(config_dir.join("mcpsnag.json"));
        }

        paths
    }
}
