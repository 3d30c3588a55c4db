use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Name of the optional config file looked up in the dispatcher root.
pub const CONFIG_FILE: &str = "file-commander.toml";

/// Command file name used when neither the CLI nor the config names one.
pub const DEFAULT_COMMAND_FILE: &str = "command.txt";

/// Configuration loaded from `file-commander.toml` in the dispatcher root.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommanderConfig {
    /// Command file path, relative to the root unless absolute.
    pub command_file: Option<PathBuf>,
    /// Debounce window for change events in milliseconds. Absent means every
    /// raw change event is dispatched.
    pub debounce_ms: Option<u64>,
}

impl CommanderConfig {
    /// Load configuration from `file-commander.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// Resolve the command file: CLI override, then config, then `command.txt`.
    /// Relative paths are joined onto `root`.
    pub fn command_file(&self, root: &Path, cli_override: Option<&Path>) -> PathBuf {
        let chosen = cli_override
            .or(self.command_file.as_deref())
            .unwrap_or(Path::new(DEFAULT_COMMAND_FILE));
        if chosen.is_absolute() {
            chosen.to_path_buf()
        } else {
            root.join(chosen)
        }
    }

    /// Resolve the debounce window: CLI override, then config.
    pub fn debounce_ms(&self, cli_override: Option<u64>) -> Option<u64> {
        cli_override.or(self.debounce_ms)
    }
}

/// Directory the dispatcher treats as home: the executable's own directory.
pub fn default_root() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("executable path {} has no parent", exe.display()))
}
