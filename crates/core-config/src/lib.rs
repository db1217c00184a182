//! Configuration loading and parsing.
//!
//! Parses `oxlive.toml` (or an override path provided by the binary) and
//! extracts the `[live]` table that drives the re-execution pipeline:
//! interpreter command, annotation colors, debounce delay, run timeout and
//! the policy applied to superseded runs. Every field has a default so a
//! missing file, a missing table or a partially filled table all produce a
//! usable configuration. Unknown fields are ignored (TOML deserialization
//! tolerance) to allow forward evolution without immediate warnings.
//!
//! The interpreter is resolved separately via `Config::resolve_interpreter`
//! because the project-local virtual environment lookup depends on the
//! workspace root, which only the host knows.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Command used when neither a project virtual environment nor a configured
/// interpreter is available.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// What happens to an in-flight run when a newer trigger fires for the same editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupersedePolicy {
    /// Let the older run complete; its annotation may still be presented
    /// (last writer wins).
    #[default]
    Finish,
    /// Abort the older run and kill its interpreter process.
    Cancel,
}

impl SupersedePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            SupersedePolicy::Finish => "finish",
            SupersedePolicy::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveConfig {
    #[serde(default)]
    pub interpreter_path: Option<String>,
    #[serde(default = "LiveConfig::default_output_color")]
    pub output_color: String,
    #[serde(default = "LiveConfig::default_error_color")]
    pub error_color: String,
    /// Settle period in milliseconds.
    #[serde(default = "LiveConfig::default_debounce_delay")]
    pub debounce_delay: u64,
    /// Upper bound for a single interpreter run in milliseconds (0 = unbounded).
    #[serde(default = "LiveConfig::default_run_timeout")]
    pub run_timeout: u64,
    #[serde(default)]
    pub on_supersede: SupersedePolicy,
    /// File name of the reused transient snippet file inside the OS temp dir.
    #[serde(default = "LiveConfig::default_scratch_file")]
    pub scratch_file: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            interpreter_path: None,
            output_color: Self::default_output_color(),
            error_color: Self::default_error_color(),
            debounce_delay: Self::default_debounce_delay(),
            run_timeout: Self::default_run_timeout(),
            on_supersede: SupersedePolicy::default(),
            scratch_file: Self::default_scratch_file(),
        }
    }
}

impl LiveConfig {
    fn default_output_color() -> String {
        "grey".to_string()
    }
    fn default_error_color() -> String {
        "red".to_string()
    }
    const fn default_debounce_delay() -> u64 {
        300
    }
    const fn default_run_timeout() -> u64 {
        10_000
    }
    fn default_scratch_file() -> String {
        "oxlive_snippet.py".to_string()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_delay)
    }

    /// `None` when the timeout is disabled.
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout > 0).then(|| Duration::from_millis(self.run_timeout))
    }

    /// Fixed transient file path shared by every run of this process.
    pub fn scratch_path(&self) -> PathBuf {
        std::env::temp_dir().join(&self.scratch_file)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Best-effort config path: local working directory first, then the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("oxlive.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("oxlive").join("oxlive.toml");
    }
    PathBuf::from("oxlive.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config {
            raw: Some(content),
            file,
        }),
        Err(e) => {
            // Fall back to defaults rather than refusing to start.
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

/// Project-local virtual environment interpreter for `root`.
pub fn venv_interpreter(root: &Path) -> PathBuf {
    if cfg!(windows) {
        root.join(".venv").join("Scripts").join("python.exe")
    } else {
        root.join(".venv").join("bin").join("python")
    }
}

impl Config {
    pub fn live(&self) -> &LiveConfig {
        &self.file.live
    }

    /// Pick the interpreter: project virtual environment when present, then the
    /// configured command, then `DEFAULT_INTERPRETER`.
    pub fn resolve_interpreter(&self, workspace_root: Option<&Path>) -> PathBuf {
        if let Some(root) = workspace_root {
            let venv = venv_interpreter(root);
            if venv.exists() {
                return venv;
            }
        }
        match self.file.live.interpreter_path.as_deref() {
            Some(configured) if !configured.trim().is_empty() => PathBuf::from(configured),
            _ => PathBuf::from(DEFAULT_INTERPRETER),
        }
    }

    /// Emit the effective settings once at startup.
    pub fn log_effective(&self, interpreter: &Path) {
        let live = &self.file.live;
        info!(
            target: "config",
            interpreter = %interpreter.display(),
            debounce_ms = live.debounce_delay,
            run_timeout_ms = live.run_timeout,
            on_supersede = live.on_supersede.as_str(),
            output_color = live.output_color.as_str(),
            error_color = live.error_color.as_str(),
            from_file = self.raw.is_some(),
            "live_config_effective"
        );
    }
}
