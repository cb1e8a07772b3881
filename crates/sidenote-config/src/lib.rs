use serde::{Deserialize, Serialize};
use sidenote_engine::anchoring::{AnchorOptions, DEFAULT_CONTEXT_CHARS, MatchMode};
use sidenote_engine::editor::EditorConfig;
use sidenote_engine::overlay::{OverlayStyle, Rgba};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid colour {value:?} for {field}, expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding note records
    pub notes_path: PathBuf,
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Rewrite a highlight's quote when the text under it drifts
    #[serde(default = "default_auto_correct")]
    pub auto_correct_drift: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover_color: Option<String>,
}

fn default_context_chars() -> usize {
    DEFAULT_CONTEXT_CHARS
}

fn default_auto_correct() -> bool {
    true
}

impl Config {
    pub fn new(notes_path: impl Into<PathBuf>) -> Self {
        Self {
            notes_path: notes_path.into(),
            context_chars: default_context_chars(),
            match_mode: MatchMode::default(),
            auto_correct_drift: default_auto_correct(),
            highlight_color: None,
            hover_color: None,
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.notes_path = Self::expand_path(&config.notes_path).unwrap_or(config.notes_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/sidenote");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Record file for a note called `name` inside the notes directory.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.notes_path.join(format!("{name}.json"))
    }

    /// Editor settings derived from this config.
    pub fn editor_config(&self) -> Result<EditorConfig, ConfigError> {
        let defaults = OverlayStyle::default();
        let style = OverlayStyle {
            fill: parse_color("highlight_color", self.highlight_color.as_deref())?
                .unwrap_or(defaults.fill),
            hover_fill: parse_color("hover_color", self.hover_color.as_deref())?
                .unwrap_or(defaults.hover_fill),
        };

        Ok(EditorConfig {
            anchor: AnchorOptions {
                context_chars: self.context_chars,
                match_mode: self.match_mode,
            },
            auto_correct_drift: self.auto_correct_drift,
            style,
        })
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}

fn parse_color(field: &'static str, value: Option<&str>) -> Result<Option<Rgba>, ConfigError> {
    value
        .map(|value| {
            Rgba::parse_hex(value).ok_or_else(|| ConfigError::InvalidColor {
                field,
                value: value.to_string(),
            })
        })
        .transpose()
}
