//! TOML configuration for the synth and its front end.
//!
//! Every section is optional; a missing file or section means defaults.

use std::{
    error, fmt, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{io::keymap::KeyLayout, synth::params::ParamTemplate};

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, .. } => {
                write!(f, "failed to read config file {}", path.display())
            }
            ConfigError::Parse(err) => write!(f, "invalid config: {}", err),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid value for {}: {}", field, reason)
            }
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub keyboard: KeyboardConfig,
    pub voice: VoiceConfig,
    pub analyser: AnalyserConfig,
    pub render: RenderConfig,
    pub template: ParamTemplate,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    pub layout: KeyLayout,
    pub base_octave: i8,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            layout: KeyLayout::Chromatic,
            base_octave: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Extra time a released voice stays connected.
    pub disposal_guard_ms: u64,
    /// How long a key press holds its note when the terminal cannot report
    /// key releases.
    pub fallback_gate_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            disposal_guard_ms: 100,
            fallback_gate_ms: 250,
        }
    }
}

impl VoiceConfig {
    pub fn disposal_guard(&self) -> Duration {
        Duration::from_millis(self.disposal_guard_ms)
    }

    pub fn fallback_gate(&self) -> Duration {
        Duration::from_millis(self.fallback_gate_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    pub waveform_len: usize,
    pub spectrum_bins: usize,
    pub smoothing: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            waveform_len: 1024,
            spectrum_bins: 128,
            smoothing: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub frame_interval_ms: u64,
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            width: 600.0,
            height: 150.0,
        }
    }
}

impl RenderConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file; defaults to `polytone.log` in the system temp directory.
    pub file: Option<PathBuf>,
    /// `EnvFilter` directive.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            filter: "polytone=info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn file_path(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("polytone.log"))
    }
}

impl Config {
    /// `<config dir>/polytone/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("polytone").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from the default path when that file exists, defaults otherwise.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse and validate. Template values are clamped to their control ranges.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(text)?;
        config.template = config.template.clamped();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: String| Err(ConfigError::Invalid { field, reason });

        let analyser = &self.analyser;
        if analyser.waveform_len == 0 {
            return invalid("analyser.waveform_len", "must be non-zero".into());
        }
        if analyser.spectrum_bins == 0 {
            return invalid("analyser.spectrum_bins", "must be non-zero".into());
        }
        if analyser.spectrum_bins * 2 > analyser.waveform_len {
            return invalid(
                "analyser.spectrum_bins",
                format!(
                    "{} bins need {} samples but the waveform window holds {}",
                    analyser.spectrum_bins,
                    analyser.spectrum_bins * 2,
                    analyser.waveform_len
                ),
            );
        }
        if !(0.0..1.0).contains(&analyser.smoothing) {
            return invalid("analyser.smoothing", format!("{} is outside [0, 1)", analyser.smoothing));
        }

        let render = &self.render;
        if render.frame_interval_ms == 0 {
            return invalid("render.frame_interval_ms", "must be non-zero".into());
        }
        if !(render.width > 0.0 && render.height > 0.0) {
            return invalid(
                "render",
                format!("surface {}x{} has no area", render.width, render.height),
            );
        }

        if !(-1..=8).contains(&self.keyboard.base_octave) {
            return invalid(
                "keyboard.base_octave",
                format!("{} is outside [-1, 8]", self.keyboard.base_octave),
            );
        }
        Ok(())
    }
}
