use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "parley";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Runtime flags governing readings notification behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingsSettings {
    /// User preference for the incoming-message audio cue.
    #[serde(default = "default_true")]
    pub sounds_incoming_message: bool,
    /// Deployment-level override that wins over the user preference.
    #[serde(default)]
    pub disable_incoming_message_sound: bool,
    /// Recorder/automation endpoints subscribe to nothing and render
    /// nothing.
    #[serde(default)]
    pub i_am_recorder: bool,
}

impl Default for ReadingsSettings {
    fn default() -> Self {
        Self {
            sounds_incoming_message: true,
            disable_incoming_message_sound: false,
            i_am_recorder: false,
        }
    }
}

impl ReadingsSettings {
    /// True when an unread append should produce an audio cue.
    pub fn incoming_message_sound_enabled(&self) -> bool {
        self.sounds_incoming_message && !self.disable_incoming_message_sound
    }
}

/// Settings persistence with a live, swappable snapshot.
pub struct SettingsStore {
    settings: Arc<ArcSwap<ReadingsSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".parley"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<ReadingsSettings> {
        self.settings.load_full()
    }

    /// Shared handle for components that read settings per transition.
    pub fn handle(&self) -> Arc<ArcSwap<ReadingsSettings>> {
        self.settings.clone()
    }

    pub fn update(&self, settings: ReadingsSettings) -> SettingsResult<()> {
        self.persist(&settings)?;
        self.settings.store(Arc::new(settings));
        Ok(())
    }

    fn load_from_disk(path: &PathBuf) -> ReadingsSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return ReadingsSettings::default();
        }

        let figment = Figment::from(Serialized::defaults(ReadingsSettings::default()))
            .merge(Json::file(path));

        match figment.extract::<ReadingsSettings>() {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                ReadingsSettings::default()
            }
        }
    }

    fn persist(&self, settings: &ReadingsSettings) -> SettingsResult<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

fn default_true() -> bool {
    true
}
