use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use which::which;

use crate::{write_json_atomically, NoteError, Result};

const CONFIG_FILE_NAME: &str = "config.json";
const DATABASE_FILE_NAME: &str = "notes.db";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the notes
    pub database_path: PathBuf,

    /// Default editor command
    pub editor_command: Option<String>,

    /// Number of content characters shown in list previews
    pub preview_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        let database_path = project_dirs()
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from("pocketnotes.db"));

        Self {
            database_path,
            editor_command: None,
            preview_length: 100,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pocketnotes", "pocketnotes")
}

impl Config {
    /// Default location of the configuration file, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// read when present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(NoteError::FileNotFound {
                        file_path: path.display().to_string(),
                    });
                }
                Self::read_from(path)
            }
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::read_from(&default),
                _ => {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Like [`load`](Self::load), but a missing explicit file yields the
    /// defaults so that `config --init` can create it.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if !path.exists() => {
                debug!("{} does not exist yet, using defaults", path.display());
                Ok(Self::default())
            }
            _ => Self::load(path),
        }
    }

    fn read_from(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;

        if config.database_path.as_os_str().is_empty() {
            return Err(NoteError::ConfigError {
                message: format!("database_path is empty in {}", path.display()),
            });
        }

        Ok(config)
    }

    /// Writes this configuration to `path` as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomically(path, self)?;
        info!("Configuration written to {}", path.display());
        Ok(())
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -t".to_string()
        } else {
            // Try common Linux editors
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "database_path": "/tmp/elsewhere.db" }"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/elsewhere.db"));
        assert_eq!(config.preview_length, 100);
        assert!(config.editor_command.is_none());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert!(matches!(
            Config::load(Some(&path)),
            Err(NoteError::FileNotFound { .. })
        ));
    }

    #[test]
    fn missing_file_yields_defaults_when_allowed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert_eq!(Config::load_or_default(Some(&path)).unwrap(), Config::default());
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(NoteError::Serialization(_))
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            database_path: dir.path().join("notes.db"),
            editor_command: Some("vim".to_string()),
            preview_length: 40,
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn configured_editor_wins() {
        let config = Config {
            editor_command: Some("code --wait".to_string()),
            ..Config::default()
        };
        assert_eq!(config.get_editor_command(), "code --wait");
    }
}
