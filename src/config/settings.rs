//! Engine settings and paths.
//!
//! Settings are stored as JSON in an XDG-compliant config directory. Values
//! outside their allowed range are clamped, never rejected.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Global paths singleton.
static PATHS: OnceLock<Option<Paths>> = OnceLock::new();

/// Allowed horizontal range.
pub const HORIZONTAL_RANGE: (i32, i32) = (0, 128);
/// Allowed vertical range; -1 means the whole world height.
pub const VERTICAL_RANGE: (i32, i32) = (-1, 253);
/// Allowed notice durations, in seconds. Zero disables the notice.
pub const NOTICE_SECS: (f32, f32) = (0.0, 10.0);
/// Shortest sweep or retry interval, in seconds.
pub const MIN_INTERVAL_SECS: f32 = 0.1;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/inbox-sort)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Get the global paths instance.
    pub fn get() -> ConfigResult<&'static Paths> {
        PATHS
            .get_or_init(|| Self::new().ok())
            .as_ref()
            .ok_or(ConfigError::DirectoryNotFound)
    }

    fn new() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "inbox-sort", "inbox-sort")
            .ok_or(ConfigError::DirectoryNotFound)?;
        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxSettings {
    /// Reach on the x and z axes.
    pub horizontal_range: i32,
    /// Reach on the y axis; -1 scans the whole world height.
    pub vertical_range: i32,
    /// How long "transferred" notices stay on a container (0 disables).
    pub success_notice_secs: f32,
    /// How long "blocked" notices stay on a container (0 disables).
    pub blocked_notice_secs: f32,
    /// Keep inboxes inside a land claim from reaching outside it.
    pub base_siphoning_protection: bool,
    /// How often expired labels are swept.
    pub sweep_interval_secs: f32,
    /// Delay before retrying a failed label restore.
    pub restore_retry_secs: f32,
}

impl Default for InboxSettings {
    fn default() -> Self {
        Self {
            horizontal_range: 5,
            vertical_range: 5,
            success_notice_secs: 2.0,
            blocked_notice_secs: 3.0,
            base_siphoning_protection: true,
            sweep_interval_secs: 3.0,
            restore_retry_secs: 5.0,
        }
    }
}

impl InboxSettings {
    /// Copy of these settings with every value forced into its allowed range.
    pub fn clamped(&self) -> Self {
        let clamp_secs = |value: f32, (lo, hi): (f32, f32)| {
            if value.is_nan() {
                lo
            } else {
                value.clamp(lo, hi)
            }
        };
        let interval = |value: f32| {
            if value.is_nan() {
                MIN_INTERVAL_SECS
            } else {
                value.max(MIN_INTERVAL_SECS)
            }
        };
        Self {
            horizontal_range: self
                .horizontal_range
                .clamp(HORIZONTAL_RANGE.0, HORIZONTAL_RANGE.1),
            vertical_range: self.vertical_range.clamp(VERTICAL_RANGE.0, VERTICAL_RANGE.1),
            success_notice_secs: clamp_secs(self.success_notice_secs, NOTICE_SECS),
            blocked_notice_secs: clamp_secs(self.blocked_notice_secs, NOTICE_SECS),
            base_siphoning_protection: self.base_siphoning_protection,
            sweep_interval_secs: interval(self.sweep_interval_secs),
            restore_retry_secs: interval(self.restore_retry_secs),
        }
    }

    pub fn success_notice(&self) -> Duration {
        Duration::from_secs_f32(self.success_notice_secs.max(0.0))
    }

    pub fn blocked_notice(&self) -> Duration {
        Duration::from_secs_f32(self.blocked_notice_secs.max(0.0))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs_f32(self.sweep_interval_secs.max(MIN_INTERVAL_SECS))
    }

    pub fn restore_retry(&self) -> Duration {
        Duration::from_secs_f32(self.restore_retry_secs.max(MIN_INTERVAL_SECS))
    }

    /// Load settings from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::get()?.settings_file();
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file, clamping every value.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        Ok(settings.clamped())
    }

    /// Save settings to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = Paths::get()?;
        fs::create_dir_all(&paths.config_dir)?;
        self.save_to(&paths.settings_file())
    }

    /// Save settings to a specific file.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Human-readable summary with allowed ranges.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InboxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- horizontal-range: {}", self.horizontal_range)?;
        writeln!(
            f,
            "  - [recommended: 5 | must be >= {} & <= {}]",
            HORIZONTAL_RANGE.0, HORIZONTAL_RANGE.1
        )?;
        writeln!(f, "- vertical-range: {}", self.vertical_range)?;
        writeln!(
            f,
            "  - [recommended: 5 | must be >= {} & <= {} | -1 = whole world height]",
            VERTICAL_RANGE.0, VERTICAL_RANGE.1
        )?;
        writeln!(f, "- success-notice-time: {:.1}", self.success_notice_secs)?;
        writeln!(
            f,
            "  - [recommended: 2.0 | must be >= {:.1} & <= {:.1} | disable with 0.0]",
            NOTICE_SECS.0, NOTICE_SECS.1
        )?;
        writeln!(f, "- blocked-notice-time: {:.1}", self.blocked_notice_secs)?;
        writeln!(
            f,
            "  - [recommended: 3.0 | must be >= {:.1} & <= {:.1} | disable with 0.0]",
            NOTICE_SECS.0, NOTICE_SECS.1
        )?;
        writeln!(
            f,
            "- base-siphoning-protection: {}",
            self.base_siphoning_protection
        )?;
        writeln!(f, "  - [recommended: true]")?;
        writeln!(f, "- sweep-interval: {:.1}s", self.sweep_interval_secs)?;
        write!(f, "- restore-retry: {:.1}s", self.restore_retry_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = InboxSettings::default();
        assert_eq!(settings.horizontal_range, 5);
        assert_eq!(settings.vertical_range, 5);
        assert!(settings.base_siphoning_protection);
        assert_eq!(settings.restore_retry(), Duration::from_secs(5));
    }

    #[test]
    fn test_clamped() {
        let settings = InboxSettings {
            horizontal_range: 500,
            vertical_range: -7,
            success_notice_secs: 42.0,
            blocked_notice_secs: -1.0,
            sweep_interval_secs: 0.0,
            ..InboxSettings::default()
        }
        .clamped();

        assert_eq!(settings.horizontal_range, 128);
        assert_eq!(settings.vertical_range, -1);
        assert_eq!(settings.success_notice_secs, 10.0);
        assert_eq!(settings.blocked_notice_secs, 0.0);
        assert_eq!(settings.sweep_interval_secs, MIN_INTERVAL_SECS);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: InboxSettings = serde_json::from_str(r#"{"horizontal_range": 9}"#).unwrap();
        assert_eq!(settings.horizontal_range, 9);
        assert_eq!(settings.blocked_notice_secs, 3.0);
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = InboxSettings {
            horizontal_range: 12,
            base_siphoning_protection: false,
            ..InboxSettings::default()
        };
        settings.save_to(&path).unwrap();

        let loaded = InboxSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_clamps_out_of_range_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"horizontal_range": 1000, "vertical_range": 999}"#).unwrap();

        let loaded = InboxSettings::load_from(&path).unwrap();
        assert_eq!(loaded.horizontal_range, 128);
        assert_eq!(loaded.vertical_range, 253);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            InboxSettings::load_from(&path),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_describe_mentions_every_setting() {
        let text = InboxSettings::default().describe();
        assert!(text.contains("horizontal-range: 5"));
        assert!(text.contains("base-siphoning-protection: true"));
    }
}
