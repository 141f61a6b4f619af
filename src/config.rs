//! Configuration management

use crate::playback::PlaybackSettings;
use crate::{NarrateError, Result};
use ini::Ini;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persistent narration settings (~/.narrate.cfg)
///
/// `[speech]` holds the voice parameters passed with every utterance;
/// `[playback]` holds pacing and the timing workarounds for engines whose
/// cancel lands asynchronously.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if missing
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| NarrateError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| NarrateError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Parse configuration from a string without touching disk
    pub fn from_str_at(contents: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let ini = Ini::load_from_str(contents)
            .map_err(|e| NarrateError::IniParse(format!("Failed to parse config: {}", e)))?;
        Ok(Self {
            ini,
            path: path.into(),
        })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| NarrateError::Config(format!("Failed to save config: {}", e)))
    }

    /// Default config file path (~/.narrate.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".narrate.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("language", "en-US");

        ini.with_section(Some("playback"))
            .set("words_per_second", "2.5")
            .set("skip_seconds", "15")
            .set("tick_ms", "100")
            .set("restart_settle_ms", "50")
            .set("seek_settle_ms", "200")
            .set("repause_ms", "100");

        ini
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get a float value from config
    pub fn get_float(&self, section: &str, key: &str, default: f64) -> f64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// A 0-100 setting, absent when unset or out of range
    fn percent(&self, key: &str) -> Option<u8> {
        self.get_int("speech", key, -1)
            .try_into()
            .ok()
            .filter(|&v: &u8| v <= 100)
    }

    /// A duration in milliseconds, falling back when negative
    fn millis(&self, key: &str, default: u64) -> Duration {
        let ms = self.get_int("playback", key, default as i64);
        if ms < 0 {
            warn!("Ignoring negative {} = {}", key, ms);
            return Duration::from_millis(default);
        }
        Duration::from_millis(ms as u64)
    }

    // Speech settings

    /// Language tag for narration
    pub fn language(&self) -> String {
        self.get_string("speech", "language", crate::speech::DEFAULT_LANGUAGE)
    }

    /// Speech rate (0-100)
    pub fn rate(&self) -> Option<u8> {
        self.percent("rate")
    }

    /// Speech pitch (0-100)
    pub fn pitch(&self) -> Option<u8> {
        self.percent("pitch")
    }

    /// Unmuted volume (0-100)
    pub fn volume(&self) -> Option<u8> {
        self.percent("volume")
    }

    // Playback settings

    /// Narration pace used to estimate duration
    pub fn words_per_second(&self) -> f64 {
        let wps = self.get_float("playback", "words_per_second", 2.5);
        if wps > 0.0 {
            wps
        } else {
            warn!("Ignoring non-positive words_per_second = {}", wps);
            2.5
        }
    }

    /// Seconds jumped by skip forward / skip back
    pub fn skip_seconds(&self) -> f64 {
        self.get_float("playback", "skip_seconds", 15.0).abs()
    }

    /// Sampler period
    pub fn tick(&self) -> Duration {
        self.millis("tick_ms", 100)
    }

    /// Delay between cancelling and restarting in play
    pub fn restart_settle(&self) -> Duration {
        self.millis("restart_settle_ms", 50)
    }

    /// Delay between cancelling and restarting after a seek
    pub fn seek_settle(&self) -> Duration {
        self.millis("seek_settle_ms", 200)
    }

    /// Delay before pausing again after a seek made while paused
    pub fn repause_delay(&self) -> Duration {
        self.millis("repause_ms", 100)
    }

    /// Everything the playback controller needs from the config
    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            words_per_second: self.words_per_second(),
            skip_seconds: self.skip_seconds(),
            tick: self.tick(),
            restart_settle: self.restart_settle(),
            seek_settle: self.seek_settle(),
            repause_delay: self.repause_delay(),
            language: self.language(),
            rate: self.rate(),
            pitch: self.pitch(),
            volume: self.volume().map_or(1.0, |v| f32::from(v) / 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Config {
        Config::from_str_at(contents, "test.cfg").unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = parse("");
        let settings = config.playback_settings();
        assert_eq!(settings, PlaybackSettings::default());
    }

    #[test]
    fn test_speech_values() {
        let config = parse("[speech]\nlanguage=en-GB\nrate=70\npitch=40\nvolume=80\n");
        assert_eq!(config.language(), "en-GB");
        assert_eq!(config.rate(), Some(70));
        assert_eq!(config.pitch(), Some(40));
        assert_eq!(config.playback_settings().volume, 0.8);
    }

    #[test]
    fn test_out_of_range_percent_ignored() {
        let config = parse("[speech]\nrate=150\nvolume=-4\n");
        assert_eq!(config.rate(), None);
        assert_eq!(config.volume(), None);
    }

    #[test]
    fn test_playback_timings() {
        let config = parse("[playback]\nseek_settle_ms=350\nrepause_ms=-1\ntick_ms=250\n");
        assert_eq!(config.seek_settle(), Duration::from_millis(350));
        assert_eq!(config.repause_delay(), Duration::from_millis(100));
        assert_eq!(config.tick(), Duration::from_millis(250));
    }

    #[test]
    fn test_bad_pace_falls_back() {
        assert_eq!(parse("[playback]\nwords_per_second=0\n").words_per_second(), 2.5);
        assert_eq!(parse("[playback]\nwords_per_second=abc\n").words_per_second(), 2.5);
        assert_eq!(parse("[playback]\nwords_per_second=3\n").words_per_second(), 3.0);
    }

    #[test]
    fn test_set_and_get() {
        let mut config = parse("");
        config.set("playback", "skip_seconds", "30");
        assert_eq!(config.skip_seconds(), 30.0);
        assert_eq!(config.get_string("playback", "missing", "x"), "x");
    }
}
