//! Configuration loading tests
//!
//! Tests that narration configuration loads correctly and provides
//! expected default values

use narrate::config::Config;
use narrate::playback::PlaybackSettings;
use std::fs;
use std::time::Duration;

#[test]
fn test_missing_config_is_created_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".narrate.cfg");

    let config = Config::load_from(&path).expect("Failed to load config");
    assert!(path.exists());
    assert_eq!(config.path(), path.as_path());

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[playback]"));
    assert!(contents.contains("words_per_second"));

    assert_eq!(config.playback_settings(), PlaybackSettings::default());
}

#[test]
fn test_existing_config_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("narrate.cfg");
    fs::write(
        &path,
        "[speech]\nlanguage=fr-FR\nrate=60\n\n[playback]\nwords_per_second=2\nskip_seconds=10\nseek_settle_ms=300\n",
    )
    .unwrap();

    let settings = Config::load_from(&path).unwrap().playback_settings();
    assert_eq!(settings.language, "fr-FR");
    assert_eq!(settings.rate, Some(60));
    assert_eq!(settings.words_per_second, 2.0);
    assert_eq!(settings.skip_seconds, 10.0);
    assert_eq!(settings.seek_settle, Duration::from_millis(300));
    assert_eq!(settings.restart_settle, Duration::from_millis(50));
}

#[test]
fn test_save_round_trips_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("narrate.cfg");

    let mut config = Config::load_from(&path).unwrap();
    config.set("playback", "skip_seconds", "30");
    config.save().unwrap();

    let reloaded = Config::load_from(&path).unwrap();
    assert_eq!(reloaded.skip_seconds(), 30.0);
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("narrate.cfg");
    fs::write(&path, "[playback\nwords_per_second=2\n").unwrap();

    assert!(Config::load_from(&path).is_err());
}
