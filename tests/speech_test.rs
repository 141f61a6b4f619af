//! Integration tests for speech backends
//!
//! These exercise whatever narrator the platform provides. Creation may
//! fail in CI or headless environments without an engine, which is fine:
//! the controller treats that as narration being unavailable.

use narrate::playback::{NarrationController, PlaybackSettings, PlaybackStatus};
use narrate::speech::{create_backend, UtteranceRequest};
use std::time::{Duration, Instant};

#[test]
fn test_create_backend() {
    match create_backend() {
        Ok(backend) => {
            println!(
                "✓ Created {} narrator ({:?})",
                backend.narrator.name(),
                backend.narrator.features()
            );
        }
        Err(e) => {
            println!("⚠ Narrator creation failed (may be expected): {}", e);
        }
    }
}

#[test]
fn test_utterances_get_distinct_ids() {
    let mut backend = match create_backend() {
        Ok(backend) => backend,
        Err(_) => {
            println!("⚠ Skipping utterance test (TTS not available)");
            return;
        }
    };

    let mut request = UtteranceRequest::new("Integration test");
    request.volume = 0.0;

    let first = backend.narrator.speak(&request);
    let _ = backend.narrator.cancel();
    let second = backend.narrator.speak(&request);
    let _ = backend.narrator.cancel();

    match (first, second) {
        (Ok(a), Ok(b)) => {
            assert_ne!(a, b, "Each utterance should get its own id");
            println!("✓ Utterance ids {} and {}", a, b);
        }
        (a, b) => println!("⚠ Speak failed (may be expected): {:?} {:?}", a.err(), b.err()),
    }
}

#[test]
fn test_controller_over_platform_narrator() {
    let backend = create_backend().ok();
    let available = backend.is_some();
    let mut settings = PlaybackSettings::default();
    settings.volume = 0.0;

    let mut controller = NarrationController::new(backend, settings);
    controller.load_content("<p>Accents: café naïve, and 世界.</p>");

    let now = Instant::now();
    controller.play(0.0, now);
    controller.poll(now + Duration::from_millis(10));

    if available {
        assert_ne!(controller.status(), PlaybackStatus::Idle);
        controller.stop();
        assert_eq!(controller.status(), PlaybackStatus::Idle);
        println!("✓ Controller drove the platform narrator");
    } else {
        assert_eq!(controller.status(), PlaybackStatus::Idle);
        println!("⚠ Narration unavailable, controller stayed idle");
    }
}
