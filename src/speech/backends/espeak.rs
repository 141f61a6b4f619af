//! espeak-ng backend
//!
//! Runs one espeak-ng process per utterance. This is the fallback on Linux
//! when Speech Dispatcher is missing, and the preferred backend on WSL with
//! WSLg, where PulseAudio is reachable through /mnt/wslg/PulseServer.
//!
//! Unlike the native engines, a child process can be paused in place:
//! SIGSTOP freezes it mid-sentence and SIGCONT picks up where it left off.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)
//! - PulseAudio client libraries (usually pre-installed with WSLG)

use crate::platform::is_wsl;
use crate::speech::{
    Narrator, NarratorEvent, NarratorFeatures, SpeechErrorKind, UtteranceId, UtteranceRequest,
};
use crate::{NarrateError, Result};
use log::{debug, error, info, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How often a running process is checked for exit
const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// The espeak-ng process behind the live utterance
struct Running {
    id: UtteranceId,
    pid: Pid,
    child: Arc<Mutex<Child>>,
    cancelled: Arc<AtomicBool>,
}

/// espeak-ng narrator
pub struct EspeakNarrator {
    /// Process speaking the current utterance
    current: Option<Running>,

    /// Lifecycle signal channel
    events: Sender<NarratorEvent>,

    /// Path to espeak-ng
    espeak_path: String,

    next_id: u64,
}

impl EspeakNarrator {
    /// Setup PulseAudio server environment
    ///
    /// Auto-detects WSLG PulseAudio server and sets PULSE_SERVER if needed.
    /// Returns error with helpful message if PulseAudio is not available.
    fn setup_pulseaudio() -> Result<()> {
        const WSLG_PULSE_PATH: &str = "/mnt/wslg/PulseServer";

        if std::env::var("PULSE_SERVER").is_ok() {
            debug!("PULSE_SERVER already set via environment");
            return Ok(());
        }

        if std::path::Path::new(WSLG_PULSE_PATH).exists() {
            info!("Auto-detected WSLG PulseAudio server at {}", WSLG_PULSE_PATH);
            std::env::set_var("PULSE_SERVER", WSLG_PULSE_PATH);
            return Ok(());
        }

        if is_wsl() {
            warn!("WSLG PulseAudio server not found at {}", WSLG_PULSE_PATH);
            warn!("Make sure WSLg is installed and running, or set PULSE_SERVER");
            return Err(NarrateError::Speech(
                "PulseAudio server not found. Install WSLg or set PULSE_SERVER environment variable.".to_string()
            ));
        }

        // Native Linux: let espeak-ng use the default PulseAudio socket
        debug!("Running on native Linux - PulseAudio will use default configuration");
        Ok(())
    }

    /// Create a new espeak-ng narrator
    ///
    /// Verifies espeak-ng and PulseAudio are available
    pub fn new(events: Sender<NarratorEvent>) -> Result<Self> {
        debug!("Creating espeak-ng backend");

        Self::setup_pulseaudio()?;

        let espeak_path = Self::find_espeak()?;
        debug!("Found espeak-ng at: {}", espeak_path);

        Ok(Self {
            current: None,
            events,
            espeak_path,
            next_id: 0,
        })
    }

    /// Find espeak-ng executable
    fn find_espeak() -> Result<String> {
        for path in ["espeak-ng", "/usr/bin/espeak-ng"] {
            if let Ok(status) = Command::new(path)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                if status.success() {
                    return Ok(path.to_string());
                }
            }
        }

        Err(NarrateError::Speech(
            "espeak-ng not found. Install with: sudo apt install espeak-ng".to_string(),
        ))
    }

    /// Convert rate (0-100) to espeak speed (80-450 wpm)
    fn rate_to_speed(rate: u8) -> u16 {
        // 0 = 80 wpm, 50 = 265 wpm, 100 = 450 wpm
        80 + (u16::from(rate.min(100)) * 370 / 100)
    }

    /// Convert pitch (0-100) to espeak pitch (0-99)
    fn pitch_to_espeak(pitch: u8) -> u8 {
        ((u16::from(pitch.min(100)) * 99) / 100) as u8
    }

    /// Convert volume (0.0-1.0) to espeak amplitude (0-200)
    fn volume_to_amplitude(volume: f32) -> u8 {
        (volume.clamp(0.0, 1.0) * 200.0).round() as u8
    }

    /// espeak-ng voice name for a language tag ("en-US" -> "en-us")
    fn voice_for_language(language: &str) -> String {
        if language.trim().is_empty() {
            "en".to_string()
        } else {
            language.trim().to_lowercase()
        }
    }

    /// Kill the running process, if any
    ///
    /// The watcher thread reaps it and reports the cancellation.
    fn cancel_process(&mut self) {
        if let Some(running) = self.current.take() {
            debug!("Killing espeak-ng process for {}", running.id);
            running.cancelled.store(true, Ordering::SeqCst);
            if let Ok(mut child) = running.child.lock() {
                if let Err(e) = child.kill() {
                    debug!("Failed to kill espeak-ng process: {}", e);
                }
            }
        }
    }

    /// Report how the process for `id` finished
    fn watch(
        id: UtteranceId,
        child: Arc<Mutex<Child>>,
        cancelled: Arc<AtomicBool>,
        events: Sender<NarratorEvent>,
    ) {
        thread::spawn(move || loop {
            thread::sleep(WATCH_INTERVAL);

            let status = match child.lock() {
                Ok(mut child) => child.try_wait(),
                Err(_) => return,
            };

            let event = match status {
                Ok(None) => continue,
                Ok(Some(_)) if cancelled.load(Ordering::SeqCst) => {
                    NarratorEvent::error(id, SpeechErrorKind::Canceled)
                }
                Ok(Some(status)) if status.success() => NarratorEvent::ended(id),
                Ok(Some(status)) => NarratorEvent::error(
                    id,
                    SpeechErrorKind::Failed(format!("espeak-ng exited with {}", status)),
                ),
                Err(e) => NarratorEvent::error(
                    id,
                    SpeechErrorKind::Failed(format!("Lost track of espeak-ng: {}", e)),
                ),
            };

            debug!("{} finished: {:?}", id, event.kind);
            let _ = events.send(event);
            return;
        });
    }

    fn signal_current(&self, signal: Signal) -> Result<()> {
        if let Some(running) = &self.current {
            kill(running.pid, signal).map_err(|e| {
                NarrateError::Speech(format!("Failed to send {} to espeak-ng: {}", signal, e))
            })?;
        }
        Ok(())
    }
}

impl Narrator for EspeakNarrator {
    fn name(&self) -> &str {
        "espeak-ng"
    }

    fn features(&self) -> NarratorFeatures {
        NarratorFeatures {
            pause_in_place: true,
            live_volume: false,
            lifecycle_events: true,
        }
    }

    fn speak(&mut self, request: &UtteranceRequest) -> Result<UtteranceId> {
        self.cancel_process();

        self.next_id += 1;
        let id = UtteranceId(self.next_id);

        let mut cmd = Command::new(&self.espeak_path);
        cmd.arg("-v").arg(Self::voice_for_language(&request.language));
        cmd.arg("-s").arg(Self::rate_to_speed(request.rate.unwrap_or(50)).to_string());
        cmd.arg("-p").arg(Self::pitch_to_espeak(request.pitch.unwrap_or(50)).to_string());
        cmd.arg("-a").arg(Self::volume_to_amplitude(request.volume).to_string());
        cmd.arg("--stdin");

        // PULSE_SERVER was set in new() and is inherited by the child
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn espeak-ng: {}", e);
            NarrateError::SynthesisFailed(format!("Failed to start espeak-ng: {}", e))
        })?;

        // Long articles overflow the pipe buffer, so feed stdin off-thread
        if let Some(mut stdin) = child.stdin.take() {
            let text = request.text.clone();
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(text.as_bytes()) {
                    debug!("espeak-ng stdin closed early: {}", e);
                }
            });
        }

        debug!("espeak-ng process {} started for {}", child.id(), id);
        let pid = Pid::from_raw(child.id() as i32);
        let child = Arc::new(Mutex::new(child));
        let cancelled = Arc::new(AtomicBool::new(false));

        Self::watch(id, Arc::clone(&child), Arc::clone(&cancelled), self.events.clone());
        self.current = Some(Running {
            id,
            pid,
            child,
            cancelled,
        });

        let _ = self.events.send(NarratorEvent::started(id));
        Ok(id)
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        self.cancel_process();
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        debug!("Pausing speech");
        self.signal_current(Signal::SIGSTOP)
    }

    fn resume(&mut self) -> Result<()> {
        debug!("Resuming speech");
        self.signal_current(Signal::SIGCONT)
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        // A running process keeps its amplitude; the next utterance gets this
        debug!("Volume {} applies from the next utterance", volume);
        Ok(())
    }
}

impl Drop for EspeakNarrator {
    fn drop(&mut self) {
        debug!("Shutting down espeak-ng backend");
        self.cancel_process();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_rate_conversion() {
        assert_eq!(EspeakNarrator::rate_to_speed(0), 80);
        assert_eq!(EspeakNarrator::rate_to_speed(50), 265);
        assert_eq!(EspeakNarrator::rate_to_speed(100), 450);
        assert_eq!(EspeakNarrator::rate_to_speed(255), 450);
    }

    #[test]
    fn test_pitch_conversion() {
        assert_eq!(EspeakNarrator::pitch_to_espeak(0), 0);
        assert_eq!(EspeakNarrator::pitch_to_espeak(50), 49);
        assert_eq!(EspeakNarrator::pitch_to_espeak(100), 99);
    }

    #[test]
    fn test_volume_conversion() {
        assert_eq!(EspeakNarrator::volume_to_amplitude(0.0), 0);
        assert_eq!(EspeakNarrator::volume_to_amplitude(0.5), 100);
        assert_eq!(EspeakNarrator::volume_to_amplitude(1.0), 200);
        assert_eq!(EspeakNarrator::volume_to_amplitude(3.0), 200);
    }

    #[test]
    fn test_voice_for_language() {
        assert_eq!(EspeakNarrator::voice_for_language("en-US"), "en-us");
        assert_eq!(EspeakNarrator::voice_for_language("fr"), "fr");
        assert_eq!(EspeakNarrator::voice_for_language(""), "en");
    }

    #[test]
    fn test_create_espeak_narrator() {
        let (tx, _rx) = mpsc::channel();
        match EspeakNarrator::new(tx) {
            Ok(narrator) => assert!(narrator.features().pause_in_place),
            Err(e) => println!("⚠ espeak-ng backend not available: {}", e),
        }
    }
}
