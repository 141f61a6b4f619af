//! Narration controller
//!
//! Turns transport commands (play, pause/resume, stop, seek, mute) into
//! operations on a narrator that can only speak whole utterances from the
//! start. Seeking is done by cancelling and speaking the words after the
//! target position; the displayed position comes from the wall clock.
//!
//! Everything happens on the caller's thread. Narrator callbacks arrive as
//! [`NarratorEvent`]s on a channel and are applied by [`poll`], which also
//! runs deferred steps and the position sampler. Every entry point takes the
//! current [`Instant`] so timing is explicit.
//!
//! No method returns an error. Failures become state transitions and the
//! only observable output is the [`PlaybackSnapshot`] stream.
//!
//! [`poll`]: NarrationController::poll

use super::clock::{PlaybackClock, Sampler};
use super::scheduler::Scheduler;
use super::settings::PlaybackSettings;
use super::state::{PlaybackSnapshot, PlaybackState, PlaybackStatus};
use crate::content::NarrationSource;
use crate::speech::{
    NarratorEvent, NarratorEventKind, NarratorFeatures, SpeechBackend, SpeechErrorKind,
    UtteranceId, UtteranceRequest,
};
use crate::NarrateError;
use log::{debug, info, trace, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

/// Whether narration can happen at all in this runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Available,
    Unavailable,
}

/// Second halves of transitions that wait for the engine
#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    /// Speak from `from` once a cancel has had time to land
    Speak { from: f64 },
    /// Restart after a seek, pausing again once started if `repause`
    Play { from: f64, repause: bool },
    /// Pause the utterance a post-seek restart produced
    Repause { utterance: UtteranceId },
}

/// The utterance currently considered live
#[derive(Debug, Clone, Copy)]
struct LiveUtterance {
    id: UtteranceId,
    /// Position the utterance's first word corresponds to
    from: f64,
    /// Volume it was synthesized with
    volume: f32,
}

/// Playback state machine over a non-seekable narrator
pub struct NarrationController {
    backend: Option<SpeechBackend>,
    features: NarratorFeatures,
    settings: PlaybackSettings,
    source: NarrationSource,
    state: PlaybackState,
    live: Option<LiveUtterance>,
    /// Re-pause as soon as the pending utterance starts
    repause_on_start: bool,
    clock: PlaybackClock,
    sampler: Sampler,
    deferred: Scheduler<Deferred>,
    subscribers: Vec<Sender<PlaybackSnapshot>>,
    last_published: Option<PlaybackSnapshot>,
}

impl NarrationController {
    /// Create a controller
    ///
    /// Pass `None` when no narrator could be created; the controller then
    /// ignores every command and stays `Idle`.
    pub fn new(backend: Option<SpeechBackend>, settings: PlaybackSettings) -> Self {
        let features = match &backend {
            Some(backend) => {
                let features = backend.narrator.features();
                info!("Narrating with {} ({:?})", backend.narrator.name(), features);
                features
            }
            None => {
                warn!("{}", NarrateError::CapabilityUnavailable);
                NarratorFeatures::default()
            }
        };

        Self {
            backend,
            features,
            sampler: Sampler::new(settings.tick),
            settings,
            source: NarrationSource::empty(),
            state: PlaybackState::new(),
            live: None,
            repause_on_start: false,
            clock: PlaybackClock::new(),
            deferred: Scheduler::new(),
            subscribers: Vec::new(),
            last_published: None,
        }
    }

    pub fn capability(&self) -> Capability {
        if self.backend.is_some() {
            Capability::Available
        } else {
            Capability::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        self.capability() == Capability::Available
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn source(&self) -> &NarrationSource {
        &self.source
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.snapshot()
    }

    /// Utterance currently considered live, if any
    pub fn live_utterance(&self) -> Option<UtteranceId> {
        self.live.map(|live| live.id)
    }

    /// Receive a snapshot on every visible state change
    ///
    /// The current snapshot is sent immediately.
    pub fn subscribe(&mut self) -> Receiver<PlaybackSnapshot> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.snapshot());
        self.subscribers.push(tx);
        rx
    }

    // ========== Transport commands ==========

    /// Replace the content being narrated
    ///
    /// Playback of the previous content is abandoned unconditionally.
    pub fn load_content(&mut self, markup: &str) -> &NarrationSource {
        self.reset();
        self.source = NarrationSource::from_markup(markup, self.settings.words_per_second);
        self.state.total_duration = self.source.total_duration();
        self.state.elapsed_seconds = 0.0;

        if self.source.is_empty() {
            debug!("{}", NarrateError::EmptyContent);
        } else {
            info!(
                "Loaded {} words (~{}s)",
                self.source.word_count(),
                self.source.total_duration()
            );
        }

        self.publish();
        &self.source
    }

    /// Start narrating at `from_seconds`
    pub fn play(&mut self, from_seconds: f64, now: Instant) {
        self.repause_on_start = false;
        self.start(from_seconds, now);
    }

    /// Pause while playing, resume while paused; otherwise nothing
    pub fn pause_or_resume(&mut self, now: Instant) {
        match self.state.status {
            PlaybackStatus::Playing => self.pause(now),
            PlaybackStatus::Paused => self.resume(now),
            status => trace!("Pause/resume ignored while {}", status),
        }
    }

    /// Stop narration and rewind to the start
    pub fn stop(&mut self) {
        if !self.is_available() {
            return;
        }
        debug!("Stop at {:.1}s", self.state.elapsed_seconds);
        self.reset();
        self.publish();
    }

    /// Move the position by `delta_seconds`, clamped to the content
    pub fn seek(&mut self, delta_seconds: f64, now: Instant) {
        if !self.is_available() {
            return;
        }

        if self.state.status == PlaybackStatus::Playing {
            self.sample(now);
        }
        let target = (self.state.elapsed_seconds + delta_seconds)
            .clamp(0.0, self.state.total_duration.max(0.0));

        match self.state.status {
            PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Loading => {
                let repause = self.state.status == PlaybackStatus::Paused || self.repause_on_start;
                debug!(
                    "Seek {:+}s to {:.1}s (restarting in {:?})",
                    delta_seconds, target, self.settings.seek_settle
                );

                self.sampler.stop();
                self.deferred.clear();
                self.repause_on_start = false;
                self.cancel_live();
                self.clock.clear();
                self.state.set_elapsed(target);
                self.set_status(PlaybackStatus::Loading);
                self.publish();

                self.deferred.schedule(
                    now,
                    self.settings.seek_settle,
                    Deferred::Play {
                        from: target,
                        repause,
                    },
                );
            }
            _ => {
                debug!("Seek {:+}s to {:.1}s (not playing)", delta_seconds, target);
                self.state.set_elapsed(target);
                self.publish();
            }
        }
    }

    /// Jump forward by the configured skip interval
    pub fn skip_forward(&mut self, now: Instant) {
        self.seek(self.settings.skip_seconds, now);
    }

    /// Jump back by the configured skip interval
    pub fn skip_back(&mut self, now: Instant) {
        self.seek(-self.settings.skip_seconds, now);
    }

    /// Flip mute; applies to live speech where the engine allows it
    pub fn toggle_mute(&mut self, now: Instant) {
        if !self.is_available() {
            return;
        }

        self.state.is_muted = !self.state.is_muted;
        let volume = self.output_volume();
        debug!("Mute {}", if self.state.is_muted { "on" } else { "off" });

        if let Some(live) = self.live {
            if self.features.live_volume {
                if let Some(backend) = self.backend.as_mut() {
                    match backend.narrator.set_volume(volume) {
                        Ok(()) => self.live = Some(LiveUtterance { volume, ..live }),
                        Err(e) => warn!("Failed to change volume: {}", e),
                    }
                }
            } else if matches!(
                self.state.status,
                PlaybackStatus::Playing | PlaybackStatus::Loading
            ) {
                // Volume is fixed at synthesis time; re-speak from here
                self.seek(0.0, now);
            }
        }

        self.publish();
    }

    // ========== Event loop integration ==========

    /// Apply pending narrator events, due deferred steps and sampler ticks
    pub fn poll(&mut self, now: Instant) {
        let events: Vec<NarratorEvent> = match &self.backend {
            Some(backend) => backend.events.try_iter().collect(),
            None => return,
        };
        for event in events {
            self.handle_event(event, now);
        }

        while let Some(step) = self.deferred.pop_due(now) {
            self.run_deferred(step, now);
        }

        if self.sampler.take_tick(now) {
            self.tick(now);
        }
    }

    /// How long the event loop may sleep before `poll` has work
    pub fn time_until_next_wakeup(&self, now: Instant) -> Option<Duration> {
        match (
            self.sampler.time_until_tick(now),
            self.deferred.time_until_next(now),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Transition function for one narrator signal
    ///
    /// Signals for anything but the live utterance are leftovers from a
    /// cancelled one and are dropped.
    pub fn handle_event(&mut self, event: NarratorEvent, now: Instant) {
        let live = match self.live {
            Some(live) if live.id == event.utterance => live,
            _ => {
                trace!("Ignoring {:?} from stale {}", event.kind, event.utterance);
                return;
            }
        };

        match event.kind {
            NarratorEventKind::Started => self.on_started(live, now),
            NarratorEventKind::Ended => {
                debug!("{} ended", live.id);
                self.live = None;
                self.finish();
            }
            NarratorEventKind::Error(kind) if kind.is_benign() => {
                // Our own cancels release the handle first, so this one came
                // from outside; hold the position without surfacing an error
                debug!("{} {}: {}", live.id, kind, NarrateError::SynthesisInterrupted);
                self.live = None;
                self.interrupted(now);
            }
            NarratorEventKind::Error(kind) => {
                self.live = None;
                let message = match kind {
                    SpeechErrorKind::Failed(message) => message,
                    other => other.to_string(),
                };
                self.fail(NarrateError::SynthesisFailed(message));
            }
        }
    }

    // ========== Internals ==========

    fn start(&mut self, from_seconds: f64, now: Instant) {
        if !self.is_available() {
            trace!("Play ignored: {}", NarrateError::CapabilityUnavailable);
            return;
        }
        if self.source.is_empty() {
            debug!("Play ignored: {}", NarrateError::EmptyContent);
            return;
        }

        let from = from_seconds.clamp(0.0, self.state.total_duration);
        self.deferred.clear();
        self.sampler.stop();
        let had_live = self.cancel_live();
        self.state.error = None;

        if from >= self.state.total_duration {
            debug!("Play from {:.1}s: nothing left to say", from);
            self.finish();
            return;
        }

        self.state.set_elapsed(from);
        self.clock.anchor(now, from);
        self.set_status(PlaybackStatus::Loading);
        self.publish();

        if had_live {
            self.deferred.schedule(
                now,
                self.settings.restart_settle,
                Deferred::Speak { from },
            );
        } else {
            self.speak_from(from);
        }
    }

    /// Create the utterance for the words after `from`
    fn speak_from(&mut self, from: f64) {
        let text = match self.source.remaining_text(from) {
            Some(text) => text,
            None => {
                self.finish();
                return;
            }
        };

        let mut request = UtteranceRequest::new(text);
        request.language = self.settings.language.clone();
        request.rate = self.settings.rate;
        request.pitch = self.settings.pitch;
        request.volume = self.output_volume();

        let spoken = match self.backend.as_mut() {
            Some(backend) => backend.narrator.speak(&request),
            None => return,
        };

        match spoken {
            Ok(id) => {
                debug!(
                    "{} covers words {}.. of {}",
                    id,
                    self.source.word_offset(from),
                    self.source.word_count()
                );
                self.live = Some(LiveUtterance {
                    id,
                    from,
                    volume: request.volume,
                });
            }
            Err(e) if e.is_benign() => {
                debug!("Speak interrupted: {}", e);
                self.reset();
                self.publish();
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_started(&mut self, live: LiveUtterance, now: Instant) {
        if self.state.status != PlaybackStatus::Loading {
            trace!("{} started while {}", live.id, self.state.status);
            return;
        }

        debug!("{} started at {:.1}s", live.id, live.from);
        self.clock.anchor(now, live.from);
        self.state.set_elapsed(live.from);
        self.set_status(PlaybackStatus::Playing);
        self.sampler.start(now);
        self.publish();

        if self.repause_on_start {
            self.repause_on_start = false;
            self.deferred.schedule(
                now,
                self.settings.repause_delay,
                Deferred::Repause { utterance: live.id },
            );
        }
    }

    fn run_deferred(&mut self, step: Deferred, now: Instant) {
        trace!("Running deferred {:?}", step);
        match step {
            Deferred::Speak { from } => {
                if self.state.status == PlaybackStatus::Loading && self.live.is_none() {
                    self.speak_from(from);
                }
            }
            Deferred::Play { from, repause } => {
                self.start(from, now);
                self.repause_on_start = repause && self.state.status == PlaybackStatus::Loading;
            }
            Deferred::Repause { utterance } => {
                if self.live_utterance() == Some(utterance)
                    && self.state.status == PlaybackStatus::Playing
                {
                    self.pause(now);
                }
            }
        }
    }

    fn pause(&mut self, now: Instant) {
        self.sample(now);
        self.sampler.stop();
        self.deferred.clear();
        self.repause_on_start = false;

        let paused_in_place = self.features.pause_in_place
            && match self.backend.as_mut() {
                Some(backend) => match backend.narrator.pause() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Pause failed, will re-synthesize on resume: {}", e);
                        false
                    }
                },
                None => false,
            };
        if !paused_in_place {
            self.cancel_live();
        }

        debug!("Paused at {:.1}s", self.state.elapsed_seconds);
        self.set_status(PlaybackStatus::Paused);
        self.publish();
    }

    fn resume(&mut self, now: Instant) {
        let elapsed = self.state.elapsed_seconds;
        let volume = self.output_volume();

        let resumed_in_place = match (self.live, self.backend.as_mut()) {
            (Some(live), Some(backend)) if live.volume == volume => {
                match backend.narrator.resume() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Resume failed, re-synthesizing: {}", e);
                        false
                    }
                }
            }
            _ => false,
        };

        if resumed_in_place {
            debug!("Resumed at {:.1}s", elapsed);
            self.clock.anchor(now, elapsed);
            self.set_status(PlaybackStatus::Playing);
            self.sampler.start(now);
            self.publish();
        } else {
            self.start(elapsed, now);
        }
    }

    /// Sampler tick: derive the position from the wall clock
    fn tick(&mut self, now: Instant) {
        if self.state.status != PlaybackStatus::Playing {
            self.sampler.stop();
            return;
        }
        self.sample(now);

        // Without end signals the estimate is all there is
        if !self.features.lifecycle_events
            && self.state.elapsed_seconds >= self.state.total_duration
        {
            self.live = None;
            self.finish();
            return;
        }
        self.publish();
    }

    fn sample(&mut self, now: Instant) {
        if let Some(elapsed) = self.clock.elapsed(now, self.state.total_duration) {
            // Never step backwards, e.g. after re-anchoring on resume
            if elapsed > self.state.elapsed_seconds {
                self.state.set_elapsed(elapsed);
            }
        }
    }

    /// Speech stopped underneath us: park at the current position
    ///
    /// Resuming re-synthesizes since there is no utterance left.
    fn interrupted(&mut self, now: Instant) {
        if self.state.status == PlaybackStatus::Playing {
            self.sample(now);
        }
        self.sampler.stop();
        self.deferred.clear();
        self.repause_on_start = false;
        self.clock.clear();
        self.set_status(PlaybackStatus::Paused);
        self.publish();
    }

    fn finish(&mut self) {
        self.sampler.stop();
        self.deferred.clear();
        self.repause_on_start = false;
        self.clock.clear();
        self.state.elapsed_seconds = self.state.total_duration;
        self.set_status(PlaybackStatus::Ended);
        self.publish();
    }

    fn fail(&mut self, error: NarrateError) {
        warn!("{}", error);
        self.cancel_live();
        self.sampler.stop();
        self.deferred.clear();
        self.repause_on_start = false;
        self.clock.clear();
        self.state.error = Some(error.to_string());
        self.set_status(PlaybackStatus::Error);
        self.publish();
    }

    /// Back to `Idle` at zero, keeping content and mute
    fn reset(&mut self) {
        self.cancel_live();
        self.sampler.stop();
        self.deferred.clear();
        self.repause_on_start = false;
        self.clock.clear();
        self.state.elapsed_seconds = 0.0;
        self.state.error = None;
        self.set_status(PlaybackStatus::Idle);
    }

    /// Cancel and forget the live utterance; true if there was one
    fn cancel_live(&mut self) -> bool {
        let live = match self.live.take() {
            Some(live) => live,
            None => return false,
        };
        if let Some(backend) = self.backend.as_mut() {
            debug!("Cancelling {}", live.id);
            if let Err(e) = backend.narrator.cancel() {
                warn!("Cancel failed: {}", e);
            }
        }
        true
    }

    fn output_volume(&self) -> f32 {
        if self.state.is_muted {
            0.0
        } else {
            self.settings.volume.clamp(0.0, 1.0)
        }
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.state.status != status {
            debug!("Playback {} -> {}", self.state.status, status);
            self.state.status = status;
        }
    }

    fn publish(&mut self) {
        let snapshot = self.state.snapshot();
        if self.last_published.as_ref() == Some(&snapshot) {
            return;
        }
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        self.last_published = Some(snapshot);
    }
}

impl Drop for NarrationController {
    fn drop(&mut self) {
        self.sampler.stop();
        self.deferred.clear();
        if self.cancel_live() {
            debug!("Narration cancelled on teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_controller_stays_idle() {
        let t0 = Instant::now();
        let mut controller = NarrationController::new(None, PlaybackSettings::default());
        assert_eq!(controller.capability(), Capability::Unavailable);

        controller.load_content("<p>one two three four five</p>");
        controller.play(0.0, t0);
        controller.seek(15.0, t0);
        controller.toggle_mute(t0);
        controller.pause_or_resume(t0);
        controller.poll(t0 + Duration::from_secs(1));

        assert_eq!(controller.status(), PlaybackStatus::Idle);
        assert_eq!(controller.state().elapsed_seconds, 0.0);
        assert!(!controller.state().is_muted);
        assert_eq!(controller.time_until_next_wakeup(t0), None);
    }

    #[test]
    fn test_unavailable_controller_still_estimates_duration() {
        let t0 = Instant::now();
        let mut controller = NarrationController::new(None, PlaybackSettings::default());
        let source = controller.load_content("<p>one two three four five</p>");
        assert_eq!(source.total_duration(), 2.0);
    }
}
