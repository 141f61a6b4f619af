//! Native TTS backend using the tts crate
//!
//! The `tts` crate provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS (via native bindings)
//! - WinRT/SAPI on Windows
//!
//! Utterance callbacks from the crate are forwarded as [`NarratorEvent`]s.
//! None of these engines can pause an utterance in place, so pause is
//! reported as unsupported and the controller falls back to re-synthesis.

use crate::speech::{
    scale_setting, Narrator, NarratorEvent, NarratorFeatures, SpeechErrorKind, UtteranceId,
    UtteranceRequest,
};
use crate::{NarrateError, Result};
use log::{debug, error, warn};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tts::{Tts as TtsCrate, UtteranceId as TtsUtteranceId};

/// Mapping from the engine's utterance ids to ours
///
/// `latest` covers a begin callback that fires before `speak` has handed
/// the engine id back, and engines that never hand ids back at all. Once
/// real ids are known, signals for unknown ids are leftovers and map to
/// nothing.
struct IdTable<K> {
    pairs: Vec<(K, UtteranceId)>,
    latest: Option<UtteranceId>,
    engine_ids: bool,
}

impl<K: PartialEq> IdTable<K> {
    fn new() -> Self {
        Self {
            pairs: Vec::new(),
            latest: None,
            engine_ids: false,
        }
    }

    fn track(&mut self, engine_id: K, id: UtteranceId) {
        self.engine_ids = true;
        self.pairs.push((engine_id, id));
    }

    fn lookup(&self, engine_id: &K) -> Option<UtteranceId> {
        self.pairs
            .iter()
            .find(|(known, _)| known == engine_id)
            .map(|(_, id)| *id)
            .or(if self.engine_ids { None } else { self.latest })
    }

    /// Id for a begin signal, which may race ahead of `track`
    fn lookup_started(&self, engine_id: &K) -> Option<UtteranceId> {
        self.lookup(engine_id).or(self.latest)
    }

    fn forget(&mut self, engine_id: &K) {
        self.pairs.retain(|(known, _)| known != engine_id);
    }
}

/// Native TTS backend using the tts crate
pub struct NativeNarrator {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Engine ids of utterances still in flight
    ids: Arc<Mutex<IdTable<TtsUtteranceId>>>,

    /// Where lifecycle signals go when the engine cannot call back
    events: Sender<NarratorEvent>,

    features: tts::Features,

    next_id: u64,

    /// Last applied settings, so unchanged values are not re-sent
    rate: Option<u8>,
    pitch: Option<u8>,
    volume: Option<f32>,
    language: Option<String>,
}

impl NativeNarrator {
    /// Create a new native narrator
    ///
    /// Initializes the platform-appropriate TTS backend and registers
    /// utterance callbacks when the platform supports them.
    pub fn new(events: Sender<NarratorEvent>) -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| NarrateError::Speech(format!("Failed to initialize TTS: {}", e)))?;
        let features = tts.supported_features();
        let ids = Arc::new(Mutex::new(IdTable::new()));

        if features.utterance_callbacks {
            Self::register_callbacks(&tts, &ids, &events)?;
        } else {
            warn!("Utterance callbacks not supported; end of speech will be estimated");
        }

        debug!("Native TTS backend created successfully");

        Ok(Self {
            tts,
            ids,
            events,
            features,
            next_id: 0,
            rate: None,
            pitch: None,
            volume: None,
            language: None,
        })
    }

    fn register_callbacks(
        tts: &TtsCrate,
        ids: &Arc<Mutex<IdTable<TtsUtteranceId>>>,
        events: &Sender<NarratorEvent>,
    ) -> Result<()> {
        let (table, tx) = (Arc::clone(ids), events.clone());
        tts.on_utterance_begin(Some(Box::new(move |tts_id| {
            if let Some(id) = table.lock().ok().and_then(|t| t.lookup_started(&tts_id)) {
                let _ = tx.send(NarratorEvent::started(id));
            }
        })))
        .map_err(|e| NarrateError::Speech(format!("Failed to register callback: {}", e)))?;

        let (table, tx) = (Arc::clone(ids), events.clone());
        tts.on_utterance_end(Some(Box::new(move |tts_id| {
            if let Ok(mut t) = table.lock() {
                if let Some(id) = t.lookup(&tts_id) {
                    let _ = tx.send(NarratorEvent::ended(id));
                }
                t.forget(&tts_id);
            }
        })))
        .map_err(|e| NarrateError::Speech(format!("Failed to register callback: {}", e)))?;

        let (table, tx) = (Arc::clone(ids), events.clone());
        tts.on_utterance_stop(Some(Box::new(move |tts_id| {
            if let Ok(mut t) = table.lock() {
                if let Some(id) = t.lookup(&tts_id) {
                    let _ = tx.send(NarratorEvent::error(id, SpeechErrorKind::Interrupted));
                }
                t.forget(&tts_id);
            }
        })))
        .map_err(|e| NarrateError::Speech(format!("Failed to register callback: {}", e)))?;

        Ok(())
    }

    /// Push per-utterance settings to the engine when they changed
    fn apply_settings(&mut self, request: &UtteranceRequest) -> Result<()> {
        let rate = request.rate.filter(|_| self.features.rate && request.rate != self.rate);
        if let Some(rate) = rate {
            let converted = scale_setting(
                rate,
                self.tts.min_rate(),
                self.tts.normal_rate(),
                self.tts.max_rate(),
            );
            debug!("Setting rate to {} ({})", rate, converted);
            self.tts
                .set_rate(converted)
                .map_err(|e| NarrateError::Speech(format!("Failed to set rate: {}", e)))?;
            self.rate = Some(rate);
        }

        let pitch = request.pitch.filter(|_| self.features.pitch && request.pitch != self.pitch);
        if let Some(pitch) = pitch {
            let converted = scale_setting(
                pitch,
                self.tts.min_pitch(),
                self.tts.normal_pitch(),
                self.tts.max_pitch(),
            );
            debug!("Setting pitch to {} ({})", pitch, converted);
            self.tts
                .set_pitch(converted)
                .map_err(|e| NarrateError::Speech(format!("Failed to set pitch: {}", e)))?;
            self.pitch = Some(pitch);
        }

        if self.volume != Some(request.volume) {
            self.set_volume(request.volume)?;
        }

        if self.language.as_deref() != Some(request.language.as_str()) {
            self.select_language(&request.language);
            self.language = Some(request.language.clone());
        }

        Ok(())
    }

    /// Pick the first installed voice for a language, if the engine allows
    fn select_language(&mut self, language: &str) {
        if !self.features.voice {
            return;
        }

        let voices = match self.tts.voices() {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Failed to list voices: {}", e);
                return;
            }
        };

        let wanted = language.to_lowercase();
        match voices
            .iter()
            .find(|v| v.language().to_string().to_lowercase() == wanted)
        {
            Some(voice) => {
                debug!("Selecting voice {} for {}", voice.name(), language);
                if let Err(e) = self.tts.set_voice(voice) {
                    warn!("Failed to set voice: {}", e);
                }
            }
            None => debug!("No voice for {}, keeping engine default", language),
        }
    }

    /// Convert volume (0.0-1.0) to the engine's range
    fn convert_volume(&self, volume: f32) -> f32 {
        let volume = volume.clamp(0.0, 1.0);
        self.tts.min_volume() + (self.tts.max_volume() - self.tts.min_volume()) * volume
    }
}

impl Narrator for NativeNarrator {
    fn name(&self) -> &str {
        "native"
    }

    fn features(&self) -> NarratorFeatures {
        NarratorFeatures {
            pause_in_place: false,
            live_volume: self.features.volume,
            lifecycle_events: self.features.utterance_callbacks,
        }
    }

    fn speak(&mut self, request: &UtteranceRequest) -> Result<UtteranceId> {
        self.apply_settings(request)?;

        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        debug!("Speaking {} ({} chars)", id, request.text.len());

        // A begin callback that races ahead of the id pairing resolves
        // through `latest`.
        if let Ok(mut table) = self.ids.lock() {
            table.latest = Some(id);
        }
        let spoken = self.tts.speak(request.text.as_str(), true).map_err(|e| {
            error!("Failed to speak: {}", e);
            NarrateError::SynthesisFailed(format!("Speak failed: {}", e))
        })?;
        if self.features.utterance_callbacks {
            // Only the end/stop callbacks prune the table
            if let (Some(tts_id), Ok(mut table)) = (spoken, self.ids.lock()) {
                table.track(tts_id, id);
            }
        } else {
            let _ = self.events.send(NarratorEvent::started(id));
        }

        Ok(id)
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        if let Ok(mut table) = self.ids.lock() {
            table.latest = None;
        }
        if !self.features.stop {
            warn!("Stop not supported on this platform");
            return Ok(());
        }
        self.tts.stop().map_err(|e| {
            error!("Failed to cancel speech: {}", e);
            NarrateError::Speech(format!("Cancel failed: {}", e))
        })?;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        Err(NarrateError::Speech(
            "Pause is not supported by the native engine".to_string(),
        ))
    }

    fn resume(&mut self) -> Result<()> {
        Err(NarrateError::Speech(
            "Resume is not supported by the native engine".to_string(),
        ))
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        debug!("Setting volume to {}", volume);
        self.volume = Some(volume);

        if !self.features.volume {
            warn!("Volume control not supported on this platform");
            return Ok(());
        }

        let converted = self.convert_volume(volume);
        self.tts
            .set_volume(converted)
            .map_err(|e| NarrateError::Speech(format!("Failed to set volume: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_create_narrator() {
        // May fail without speech-dispatcher (Linux) or in CI without audio
        let (tx, _rx) = mpsc::channel();
        match NativeNarrator::new(tx) {
            Ok(narrator) => {
                assert_eq!(narrator.name(), "native");
                assert!(!narrator.features().pause_in_place);
            }
            Err(e) => println!("⚠ TTS initialization failed (may be expected in CI): {}", e),
        }
    }

    #[test]
    fn test_volume_conversion() {
        let (tx, _rx) = mpsc::channel();
        if let Ok(narrator) = NativeNarrator::new(tx) {
            let min = narrator.tts.min_volume();
            let max = narrator.tts.max_volume();
            assert_eq!(narrator.convert_volume(0.0), min);
            assert_eq!(narrator.convert_volume(1.0), max);
            assert_eq!(narrator.convert_volume(7.0), max);
        }
    }

    #[test]
    fn test_id_table_before_engine_ids() {
        let mut table: IdTable<u64> = IdTable::new();
        table.latest = Some(UtteranceId(1));
        assert_eq!(table.lookup(&40), Some(UtteranceId(1)));
        assert_eq!(table.lookup_started(&40), Some(UtteranceId(1)));
    }

    #[test]
    fn test_id_table_ignores_leftovers_once_ids_known() {
        let mut table: IdTable<u64> = IdTable::new();
        table.latest = Some(UtteranceId(1));
        table.track(40, UtteranceId(1));

        // Seek: the old utterance is cancelled and a new one started
        table.latest = Some(UtteranceId(2));
        table.track(41, UtteranceId(2));
        assert_eq!(table.lookup(&40), Some(UtteranceId(1)));
        table.forget(&40);

        // A stop for something never tracked must not hit the live id
        assert_eq!(table.lookup(&39), None);
        assert_eq!(table.lookup(&41), Some(UtteranceId(2)));
        assert_eq!(table.pairs.len(), 1);
    }

    #[test]
    fn test_id_table_begin_races_track() {
        let mut table: IdTable<u64> = IdTable::new();
        table.track(40, UtteranceId(1));
        table.forget(&40);
        table.latest = Some(UtteranceId(2));
        assert_eq!(table.lookup_started(&41), Some(UtteranceId(2)));
        assert_eq!(table.lookup(&41), None);
    }

    #[test]
    fn test_pause_is_refused() {
        let (tx, _rx) = mpsc::channel();
        if let Ok(mut narrator) = NativeNarrator::new(tx) {
            assert!(narrator.pause().is_err());
            assert!(narrator.resume().is_err());
        }
    }
}
