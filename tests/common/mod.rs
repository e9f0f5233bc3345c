//! Shared test utilities
//!
//! Fake engines read a marker from the first sample of each frame, so a
//! "recording" is just a sequence of tokens: silence, the wake phrase, spoken
//! words and the trailing silence that ends a command.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use hark::{
    AudioFormat, Config, EngineError, EngineResult, EngineStatus, Inference, IntentEngine,
    IntentEngineFactory, OrchestratorBuilder, WakeEngine, WakeEngineFactory,
};
use hark::engine::{IntentParams, WakeParams};

pub const SAMPLE_RATE: u32 = 16000;
pub const FRAME_LENGTH: usize = 512;

pub const FORMAT: AudioFormat = AudioFormat {
    sample_rate: SAMPLE_RATE,
    frame_length: FRAME_LENGTH,
};

const SILENCE: i16 = 0;
const WAKE: i16 = 1;
const ENDPOINT: i16 = 2;
const WORD_BASE: i16 = 100;

/// Words the fake intent engine can hear
const VOCABULARY: &[&str] = &[
    "order", "me", "a", "small", "medium", "large", "coffee", "tea", "latte", "play", "some",
    "music",
];

/// One frame of scripted audio
#[derive(Debug, Clone, Copy)]
pub enum Token {
    Silence,
    Wake,
    Word(&'static str),
    Endpoint,
}

/// Encode a token as a full frame
#[must_use]
pub fn frame(token: Token) -> Vec<i16> {
    let marker = match token {
        Token::Silence => SILENCE,
        Token::Wake => WAKE,
        Token::Endpoint => ENDPOINT,
        Token::Word(word) => {
            let index = VOCABULARY
                .iter()
                .position(|w| *w == word)
                .expect("word not in fake vocabulary");
            WORD_BASE + i16::try_from(index).unwrap()
        }
    };
    let mut frame = vec![0i16; FRAME_LENGTH];
    frame[0] = marker;
    // Some texture so frames are not all zero
    for (i, sample) in frame.iter_mut().enumerate().skip(1) {
        *sample = i16::try_from(i % 64).unwrap() * marker.signum();
    }
    frame
}

/// Encode a sequence of tokens as frames
#[must_use]
pub fn recording(tokens: &[Token]) -> Vec<Vec<i16>> {
    tokens.iter().map(|t| frame(*t)).collect()
}

/// "Picovoice, order me a large coffee"
#[must_use]
pub fn coffee_recording() -> Vec<Vec<i16>> {
    use Token::{Endpoint, Silence, Wake, Word};

    recording(&[
        Silence,
        Silence,
        Wake,
        Silence,
        Word("order"),
        Word("me"),
        Word("a"),
        Word("large"),
        Word("coffee"),
        Endpoint,
        Silence,
    ])
}

/// "Picovoice, play some music"
#[must_use]
pub fn out_of_context_recording() -> Vec<Vec<i16>> {
    use Token::{Endpoint, Silence, Wake, Word};

    recording(&[
        Silence,
        Wake,
        Word("play"),
        Word("some"),
        Word("music"),
        Endpoint,
        Silence,
    ])
}

fn decode(frame: &[i16]) -> Token {
    match frame[0] {
        WAKE => Token::Wake,
        ENDPOINT => Token::Endpoint,
        m if m >= WORD_BASE => usize::try_from(m - WORD_BASE)
            .ok()
            .and_then(|i| VOCABULARY.get(i))
            .map_or(Token::Silence, |w| Token::Word(w)),
        _ => Token::Silence,
    }
}

/// What the fake engines have been asked to do
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Calls {
    pub wake_created: usize,
    pub intent_created: usize,
    pub wake_frames: usize,
    pub intent_frames: usize,
    pub intent_resets: usize,
    pub wake_deleted: usize,
    pub intent_deleted: usize,
    pub last_wake_sensitivity: Option<f32>,
    pub last_endpoint_duration: Option<f32>,
}

/// Shared call log
#[derive(Debug, Default, Clone)]
pub struct CallLog(Arc<Mutex<Calls>>);

impl CallLog {
    #[must_use]
    pub fn snapshot(&self) -> Calls {
        self.0.lock().unwrap().clone()
    }

    fn update(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.0.lock().unwrap());
    }
}

/// Wake engine that matches on wake-marker frames
#[derive(Debug, Clone)]
pub struct FakeWakeFactory {
    pub format: AudioFormat,
    /// Index reported when a wake marker is heard
    pub match_index: usize,
    pub fail_create: Option<EngineStatus>,
    pub fail_process: Option<EngineStatus>,
    pub fail_delete: Option<EngineStatus>,
    pub log: CallLog,
}

impl FakeWakeFactory {
    #[must_use]
    pub fn new(log: &CallLog) -> Self {
        Self {
            format: FORMAT,
            match_index: 0,
            fail_create: None,
            fail_process: None,
            fail_delete: None,
            log: log.clone(),
        }
    }
}

impl WakeEngineFactory for FakeWakeFactory {
    fn audio_format(&self) -> AudioFormat {
        self.format
    }

    fn create(&self, params: &WakeParams<'_>) -> EngineResult<Box<dyn WakeEngine>> {
        if let Some(status) = self.fail_create {
            return Err(EngineError::new(status, "fake wake engine refused to start"));
        }
        let sensitivity = params.sensitivity;
        self.log.update(|c| {
            c.wake_created += 1;
            c.last_wake_sensitivity = Some(sensitivity);
        });
        Ok(Box::new(FakeWake {
            factory: self.clone(),
            released: false,
        }))
    }
}

struct FakeWake {
    factory: FakeWakeFactory,
    released: bool,
}

impl WakeEngine for FakeWake {
    fn process(&mut self, frame: &[i16]) -> EngineResult<Option<usize>> {
        assert!(!self.released, "wake engine used after release");
        assert_eq!(frame.len(), self.factory.format.frame_length);
        self.factory.log.update(|c| c.wake_frames += 1);

        if let Some(status) = self.factory.fail_process {
            return Err(EngineError::new(status, "fake wake engine failed"));
        }
        Ok(matches!(decode(frame), Token::Wake).then_some(self.factory.match_index))
    }

    fn version(&self) -> String {
        "3.0.0".to_string()
    }

    fn delete(&mut self) -> EngineResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.factory.log.update(|c| c.wake_deleted += 1);
        match self.factory.fail_delete {
            Some(status) => Err(EngineError::new(status, "fake wake engine leaked")),
            None => Ok(()),
        }
    }
}

/// Intent engine with a tiny coffee-ordering grammar
///
/// Collects words until an endpoint marker, then understands
/// `order [me] [a] [<size>] <beverage>`.
#[derive(Debug, Clone)]
pub struct FakeIntentFactory {
    pub format: AudioFormat,
    pub fail_create: Option<EngineStatus>,
    pub fail_process: Option<EngineStatus>,
    pub fail_delete: Option<EngineStatus>,
    pub log: CallLog,
}

impl FakeIntentFactory {
    #[must_use]
    pub fn new(log: &CallLog) -> Self {
        Self {
            format: FORMAT,
            fail_create: None,
            fail_process: None,
            fail_delete: None,
            log: log.clone(),
        }
    }
}

impl IntentEngineFactory for FakeIntentFactory {
    fn audio_format(&self) -> AudioFormat {
        self.format
    }

    fn create(&self, params: &IntentParams<'_>) -> EngineResult<Box<dyn IntentEngine>> {
        if let Some(status) = self.fail_create {
            return Err(EngineError::new(status, "fake intent engine refused to start"));
        }
        let endpoint = params.endpoint_duration_sec;
        self.log.update(|c| {
            c.intent_created += 1;
            c.last_endpoint_duration = Some(endpoint);
        });
        Ok(Box::new(FakeIntent {
            factory: self.clone(),
            words: Vec::new(),
            finalized: None,
            released: false,
        }))
    }
}

struct FakeIntent {
    factory: FakeIntentFactory,
    words: Vec<&'static str>,
    finalized: Option<Inference>,
    released: bool,
}

impl FakeIntent {
    fn understand(words: &[&str]) -> Inference {
        let mut rest = words.iter().copied().filter(|w| !matches!(*w, "me" | "a"));
        if rest.next() != Some("order") {
            return Inference::not_understood();
        }

        let mut slots = Vec::new();
        let mut next = rest.next();
        if let Some(size @ ("small" | "medium" | "large")) = next {
            slots.push(("size", size));
            next = rest.next();
        }
        match next {
            Some(beverage @ ("coffee" | "tea" | "latte")) if rest.next().is_none() => {
                slots.push(("beverage", beverage));
                Inference::understood("orderBeverage", slots)
            }
            _ => Inference::not_understood(),
        }
    }
}

impl IntentEngine for FakeIntent {
    fn process(&mut self, frame: &[i16]) -> EngineResult<bool> {
        assert!(!self.released, "intent engine used after release");
        assert_eq!(frame.len(), self.factory.format.frame_length);
        self.factory.log.update(|c| c.intent_frames += 1);

        if let Some(status) = self.factory.fail_process {
            return Err(EngineError::new(status, "fake intent engine failed"));
        }

        match decode(frame) {
            Token::Word(word) => self.words.push(word),
            Token::Endpoint => {
                let words = std::mem::take(&mut self.words);
                self.finalized = Some(Self::understand(&words));
                return Ok(true);
            }
            Token::Silence | Token::Wake => {}
        }
        Ok(false)
    }

    fn inference(&mut self) -> EngineResult<Inference> {
        self.finalized
            .take()
            .ok_or_else(|| EngineError::new(EngineStatus::InvalidState, "nothing finalized"))
    }

    fn reset(&mut self) -> EngineResult<()> {
        self.words.clear();
        self.finalized = None;
        self.factory.log.update(|c| c.intent_resets += 1);
        Ok(())
    }

    fn context_info(&self) -> String {
        "context:\n  expressions:\n    orderBeverage:\n      - order [me] [a] [$size:size] $beverage:beverage"
            .to_string()
    }

    fn version(&self) -> String {
        "3.0.1".to_string()
    }

    fn delete(&mut self) -> EngineResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.factory.log.update(|c| c.intent_deleted += 1);
        match self.factory.fail_delete {
            Some(status) => Err(EngineError::new(status, "fake intent engine leaked")),
            None => Ok(()),
        }
    }
}

/// Callback event seen by a test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Wake,
    Inference(Inference),
}

/// Shared event log filled by the callbacks
#[derive(Debug, Default, Clone)]
pub struct Events(Arc<Mutex<Vec<Event>>>);

impl Events {
    #[must_use]
    pub fn snapshot(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    #[must_use]
    pub fn inferences(&self) -> Vec<Inference> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                Event::Inference(i) => Some(i),
                Event::Wake => None,
            })
            .collect()
    }

    #[must_use]
    pub fn wake_count(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|e| matches!(e, Event::Wake))
            .count()
    }
}

/// Temp directory holding keyword and context files, plus a config using them
///
/// Keep the directory alive for as long as the config is used.
#[must_use]
pub fn config_fixture() -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let keyword = dir.path().join("picovoice_linux.ppn");
    let context = dir.path().join("coffee_maker_linux.rhn");
    std::fs::write(&keyword, b"keyword").unwrap();
    std::fs::write(&context, b"context").unwrap();
    (dir, Config::new("test-access-key", keyword, context))
}

/// Builder wired to the given fakes and recording callbacks into `events`
#[must_use]
pub fn builder(
    config: Config,
    wake: FakeWakeFactory,
    intent: FakeIntentFactory,
    events: &Events,
) -> OrchestratorBuilder {
    let on_wake = events.clone();
    let on_inference = events.clone();
    hark::Orchestrator::builder(config)
        .wake_engine(wake)
        .intent_engine(intent)
        .on_wake(move || on_wake.0.lock().unwrap().push(Event::Wake))
        .on_inference(move |inference| {
            on_inference
                .0
                .lock()
                .unwrap()
                .push(Event::Inference(inference));
        })
}

/// Builder with well-behaved fakes
#[must_use]
pub fn default_builder(config: Config, log: &CallLog, events: &Events) -> OrchestratorBuilder {
    builder(
        config,
        FakeWakeFactory::new(log),
        FakeIntentFactory::new(log),
        events,
    )
}
