//! Stub providers shared by the relay and HTTP tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vocalis_llm::{ChatProvider, ChatResponse, LLMError};
use vocalis_server::Relay;
use vocalis_spk::{SpeechChain, SpeechEngine, SpeechError, SpeechResult};

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls_in(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Clone)]
pub enum ChatBehavior {
    Reply(&'static str),
    NoContent,
    Malformed,
    Upstream(u16, &'static str),
    Broken,
}

pub struct StubChat {
    has_key: bool,
    behavior: ChatBehavior,
    calls: AtomicUsize,
    log: CallLog,
    last_request: Mutex<Option<vocalis_llm::ChatRequest>>,
}

impl StubChat {
    pub fn new(behavior: ChatBehavior, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            has_key: true,
            behavior,
            calls: AtomicUsize::new(0),
            log: log.clone(),
            last_request: Mutex::new(None),
        })
    }

    pub fn without_key(log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            has_key: false,
            behavior: ChatBehavior::Reply("unused"),
            calls: AtomicUsize::new(0),
            log: log.clone(),
            last_request: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<vocalis_llm::ChatRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for StubChat {
    fn name(&self) -> &str {
        "stub-chat"
    }

    fn has_api_key(&self) -> bool {
        self.has_key
    }

    async fn chat(&self, request: vocalis_llm::ChatRequest) -> vocalis_llm::Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push("chat".to_string());
        *self.last_request.lock().unwrap() = Some(request);

        let response = |content: Option<&str>| ChatResponse {
            content: content.map(str::to_string),
        };

        match &self.behavior {
            ChatBehavior::Reply(text) => Ok(response(Some(*text))),
            ChatBehavior::NoContent => Ok(response(None)),
            ChatBehavior::Malformed => Err(LLMError::InvalidResponse("not json".to_string())),
            ChatBehavior::Upstream(status, body) => Err(LLMError::Upstream {
                status: *status,
                body: body.to_string(),
            }),
            ChatBehavior::Broken => {
                let err = reqwest::Client::new().get("not a url").build().unwrap_err();
                Err(LLMError::HttpRequest(err))
            }
        }
    }
}

#[derive(Clone)]
pub enum SpeechBehavior {
    Audio(&'static [u8], Option<&'static str>),
    Fail,
    Hang,
    Unconfigured,
}

pub struct StubSpeech {
    name: String,
    behavior: SpeechBehavior,
    calls: AtomicUsize,
    log: CallLog,
}

impl StubSpeech {
    pub fn new(name: &str, behavior: SpeechBehavior, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            calls: AtomicUsize::new(0),
            log: log.clone(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for StubSpeech {
    async fn synthesize(&self, _text: &str) -> Result<SpeechResult, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.name.clone());
        match &self.behavior {
            SpeechBehavior::Audio(audio, mime) => Ok(SpeechResult {
                audio: Bytes::from_static(*audio),
                mime: mime.map(str::to_string),
            }),
            SpeechBehavior::Fail => Err(SpeechError::Api {
                provider: self.name.clone(),
                status: 500,
                body: "stub failure".to_string(),
            }),
            SpeechBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(SpeechError::Engine("unreachable".to_string()))
            }
            SpeechBehavior::Unconfigured => Err(SpeechError::Config("not configured".to_string())),
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self.behavior, SpeechBehavior::Unconfigured)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Relay over the given stubs with a short per-attempt timeout.
pub fn relay(chat: Arc<StubChat>, speech: &[Arc<StubSpeech>]) -> Relay {
    let chain = speech.iter().fold(
        SpeechChain::new(Duration::from_millis(100)),
        |chain, engine| chain.with_engine(engine.clone()),
    );
    Relay::new(chat, chain)
}
