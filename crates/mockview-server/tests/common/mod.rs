//! In-process doubles for the provider capabilities and the credential
//! store, plus a harness that wires them into an orchestrator backed by a
//! temporary SQLite database.

#![allow(dead_code)]

use async_trait::async_trait;
use mockview_auth::SecretHasher;
use mockview_chat::{ApiKeys, Turn};
use mockview_db::{open_database, DbPool, DbRuntimeSettings};
use mockview_server::credentials::{CredentialError, CredentialStore};
use mockview_server::orchestrator::{Orchestrator, Providers};
use mockview_types::Language;
use mockview_voice::{
    ApiStatus, ChatMessage, Completer, ProviderHealth, SpeechProvider, Transcriber, VoiceError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct FakeTranscriber {
    text: Mutex<String>,
    pub calls: AtomicUsize,
    pub last_language: Mutex<Option<Language>>,
}

impl FakeTranscriber {
    pub fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(
        &self,
        _api_key: &str,
        _audio: &[u8],
        language: Language,
    ) -> Result<String, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_language.lock().unwrap() = Some(language);
        Ok(self.text.lock().unwrap().clone())
    }
}

pub struct FakeCompleter {
    reply: Mutex<Option<String>>,
    fail: AtomicBool,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeCompleter {
    pub fn set_reply(&self, reply: Option<&str>) {
        *self.reply.lock().unwrap() = reply.map(str::to_string);
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn last_request(&self) -> Vec<ChatMessage> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Completer for FakeCompleter {
    async fn complete(
        &self,
        _api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, VoiceError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::Unreachable {
                provider: "fake-completer",
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.reply.lock().unwrap().clone())
    }
}

/// Speech double whose audio is `"<name>:<key>:<text>"`, so a test can tell
/// which provider and which key produced it.
pub struct FakeSpeech {
    name: &'static str,
    english_only: bool,
    fail: AtomicBool,
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for FakeSpeech {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports_language(&self, language: Language) -> bool {
        !self.english_only || language == Language::English
    }

    async fn speak(&self, api_key: &str, text: &str) -> Result<Vec<u8>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::Rejected {
                provider: self.name,
                status: 500,
                body: "synthesis failed".to_string(),
            });
        }
        Ok(format!("{}:{}:{}", self.name, api_key, text).into_bytes())
    }
}

pub struct FakeHealth {
    pub status: Mutex<ApiStatus>,
}

#[async_trait]
impl ProviderHealth for FakeHealth {
    async fn api_status(&self) -> ApiStatus {
        *self.status.lock().unwrap()
    }

    async fn is_key_valid(&self, api_key: &str) -> Result<bool, VoiceError> {
        Ok(api_key.starts_with("sk-"))
    }
}

#[derive(Default)]
pub struct MemoryCredentials {
    keys: Mutex<ApiKeys>,
}

impl MemoryCredentials {
    pub fn clear(&self) {
        *self.keys.lock().unwrap() = ApiKeys::default();
    }
}

impl CredentialStore for MemoryCredentials {
    fn get(&self) -> Result<ApiKeys, CredentialError> {
        Ok(self.keys.lock().unwrap().clone())
    }

    fn update(
        &self,
        primary: Option<&str>,
        secondary: Option<&str>,
    ) -> Result<(), CredentialError> {
        let mut keys = self.keys.lock().unwrap();
        if let Some(k) = primary.filter(|k| !k.is_empty()) {
            keys.primary = k.to_string();
        }
        if let Some(k) = secondary.filter(|k| !k.is_empty()) {
            keys.secondary = k.to_string();
        }
        Ok(())
    }
}

/// Handles to every double plus the database behind the orchestrator.
pub struct Fakes {
    pub pool: DbPool,
    pub transcriber: Arc<FakeTranscriber>,
    pub completer: Arc<FakeCompleter>,
    pub primary: Arc<FakeSpeech>,
    pub secondary: Arc<FakeSpeech>,
    pub health: Arc<FakeHealth>,
    pub credentials: Arc<MemoryCredentials>,
    _dir: tempfile::TempDir,
}

impl Fakes {
    pub fn turns(&self, session_id: &str) -> Vec<Turn> {
        let conn = self.pool.get().unwrap();
        mockview_chat::list_turns(&conn, session_id).unwrap()
    }

    pub fn turn_count(&self) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM chat_turns", [], |row| row.get(0))
            .unwrap()
    }

    pub fn session_count(&self) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM chat_sessions", [], |row| row.get(0))
            .unwrap()
    }
}

/// Builds an orchestrator over fresh doubles with both keys configured.
pub fn orchestrator() -> (Orchestrator, Fakes) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mockview.db");
    let pool = open_database(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();

    let transcriber = Arc::new(FakeTranscriber {
        text: Mutex::new("I have five years of Go experience.".to_string()),
        calls: AtomicUsize::new(0),
        last_language: Mutex::new(None),
    });
    let completer = Arc::new(FakeCompleter {
        reply: Mutex::new(Some("Great. **Tell me** about your SQL work.".to_string())),
        fail: AtomicBool::new(false),
        requests: Mutex::new(Vec::new()),
    });
    let primary = Arc::new(FakeSpeech {
        name: "primary",
        english_only: true,
        fail: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
        texts: Mutex::new(Vec::new()),
    });
    let secondary = Arc::new(FakeSpeech {
        name: "secondary",
        english_only: false,
        fail: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
        texts: Mutex::new(Vec::new()),
    });
    let health = Arc::new(FakeHealth {
        status: Mutex::new(ApiStatus::Operational),
    });
    let credentials = Arc::new(MemoryCredentials::default());
    credentials.update(Some("sk-primary"), Some("el-secondary")).unwrap();

    let providers = Providers {
        transcriber: transcriber.clone(),
        completer: completer.clone(),
        primary_speech: primary.clone(),
        secondary_speech: secondary.clone(),
        health: health.clone(),
    };
    let orchestrator = Orchestrator::new(
        pool.clone(),
        SecretHasher::new(4).unwrap(),
        providers,
        credentials.clone(),
        Language::English,
    );

    let fakes = Fakes {
        pool,
        transcriber,
        completer,
        primary,
        secondary,
        health,
        credentials,
        _dir: dir,
    };
    (orchestrator, fakes)
}

/// Decodes a base64 audio field produced by the fake speech providers.
pub fn decode_audio(audio: &str) -> String {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(audio)
        .unwrap();
    String::from_utf8(bytes).unwrap()
}
