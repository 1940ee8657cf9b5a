//! Interview flows.
//!
//! The [`Orchestrator`] composes the secret hasher, the conversation store
//! and the provider adapters into the session lifecycle:
//!
//! - **start**: persona + opening line, spoken, stored with a new session.
//! - **answer**: transcribe, store the answer, complete, speak, store.
//! - **end**: complete against a closing prompt, speak, store, mark ended.
//!
//! Each flow is a straight pipeline with a single attempt per provider
//! call; the first failure aborts the flow. Speech provider selection runs
//! on every turn: the primary provider is used when it supports the
//! session language, otherwise the secondary provider is used. A provider
//! failure is never retried on the other one.
//!
//! Answer and end flows for the same session are serialized by a
//! per-session async mutex held for the whole flow.

use crate::credentials::CredentialStore;
use crate::error::ChatError;
use crate::prompt;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use mockview_auth::SecretHasher;
use mockview_chat::{ApiKeys, NewTurn, Session, StoreError, Turn};
use mockview_db::DbPool;
use mockview_types::{Language, Role};
use mockview_voice::{
    speech_text, ApiStatus, ChatMessage, Completer, ProviderHealth, SpeechProvider, Transcriber,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// The remote capabilities a flow may call.
#[derive(Clone)]
pub struct Providers {
    pub transcriber: Arc<dyn Transcriber>,
    pub completer: Arc<dyn Completer>,
    /// Preferred speech provider, used whenever it supports the language.
    pub primary_speech: Arc<dyn SpeechProvider>,
    /// Catch-all speech provider.
    pub secondary_speech: Arc<dyn SpeechProvider>,
    pub health: Arc<dyn ProviderHealth>,
}

/// Text plus base64-encoded audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpokenTurn {
    pub text: String,
    pub audio: String,
}

/// Result of starting a session. The secret is only ever returned here.
#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub id: String,
    pub secret: String,
    /// Boundary language code, e.g. `en-US`.
    pub language: &'static str,
    #[serde(flatten)]
    pub opening: SpokenTurn,
}

/// Result of an answer or end flow.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub language: &'static str,
    /// The candidate's transcribed answer and its recording. Absent when
    /// the interview was ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<SpokenTurn>,
    pub answer: SpokenTurn,
}

/// Visible conversation of a session, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct SessionHistory {
    pub language: &'static str,
    pub ended: bool,
    pub turns: Vec<Turn>,
}

/// Health summary for a status page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub server: bool,
    pub key: bool,
    pub api: Option<bool>,
    pub api_status: ApiStatus,
}

pub struct Orchestrator {
    pool: DbPool,
    hasher: SecretHasher,
    providers: Providers,
    credentials: Arc<dyn CredentialStore>,
    default_language: Language,
    locks: SessionLocks,
}

impl Orchestrator {
    pub fn new(
        pool: DbPool,
        hasher: SecretHasher,
        providers: Providers,
        credentials: Arc<dyn CredentialStore>,
        default_language: Language,
    ) -> Self {
        Self {
            pool,
            hasher,
            providers,
            credentials,
            default_language,
            locks: SessionLocks::default(),
        }
    }

    /// Starts an interview for `role`.
    ///
    /// `language_code` is a boundary code (`id-ID`); `None` or blank uses
    /// the configured default. The session row and its two opening turns
    /// are written in one transaction after every provider call succeeded.
    pub async fn start_session(
        &self,
        role: &str,
        skills: &[String],
        language_code: Option<&str>,
    ) -> Result<StartedSession, ChatError> {
        if role.trim().is_empty() {
            return Err(ChatError::InvalidInput("role must not be empty".to_string()));
        }
        let language = self.resolve_language(language_code)?;
        let keys = self.load_credentials().await?;

        let system = prompt::system_prompt(role, skills, language);
        let opening = prompt::opening_line(role, language);
        let audio = self
            .speak(&keys, language, &opening, "synthesize opening line")
            .await?;
        let audio = BASE64.encode(audio);

        let turns = vec![
            NewTurn::new(Role::System, system, None),
            NewTurn::new(Role::Assistant, opening.clone(), Some(audio.clone())),
        ];
        let pool = self.pool.clone();
        let hasher = self.hasher;
        let (session, secret) = tokio::task::spawn_blocking(move || {
            let secret = hasher.issue().map_err(ChatError::Secret)?;
            let conn = pool.get()?;
            let (session, _) =
                mockview_chat::create_session_with_turns(&conn, &secret.hash, language, &turns)
                    .map_err(ChatError::store_write("create chat session"))?;
            Ok::<_, ChatError>((session, secret.plaintext))
        })
        .await??;

        tracing::info!(session_id = %session.id, %language, "chat session started");
        Ok(StartedSession {
            id: session.id,
            secret,
            language: language.code(),
            opening: SpokenTurn {
                text: opening,
                audio,
            },
        })
    }

    /// Takes one recorded answer and returns the interviewer's reply.
    ///
    /// The user turn is stored before the completion is requested, so it
    /// survives a failure later in the flow.
    pub async fn answer_session(
        &self,
        session_id: &str,
        secret: &str,
        audio: &[u8],
    ) -> Result<ChatReply, ChatError> {
        if audio.is_empty() {
            return Err(ChatError::InvalidInput("audio must not be empty".to_string()));
        }

        let _guard = self.locks.acquire(session_id).await;
        let session = self.open_session(session_id, secret).await?;
        let keys = self.load_credentials().await?;
        let primary_key = self.turn_key(&keys, session.language)?;
        let history = self.list_turns(&session.id).await?;

        let transcript = self
            .providers
            .transcriber
            .transcribe(primary_key, audio, session.language)
            .await
            .map_err(ChatError::provider("transcribe audio"))?;
        if transcript.trim().is_empty() {
            return Err(ChatError::EmptyTranscript);
        }

        let recording = BASE64.encode(audio);
        let user_turn = NewTurn::new(Role::User, transcript, Some(recording));
        self.append(&session.id, user_turn.clone(), false).await?;

        let mut messages = to_messages(&history);
        messages.push(ChatMessage::new(Role::User, user_turn.text.clone()));
        let answer = self.respond(&keys, &session, messages, false).await?;

        tracing::info!(session_id = %session.id, turns = history.len() + 2, "answer recorded");
        Ok(ChatReply {
            language: session.language.code(),
            prompt: Some(SpokenTurn {
                text: user_turn.text,
                audio: user_turn.audio.unwrap_or_default(),
            }),
            answer,
        })
    }

    /// Ends the interview with spoken feedback and closes the session.
    ///
    /// The closing prompt is only sent to the model; it is not stored.
    pub async fn end_session(&self, session_id: &str, secret: &str) -> Result<ChatReply, ChatError> {
        let _guard = self.locks.acquire(session_id).await;
        let session = self.open_session(session_id, secret).await?;
        let keys = self.load_credentials().await?;
        self.turn_key(&keys, session.language)?;
        let history = self.list_turns(&session.id).await?;

        let mut messages = to_messages(&history);
        messages.push(ChatMessage::new(Role::User, prompt::CLOSING_PROMPT));
        let answer = self.respond(&keys, &session, messages, true).await?;

        tracing::info!(session_id = %session.id, "chat session ended");
        Ok(ChatReply {
            language: session.language.code(),
            prompt: None,
            answer,
        })
    }

    /// Returns the visible turns (everything except the persona prompt).
    pub async fn history(&self, session_id: &str, secret: &str) -> Result<SessionHistory, ChatError> {
        let session = self.authenticate(session_id, secret).await?;
        let turns = self
            .list_turns(&session.id)
            .await?
            .into_iter()
            .filter(|turn| turn.role.is_visible())
            .collect();

        Ok(SessionHistory {
            language: session.language.code(),
            ended: session.is_ended(),
            turns,
        })
    }

    /// Probes the primary provider and the stored key.
    pub async fn status(&self) -> Result<StatusReport, ChatError> {
        let keys = self.load_credentials().await?;
        let key = match keys.primary() {
            Some(api_key) => match self.providers.health.is_key_valid(api_key).await {
                Ok(valid) => valid,
                Err(e) => {
                    tracing::warn!(error = %e, "could not validate primary API key");
                    false
                }
            },
            None => false,
        };
        let api_status = self.providers.health.api_status().await;

        Ok(StatusReport {
            server: true,
            key,
            api: api_status.is_available(),
            api_status,
        })
    }

    pub async fn keys_configured(&self) -> Result<bool, ChatError> {
        let store = self.credentials.clone();
        Ok(tokio::task::spawn_blocking(move || store.configured()).await??)
    }

    /// Partially updates the provider keys; `None` or empty keeps a key.
    pub async fn update_keys(
        &self,
        primary: Option<String>,
        secondary: Option<String>,
    ) -> Result<(), ChatError> {
        let store = self.credentials.clone();
        tokio::task::spawn_blocking(move || store.update(primary.as_deref(), secondary.as_deref()))
            .await??;
        Ok(())
    }

    fn resolve_language(&self, code: Option<&str>) -> Result<Language, ChatError> {
        match code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Ok(Language::from_code(code)?),
            None => Ok(self.default_language),
        }
    }

    /// Picks the speech provider for `language` and the key it needs.
    fn select_speech<'a>(
        &'a self,
        keys: &'a ApiKeys,
        language: Language,
    ) -> Result<(&'a dyn SpeechProvider, &'a str), ChatError> {
        if self.providers.primary_speech.supports_language(language) {
            let key = keys
                .primary()
                .ok_or(ChatError::CredentialsMissing("primary"))?;
            Ok((self.providers.primary_speech.as_ref(), key))
        } else {
            let key = keys
                .secondary()
                .ok_or(ChatError::CredentialsMissing("secondary"))?;
            Ok((self.providers.secondary_speech.as_ref(), key))
        }
    }

    /// Checks every key a spoken turn in `language` will need and returns
    /// the primary one. Runs before the first provider call of a turn.
    fn turn_key<'a>(&self, keys: &'a ApiKeys, language: Language) -> Result<&'a str, ChatError> {
        let primary_key = keys
            .primary()
            .ok_or(ChatError::CredentialsMissing("primary"))?;
        self.select_speech(keys, language)?;
        Ok(primary_key)
    }

    async fn speak(
        &self,
        keys: &ApiKeys,
        language: Language,
        text: &str,
        step: &'static str,
    ) -> Result<Vec<u8>, ChatError> {
        let (provider, api_key) = self.select_speech(keys, language)?;
        tracing::debug!(provider = provider.name(), %language, "selected speech provider");
        provider
            .speak(api_key, &speech_text(text))
            .await
            .map_err(ChatError::provider(step))
    }

    /// Completion, speech, then the stored assistant turn.
    async fn respond(
        &self,
        keys: &ApiKeys,
        session: &Session,
        messages: Vec<ChatMessage>,
        final_turn: bool,
    ) -> Result<SpokenTurn, ChatError> {
        let primary_key = keys
            .primary()
            .ok_or(ChatError::CredentialsMissing("primary"))?;
        let text = self
            .providers
            .completer
            .complete(primary_key, &messages)
            .await
            .map_err(ChatError::provider("get chat completion"))?
            .ok_or(ChatError::EmptyCompletion)?;

        let audio = self
            .speak(keys, session.language, &text, "synthesize answer")
            .await?;
        let audio = BASE64.encode(audio);

        let turn = NewTurn::new(Role::Assistant, text.clone(), Some(audio.clone()));
        self.append(&session.id, turn, final_turn).await?;
        Ok(SpokenTurn { text, audio })
    }

    async fn load_credentials(&self) -> Result<ApiKeys, ChatError> {
        let store = self.credentials.clone();
        Ok(tokio::task::spawn_blocking(move || store.get()).await??)
    }

    /// Authenticates and refuses sessions that have already ended.
    async fn open_session(&self, session_id: &str, secret: &str) -> Result<Session, ChatError> {
        let session = self.authenticate(session_id, secret).await?;
        if session.is_ended() {
            tracing::debug!(session_id, "rejected turn on ended session");
            return Err(ChatError::SessionEnded);
        }
        Ok(session)
    }

    async fn authenticate(&self, session_id: &str, secret: &str) -> Result<Session, ChatError> {
        let pool = self.pool.clone();
        let hasher = self.hasher;
        let id = session_id.to_string();
        let secret = secret.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let session = mockview_chat::get_session(&conn, &id).map_err(|e| match e {
                StoreError::SessionNotFound(id) => ChatError::SessionNotFound(id),
                other => ChatError::StoreRead(other),
            })?;
            hasher
                .verify(&secret, &session.secret_hash)
                .map_err(|_| ChatError::InvalidSecret)?;
            Ok::<_, ChatError>(session)
        })
        .await?;

        if let Err(e) = &result {
            tracing::warn!(session_id, error = %e, "chat session authentication failed");
        }
        result
    }

    async fn list_turns(&self, session_id: &str) -> Result<Vec<Turn>, ChatError> {
        let pool = self.pool.clone();
        let id = session_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            mockview_chat::list_turns(&conn, &id).map_err(ChatError::StoreRead)
        })
        .await?
    }

    async fn append(&self, session_id: &str, turn: NewTurn, final_turn: bool) -> Result<(), ChatError> {
        let pool = self.pool.clone();
        let id = session_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let written = if final_turn {
                mockview_chat::append_final_turn(&conn, &id, &turn)
            } else {
                mockview_chat::append_turn(&conn, &id, &turn)
            };
            written
                .map(|_| ())
                .map_err(ChatError::store_write("save chat turn"))
        })
        .await?
    }
}

fn to_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|turn| ChatMessage::new(turn.role, turn.text.clone()))
        .collect()
}

/// One async mutex per session id. Idle entries are dropped on the next
/// acquire.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(session_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
