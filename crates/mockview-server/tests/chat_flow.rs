mod common;

use common::{decode_audio, orchestrator};
use mockview_server::credentials::CredentialStore as _;
use mockview_server::error::ErrorKind;
use mockview_server::prompt::CLOSING_PROMPT;
use mockview_types::Role;
use mockview_voice::ApiStatus;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn full_interview_leaves_five_turns_in_order() {
    let (orchestrator, fakes) = orchestrator();

    let started = orchestrator
        .start_session(
            "Backend Engineer",
            &["Go".to_string(), "SQL".to_string()],
            Some(""),
        )
        .await
        .unwrap();
    assert!(!started.id.is_empty());
    assert_eq!(started.secret.len(), 10);
    assert_eq!(started.language, "en-US");
    assert!(!started.opening.text.is_empty());
    assert!(!started.opening.audio.is_empty());

    let reply = orchestrator
        .answer_session(&started.id, &started.secret, b"RIFF-answer")
        .await
        .unwrap();
    let prompt = reply.prompt.expect("answer should echo the transcript");
    assert_eq!(prompt.text, "I have five years of Go experience.");
    assert_eq!(decode_audio(&prompt.audio), "RIFF-answer");
    assert_eq!(reply.answer.text, "Great. **Tell me** about your SQL work.");
    assert!(!reply.answer.audio.is_empty());

    fakes
        .completer
        .set_reply(Some("You did well. Work on system design."));
    let farewell = orchestrator
        .end_session(&started.id, &started.secret)
        .await
        .unwrap();
    assert_eq!(farewell.language, "en-US");
    assert!(farewell.prompt.is_none());
    assert_eq!(farewell.answer.text, "You did well. Work on system design.");
    assert!(!farewell.answer.audio.is_empty());

    let turns = fakes.turns(&started.id);
    let shape: Vec<(Role, &str)> = turns.iter().map(|t| (t.role, t.text.as_str())).collect();
    assert_eq!(shape.len(), 5);
    assert_eq!(shape[0].0, Role::System);
    assert!(shape[0].1.contains("Backend Engineer"));
    assert_eq!(shape[1], (Role::Assistant, started.opening.text.as_str()));
    assert_eq!(shape[2], (Role::User, "I have five years of Go experience."));
    assert_eq!(shape[3], (Role::Assistant, "Great. **Tell me** about your SQL work."));
    assert_eq!(shape[4], (Role::Assistant, "You did well. Work on system design."));
    assert!(turns.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[tokio::test]
async fn system_turn_has_no_audio_and_opening_audio_is_stored() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("QA Engineer", &[], None)
        .await
        .unwrap();

    let turns = fakes.turns(&started.id);
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::System);
    assert_eq!(turns[0].audio, None);
    assert_eq!(turns[1].audio.as_deref(), Some(started.opening.audio.as_str()));
}

#[tokio::test]
async fn english_session_is_voiced_by_primary() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], Some("en-US"))
        .await
        .unwrap();

    assert!(decode_audio(&started.opening.audio).starts_with("primary:sk-primary:"));
    assert_eq!(fakes.primary.call_count(), 1);
    assert_eq!(fakes.secondary.call_count(), 0);
}

#[tokio::test]
async fn language_unsupported_by_primary_is_voiced_by_secondary() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &["Go".to_string()], Some("id-ID"))
        .await
        .unwrap();

    assert_eq!(started.language, "id-ID");
    assert!(started.opening.text.starts_with("Halo"));
    assert!(decode_audio(&started.opening.audio).starts_with("secondary:el-secondary:"));
    assert_eq!(fakes.primary.call_count(), 0);

    // Later turns follow the stored session language.
    let reply = orchestrator
        .answer_session(&started.id, &started.secret, b"audio")
        .await
        .unwrap();
    assert!(decode_audio(&reply.answer.audio).starts_with("secondary:"));
    assert_eq!(fakes.primary.call_count(), 0);
    assert_eq!(fakes.secondary.call_count(), 2);
    assert_eq!(
        *fakes.transcriber.last_language.lock().unwrap(),
        Some(mockview_types::Language::Indonesian)
    );
}

#[tokio::test]
async fn speech_text_is_stripped_of_markup() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();
    fakes
        .completer
        .set_reply(Some("Read [this](https://x.test):\n- **Go**\n- *SQL*"));

    let reply = orchestrator
        .answer_session(&started.id, &started.secret, b"audio")
        .await
        .unwrap();
    assert_eq!(reply.answer.text, "Read [this](https://x.test):\n- **Go**\n- *SQL*");
    let spoken = fakes.primary.texts.lock().unwrap().last().cloned().unwrap();
    assert_eq!(spoken, "Read this:, Go, SQL");
}

#[tokio::test]
async fn empty_transcript_fails_without_appending() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();
    fakes.transcriber.set_text("   ");

    let err = orchestrator
        .answer_session(&started.id, &started.secret, b"silence")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyTranscript);
    assert_eq!(fakes.turns(&started.id).len(), 2);
    assert!(fakes.completer.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_secret_fails_without_side_effects() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();

    let err = orchestrator
        .answer_session(&started.id, "0000000000", b"audio")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSecret);

    let err = orchestrator
        .end_session(&started.id, "0000000000")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSecret);

    assert_eq!(fakes.turns(&started.id).len(), 2);
    assert_eq!(
        fakes
            .transcriber
            .calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
    assert!(fakes.completer.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_session_is_distinct_from_wrong_secret() {
    let (orchestrator, _fakes) = orchestrator();
    let err = orchestrator
        .answer_session("no-such-session", "0000000000", b"audio")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionNotFound);
}

#[tokio::test]
async fn repeated_answers_are_not_deduplicated() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();

    for _ in 0..2 {
        orchestrator
            .answer_session(&started.id, &started.secret, b"same audio")
            .await
            .unwrap();
    }

    let turns = fakes.turns(&started.id);
    let roles: Vec<Role> = turns.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        [
            Role::System,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant
        ]
    );
    assert_eq!(turns[2].text, turns[4].text);
}

#[tokio::test]
async fn completion_sees_full_history_with_new_answer_last() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();
    orchestrator
        .answer_session(&started.id, &started.secret, b"audio")
        .await
        .unwrap();

    let request = fakes.completer.last_request();
    let roles: Vec<Role> = request.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::Assistant, Role::User]);
    assert_eq!(request[2].content, "I have five years of Go experience.");
}

#[tokio::test]
async fn completion_failure_keeps_user_turn() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();
    fakes.completer.fail(true);

    let err = orchestrator
        .answer_session(&started.id, &started.secret, b"audio")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderUnreachable);
    assert!(err.to_string().starts_with("failed to get chat completion"));

    let turns = fakes.turns(&started.id);
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[2].role, Role::User);
}

#[tokio::test]
async fn empty_completion_is_an_error() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();
    fakes.completer.set_reply(None);

    let err = orchestrator
        .answer_session(&started.id, &started.secret, b"audio")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyCompletion);
    assert_eq!(fakes.turns(&started.id).len(), 3);
}

#[tokio::test]
async fn primary_speech_failure_is_not_retried_on_secondary() {
    let (orchestrator, fakes) = orchestrator();
    fakes.primary.fail(true);

    let err = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderRejected);
    assert_eq!(fakes.secondary.call_count(), 0);
    assert_eq!(fakes.session_count(), 0);
    assert_eq!(fakes.turn_count(), 0);
}

#[tokio::test]
async fn missing_secondary_key_only_matters_when_secondary_is_needed() {
    let (orchestrator, fakes) = orchestrator();
    fakes.credentials.clear();
    fakes.credentials.update(Some("sk-only"), None).unwrap();

    orchestrator
        .start_session("Backend Engineer", &[], Some("en"))
        .await
        .unwrap();

    let err = orchestrator
        .start_session("Backend Engineer", &[], Some("de-DE"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialsMissing);
    assert_eq!(fakes.session_count(), 1);
}

#[tokio::test]
async fn missing_speech_key_fails_turns_before_any_provider_call() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], Some("de-DE"))
        .await
        .unwrap();
    fakes.credentials.clear();
    fakes.credentials.update(Some("sk-only"), None).unwrap();
    let completions_before = fakes.completer.requests.lock().unwrap().len();

    for _ in 0..2 {
        let err = orchestrator
            .answer_session(&started.id, &started.secret, b"audio")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialsMissing);
    }
    let err = orchestrator
        .end_session(&started.id, &started.secret)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialsMissing);

    assert_eq!(fakes.transcriber.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fakes.completer.requests.lock().unwrap().len(), completions_before);
    assert_eq!(fakes.secondary.call_count(), 1);
    assert_eq!(fakes.turns(&started.id).len(), 2);
}

#[tokio::test]
async fn unsupported_language_is_rejected_before_any_call() {
    let (orchestrator, fakes) = orchestrator();
    let err = orchestrator
        .start_session("Backend Engineer", &[], Some("xx-XX"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(fakes.primary.call_count() + fakes.secondary.call_count(), 0);
}

#[tokio::test]
async fn ended_session_refuses_further_turns() {
    let (orchestrator, fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();
    orchestrator
        .end_session(&started.id, &started.secret)
        .await
        .unwrap();

    let closing = fakes.completer.last_request();
    assert_eq!(closing.last().unwrap().content, CLOSING_PROMPT);
    assert!(fakes
        .turns(&started.id)
        .iter()
        .all(|t| t.text != CLOSING_PROMPT));

    let err = orchestrator
        .answer_session(&started.id, &started.secret, b"audio")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionEnded);
    let err = orchestrator
        .end_session(&started.id, &started.secret)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionEnded);
    assert_eq!(fakes.turns(&started.id).len(), 3);

    let history = orchestrator
        .history(&started.id, &started.secret)
        .await
        .unwrap();
    assert!(history.ended);
}

#[tokio::test]
async fn history_hides_system_turn() {
    let (orchestrator, _fakes) = orchestrator();
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();
    orchestrator
        .answer_session(&started.id, &started.secret, b"audio")
        .await
        .unwrap();

    let history = orchestrator
        .history(&started.id, &started.secret)
        .await
        .unwrap();
    let roles: Vec<Role> = history.turns.iter().map(|t| t.role).collect();
    assert_eq!(roles, [Role::Assistant, Role::User, Role::Assistant]);
    assert!(!history.ended);
}

#[tokio::test]
async fn concurrent_answers_on_one_session_do_not_interleave() {
    let (orchestrator, fakes) = orchestrator();
    let orchestrator = Arc::new(orchestrator);
    let started = orchestrator
        .start_session("Backend Engineer", &[], None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let orchestrator = orchestrator.clone();
        let id = started.id.clone();
        let secret = started.secret.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.answer_session(&id, &secret, b"audio").await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let roles: Vec<Role> = fakes.turns(&started.id).iter().map(|t| t.role).collect();
    assert_eq!(roles.len(), 10);
    for pair in roles[2..].chunks(2) {
        assert_eq!(pair, [Role::User, Role::Assistant]);
    }
}

#[tokio::test]
async fn status_reports_key_validity_and_api_state() {
    let (orchestrator, fakes) = orchestrator();
    let report = orchestrator.status().await.unwrap();
    assert!(report.server);
    assert!(report.key);
    assert_eq!(report.api, Some(true));

    *fakes.health.status.lock().unwrap() = ApiStatus::Unknown;
    let report = orchestrator.status().await.unwrap();
    assert_eq!(report.api, None);
    assert_eq!(report.api_status, ApiStatus::Unknown);
}

#[tokio::test]
async fn keys_can_be_updated_partially() {
    let (orchestrator, fakes) = orchestrator();
    assert!(orchestrator.keys_configured().await.unwrap());

    orchestrator
        .update_keys(None, Some("el-rotated".to_string()))
        .await
        .unwrap();
    let keys = fakes.credentials.get().unwrap();
    assert_eq!(keys.primary(), Some("sk-primary"));
    assert_eq!(keys.secondary(), Some("el-rotated"));
}
