//! Test Fixtures
//!
//! テスト用の共通データとヘルパー関数

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use privacy_rs::error::SessionError;
use privacy_rs::privacy::{
    CustomField, EligibilityChecker, ErasureExecutor, ExportOrchestrator, FieldValue,
    MemoryFieldResolver, MemorySubjectDirectory, Subject, UserPrivacyHandler,
};
use privacy_rs::session::{
    BackendSessionStore, MemorySessionStorage, Session, SessionId, SessionStorage, SessionStore,
};
use privacy_rs::storage::{MemoryRowStore, Row};
use std::sync::Arc;

/// In-memory host: one of every collaborator, shared by clones
#[derive(Debug, Clone, Default)]
pub struct Host {
    pub rows: MemoryRowStore,
    pub directory: MemorySubjectDirectory,
    pub fields: MemoryFieldResolver,
    pub live_sessions: MemorySessionStorage,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orchestrator(&self) -> ExportOrchestrator {
        ExportOrchestrator::new(
            Arc::new(self.directory.clone()),
            Arc::new(self.rows.clone()),
            Arc::new(self.fields.clone()),
        )
    }

    pub fn executor(&self) -> ErasureExecutor {
        self.executor_with(Arc::new(BackendSessionStore::new(Arc::new(
            self.live_sessions.clone(),
        ))))
    }

    pub fn executor_with(&self, sessions: Arc<dyn SessionStore>) -> ErasureExecutor {
        ErasureExecutor::new(
            Arc::new(self.directory.clone()),
            Arc::new(self.rows.clone()),
            sessions,
        )
    }

    pub fn checker(&self) -> EligibilityChecker {
        EligibilityChecker::new(Arc::new(self.directory.clone()))
    }

    pub fn handler(&self) -> UserPrivacyHandler {
        UserPrivacyHandler::new(self.checker(), self.orchestrator(), self.executor())
    }

    pub async fn add_subject(&self, id: u64, name: &str) -> Subject {
        let login = name.to_lowercase().replace(' ', ".");
        let mut subject = Subject::new(id, name, login.as_str(), format!("{}@example.com", login));
        subject.credentials.password = "$2y$10$abcdefghijklmnopqrstuv".into();
        subject.credentials.otp_key = "JBSWY3DPEHPK3PXP".into();
        subject.credentials.otep = "1234-5678".into();
        subject.register_date = Some(Utc.with_ymd_and_hms(2018, 5, 1, 9, 0, 0).unwrap());
        self.directory.insert(subject.clone()).await;
        subject
    }

    /// Start `count` live sessions for `user_id`, mirrored in the session table
    pub async fn add_sessions(&self, user_id: u64, count: usize) -> Vec<SessionId> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let session = self
                .live_sessions
                .create(Session::new(user_id))
                .await
                .unwrap();
            self.rows
                .seed(
                    "session",
                    vec![Row::new()
                        .with("session_id", session.id.as_str())
                        .with("userid", user_id)
                        .with("time", 1_700_000_000i64)],
                )
                .await;
            ids.push(session.id);
        }
        ids
    }

    pub async fn session_rows_for(&self, user_id: u64) -> usize {
        self.rows
            .rows("session")
            .await
            .iter()
            .filter(|row| row.get("userid").and_then(|v| v.as_i64()) == Some(user_id as i64))
            .count()
    }

    /// 2 notes, 1 profile row, 3 custom fields, no contacts, 1 content row
    /// with 2 custom fields, 3 sent and 2 received messages
    pub async fn seed_subject_42(&self) {
        self.add_subject(42, "Jane Roe").await;
        self.add_subject(43, "Other Person").await;

        self.rows
            .seed("user_notes", vec![note(2, 42, "Second note"), note(1, 42, "First note"), note(3, 43, "Not hers")])
            .await;
        self.rows
            .seed(
                "user_profiles",
                vec![Row::new()
                    .with("user_id", 42i64)
                    .with("profile_key", "profile.city")
                    .with("profile_value", "\"Lisbon\"")
                    .with("ordering", 1i64)],
            )
            .await;
        self.fields
            .set_fields(
                "com_users.user",
                "42",
                vec![
                    CustomField::new("city", "City", "Lisbon"),
                    CustomField::new("phone", "Phone", "555-0100"),
                    CustomField::new(
                        "languages",
                        "Languages",
                        FieldValue::List(vec!["pt".into(), "en".into()]),
                    ),
                ],
            )
            .await;
        self.rows
            .seed(
                "messages",
                vec![
                    message(5, 42, 43, 5),
                    message(1, 42, 43, 1),
                    message(4, 43, 42, 4),
                    message(2, 43, 42, 2),
                    message(3, 42, 1, 3),
                    message(6, 43, 1, 6),
                ],
            )
            .await;
        self.rows
            .seed(
                "content",
                vec![Row::new()
                    .with("id", 77i64)
                    .with("title", "My article")
                    .with("created_by", 42i64)
                    .with("ordering", 0i64)],
            )
            .await;
        self.fields
            .set_fields(
                "com_content.article",
                "77",
                vec![
                    CustomField::new("mood", "Mood", "calm"),
                    CustomField::new("tags", "Tags", FieldValue::List(vec!["a".into(), "b".into()])),
                ],
            )
            .await;
    }
}

pub fn note(id: i64, user_id: i64, subject: &str) -> Row {
    Row::new()
        .with("id", id)
        .with("user_id", user_id)
        .with("subject", subject)
        .with("body", format!("{} body", subject))
        .with("created_user_id", 1i64)
        .with("modified_user_id", 1i64)
}

/// Message sent at minute `minute` of a fixed day
pub fn message(id: i64, from: i64, to: i64, minute: u32) -> Row {
    Row::new()
        .with("message_id", id)
        .with("user_id_from", from)
        .with("user_id_to", to)
        .with("date_time", Utc.with_ymd_and_hms(2020, 1, 1, 12, minute, 0).unwrap())
        .with("subject", format!("message {}", id))
}

pub fn contact(id: i64, user_id: i64, ordering: i64) -> Row {
    Row::new()
        .with("id", id)
        .with("name", format!("Contact {}", id))
        .with("user_id", user_id)
        .with("ordering", ordering)
}

/// Session store whose destroy always fails
#[derive(Debug, Default)]
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn destroy(&self, id: &SessionId) -> Result<bool, SessionError> {
        Err(SessionError::Storage(format!("session handler unavailable for {}", id)))
    }
}
