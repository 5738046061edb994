//! SQLite Integration Tests
//!
//! End-to-end export and erasure over a SQLite database

#![cfg(feature = "sqlite")]

use privacy_rs::config::PrivacyConfig;
use privacy_rs::privacy::directory::group_membership;
use privacy_rs::privacy::{
    PrivacyHandler, PrivacyRequest, RequestType, TableFieldResolver,
    TableSubjectDirectory, UserPrivacyHandler,
};
use privacy_rs::session::TableSessionStore;
use privacy_rs::storage::{Filter, RowStore, SqliteRowStore};
use privacy_rs::Error;
use regex::Regex;
use std::sync::Arc;

const SCHEMA: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    username TEXT NOT NULL,
    email TEXT NOT NULL,
    password TEXT NOT NULL,
    block INTEGER NOT NULL DEFAULT 0,
    sendEmail INTEGER DEFAULT 0,
    registerDate TEXT,
    lastvisitDate TEXT,
    activation TEXT NOT NULL DEFAULT '',
    params TEXT NOT NULL DEFAULT '',
    otpKey TEXT NOT NULL DEFAULT '',
    otep TEXT NOT NULL DEFAULT '',
    requireReset INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE user_usergroup_map (user_id INTEGER NOT NULL, group_id INTEGER NOT NULL);
CREATE TABLE user_notes (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    created_user_id INTEGER NOT NULL,
    modified_user_id INTEGER NOT NULL
);
CREATE TABLE user_profiles (user_id INTEGER, profile_key TEXT, profile_value TEXT, ordering INTEGER);
CREATE TABLE messages (
    message_id INTEGER PRIMARY KEY,
    user_id_from INTEGER,
    user_id_to INTEGER,
    date_time TEXT,
    subject TEXT
);
CREATE TABLE contact_details (id INTEGER PRIMARY KEY, name TEXT, user_id INTEGER, ordering INTEGER);
CREATE TABLE content (id INTEGER PRIMARY KEY, title TEXT, created_by INTEGER, ordering INTEGER);
CREATE TABLE fields (
    id INTEGER PRIMARY KEY,
    context TEXT,
    name TEXT,
    title TEXT,
    default_value TEXT,
    state INTEGER,
    ordering INTEGER
);
CREATE TABLE fields_values (field_id INTEGER, item_id TEXT, value TEXT);
CREATE TABLE session (session_id TEXT PRIMARY KEY, userid INTEGER, time INTEGER);

INSERT INTO users (id, name, username, email, password, registerDate, otpKey, otep)
VALUES (1, 'Site Admin', 'admin', 'admin@example.com', '$2y$10$admin', '2017-01-01 00:00:00', '', ''),
       (42, 'Jane Roe', 'jroe', 'jane@example.com', '$2y$10$secret', '2018-05-01 09:00:00', 'SEED', 'CODES');
INSERT INTO user_notes VALUES (1, 42, 'First', 'first body', 1, 1), (2, 42, 'Second', 'second body', 1, 1);
INSERT INTO user_profiles VALUES (42, 'profile.city', '"Lisbon"', 1);
INSERT INTO messages VALUES
    (1, 42, 1, '2020-01-01 12:03:00', 'third'),
    (2, 1, 42, '2020-01-01 12:01:00', 'first'),
    (3, 42, 1, '2020-01-01 12:02:00', 'second');
INSERT INTO contact_details VALUES (5, 'Jane at work', 42, 1);
INSERT INTO content VALUES (77, 'My article', 42, 0);
INSERT INTO fields VALUES
    (1, 'com_users.user', 'city', 'City', '', 1, 1),
    (2, 'com_contact.contact', 'fax', 'Fax', '', 1, 1),
    (3, 'com_content.article', 'tags', 'Tags', '', 1, 1);
INSERT INTO fields_values VALUES (1, '42', 'Lisbon'), (2, '5', '555-0199'), (3, '77', 'a'), (3, '77', 'b');
INSERT INTO session VALUES ('s1', 42, 0), ('s2', 42, 0), ('s3', 1, 0);
"#;

async fn setup() -> (Arc<SqliteRowStore>, UserPrivacyHandler) {
    let rows = Arc::new(SqliteRowStore::connect("sqlite::memory:", 1).await.unwrap());
    rows.execute_script(SCHEMA).await.unwrap();
    rows.insert("user_usergroup_map", group_membership(1, 8)).await.unwrap();

    let config = PrivacyConfig::default();
    let directory = Arc::new(TableSubjectDirectory::new(
        rows.clone(),
        &config.tables.users,
        &config.tables.usergroup_map,
        config.eligibility.super_user_groups.clone(),
    ));
    let fields = Arc::new(TableFieldResolver::new(
        rows.clone(),
        &config.tables.fields,
        &config.tables.fields_values,
    ));
    let sessions = Arc::new(TableSessionStore::new(rows.clone(), &config.tables.session));
    let handler = UserPrivacyHandler::from_config(&config, directory, rows.clone(), fields, sessions);
    (rows, handler)
}

#[tokio::test]
async fn test_sqlite_export() {
    let (_, handler) = setup().await;

    let request = PrivacyRequest::new("jane@example.com", Some(42), RequestType::Export);
    let domains = handler.export_request(&request).await.unwrap();

    let summary: Vec<(&str, usize)> = domains.iter().map(|d| (d.name(), d.len())).collect();
    assert_eq!(
        summary,
        vec![
            ("users", 1),
            ("user notes", 2),
            ("user profile", 1),
            ("user custom fields", 1),
            ("user message", 3),
            ("user contact", 1),
            ("contact custom fields", 1),
            ("user content", 1),
            ("content custom fields", 1),
        ]
    );

    let identity = &domains[0].items()[0];
    assert!(identity.field("password").is_none());
    assert!(identity.field("otpKey").is_none());
    assert_eq!(identity.field("registerDate"), Some("2018-05-01 09:00:00"));

    let subjects: Vec<_> = domains[4].items().iter().map(|i| i.field("subject").unwrap()).collect();
    assert_eq!(subjects, vec!["first", "second", "third"]);

    assert_eq!(domains[6].items()[0].field("field_value"), Some("555-0199"));
    assert_eq!(domains[8].items()[0].field("field_value"), Some("a, b"));
}

#[tokio::test]
async fn test_sqlite_erasure() {
    let (rows, handler) = setup().await;

    let request = PrivacyRequest::new("jane@example.com", Some(42), RequestType::Remove);
    let report = handler.remove_data(&request).await.unwrap();
    assert_eq!(report.sessions_found, 2);

    let user = rows.query("users", &Filter::eq("id", 42i64), None).await.unwrap();
    let username = user[0].get("username").unwrap().to_display_string();
    assert!(Regex::new(r"^[0-9a-f]{24}$").unwrap().is_match(&username));
    assert_eq!(
        user[0].get("email").unwrap().to_display_string(),
        "UserID42removed@email.invalid"
    );
    assert_eq!(user[0].get("block").unwrap().as_i64(), Some(1));

    let remaining = rows.query("session", &Filter::All, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].get("userid").unwrap().as_i64(), Some(1));
}

#[tokio::test]
async fn test_sqlite_admin_is_protected() {
    let (_, handler) = setup().await;

    let request = PrivacyRequest::new("admin@example.com", Some(1), RequestType::Remove);
    let status = handler.can_remove_data(&request).await.unwrap();
    assert!(!status.can_remove());

    let err = handler.remove_data(&request).await.unwrap_err();
    assert!(matches!(err, Error::RemovalDenied { .. }));
}

#[tokio::test]
async fn test_sqlite_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("privacy.db").display());

    let rows = SqliteRowStore::connect(&url, 2).await.unwrap();
    rows.execute_script("CREATE TABLE session (session_id TEXT, userid INTEGER);")
        .await
        .unwrap();
    rows.execute_script("INSERT INTO session VALUES ('a', 7), ('b', 7), ('c', 8);")
        .await
        .unwrap();

    let deleted = rows
        .delete("session", &Filter::is_in("session_id", vec!["a".into(), "b".into()]))
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert!(rows.query("session", &Filter::eq("userid", 7i64), None).await.unwrap().is_empty());
}
