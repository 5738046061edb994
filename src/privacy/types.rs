//! Privacy Types
//!
//! エクスポート・削除処理に関連する型定義

use crate::error::StorageError;
use crate::storage::{Row, Value};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Custom field context of the identity record
pub const USER_FIELDS_CONTEXT: &str = "com_users.user";
/// Custom field context of contact records
pub const CONTACT_FIELDS_CONTEXT: &str = "com_contact.contact";
/// Custom field context of content records
pub const CONTENT_FIELDS_CONTEXT: &str = "com_content.article";

/// Users table columns holding credential material. Never exported.
pub const CREDENTIAL_COLUMNS: [&str; 3] = ["password", "otpKey", "otep"];

/// Credential material of a subject. Never exported.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Password hash
    pub password: String,
    /// One-time-password seed
    pub otp_key: String,
    /// One-time emergency passwords
    pub otep: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials([redacted])")
    }
}

/// データ主体（ユーザーアカウント）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: u64,
    pub name: String,
    /// Login name
    pub username: String,
    pub email: String,
    /// Blocked / disabled account
    pub block: bool,
    pub send_email: bool,
    pub register_date: Option<DateTime<Utc>>,
    pub last_visit_date: Option<DateTime<Utc>>,
    pub activation: String,
    pub params: String,
    pub require_reset: bool,
    pub credentials: Credentials,
    /// Stored users row as loaded, including host columns not modelled above
    #[serde(default, skip_serializing)]
    pub record: Row,
}

impl Subject {
    /// Active account with empty optional attributes
    pub fn new(
        id: u64,
        name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            username: username.into(),
            email: email.into(),
            block: false,
            send_email: false,
            register_date: None,
            last_visit_date: None,
            activation: String::new(),
            params: String::new(),
            require_reset: false,
            credentials: Credentials::default(),
            record: Row::new(),
        }
    }

    /// Guest identities (id 0) have nothing to export or erase
    pub fn is_guest(&self) -> bool {
        self.id == 0
    }

    /// Identity record as stored in the users table, columns in table order
    pub fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("username", self.username.as_str())
            .with("email", self.email.as_str())
            .with("password", self.credentials.password.as_str())
            .with("block", self.block)
            .with("sendEmail", self.send_email)
            .with("registerDate", self.register_date)
            .with("lastvisitDate", self.last_visit_date)
            .with("activation", self.activation.as_str())
            .with("params", self.params.as_str())
            .with("otpKey", self.credentials.otp_key.as_str())
            .with("otep", self.credentials.otep.as_str())
            .with("requireReset", self.require_reset)
    }

    /// Columns overwritten by pseudonymization; the only ones a save writes
    pub fn identity_row(&self) -> Row {
        Row::new()
            .with("name", self.name.as_str())
            .with("username", self.username.as_str())
            .with("email", self.email.as_str())
            .with("block", self.block)
    }

    /// Identity record for export: every stored column except credentials.
    ///
    /// Subjects that were not loaded from a table fall back to [`Self::to_row`].
    /// Identity columns always carry the current values.
    pub fn export_row(&self) -> Row {
        let mut row = if self.record.is_empty() {
            self.to_row()
        } else {
            self.record.clone()
        };

        let block = match row.get("block") {
            Some(Value::Int(_)) => Value::Int(i64::from(self.block)),
            _ => Value::Bool(self.block),
        };
        row.set("name", self.name.as_str());
        row.set("username", self.username.as_str());
        row.set("email", self.email.as_str());
        row.set("block", block);

        row.without(&CREDENTIAL_COLUMNS)
    }

    /// Parse a users table row
    pub fn from_row(row: &Row) -> Result<Self, StorageError> {
        let id = row
            .get("id")
            .and_then(Value::as_i64)
            .filter(|id| *id >= 0)
            .ok_or_else(|| StorageError::ConversionError("users row without a valid id".into()))?;

        let text = |column: &str| row.get(column).map(Value::to_display_string).unwrap_or_default();
        let flag = |column: &str| match row.get(column) {
            Some(Value::Bool(b)) => *b,
            Some(value) => value.as_i64().is_some_and(|i| i != 0),
            None => false,
        };

        Ok(Self {
            id: id as u64,
            name: text("name"),
            username: text("username"),
            email: text("email"),
            block: flag("block"),
            send_email: flag("sendEmail"),
            register_date: row.get("registerDate").and_then(parse_datetime),
            last_visit_date: row.get("lastvisitDate").and_then(parse_datetime),
            activation: text("activation"),
            params: text("params"),
            require_reset: flag("requireReset"),
            credentials: Credentials {
                password: text("password"),
                otp_key: text("otpKey"),
                otep: text("otep"),
            },
            record: row.clone(),
        })
    }
}

/// SQL null dates (`0000-00-00 00:00:00`) and unparsable text read as `None`
fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::String(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).ok()),
        _ => None,
    }
}

/// One display-ready field of an export item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportField {
    pub name: String,
    pub value: String,
}

/// One exportable record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportItem {
    /// Natural key of the source record, when it has one
    pub id: Option<String>,
    pub fields: Vec<ExportField>,
}

impl ExportItem {
    pub fn new(id: Option<String>) -> Self {
        Self {
            id,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(ExportField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Named group of export items for one logical data source.
///
/// Populated once by the domain builder; the item list is read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDomain {
    name: String,
    description: String,
    items: Vec<ExportItem>,
}

impl ExportDomain {
    pub(crate) fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        items: Vec<ExportItem>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            items,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn items(&self) -> &[ExportItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of the erasure eligibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalStatus {
    can_remove: bool,
    reason: Option<String>,
}

impl RemovalStatus {
    pub fn permitted() -> Self {
        Self {
            can_remove: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            can_remove: false,
            reason: Some(reason.into()),
        }
    }

    pub fn can_remove(&self) -> bool {
        self.can_remove
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl Default for RemovalStatus {
    fn default() -> Self {
        Self::permitted()
    }
}

/// Kind of record discovered while exporting the primary subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecondaryKind {
    /// Contact record owned by the subject
    Contact,
    /// Content item authored by the subject
    Content,
}

impl SecondaryKind {
    /// Custom field context used to resolve this kind's attributes
    pub fn schema_key(&self) -> &'static str {
        match self {
            SecondaryKind::Contact => CONTACT_FIELDS_CONTEXT,
            SecondaryKind::Content => CONTENT_FIELDS_CONTEXT,
        }
    }

    /// Column naming the owner in custom field items
    pub fn owner_key(&self) -> &'static str {
        match self {
            SecondaryKind::Contact => "contact_id",
            SecondaryKind::Content => "content_id",
        }
    }
}

impl fmt::Display for SecondaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondaryKind::Contact => write!(f, "contact"),
            SecondaryKind::Content => write!(f, "content"),
        }
    }
}

/// A record linked to the primary subject that carries its own custom
/// attributes. Holds the record's identifier, not the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondarySubject {
    pub kind: SecondaryKind,
    pub id: String,
}

impl SecondarySubject {
    pub fn schema_key(&self) -> &'static str {
        self.kind.schema_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_row_roundtrip_keeps_credentials() {
        let mut subject = Subject::new(42, "Jane Roe", "jroe", "jane@example.com");
        subject.credentials.password = "$2y$10$hash".into();
        subject.block = true;

        let parsed = Subject::from_row(&subject.to_row()).unwrap();
        assert_eq!(parsed.id, 42);
        assert!(parsed.block);
        assert_eq!(parsed.credentials.password, "$2y$10$hash");
    }

    #[test]
    fn test_from_row_parses_sql_dates() {
        let row = Row::new()
            .with("id", "7")
            .with("registerDate", "2018-05-01 10:20:30")
            .with("lastvisitDate", "0000-00-00 00:00:00")
            .with("block", 1i64);

        let subject = Subject::from_row(&row).unwrap();
        assert_eq!(subject.id, 7);
        assert!(subject.block);
        assert!(subject.register_date.is_some());
        assert!(subject.last_visit_date.is_none());
    }

    #[test]
    fn test_export_row_keeps_host_columns_and_drops_credentials() {
        let row = Row::new()
            .with("id", 9i64)
            .with("name", "Ada")
            .with("password", "$2y$10$hash")
            .with("block", 0i64)
            .with("lastvisitDate", "0000-00-00 00:00:00")
            .with("otpKey", "seed")
            .with("lastResetTime", "2021-03-04 05:06:07")
            .with("resetCount", 2i64)
            .with("otep", "codes");

        let exported = Subject::from_row(&row).unwrap().export_row();

        assert_eq!(
            exported.column_names(),
            vec!["id", "name", "block", "lastvisitDate", "lastResetTime", "resetCount", "username", "email"]
        );
        assert_eq!(exported.get("block"), Some(&Value::Int(0)));
        assert_eq!(
            exported.get("lastvisitDate").map(Value::to_display_string).as_deref(),
            Some("0000-00-00 00:00:00")
        );
    }

    #[test]
    fn test_export_row_reflects_pseudonymized_identity() {
        let mut subject = Subject::from_row(
            &Row::new().with("id", 9i64).with("name", "Ada").with("username", "ada").with("block", 0i64),
        )
        .unwrap();
        subject.name = "User ID 9".into();
        subject.block = true;

        let exported = subject.export_row();
        assert_eq!(exported.get("name").and_then(Value::as_str), Some("User ID 9"));
        assert_eq!(exported.get("block"), Some(&Value::Int(1)));
        assert_eq!(subject.identity_row().column_names(), vec!["name", "username", "email", "block"]);
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials {
            password: "secret-hash".into(),
            otp_key: "seed".into(),
            otep: "codes".into(),
        };
        let rendered = format!("{:?}", credentials);
        assert!(!rendered.contains("secret-hash"));
        assert!(!rendered.contains("seed"));
    }

    #[test]
    fn test_removal_status_constructors() {
        assert!(RemovalStatus::permitted().can_remove());
        assert!(RemovalStatus::permitted().reason().is_none());

        let denied = RemovalStatus::denied("nope");
        assert!(!denied.can_remove());
        assert_eq!(denied.reason(), Some("nope"));
    }
}
