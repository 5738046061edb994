//! Custom attribute resolution
//!
//! One resolver serves every schema key; callers differ only in the key and
//! the owner id they pass.

use crate::error::StorageError;
use crate::storage::{Filter, OrderBy, RowStore, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Raw custom field value: scalar or multi-valued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Display value; lists are joined with `", "`
    pub fn to_display_string(&self) -> String {
        match self {
            FieldValue::Scalar(value) => value.clone(),
            FieldValue::List(values) => values.join(", "),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::List(values)
    }
}

/// A custom field attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    /// Machine name
    pub name: String,
    /// Display title
    pub title: String,
    pub value: FieldValue,
}

impl CustomField {
    pub fn new(name: impl Into<String>, title: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            value: value.into(),
        }
    }
}

/// Resolves the custom fields of `owner_id` under `schema_key`
/// (e.g. `com_contact.contact`), in field display order.
#[async_trait]
pub trait CustomFieldResolver: Send + Sync + std::fmt::Debug {
    async fn get_fields(&self, schema_key: &str, owner_id: &str) -> Result<Vec<CustomField>, StorageError>;
}

/// In-memory resolver keyed by `(schema_key, owner_id)`
#[derive(Debug, Clone, Default)]
pub struct MemoryFieldResolver {
    fields: Arc<RwLock<HashMap<(String, String), Vec<CustomField>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MemoryFieldResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fields(&self, schema_key: &str, owner_id: &str, fields: Vec<CustomField>) {
        self.fields
            .write()
            .await
            .insert((schema_key.to_string(), owner_id.to_string()), fields);
    }

    /// Make every lookup under `schema_key` fail
    pub async fn fail_schema(&self, schema_key: &str) {
        self.failing.write().await.insert(schema_key.to_string());
    }
}

#[async_trait]
impl CustomFieldResolver for MemoryFieldResolver {
    async fn get_fields(&self, schema_key: &str, owner_id: &str) -> Result<Vec<CustomField>, StorageError> {
        if self.failing.read().await.contains(schema_key) {
            return Err(StorageError::query_failed(schema_key, "schema is marked as failing"));
        }

        let fields = self.fields.read().await;
        Ok(fields
            .get(&(schema_key.to_string(), owner_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Resolver over the host's field definition and field value tables.
///
/// Published definitions for the context are read in `ordering` order;
/// a field with several stored values becomes a list, a field with none
/// falls back to its default value.
#[derive(Debug, Clone)]
pub struct TableFieldResolver {
    rows: Arc<dyn RowStore>,
    fields_table: String,
    values_table: String,
}

impl TableFieldResolver {
    pub fn new(rows: Arc<dyn RowStore>, fields_table: impl Into<String>, values_table: impl Into<String>) -> Self {
        Self {
            rows,
            fields_table: fields_table.into(),
            values_table: values_table.into(),
        }
    }
}

#[async_trait]
impl CustomFieldResolver for TableFieldResolver {
    async fn get_fields(&self, schema_key: &str, owner_id: &str) -> Result<Vec<CustomField>, StorageError> {
        let definitions = self
            .rows
            .query(
                &self.fields_table,
                &Filter::all_of(vec![
                    Filter::eq("context", schema_key),
                    Filter::eq("state", 1i64),
                ]),
                Some(&OrderBy::asc("ordering")),
            )
            .await?;

        let mut resolved = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let field_id = definition
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| {
                    StorageError::ConversionError(format!(
                        "{} row without id in context {}",
                        self.fields_table, schema_key
                    ))
                })?;

            let stored = self
                .rows
                .query(
                    &self.values_table,
                    &Filter::all_of(vec![
                        Filter::eq("field_id", field_id),
                        Filter::eq("item_id", owner_id),
                    ]),
                    None,
                )
                .await?;

            let mut values: Vec<String> = stored
                .iter()
                .map(|row| row.get("value").map(Value::to_display_string).unwrap_or_default())
                .collect();

            let value = match values.len() {
                0 => FieldValue::Scalar(
                    definition
                        .get("default_value")
                        .map(Value::to_display_string)
                        .unwrap_or_default(),
                ),
                1 => FieldValue::Scalar(values.remove(0)),
                _ => FieldValue::List(values),
            };

            let text = |column: &str| definition.get(column).map(Value::to_display_string).unwrap_or_default();
            resolved.push(CustomField {
                name: text("name"),
                title: text("title"),
                value,
            });
        }

        Ok(resolved)
    }
}
