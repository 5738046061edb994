//! Domain Builder
//!
//! 取得した行をエクスポートドメインに変換する。
//! Rows become items with redacted columns stripped; rows that stand for
//! secondary subjects are also registered in the run's [`DiscoveryList`].

use crate::error::{Error, Result};
use crate::privacy::fields::CustomField;
use crate::privacy::types::{ExportDomain, ExportItem, SecondaryKind, SecondarySubject};
use crate::storage::{Row, Value};

/// Secondary subjects discovered during one export run, in discovery order.
///
/// Owned by a single run; never shared between runs or subjects.
#[derive(Debug, Default)]
pub struct DiscoveryList {
    entries: Vec<SecondarySubject>,
}

impl DiscoveryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: SecondaryKind, id: impl Into<String>) {
        self.entries.push(SecondarySubject { kind, id: id.into() });
    }

    /// Remove and return every entry of `kind`, keeping discovery order
    pub fn drain_kind(&mut self, kind: SecondaryKind) -> Vec<SecondarySubject> {
        let (drained, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.kind == kind);
        self.entries = kept;
        drained
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const NO_COLUMNS: &[String] = &[];

/// Static description of one row-backed domain
#[derive(Debug, Clone, Copy)]
pub struct DomainSpec<'a> {
    pub name: &'a str,
    pub description: &'a str,
    /// Column whose value becomes the item id
    pub id_column: Option<&'a str>,
    /// Columns stripped from every item
    pub redact: &'a [String],
}

impl<'a> DomainSpec<'a> {
    pub fn new(name: &'a str, description: &'a str) -> Self {
        Self {
            name,
            description,
            id_column: None,
            redact: NO_COLUMNS,
        }
    }

    pub fn with_id_column(mut self, column: &'a str) -> Self {
        self.id_column = Some(column);
        self
    }

    pub fn redacting(mut self, columns: &'a [String]) -> Self {
        self.redact = columns;
        self
    }
}

/// Convert one row into an item, dropping `redact` columns.
///
/// The id is read before redaction so a key column may be both the item id
/// and hidden from the fields.
pub fn item_from_row<S: AsRef<str>>(row: &Row, id_column: Option<&str>, redact: &[S]) -> ExportItem {
    let id = id_column
        .and_then(|column| row.get(column))
        .filter(|value| !value.is_null())
        .map(Value::to_display_string);

    row.without(redact)
        .columns()
        .fold(ExportItem::new(id), |item, (name, value)| {
            item.with_field(name, value.to_display_string())
        })
}

/// Wrap a data source's rows into a domain, one item per row
pub fn build_domain(spec: DomainSpec<'_>, rows: &[Row]) -> ExportDomain {
    let items = rows
        .iter()
        .map(|row| item_from_row(row, spec.id_column, spec.redact))
        .collect();
    ExportDomain::new(spec.name, spec.description, items)
}

/// Like [`build_domain`], additionally registering every row as a secondary
/// subject of `kind`.
///
/// Every row must carry an `id`; a row that could not be followed up would
/// silently drop its custom fields from the export, so it is an error.
pub fn build_discovering_domain(
    spec: DomainSpec<'_>,
    rows: &[Row],
    kind: SecondaryKind,
    discovered: &mut DiscoveryList,
) -> Result<ExportDomain> {
    let mut found = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row
            .get("id")
            .filter(|value| !value.is_null())
            .map(Value::to_display_string)
            .ok_or_else(|| {
                Error::InvalidInput(format!("{} row without id in domain '{}'", kind, spec.name))
            })?;
        found.push(id);
    }

    let domain = build_domain(spec, rows);
    for id in found {
        discovered.register(kind, id);
    }
    Ok(domain)
}

/// One item per custom field, shaped
/// `{<owner_key>, field_name, field_title, field_value}`.
pub fn build_custom_field_domain(
    name: &str,
    description: &str,
    owner_key: &str,
    owner_id: &str,
    fields: &[CustomField],
) -> ExportDomain {
    let items = fields
        .iter()
        .map(|field| {
            ExportItem::new(None)
                .with_field(owner_key, owner_id)
                .with_field("field_name", field.name.as_str())
                .with_field("field_title", field.title.as_str())
                .with_field("field_value", field.value.to_display_string())
        })
        .collect();
    ExportDomain::new(name, description, items)
}
