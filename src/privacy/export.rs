//! Export Orchestrator
//!
//! データ主体が保持する全データをドメイン単位で収集する。
//!
//! Independent sources are fetched concurrently, then domains are built in
//! a fixed order:
//!
//! 1. `users` (credentials redacted)
//! 2. `user notes` (actor columns redacted)
//! 3. `user profile`
//! 4. `user custom fields`
//! 5. `user message`
//! 6. `user contact`, followed by one `contact custom fields` domain per contact
//! 7. `user content`, followed by one `content custom fields` domain per item
//!
//! Empty domains are always emitted so a caller can tell "no data" from
//! "not checked".

use crate::config::{ExportConfig, TableConfig};
use crate::error::{Error, ExportFailure};
use crate::privacy::directory::SubjectDirectory;
use crate::privacy::domain_builder::{
    build_custom_field_domain, build_discovering_domain, build_domain, DiscoveryList, DomainSpec,
};
use crate::privacy::fields::CustomFieldResolver;
use crate::privacy::types::{ExportDomain, SecondaryKind, Subject, USER_FIELDS_CONTEXT};
use crate::storage::{Filter, OrderBy, RowStore};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

pub const USERS_DOMAIN: &str = "users";
pub const NOTES_DOMAIN: &str = "user notes";
pub const PROFILE_DOMAIN: &str = "user profile";
pub const USER_FIELDS_DOMAIN: &str = "user custom fields";
pub const MESSAGES_DOMAIN: &str = "user message";
pub const CONTACTS_DOMAIN: &str = "user contact";
pub const CONTACT_FIELDS_DOMAIN: &str = "contact custom fields";
pub const CONTENT_DOMAIN: &str = "user content";
pub const CONTENT_FIELDS_DOMAIN: &str = "content custom fields";

/// A domain that failed, with its cause
type DomainFailure = (&'static str, Error);

fn in_domain<E: Into<Error>>(domain: &'static str) -> impl FnOnce(E) -> DomainFailure {
    move |err| (domain, err.into())
}

/// Per-run state. Dropped when the run returns.
#[derive(Debug, Default)]
struct ExportRun {
    domains: Vec<ExportDomain>,
    discovered: DiscoveryList,
}

impl ExportRun {
    fn push(&mut self, domain: ExportDomain) {
        debug!(domain = domain.name(), items = domain.len(), "domain built");
        self.domains.push(domain);
    }
}

/// Assembles the full export of one subject
#[derive(Debug, Clone)]
pub struct ExportOrchestrator {
    directory: Arc<dyn SubjectDirectory>,
    rows: Arc<dyn RowStore>,
    fields: Arc<dyn CustomFieldResolver>,
    config: ExportConfig,
    tables: TableConfig,
}

impl ExportOrchestrator {
    pub fn new(
        directory: Arc<dyn SubjectDirectory>,
        rows: Arc<dyn RowStore>,
        fields: Arc<dyn CustomFieldResolver>,
    ) -> Self {
        Self {
            directory,
            rows,
            fields,
            config: ExportConfig::default(),
            tables: TableConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tables(mut self, tables: TableConfig) -> Self {
        self.tables = tables;
        self
    }

    /// Export every domain held about `subject_id`.
    ///
    /// Returns an empty sequence for id 0 and for unknown or guest
    /// subjects. On failure the error names the failing domain and carries
    /// the domains built before it.
    pub async fn export_subject(&self, subject_id: u64) -> Result<Vec<ExportDomain>, ExportFailure> {
        if subject_id == 0 {
            debug!("export request without subject, nothing to export");
            return Ok(Vec::new());
        }

        let subject = match self.directory.load_subject(subject_id).await {
            Ok(Some(subject)) if !subject.is_guest() => subject,
            Ok(_) => {
                info!(subject_id, "subject not found, nothing to export");
                return Ok(Vec::new());
            }
            Err(e) => return Err(ExportFailure::new(USERS_DOMAIN, Vec::new(), e.into())),
        };

        info!(subject_id, "starting export");
        let mut run = ExportRun::default();
        match self.collect(&subject, &mut run).await {
            Ok(()) => {
                info!(subject_id, domains = run.domains.len(), "export complete");
                Ok(run.domains)
            }
            Err((domain, source)) => {
                tracing::error!(subject_id, domain, error = %source, "export failed");
                Err(ExportFailure::new(domain, run.domains, source))
            }
        }
    }

    async fn collect(&self, subject: &Subject, run: &mut ExportRun) -> Result<(), DomainFailure> {
        let tables = &self.tables;
        let owner = subject.id.to_string();

        let by_user = Filter::eq("user_id", subject.id);
        let by_author = Filter::eq("created_by", subject.id);
        let by_party = Filter::any_of(vec![
            Filter::eq("user_id_from", subject.id),
            Filter::eq("user_id_to", subject.id),
        ]);
        let by_insertion = OrderBy::asc("id");
        let by_ordering = OrderBy::asc("ordering");
        let by_time = OrderBy::asc("date_time");

        let (user_fields, notes, profile, messages, contacts, content) = futures::join!(
            self.fields.get_fields(USER_FIELDS_CONTEXT, &owner),
            self.rows.query(&tables.user_notes, &by_user, Some(&by_insertion)),
            self.rows.query(&tables.user_profiles, &by_user, Some(&by_ordering)),
            self.rows.query(&tables.messages, &by_party, Some(&by_time)),
            self.rows.query(&tables.contacts, &by_user, Some(&by_ordering)),
            self.rows.query(&tables.content, &by_author, Some(&by_ordering)),
        );

        run.push(build_domain(
            DomainSpec::new(USERS_DOMAIN, "users table data")
                .with_id_column("id")
                .redacting(&self.config.identity_redact),
            &[subject.export_row()],
        ));

        let notes = notes.map_err(in_domain(NOTES_DOMAIN))?;
        run.push(build_domain(
            DomainSpec::new(NOTES_DOMAIN, "user notes data")
                .with_id_column("id")
                .redacting(&self.config.notes_redact),
            &notes,
        ));

        let profile = profile.map_err(in_domain(PROFILE_DOMAIN))?;
        run.push(build_domain(
            DomainSpec::new(PROFILE_DOMAIN, "user profile data"),
            &profile,
        ));

        let user_fields = user_fields.map_err(in_domain(USER_FIELDS_DOMAIN))?;
        run.push(build_custom_field_domain(
            USER_FIELDS_DOMAIN,
            "user custom fields data",
            "user_id",
            &owner,
            &user_fields,
        ));

        let messages = messages.map_err(in_domain(MESSAGES_DOMAIN))?;
        run.push(build_domain(
            DomainSpec::new(MESSAGES_DOMAIN, "user message data"),
            &messages,
        ));

        let contacts = contacts.map_err(in_domain(CONTACTS_DOMAIN))?;
        let domain = build_discovering_domain(
            DomainSpec::new(CONTACTS_DOMAIN, "user contact data").with_id_column("id"),
            &contacts,
            SecondaryKind::Contact,
            &mut run.discovered,
        )
        .map_err(in_domain(CONTACTS_DOMAIN))?;
        run.push(domain);
        self.secondary_fields(run, SecondaryKind::Contact, CONTACT_FIELDS_DOMAIN, "contact custom fields data")
            .await?;

        let content = content.map_err(in_domain(CONTENT_DOMAIN))?;
        let domain = build_discovering_domain(
            DomainSpec::new(CONTENT_DOMAIN, "user content data").with_id_column("id"),
            &content,
            SecondaryKind::Content,
            &mut run.discovered,
        )
        .map_err(in_domain(CONTENT_DOMAIN))?;
        run.push(domain);
        self.secondary_fields(run, SecondaryKind::Content, CONTENT_FIELDS_DOMAIN, "content custom fields data")
            .await?;

        Ok(())
    }

    /// Drain the discovered subjects of `kind` and emit one custom field
    /// domain per subject, in discovery order.
    async fn secondary_fields(
        &self,
        run: &mut ExportRun,
        kind: SecondaryKind,
        name: &'static str,
        description: &str,
    ) -> Result<(), DomainFailure> {
        let secondaries = run.discovered.drain_kind(kind);
        if secondaries.is_empty() {
            return Ok(());
        }

        debug!(%kind, count = secondaries.len(), "resolving secondary custom fields");
        let lookups = secondaries
            .iter()
            .map(|secondary| self.fields.get_fields(secondary.schema_key(), &secondary.id));
        let resolved = join_all(lookups).await;

        for (secondary, fields) in secondaries.iter().zip(resolved) {
            let fields = fields.map_err(in_domain(name))?;
            run.push(build_custom_field_domain(
                name,
                description,
                kind.owner_key(),
                &secondary.id,
                &fields,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy::directory::MemorySubjectDirectory;
    use crate::privacy::fields::MemoryFieldResolver;
    use crate::storage::{MemoryRowStore, Row};

    async fn orchestrator() -> (MemoryRowStore, ExportOrchestrator) {
        let directory = MemorySubjectDirectory::new();
        directory
            .insert(Subject::new(5, "Sam Poe", "spoe", "sam@example.com"))
            .await;
        let rows = MemoryRowStore::new();
        let orchestrator = ExportOrchestrator::new(
            Arc::new(directory),
            Arc::new(rows.clone()),
            Arc::new(MemoryFieldResolver::new()),
        );
        (rows, orchestrator)
    }

    #[tokio::test]
    async fn test_subject_without_data_gets_base_domains() {
        let (_, orchestrator) = orchestrator().await;
        let domains = orchestrator.export_subject(5).await.unwrap();

        let names: Vec<_> = domains.iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec![
                USERS_DOMAIN,
                NOTES_DOMAIN,
                PROFILE_DOMAIN,
                USER_FIELDS_DOMAIN,
                MESSAGES_DOMAIN,
                CONTACTS_DOMAIN,
                CONTENT_DOMAIN,
            ]
        );
        assert_eq!(domains[0].len(), 1);
        assert!(domains[1..].iter().all(|d| d.is_empty()));
    }

    #[tokio::test]
    async fn test_unknown_subject_exports_nothing() {
        let (rows, orchestrator) = orchestrator().await;
        assert!(orchestrator.export_subject(404).await.unwrap().is_empty());
        assert!(rows.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_contact_discovery_is_per_run() {
        let (rows, orchestrator) = orchestrator().await;
        rows.seed(
            "contact_details",
            vec![Row::new().with("id", 3i64).with("user_id", 5i64).with("ordering", 1i64)],
        )
        .await;

        for _ in 0..2 {
            let domains = orchestrator.export_subject(5).await.unwrap();
            let contact_fields = domains
                .iter()
                .filter(|d| d.name() == CONTACT_FIELDS_DOMAIN)
                .count();
            assert_eq!(contact_fields, 1);
        }
    }
}
