//! Document records
//!
//! Discovered reports are handed to a [`DocumentSink`] as
//! `(company, file_name, source_url)` records. Recording is fire-and-forget:
//! a sink logs its own failures and never feeds them back into crawl results.

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresSink;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

/// A stored document record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentRecord {
    /// Company name derived from the site host or supplied by the caller
    pub company: String,
    /// Last path segment of the source URL, without query
    pub file_name: String,
    /// Where the document was found
    pub source_url: String,
    /// Time of the last upsert
    #[schemars(with = "String")]
    pub last_updated_at: DateTime<Utc>,
}

/// Destination for discovered documents
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Insert or replace the record for `(company, file_name)`
    async fn upsert(&self, company: &str, file_name: &str, source_url: &str);

    /// All records, ordered by company then file name
    async fn list(&self) -> Vec<DocumentRecord>;

    /// Records for one company
    async fn list_company(&self, company: &str) -> Vec<DocumentRecord>;
}

/// In-process sink keyed by `(company, file_name)`
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RwLock<BTreeMap<(String, String), DocumentRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentSink for MemorySink {
    async fn upsert(&self, company: &str, file_name: &str, source_url: &str) {
        let record = DocumentRecord {
            company: company.to_string(),
            file_name: file_name.to_string(),
            source_url: source_url.to_string(),
            last_updated_at: Utc::now(),
        };
        match self.records.write() {
            Ok(mut records) => {
                let key = (record.company.clone(), record.file_name.clone());
                let replaced = records.insert(key, record).is_some();
                debug!(company, file_name, replaced, "Recorded document");
            }
            Err(_) => warn!(company, file_name, "Document store lock poisoned"),
        }
    }

    async fn list(&self) -> Vec<DocumentRecord> {
        match self.records.read() {
            Ok(records) => records.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn list_company(&self, company: &str) -> Vec<DocumentRecord> {
        match self.records.read() {
            Ok(records) => records
                .values()
                .filter(|r| r.company == company)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// File name for a document URL: last path segment without the query
///
/// Falls back to the raw URL text after the last `/` when the URL does not
/// parse. Returns `None` for an empty segment.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let name = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => url
            .rsplit('/')
            .next()
            .and_then(|last| last.split(['?', '#']).next())
            .map(str::to_string),
    }?;
    (!name.is_empty()).then_some(name)
}
