// Paginated BVFS listing shared by directory and file listers

use crate::console::{self, ConsoleClient, ConsoleCommand};
use crate::errors::{ConsoleError, RestoreError};
use crate::models::{CatalogEntry, CatalogKind, CatalogPage, PathRef};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

/// Page size used against the director
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Directory pages with at most this many rows are final
const DIRECTORY_TERMINAL_LEN: usize = 2;

/// Fetches every row of one BVFS listing, page by page.
///
/// Directory listings end on a page of at most two rows (a cached directory
/// always carries `.` and `..`), file listings end on an empty page. A first
/// page without any usable rows means the path is not cached under that
/// reference yet, so the query is retried once against `path=@`.
#[derive(Debug, Clone, Copy)]
pub struct CatalogPaginator {
    kind: CatalogKind,
    limit: u32,
}

impl CatalogPaginator {
    pub fn new(kind: CatalogKind, limit: u32) -> Self {
        Self { kind, limit }
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Build the listing command for one page
    pub fn command(&self, job_ids: &str, path: &PathRef, offset: u64) -> ConsoleCommand {
        let command = ConsoleCommand::new(self.kind.verb()).arg("jobid", job_ids);
        let command = match path {
            PathRef::Root => command.arg("path", ""),
            PathRef::LastResolved => command.arg("path", "@"),
            PathRef::PathId(id) => command.arg("pathid", id.trim_start_matches('-')),
        };
        command
            .arg("limit", self.limit.to_string())
            .arg("offset", offset.to_string())
    }

    /// Fetch every entry below `path` for the comma-joined `job_ids`.
    ///
    /// Any transport or parse failure discards what was accumulated and
    /// surfaces as `CatalogUnavailable`.
    #[instrument(skip(self, console), fields(kind = ?self.kind, limit = self.limit))]
    pub async fn fetch_all(
        &self,
        console: &mut dyn ConsoleClient,
        job_ids: &str,
        path: &PathRef,
    ) -> Result<Vec<CatalogEntry>, RestoreError> {
        if job_ids.trim().is_empty() {
            debug!("No job ids, nothing to list");
            return Ok(Vec::new());
        }

        match self.fetch_pages(console, job_ids, path).await {
            Ok(entries) => {
                metrics::histogram!("catalog_listing_entries", "verb" => self.kind.verb())
                    .record(entries.len() as f64);
                debug!(count = entries.len(), "Listing complete");
                Ok(entries)
            }
            Err(e) => {
                error!(error = %e, "Listing aborted");
                metrics::counter!("catalog_listing_failures_total", "verb" => self.kind.verb())
                    .increment(1);
                Err(RestoreError::CatalogUnavailable(e.to_string()))
            }
        }
    }

    async fn fetch_pages(
        &self,
        console: &mut dyn ConsoleClient,
        job_ids: &str,
        path: &PathRef,
    ) -> Result<Vec<CatalogEntry>, ConsoleError> {
        let mut target = path.clone();
        let mut accumulated = Vec::new();
        let mut offset: u64 = 0;
        let mut fell_back = false;

        loop {
            let page = self.fetch_page(console, job_ids, &target, offset).await?;

            if page.is_empty() && offset == 0 && !fell_back && target != PathRef::LastResolved {
                warn!(path = ?target, "Path not cached yet, retrying with path=@");
                metrics::counter!("bvfs_fallbacks_total", "verb" => self.kind.verb()).increment(1);
                target = PathRef::LastResolved;
                fell_back = true;
                continue;
            }

            match self.kind {
                CatalogKind::Directory => {
                    let last = page.len() <= DIRECTORY_TERMINAL_LEN;
                    accumulated.extend(page.entries);
                    if last {
                        accumulated.retain(|entry: &CatalogEntry| !entry.is_pseudo());
                        return Ok(accumulated);
                    }
                }
                CatalogKind::File => {
                    if page.is_empty() {
                        return Ok(accumulated);
                    }
                    accumulated.extend(page.entries);
                }
            }

            offset += u64::from(self.limit);
        }
    }

    async fn fetch_page(
        &self,
        console: &mut dyn ConsoleClient,
        job_ids: &str,
        target: &PathRef,
        offset: u64,
    ) -> Result<CatalogPage, ConsoleError> {
        let command = self.command(job_ids, target, offset);
        let result = console::execute(console, &command).await?;
        let entries = self.parse_entries(result)?;

        debug!(offset = offset, rows = entries.len(), "Fetched page");
        Ok(CatalogPage {
            entries,
            requested_limit: self.limit,
            requested_offset: offset,
        })
    }

    fn parse_entries(&self, result: Value) -> Result<Vec<CatalogEntry>, ConsoleError> {
        let key = self.kind.result_key();
        let rows = match result {
            Value::Object(mut object) => match object.remove(key) {
                None | Some(Value::Null) => {
                    debug!(key = key, "Result carries no rows");
                    return Ok(Vec::new());
                }
                Some(Value::Array(rows)) => rows,
                Some(other) => {
                    return Err(ConsoleError::MalformedResponse(format!(
                        "{} is not a list: {}",
                        key, other
                    )))
                }
            },
            Value::Array(rows) if rows.is_empty() => return Ok(Vec::new()),
            other => {
                return Err(ConsoleError::MalformedResponse(format!(
                    "unexpected result shape: {}",
                    other
                )))
            }
        };

        rows.into_iter()
            .map(|row| CatalogEntry::from_value(self.kind, row))
            .collect()
    }
}
