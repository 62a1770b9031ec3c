// Directory and file listers over the shared paginator

use super::paginator::CatalogPaginator;
use crate::console::ConsoleClient;
use crate::errors::RestoreError;
use crate::models::{CatalogEntry, CatalogKind, PathRef};

/// Lists subdirectories with `.bvfs_lsdirs`
#[derive(Debug, Clone, Copy)]
pub struct DirectoryLister {
    paginator: CatalogPaginator,
}

impl DirectoryLister {
    pub fn new(page_size: u32) -> Self {
        Self {
            paginator: CatalogPaginator::new(CatalogKind::Directory, page_size),
        }
    }

    /// `job_ids` is a single job id or a comma-joined list
    pub async fn list(
        &self,
        console: &mut dyn ConsoleClient,
        job_ids: &str,
        path: &PathRef,
    ) -> Result<Vec<CatalogEntry>, RestoreError> {
        self.paginator.fetch_all(console, job_ids, path).await
    }
}

/// Lists files with `.bvfs_lsfiles`
#[derive(Debug, Clone, Copy)]
pub struct FileLister {
    paginator: CatalogPaginator,
}

impl FileLister {
    pub fn new(page_size: u32) -> Self {
        Self {
            paginator: CatalogPaginator::new(CatalogKind::File, page_size),
        }
    }

    /// `job_ids` is a single job id or a comma-joined list
    pub async fn list(
        &self,
        console: &mut dyn ConsoleClient,
        job_ids: &str,
        path: &PathRef,
    ) -> Result<Vec<CatalogEntry>, RestoreError> {
        self.paginator.fetch_all(console, job_ids, path).await
    }
}
