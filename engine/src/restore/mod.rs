// Restore navigation and resolution
// Job id resolution, BVFS listing, tree assembly and restore submission

mod cache;
mod listers;
mod options;
mod paginator;
mod resolver;
mod service;
mod session;
mod submit;
mod tree;
mod versions;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::BvfsCacheUpdater;
pub use listers::{DirectoryLister, FileLister};
pub use options::RestoreOptions;
pub use paginator::{CatalogPaginator, DEFAULT_PAGE_SIZE};
pub use resolver::JobIdResolver;
pub use service::RestoreService;
pub use session::{RestoreSession, SessionState};
pub use submit::RestoreSubmitter;
pub use tree::TreeAssembler;
pub use versions::FileVersionLister;
