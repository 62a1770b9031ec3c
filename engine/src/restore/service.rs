// Restore operations over scoped console connections
// Each public operation opens one connection and always releases it

use super::{
    BvfsCacheUpdater, DirectoryLister, FileLister, FileVersionLister, JobIdResolver,
    RestoreOptions, RestoreSession, RestoreSubmitter, TreeAssembler,
};
use crate::config::RestoreConfig;
use crate::console::{ConsoleClient, ConsoleConnector};
use crate::errors::RestoreError;
use crate::models::{
    CatalogEntry, FileVersion, JobIdSet, PathRef, RestoreResult, RestoreScope, RestoreSelection,
    TreeNode,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Entry point used by the UI layer for the whole restore flow
pub struct RestoreService {
    connector: Arc<dyn ConsoleConnector>,
    config: RestoreConfig,
    resolver: JobIdResolver,
    updater: BvfsCacheUpdater,
    directories: DirectoryLister,
    files: FileLister,
    tree: TreeAssembler,
    versions: FileVersionLister,
    submitter: RestoreSubmitter,
    options: RestoreOptions,
}

impl RestoreService {
    pub fn new(connector: Arc<dyn ConsoleConnector>, config: RestoreConfig) -> Self {
        Self {
            connector,
            directories: DirectoryLister::new(config.page_size),
            files: FileLister::new(config.page_size),
            config,
            resolver: JobIdResolver::new(),
            updater: BvfsCacheUpdater::new(),
            tree: TreeAssembler::new(),
            versions: FileVersionLister::new(),
            submitter: RestoreSubmitter::new(),
            options: RestoreOptions::new(),
        }
    }

    /// Validate `scope`, resolve its job ids and move the session to browsing.
    ///
    /// A malformed or empty resolution answer leaves the session browsing an
    /// empty job set ("no backups found"). A lost connection fails the call.
    #[instrument(skip(self, scope), fields(client = %scope.client, job_id = ?scope.job_id))]
    pub async fn open_session(&self, scope: RestoreScope) -> Result<RestoreSession, RestoreError> {
        let mut session = RestoreSession::new(scope)?;

        let mut console = self.connector.connect().await?;
        let job_ids = self.session_job_ids(console.as_mut(), session.scope()).await;
        release(console).await;

        session.begin_browsing(job_ids?)?;
        info!(job_ids = %session.job_ids(), "Restore session browsing");
        Ok(session)
    }

    async fn session_job_ids(
        &self,
        console: &mut dyn ConsoleClient,
        scope: &RestoreScope,
    ) -> Result<JobIdSet, RestoreError> {
        let seed = match scope.seed_job_id() {
            Some(id) => Some(id.to_string()),
            None => degrade(
                self.options
                    .latest_backup(console, &scope.client, scope.fileset.as_deref())
                    .await,
            )?
            .flatten(),
        };

        let Some(seed) = seed else {
            info!(client = %scope.client, "No backups found for client");
            return Ok(JobIdSet::new());
        };

        let job_ids = degrade(self.resolver.resolve(console, scope, &seed).await)?.unwrap_or_default();

        if self.config.update_cache_on_open && !job_ids.is_empty() {
            if let Err(e) = self.updater.update(console, Some(&job_ids.joined())).await {
                warn!(error = %e, "BVFS cache update failed, listings may fall back to path=@");
            }
        }

        Ok(job_ids)
    }

    /// List the children of a tree node (`None` or `#` for the root)
    #[instrument(skip(self, session), fields(job_ids = %session.job_ids()))]
    pub async fn browse(
        &self,
        session: &RestoreSession,
        node_id: Option<&str>,
    ) -> Result<Vec<TreeNode>, RestoreError> {
        session.ensure_browsing()?;
        if session.job_ids().is_empty() {
            return Ok(Vec::new());
        }

        let job_ids = session.job_ids().joined();
        let path = PathRef::from_node_id(node_id);

        let mut console = self.connector.connect().await?;
        let listed = self.list_node(console.as_mut(), &job_ids, &path).await;
        release(console).await;

        let (directories, files) = listed?;
        Ok(self.tree.assemble(directories, files))
    }

    async fn list_node(
        &self,
        console: &mut dyn ConsoleClient,
        job_ids: &str,
        path: &PathRef,
    ) -> Result<(Vec<CatalogEntry>, Vec<CatalogEntry>), RestoreError> {
        let directories = self.directories.list(console, job_ids, path).await?;
        let files = self.files.list(console, job_ids, path).await?;
        Ok((directories, files))
    }

    /// Stored versions of one file of the session's client
    #[instrument(skip(self, session))]
    pub async fn file_versions(
        &self,
        session: &RestoreSession,
        path_id: &str,
        file_name: &str,
    ) -> Result<Vec<FileVersion>, RestoreError> {
        session.ensure_browsing()?;

        let mut console = self.connector.connect().await?;
        let versions = self
            .versions
            .list(console.as_mut(), &session.scope().client, path_id, file_name)
            .await;
        release(console).await;
        versions
    }

    /// Submit the restore once and close the session as submitted or failed.
    ///
    /// A selection without job ids or without a client is refused before any
    /// connection is opened and leaves the session browsing.
    #[instrument(skip(self, session, selection), fields(client = %selection.client))]
    pub async fn submit(
        &self,
        session: &mut RestoreSession,
        selection: &RestoreSelection,
    ) -> Result<RestoreResult, RestoreError> {
        session.ensure_browsing()?;
        self.submitter.command(selection)?;
        session.begin_submit()?;

        let outcome = match self.connector.connect().await {
            Ok(mut console) => {
                let outcome = self.submitter.submit(console.as_mut(), selection).await;
                release(console).await;
                outcome
            }
            Err(e) => Err(e.into()),
        };

        session.finish_submit(outcome.is_ok())?;
        outcome
    }

    /// Refresh the BVFS cache for one job list, or for all jobs
    pub async fn update_cache(&self, job_id: Option<&str>) -> Result<(), RestoreError> {
        let mut console = self.connector.connect().await?;
        let outcome = self.updater.update(console.as_mut(), job_id).await;
        release(console).await;
        outcome
    }

    /// Resolve job ids without opening a session
    pub async fn resolve_job_ids(
        &self,
        scope: &RestoreScope,
        seed_job_id: &str,
    ) -> Result<JobIdSet, RestoreError> {
        let mut console = self.connector.connect().await?;
        let outcome = self.resolver.resolve(console.as_mut(), scope, seed_job_id).await;
        release(console).await;
        outcome
    }

    pub async fn clients(&self) -> Result<Vec<String>, RestoreError> {
        let mut console = self.connector.connect().await?;
        let outcome = self.options.clients(console.as_mut()).await;
        release(console).await;
        outcome
    }

    pub async fn restore_jobs(&self) -> Result<Vec<String>, RestoreError> {
        let mut console = self.connector.connect().await?;
        let outcome = self.options.restore_jobs(console.as_mut()).await;
        release(console).await;
        outcome
    }
}

/// Close a connection; a failed close is logged, never raised
async fn release(mut console: Box<dyn ConsoleClient>) {
    if let Err(e) = console.disconnect().await {
        warn!(error = %e, "Failed to close console connection");
    }
}

/// Turn a resolution failure into "nothing found", keep other errors
fn degrade<T>(outcome: Result<T, RestoreError>) -> Result<Option<T>, RestoreError> {
    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(RestoreError::ResolutionFailed(reason)) => {
            warn!(reason = %reason, "Job id resolution failed, continuing with no jobs");
            metrics::counter!("job_resolution_failures_total").increment(1);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::{ReplacePolicy, ScopeType};
    use crate::restore::testing::ScriptedConnector;
    use crate::restore::SessionState;

    fn scope(scope_type: ScopeType, job_id: Option<&str>) -> RestoreScope {
        RestoreScope {
            scope_type,
            client: "web-fd".to_string(),
            job_id: job_id.map(str::to_string),
            merge_filesets: false,
            merge_jobs: false,
            fileset: None,
            restore_job: "RestoreFiles".to_string(),
            restore_client: "web-fd".to_string(),
            where_path: "/tmp/bareos-restores".to_string(),
            replace: ReplacePolicy::Never,
        }
    }

    fn service(connector: &ScriptedConnector) -> RestoreService {
        RestoreService::new(Arc::new(connector.clone()), Settings::default().restore)
    }

    #[tokio::test]
    async fn test_open_session_resolves_and_updates_cache() {
        let connector = ScriptedConnector::new(vec![
            r#"{"result":{"jobids":[{"id":"10"},{"id":"12"}]}}"#,
            r#"{"result":{}}"#,
        ]);
        let session = service(&connector)
            .open_session(scope(ScopeType::SingleJob, Some("12")))
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Browsing);
        assert_eq!(session.job_ids().joined(), "10,12");
        assert_eq!(
            connector.console.commands(),
            vec![".bvfs_get_jobids jobid=12 all", ".bvfs_update jobid=10,12"]
        );
        assert_eq!(connector.console.connects(), 1);
        assert_eq!(connector.console.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_client_scope_seeds_from_latest_backup() {
        let connector = ScriptedConnector::new(vec![
            r#"{"result":{"backups":[{"jobid":"4"},{"jobid":"8"}]}}"#,
            r#"{"result":{"jobids":[{"id":"4"},{"id":"8"}]}}"#,
            r#"{"result":{}}"#,
        ]);
        let session = service(&connector)
            .open_session(scope(ScopeType::Client, None))
            .await
            .unwrap();

        assert_eq!(session.job_ids().joined(), "4,8");
        assert_eq!(connector.console.commands()[1], ".bvfs_get_jobids jobid=8 all");
    }

    #[tokio::test]
    async fn test_resolution_failure_degrades_to_empty_session() {
        let connector = ScriptedConnector::new(vec!["garbage"]);
        let service = service(&connector);
        let session = service
            .open_session(scope(ScopeType::SingleJob, Some("12")))
            .await
            .unwrap();

        assert!(session.job_ids().is_empty());
        assert!(service.browse(&session, None).await.unwrap().is_empty());
        assert_eq!(connector.console.connects(), 1);
        assert_eq!(connector.console.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_during_resolution_is_surfaced() {
        let connector = ScriptedConnector::default();
        connector.console.push_transport_error("connection reset by peer");

        let err = service(&connector)
            .open_session(scope(ScopeType::SingleJob, Some("12")))
            .await
            .unwrap_err();

        assert!(matches!(err, RestoreError::Console(ref e) if e.is_transport()));
        assert_eq!(
            connector.console.commands(),
            vec![".bvfs_get_jobids jobid=12 all"]
        );
        assert_eq!(connector.console.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_during_seed_lookup_is_surfaced() {
        let connector = ScriptedConnector::default();
        connector.console.push_transport_error("connection reset by peer");

        let err = service(&connector)
            .open_session(scope(ScopeType::Client, None))
            .await
            .unwrap_err();

        assert!(matches!(err, RestoreError::Console(ref e) if e.is_transport()));
        assert_eq!(connector.console.commands(), vec!["list backups client=web-fd"]);
    }

    #[tokio::test]
    async fn test_browse_releases_connection_on_failure() {
        let connector = ScriptedConnector::new(vec![
            r#"{"result":{"jobids":[{"id":"12"}]}}"#,
            r#"{"result":{}}"#,
        ]);
        let service = service(&connector);
        let session = service
            .open_session(scope(ScopeType::SingleJob, Some("12")))
            .await
            .unwrap();

        connector.console.push_transport_error("connection reset");
        let err = service.browse(&session, Some("-5")).await.unwrap_err();

        assert!(matches!(err, RestoreError::CatalogUnavailable(_)));
        assert_eq!(connector.console.connects(), 2);
        assert_eq!(connector.console.disconnects(), 2);
        assert_eq!(session.job_ids().joined(), "12");
    }

    #[tokio::test]
    async fn test_browse_assembles_tree() {
        let connector = ScriptedConnector::new(vec![
            r#"{"result":{"jobids":[{"id":"12"}]}}"#,
            r#"{"result":{}}"#,
            r#"{"result":{"directories":[{"name":"."},{"name":".."},{"pathid":7,"name":"etc/"}]}}"#,
            r#"{"result":{"directories":[]}}"#,
            r#"{"result":{"files":[{"fileid":7,"name":"passwd"}]}}"#,
            r#"{"result":{"files":[]}}"#,
        ]);
        let service = service(&connector);
        let session = service
            .open_session(scope(ScopeType::SingleJob, Some("12")))
            .await
            .unwrap();

        let nodes = service.browse(&session, Some("-3")).await.unwrap();
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["-7", "7"]);
        assert!(connector.console.commands()[2].contains("pathid=3"));
    }

    #[tokio::test]
    async fn test_submit_with_empty_job_ids_connects_nowhere() {
        let connector = ScriptedConnector::new(vec!["garbage"]);
        let service = service(&connector);
        let mut session = service
            .open_session(scope(ScopeType::SingleJob, Some("12")))
            .await
            .unwrap();

        let selection =
            RestoreSelection::from_checked_nodes(session.scope(), session.job_ids(), &["5"]);
        let err = service.submit(&mut session, &selection).await.unwrap_err();

        assert!(matches!(err, RestoreError::EmptyJobIdSet));
        assert_eq!(connector.console.connects(), 1);
        assert_eq!(session.state(), SessionState::Browsing);
    }

    #[tokio::test]
    async fn test_submit_without_client_keeps_browsing() {
        let connector = ScriptedConnector::new(vec![
            r#"{"result":{"jobids":[{"id":"12"}]}}"#,
            r#"{"result":{}}"#,
        ]);
        let service = service(&connector);
        let mut no_client = scope(ScopeType::SingleJob, Some("12"));
        no_client.client.clear();
        no_client.restore_client.clear();
        let mut session = service.open_session(no_client).await.unwrap();

        let selection =
            RestoreSelection::from_checked_nodes(session.scope(), session.job_ids(), &["-7"]);
        let err = service.submit(&mut session, &selection).await.unwrap_err();

        assert!(matches!(err, RestoreError::InvalidScope(_)));
        assert_eq!(session.state(), SessionState::Browsing);
        assert_eq!(connector.console.connects(), 1);
    }

    #[tokio::test]
    async fn test_rejected_submission_fails_session() {
        let connector = ScriptedConnector::new(vec![
            r#"{"result":{"jobids":[{"id":"12"}]}}"#,
            r#"{"result":{}}"#,
            r#"{"error":{"code":1,"message":"no storage"}}"#,
        ]);
        let service = service(&connector);
        let mut session = service
            .open_session(scope(ScopeType::SingleJob, Some("12")))
            .await
            .unwrap();

        let selection =
            RestoreSelection::from_checked_nodes(session.scope(), session.job_ids(), &["-7"]);
        let err = service.submit(&mut session, &selection).await.unwrap_err();

        assert!(matches!(err, RestoreError::SubmissionRejected(ref m) if m == "no storage"));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(connector.console.disconnects(), 2);
    }

    #[tokio::test]
    async fn test_refused_connection_surfaces_transport_error() {
        let connector = ScriptedConnector {
            refuse: true,
            ..Default::default()
        };
        let err = service(&connector).clients().await.unwrap_err();
        assert!(matches!(err, RestoreError::Console(ref e) if e.is_transport()));
    }
}
