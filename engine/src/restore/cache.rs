// BVFS cache population

use crate::console::{self, ConsoleClient, ConsoleCommand};
use crate::errors::RestoreError;
use tracing::{debug, instrument};

/// Asks the director to populate its BVFS cache
#[derive(Debug, Clone, Copy, Default)]
pub struct BvfsCacheUpdater;

impl BvfsCacheUpdater {
    pub fn new() -> Self {
        Self
    }

    /// Send `.bvfs_update`, for the given job ids or for all jobs.
    ///
    /// Only acceptance of the command is checked; listings tolerate a cache
    /// that is still being built.
    #[instrument(skip(self, console))]
    pub async fn update(
        &self,
        console: &mut dyn ConsoleClient,
        job_id: Option<&str>,
    ) -> Result<(), RestoreError> {
        let command = ConsoleCommand::new(".bvfs_update")
            .arg_opt("jobid", job_id.map(str::trim).filter(|id| !id.is_empty()));

        console::execute(console, &command).await?;
        debug!("BVFS cache update accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConsoleError;
    use crate::restore::testing::ScriptedConsole;

    #[tokio::test]
    async fn test_update_for_job_ids() {
        let mut console = ScriptedConsole::new(vec![r#"{"result":{}}"#]);
        BvfsCacheUpdater::new()
            .update(&mut console, Some("10,11"))
            .await
            .unwrap();
        assert_eq!(console.commands(), vec![".bvfs_update jobid=10,11"]);
    }

    #[tokio::test]
    async fn test_update_all_jobs() {
        let mut console = ScriptedConsole::new(vec![r#"{"result":{}}"#, r#"{"result":{}}"#]);
        let updater = BvfsCacheUpdater::new();
        updater.update(&mut console, None).await.unwrap();
        updater.update(&mut console, Some(" ")).await.unwrap();
        assert_eq!(console.commands(), vec![".bvfs_update", ".bvfs_update"]);
    }

    #[tokio::test]
    async fn test_rejected_update_surfaces_server_error() {
        let mut console = ScriptedConsole::new(vec![r#"{"error":{"code":1,"message":"denied"}}"#]);
        let err = BvfsCacheUpdater::new()
            .update(&mut console, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RestoreError::Console(ConsoleError::ServerError { .. })
        ));
    }
}
