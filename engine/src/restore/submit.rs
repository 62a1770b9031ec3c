// Restore command submission

use crate::console::{self, ConsoleClient, ConsoleCommand};
use crate::errors::{ConsoleError, RestoreError};
use crate::models::{field_as_string, RestoreResult, RestoreSelection};
use tracing::{error, info, instrument};

/// Composes and sends the final `restore` command
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreSubmitter;

impl RestoreSubmitter {
    pub fn new() -> Self {
        Self
    }

    /// Build the restore command; fails locally without job ids or a client
    pub fn command(&self, sel: &RestoreSelection) -> Result<ConsoleCommand, RestoreError> {
        let Some(job_id) = sel.job_ids.last() else {
            return Err(RestoreError::EmptyJobIdSet);
        };
        if sel.client.trim().is_empty() {
            return Err(RestoreError::InvalidScope(
                "restore requires a client".to_string(),
            ));
        }

        let non_empty = |value: &str| Some(value.to_string()).filter(|v| !v.trim().is_empty());
        let joined = |ids: &[String]| Some(ids.join(",")).filter(|v| !v.is_empty());

        Ok(ConsoleCommand::new("restore")
            .arg("jobid", job_id)
            .arg("client", &sel.client)
            .arg_opt("restoreclient", non_empty(&sel.restore_client))
            .arg_opt("restorejob", non_empty(&sel.restore_job))
            .arg_opt("where", non_empty(&sel.where_path))
            .arg_opt("fileid", joined(&sel.file_ids))
            .arg_opt("dirid", joined(&sel.dir_ids))
            .arg("jobids", sel.job_ids.joined())
            .arg("replace", sel.replace.as_str())
            .flag("yes"))
    }

    /// Send the restore command once.
    ///
    /// Submission is not idempotent; a director error is returned verbatim
    /// as `SubmissionRejected` and never retried here.
    #[instrument(skip(self, console, sel), fields(client = %sel.client, job_ids = %sel.job_ids))]
    pub async fn submit(
        &self,
        console: &mut dyn ConsoleClient,
        sel: &RestoreSelection,
    ) -> Result<RestoreResult, RestoreError> {
        let command = self.command(sel)?;

        let result = match console::execute(console, &command).await {
            Ok(result) => result,
            Err(ConsoleError::ServerError { message, .. }) => {
                error!(message = %message, "Director rejected restore");
                metrics::counter!("restore_rejected_total").increment(1);
                return Err(RestoreError::SubmissionRejected(message));
            }
            Err(e) => {
                error!(error = %e, "Restore submission failed");
                metrics::counter!("restore_rejected_total").increment(1);
                return Err(e.into());
            }
        };

        let job_id = field_as_string(&result, "jobid");
        info!(restore_job_id = ?job_id, "Restore job submitted");
        metrics::counter!("restore_submitted_total").increment(1);

        Ok(RestoreResult {
            job_id,
            raw: result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MockConsoleClient;
    use crate::models::{JobIdSet, ReplacePolicy};
    use crate::restore::testing::ScriptedConsole;

    fn selection(job_ids: &str) -> RestoreSelection {
        RestoreSelection {
            job_ids: JobIdSet::parse(job_ids),
            file_ids: vec!["31".to_string(), "32".to_string()],
            dir_ids: vec!["7".to_string()],
            client: "web-fd".to_string(),
            restore_client: "web-fd".to_string(),
            restore_job: "RestoreFiles".to_string(),
            where_path: "/tmp/bareos-restores".to_string(),
            replace: ReplacePolicy::IfNewer,
        }
    }

    #[test]
    fn test_command_carries_all_arguments() {
        let cmd = RestoreSubmitter::new().command(&selection("10,11,12")).unwrap();
        assert_eq!(
            cmd.render(),
            "restore jobid=12 client=web-fd restoreclient=web-fd restorejob=RestoreFiles \
             where=/tmp/bareos-restores fileid=31,32 dirid=7 jobids=10,11,12 replace=ifnewer yes"
        );
    }

    #[test]
    fn test_empty_id_lists_are_omitted() {
        let mut sel = selection("5");
        sel.file_ids.clear();
        let rendered = RestoreSubmitter::new().command(&sel).unwrap().render();
        assert!(!rendered.contains("fileid="));
        assert!(rendered.contains("dirid=7"));
    }

    #[tokio::test]
    async fn test_empty_job_ids_rejected_without_protocol_call() {
        let mut console = MockConsoleClient::new();
        console.expect_send().times(0);

        let err = RestoreSubmitter::new()
            .submit(&mut console, &selection(""))
            .await
            .unwrap_err();
        assert!(matches!(err, RestoreError::EmptyJobIdSet));
    }

    #[tokio::test]
    async fn test_missing_client_rejected_without_protocol_call() {
        let mut console = MockConsoleClient::new();
        console.expect_send().times(0);

        let mut sel = selection("12");
        sel.client = " ".to_string();
        let err = RestoreSubmitter::new()
            .submit(&mut console, &sel)
            .await
            .unwrap_err();
        assert!(matches!(err, RestoreError::InvalidScope(_)));
    }

    #[tokio::test]
    async fn test_acknowledgement_returns_job_id() {
        let mut console = ScriptedConsole::new(vec![r#"{"result":{"jobid":"101"}}"#]);
        let result = RestoreSubmitter::new()
            .submit(&mut console, &selection("10,11,12"))
            .await
            .unwrap();
        assert_eq!(result.job_id.as_deref(), Some("101"));
        assert_eq!(console.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_rejected_verbatim_and_not_retried() {
        let mut console = ScriptedConsole::new(vec![
            r#"{"error":{"code":1,"message":"Restore client \"web-fd\" not found"}}"#,
            r#"{"result":{"jobid":"102"}}"#,
        ]);
        let err = RestoreSubmitter::new()
            .submit(&mut console, &selection("12"))
            .await
            .unwrap_err();

        match err {
            RestoreError::SubmissionRejected(message) => {
                assert_eq!(message, "Restore client \"web-fd\" not found")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(console.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let mut console = ScriptedConsole::new(vec![]);
        let err = RestoreSubmitter::new()
            .submit(&mut console, &selection("12"))
            .await
            .unwrap_err();
        assert!(matches!(err, RestoreError::Console(ConsoleError::Transport(_))));
    }
}
