// Lookups that populate the restore selection form

use crate::console::{self, ConsoleClient, ConsoleCommand};
use crate::errors::{ConsoleError, RestoreError};
use crate::models::field_as_string;
use serde_json::Value;
use tracing::{debug, instrument};

/// Client names, restore job names and seed backups known to the director
#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions;

impl RestoreOptions {
    pub fn new() -> Self {
        Self
    }

    /// Names of all clients (`list clients`)
    #[instrument(skip(self, console))]
    pub async fn clients(&self, console: &mut dyn ConsoleClient) -> Result<Vec<String>, RestoreError> {
        let result = console::execute(console, &ConsoleCommand::new("list").flag("clients")).await?;
        Ok(names(&result, "clients", "name")?)
    }

    /// Names of restore-type jobs (`.jobs type=R`)
    #[instrument(skip(self, console))]
    pub async fn restore_jobs(
        &self,
        console: &mut dyn ConsoleClient,
    ) -> Result<Vec<String>, RestoreError> {
        let command = ConsoleCommand::new(".jobs").arg("type", "R");
        let result = console::execute(console, &command).await?;
        Ok(names(&result, "jobs", "name")?)
    }

    /// Most recent backup job id of `client`, used as the seed of a client scope.
    ///
    /// Picks the highest numeric job id. `None` means the client has no backups.
    /// Transport failures are returned as `RestoreError::Console`.
    #[instrument(skip(self, console))]
    pub async fn latest_backup(
        &self,
        console: &mut dyn ConsoleClient,
        client: &str,
        fileset: Option<&str>,
    ) -> Result<Option<String>, RestoreError> {
        let command = ConsoleCommand::new("list")
            .flag("backups")
            .arg("client", client)
            .arg_opt("fileset", fileset.filter(|f| !f.trim().is_empty()));
        let result = console::execute(console, &command)
            .await
            .map_err(RestoreError::resolution)?;

        let job_ids = names(&result, "backups", "jobid").map_err(RestoreError::resolution)?;
        let latest = job_ids
            .iter()
            .filter_map(|id| id.parse::<u64>().ok().map(|n| (n, id)))
            .max_by_key(|(n, _)| *n)
            .map(|(_, id)| id.clone())
            .or_else(|| job_ids.last().cloned());

        debug!(backups = job_ids.len(), latest = ?latest, "Looked up client backups");
        Ok(latest)
    }
}

fn names(result: &Value, key: &str, field: &str) -> Result<Vec<String>, ConsoleError> {
    match result.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(rows)) => Ok(rows
            .iter()
            .filter_map(|row| field_as_string(row, field))
            .collect()),
        Some(other) => Err(ConsoleError::MalformedResponse(format!(
            "{} is not a list: {}",
            key, other
        ))),
    }
}
