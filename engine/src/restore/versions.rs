// Stored versions of a single file

use crate::console::{self, ConsoleClient, ConsoleCommand};
use crate::errors::{ConsoleError, RestoreError};
use crate::models::{field_as_string, FileVersion};
use serde_json::Value;
use tracing::{debug, instrument};

/// Lists every backed-up version of a file with `.bvfs_versions`
#[derive(Debug, Clone, Copy, Default)]
pub struct FileVersionLister;

impl FileVersionLister {
    pub fn new() -> Self {
        Self
    }

    pub fn command(&self, client: &str, path_id: &str, file_name: &str) -> ConsoleCommand {
        ConsoleCommand::new(".bvfs_versions")
            .arg("jobid", "0")
            .arg("client", client)
            .arg("pathid", path_id.trim().trim_start_matches('-'))
            .quoted_arg("fname", file_name)
    }

    #[instrument(skip(self, console))]
    pub async fn list(
        &self,
        console: &mut dyn ConsoleClient,
        client: &str,
        path_id: &str,
        file_name: &str,
    ) -> Result<Vec<FileVersion>, RestoreError> {
        let command = self.command(client, path_id, file_name);
        let result = console::execute(console, &command)
            .await
            .map_err(|e| RestoreError::CatalogUnavailable(e.to_string()))?;

        let versions =
            parse_versions(result).map_err(|e| RestoreError::CatalogUnavailable(e.to_string()))?;
        debug!(count = versions.len(), "Listed file versions");
        Ok(versions)
    }
}

fn parse_versions(result: Value) -> Result<Vec<FileVersion>, ConsoleError> {
    let rows = match result.get("versions") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows.clone(),
        Some(other) => {
            return Err(ConsoleError::MalformedResponse(format!(
                "versions is not a list: {}",
                other
            )))
        }
    };

    Ok(rows
        .into_iter()
        .map(|raw| FileVersion {
            file_id: field_as_string(&raw, "fileid").unwrap_or_default(),
            job_id: field_as_string(&raw, "jobid").unwrap_or_default(),
            raw,
        })
        .collect())
}
