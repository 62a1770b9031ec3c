// Job id resolution for a restore scope

use crate::console::{self, ConsoleClient, ConsoleCommand};
use crate::errors::RestoreError;
use crate::models::{JobIdSet, RestoreScope};
use serde_json::Value;
use tracing::{debug, instrument};

/// Determines which backup jobs participate in a restore
#[derive(Debug, Clone, Copy, Default)]
pub struct JobIdResolver;

impl JobIdResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the job ids for `scope`, expanding from `seed_job_id`.
    ///
    /// With both merge options set the seed is authoritative and no command
    /// is sent. Otherwise `.bvfs_get_jobids` expands the lineage, across all
    /// filesets unless `merge_filesets` is set. An empty server answer is an
    /// empty set, not an error. A lost connection is returned as is.
    #[instrument(skip(self, console, scope), fields(client = %scope.client))]
    pub async fn resolve(
        &self,
        console: &mut dyn ConsoleClient,
        scope: &RestoreScope,
        seed_job_id: &str,
    ) -> Result<JobIdSet, RestoreError> {
        if scope.merge_filesets && scope.merge_jobs {
            debug!(job_id = %seed_job_id, "Both merges requested, using seed job id as is");
            return Ok(JobIdSet::single(seed_job_id));
        }

        let command = ConsoleCommand::new(".bvfs_get_jobids")
            .arg("jobid", seed_job_id)
            .flag_if(!scope.merge_filesets, "all");

        let result = console::execute(console, &command)
            .await
            .map_err(RestoreError::resolution)?;
        let job_ids = parse_job_ids(&result)?;

        debug!(job_ids = %job_ids, count = job_ids.len(), "Resolved job ids");
        Ok(job_ids)
    }
}

fn parse_job_ids(result: &Value) -> Result<JobIdSet, RestoreError> {
    let Some(entries) = result.get("jobids").filter(|v| !v.is_null()) else {
        return Ok(JobIdSet::new());
    };
    let entries = entries.as_array().ok_or_else(|| {
        RestoreError::ResolutionFailed(format!("jobids is not a list: {}", entries))
    })?;

    entries
        .iter()
        .map(|entry| {
            crate::models::field_as_string(entry, "id").ok_or_else(|| {
                RestoreError::ResolutionFailed(format!("job entry without id: {}", entry))
            })
        })
        .collect()
}
