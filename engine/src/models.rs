// Core data models for restore navigation and submission

use crate::errors::{ConsoleError, RestoreError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How the restore was scoped in the selection form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    /// Restore from the backups of a client
    Client,
    /// Restore from one chosen job
    #[serde(rename = "job")]
    SingleJob,
}

/// Overwrite rule applied on the restore target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacePolicy {
    Always,
    Never,
    IfOlder,
    IfNewer,
}

impl ReplacePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplacePolicy::Always => "always",
            ReplacePolicy::Never => "never",
            ReplacePolicy::IfOlder => "ifolder",
            ReplacePolicy::IfNewer => "ifnewer",
        }
    }
}

impl fmt::Display for ReplacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(ReplacePolicy::Always),
            "never" => Ok(ReplacePolicy::Never),
            "ifolder" => Ok(ReplacePolicy::IfOlder),
            "ifnewer" => Ok(ReplacePolicy::IfNewer),
            other => Err(format!("unknown replace policy '{}'", other)),
        }
    }
}

/// User-chosen restore parameters, fixed once browsing starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreScope {
    pub scope_type: ScopeType,
    pub client: String,
    pub job_id: Option<String>,
    pub merge_filesets: bool,
    pub merge_jobs: bool,
    pub fileset: Option<String>,
    pub restore_job: String,
    pub restore_client: String,
    pub where_path: String,
    pub replace: ReplacePolicy,
}

impl RestoreScope {
    /// Check the invariants a scope must hold before any console round-trip
    pub fn validate(&self) -> Result<(), RestoreError> {
        match self.scope_type {
            ScopeType::Client if self.client.trim().is_empty() => Err(
                RestoreError::InvalidScope("client scope requires a client name".to_string()),
            ),
            ScopeType::SingleJob if self.seed_job_id().is_none() => Err(
                RestoreError::InvalidScope("job scope requires a job id".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Job id supplied by the user, if any
    pub fn seed_job_id(&self) -> Option<&str> {
        self.job_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Ordered, deduplicated job ids considered jointly for one restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct JobIdSet(Vec<String>);

impl JobIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(job_id: impl Into<String>) -> Self {
        Self(vec![job_id.into()])
    }

    /// Parse a comma-joined list as the protocol carries it
    pub fn parse(joined: &str) -> Self {
        joined.split(',').collect()
    }

    pub fn push(&mut self, job_id: impl Into<String>) {
        let job_id = job_id.into();
        let job_id = job_id.trim();
        if !job_id.is_empty() && !self.0.iter().any(|existing| existing == job_id) {
            self.0.push(job_id.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Most recent job of the lineage; the director lists lineages oldest first
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Comma-joined form used by `jobid=` and `jobids=` arguments
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl<S: Into<String>> FromIterator<S> for JobIdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = JobIdSet::new();
        for id in iter {
            set.push(id);
        }
        set
    }
}

impl From<Vec<String>> for JobIdSet {
    fn from(job_ids: Vec<String>) -> Self {
        job_ids.into_iter().collect()
    }
}

impl fmt::Display for JobIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Location of a directory to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRef {
    /// Root of the backup, not yet resolved to a path id (`path=`)
    Root,
    /// Catalog path id, always non-negative on the wire (`pathid=`)
    PathId(String),
    /// Whatever the director last resolved for the job root (`path=@`)
    LastResolved,
}

impl PathRef {
    /// Interpret a tree node id coming back from the UI.
    ///
    /// `None`, empty and `#` address the root; directory nodes carry a
    /// leading `-` which is dropped so the protocol only sees the absolute id.
    pub fn from_node_id(node_id: Option<&str>) -> Self {
        match node_id.map(str::trim) {
            None | Some("") | Some("#") => PathRef::Root,
            Some("@") => PathRef::LastResolved,
            Some(id) => {
                let id = id.trim_start_matches('-');
                if id.is_empty() {
                    PathRef::Root
                } else {
                    PathRef::PathId(id.to_string())
                }
            }
        }
    }
}

/// Which BVFS listing a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Directory,
    File,
}

impl CatalogKind {
    pub fn verb(&self) -> &'static str {
        match self {
            CatalogKind::Directory => ".bvfs_lsdirs",
            CatalogKind::File => ".bvfs_lsfiles",
        }
    }

    pub fn result_key(&self) -> &'static str {
        match self {
            CatalogKind::Directory => "directories",
            CatalogKind::File => "files",
        }
    }
}

/// One row of a BVFS listing
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEntry {
    Directory {
        path_id: String,
        name: String,
        raw: Value,
    },
    File {
        file_id: String,
        name: String,
        raw: Value,
    },
}

impl CatalogEntry {
    /// Build an entry from a listing row. Ids may arrive as numbers or strings.
    pub fn from_value(kind: CatalogKind, raw: Value) -> Result<Self, ConsoleError> {
        if !raw.is_object() {
            return Err(ConsoleError::MalformedResponse(format!(
                "{} entry is not an object: {}",
                kind.result_key(),
                raw
            )));
        }
        let name = field_as_string(&raw, "name").unwrap_or_default();
        Ok(match kind {
            CatalogKind::Directory => CatalogEntry::Directory {
                path_id: field_as_string(&raw, "pathid").unwrap_or_default(),
                name,
                raw,
            },
            CatalogKind::File => CatalogEntry::File {
                file_id: field_as_string(&raw, "fileid").unwrap_or_default(),
                name,
                raw,
            },
        })
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Directory { name, .. } | CatalogEntry::File { name, .. } => name,
        }
    }

    /// `.` and `..` rows BVFS adds to every cached directory
    pub fn is_pseudo(&self) -> bool {
        matches!(
            self,
            CatalogEntry::Directory { name, .. } if name == "." || name == ".."
        )
    }
}

/// Read a scalar field as text, accepting numbers and strings
pub(crate) fn field_as_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One round-trip worth of listing rows
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntry>,
    pub requested_limit: u32,
    pub requested_offset: u64,
}

impl CatalogPage {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// Node of the lazily expanded restore tree.
///
/// Serializes to the tree widget shape `{id, text, icon, state, data, children?}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub has_children: bool,
    pub payload: Value,
}

impl TreeNode {
    pub fn icon(&self) -> &'static str {
        match self.kind {
            NodeKind::Directory => "glyphicon glyphicon-folder-close",
            NodeKind::File => "glyphicon glyphicon-file",
        }
    }
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.has_children { 6 } else { 5 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("text", &self.label)?;
        map.serialize_entry("icon", self.icon())?;
        map.serialize_entry(
            "state",
            &serde_json::json!({ "opened": false, "selected": false }),
        )?;
        map.serialize_entry("data", &self.payload)?;
        if self.has_children {
            map.serialize_entry("children", &true)?;
        }
        map.end()
    }
}

/// Everything needed to issue one restore command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreSelection {
    pub job_ids: JobIdSet,
    pub file_ids: Vec<String>,
    pub dir_ids: Vec<String>,
    pub client: String,
    pub restore_client: String,
    pub restore_job: String,
    pub where_path: String,
    pub replace: ReplacePolicy,
}

impl RestoreSelection {
    /// Build a selection from checked tree node ids.
    ///
    /// Ids with a leading `-` are directories and lose the sign, the rest are files.
    pub fn from_checked_nodes<S: AsRef<str>>(
        scope: &RestoreScope,
        job_ids: &JobIdSet,
        checked: &[S],
    ) -> Self {
        let mut file_ids = Vec::new();
        let mut dir_ids = Vec::new();
        for id in checked.iter().map(|id| id.as_ref().trim()) {
            match id.strip_prefix('-') {
                Some(dir) if !dir.is_empty() => dir_ids.push(dir.to_string()),
                Some(_) => {}
                None if !id.is_empty() && id != "#" => file_ids.push(id.to_string()),
                None => {}
            }
        }

        Self {
            job_ids: job_ids.clone(),
            file_ids,
            dir_ids,
            client: scope.client.clone(),
            restore_client: if scope.restore_client.is_empty() {
                scope.client.clone()
            } else {
                scope.restore_client.clone()
            },
            restore_job: scope.restore_job.clone(),
            where_path: scope.where_path.clone(),
            replace: scope.replace,
        }
    }
}

/// Director acknowledgement of a restore submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreResult {
    pub job_id: Option<String>,
    pub raw: Value,
}

/// One stored version of a file as reported by `.bvfs_versions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileVersion {
    pub file_id: String,
    pub job_id: String,
    pub raw: Value,
}
