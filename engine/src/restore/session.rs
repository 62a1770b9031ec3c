// Restore session state
// Explicit session object instead of ambient per-user globals

use crate::errors::RestoreError;
use crate::models::{JobIdSet, RestoreScope};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Selecting,
    Browsing,
    Submitting,
    Submitted,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Selecting => "selecting",
            SessionState::Browsing => "browsing",
            SessionState::Submitting => "submitting",
            SessionState::Submitted => "submitted",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One user's restore flow: the scope, its resolved job ids and where it stands.
///
/// Scope and job ids are fixed once browsing starts; every tree expansion
/// reuses them.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreSession {
    scope: RestoreScope,
    job_ids: JobIdSet,
    state: SessionState,
}

impl RestoreSession {
    pub fn new(scope: RestoreScope) -> Result<Self, RestoreError> {
        scope.validate()?;
        Ok(Self {
            scope,
            job_ids: JobIdSet::new(),
            state: SessionState::Selecting,
        })
    }

    pub fn scope(&self) -> &RestoreScope {
        &self.scope
    }

    pub fn job_ids(&self) -> &JobIdSet {
        &self.job_ids
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Selecting → Browsing with the resolved job ids
    pub fn begin_browsing(&mut self, job_ids: JobIdSet) -> Result<(), RestoreError> {
        self.transition(SessionState::Selecting, SessionState::Browsing)?;
        self.job_ids = job_ids;
        Ok(())
    }

    /// Browsing may be repeated any number of times
    pub fn ensure_browsing(&self) -> Result<(), RestoreError> {
        if self.state == SessionState::Browsing {
            Ok(())
        } else {
            Err(self.invalid(SessionState::Browsing))
        }
    }

    /// Browsing → Submitting
    pub fn begin_submit(&mut self) -> Result<(), RestoreError> {
        self.transition(SessionState::Browsing, SessionState::Submitting)
    }

    /// Submitting → Submitted or Failed
    pub fn finish_submit(&mut self, succeeded: bool) -> Result<(), RestoreError> {
        let to = if succeeded {
            SessionState::Submitted
        } else {
            SessionState::Failed
        };
        self.transition(SessionState::Submitting, to)
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> Result<(), RestoreError> {
        if self.state != from {
            return Err(self.invalid(to));
        }
        self.state = to;
        Ok(())
    }

    fn invalid(&self, to: SessionState) -> RestoreError {
        RestoreError::InvalidState {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReplacePolicy, ScopeType};

    fn scope() -> RestoreScope {
        RestoreScope {
            scope_type: ScopeType::Client,
            client: "web-fd".to_string(),
            job_id: None,
            merge_filesets: true,
            merge_jobs: true,
            fileset: None,
            restore_job: "RestoreFiles".to_string(),
            restore_client: String::new(),
            where_path: "/tmp/bareos-restores".to_string(),
            replace: ReplacePolicy::Never,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = RestoreSession::new(scope()).unwrap();
        assert_eq!(session.state(), SessionState::Selecting);
        assert!(session.ensure_browsing().is_err());

        session.begin_browsing(JobIdSet::parse("10,11")).unwrap();
        assert!(session.ensure_browsing().is_ok());
        assert_eq!(session.job_ids().joined(), "10,11");

        session.begin_submit().unwrap();
        session.finish_submit(true).unwrap();
        assert_eq!(session.state(), SessionState::Submitted);
    }

    #[test]
    fn test_failed_submission_is_terminal() {
        let mut session = RestoreSession::new(scope()).unwrap();
        session.begin_browsing(JobIdSet::single("3")).unwrap();
        session.begin_submit().unwrap();
        session.finish_submit(false).unwrap();

        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.begin_submit().is_err());
        assert!(session.ensure_browsing().is_err());
    }

    #[test]
    fn test_cannot_browse_twice_from_selecting() {
        let mut session = RestoreSession::new(scope()).unwrap();
        session.begin_browsing(JobIdSet::single("3")).unwrap();
        let err = session.begin_browsing(JobIdSet::single("4")).unwrap_err();
        assert!(matches!(err, RestoreError::InvalidState { .. }));
        assert_eq!(session.job_ids().joined(), "3");
    }

    #[test]
    fn test_invalid_scope_is_rejected() {
        let mut bad = scope();
        bad.client.clear();
        assert!(RestoreSession::new(bad).is_err());
    }
}
