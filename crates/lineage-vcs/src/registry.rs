//! Dispatch to the version control system responsible for a reference.

use std::path::Path;
use std::sync::Arc;

use lineage_core::VcsInfo;

use crate::error::VcsError;
use crate::{VersionControlSystem, WorkingTree};

/// Ordered set of [`VersionControlSystem`]s; the first applicable one wins.
#[derive(Debug, Clone, Default)]
pub struct VcsRegistry {
    systems: Vec<Arc<dyn VersionControlSystem>>,
}

impl VcsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, vcs: Arc<dyn VersionControlSystem>) -> Self {
        self.systems.push(vcs);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// The system for `vcs`: matched by type when the type is known,
    /// otherwise by URL.
    #[must_use]
    pub fn for_vcs(&self, vcs: &VcsInfo) -> Option<Arc<dyn VersionControlSystem>> {
        let by_type = (!vcs.vcs_type.is_unknown())
            .then(|| {
                self.systems
                    .iter()
                    .find(|system| system.vcs_type() == vcs.vcs_type)
            })
            .flatten();
        by_type
            .or_else(|| {
                self.systems
                    .iter()
                    .find(|system| system.is_applicable_url(&vcs.url))
            })
            .cloned()
    }

    /// Like [`VcsRegistry::for_vcs`] but failing when nothing applies.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::NoApplicableVcs`] if no registered system applies.
    pub fn require(&self, vcs: &VcsInfo) -> Result<Arc<dyn VersionControlSystem>, VcsError> {
        self.for_vcs(vcs)
            .ok_or_else(|| VcsError::NoApplicableVcs(vcs.url.clone()))
    }

    /// The working tree containing `path`, asking each system in turn.
    ///
    /// # Errors
    ///
    /// Propagates the first error a system reports.
    pub async fn for_directory(
        &self,
        path: &Path,
    ) -> Result<Option<Arc<dyn WorkingTree>>, VcsError> {
        for system in &self.systems {
            if let Some(tree) = system.for_directory(path).await? {
                return Ok(Some(tree));
            }
        }
        Ok(None)
    }
}
