use std::time::Duration;

use serde::{Deserialize, Serialize};

use lp_types::{Address, Admin, AdminId, AdminKind, AdminUpdate, PluginId};

use crate::error::{LedgerError, LedgerResult};

/// Descriptive fields supplied when registering an admin.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminProfile {
    pub name: String,
    pub url: String,
    /// Commit window, in seconds when read from a scenario file.
    #[serde(with = "duration_secs")]
    pub commit_time: Duration,
    pub plugin: Option<PluginId>,
}

impl AdminProfile {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_commit_time(mut self, commit_time: Duration) -> Self {
        self.commit_time = commit_time;
        self
    }

    pub fn with_plugin(mut self, plugin: PluginId) -> Self {
        self.plugin = Some(plugin);
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

/// Arena of admin records. Ids are assigned sequentially from 1.
#[derive(Clone, Debug, Default)]
pub struct AdminRegistry {
    admins: Vec<Admin>,
}

impl AdminRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered admins.
    pub fn count(&self) -> usize {
        self.admins.len()
    }

    pub fn get(&self, id: AdminId) -> LedgerResult<&Admin> {
        id.index()
            .and_then(|i| self.admins.get(i))
            .ok_or(LedgerError::AdminNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Admin> {
        self.admins.iter()
    }

    /// Register an admin after validating its parent project.
    ///
    /// The parent must exist, be a project, and not be canceled, and the new
    /// project must not nest deeper than `max_project_depth`.
    pub fn insert(
        &mut self,
        kind: AdminKind,
        controller: Address,
        profile: AdminProfile,
        parent_project: Option<AdminId>,
        max_project_depth: usize,
    ) -> LedgerResult<AdminId> {
        if let Some(parent) = parent_project {
            if kind != AdminKind::Project {
                return Err(LedgerError::InvalidState(format!(
                    "only projects can have a parent project, not a {kind}"
                )));
            }
            let parent_admin = self.get(parent)?;
            if !parent_admin.is_project() {
                return Err(LedgerError::WrongAdminKind {
                    id: parent,
                    expected: AdminKind::Project,
                    actual: parent_admin.kind,
                });
            }
            if let Some(canceled) = self.canceled_in_lineage(parent, max_project_depth)? {
                return Err(LedgerError::ProjectCanceled(canceled));
            }
            let depth = self.project_depth(parent, max_project_depth)?;
            if depth + 1 > max_project_depth {
                return Err(LedgerError::DepthExceeded {
                    limit: max_project_depth,
                });
            }
        }

        let id = AdminId::from_index(self.admins.len());
        self.admins.push(Admin {
            id,
            kind,
            controller,
            name: profile.name,
            url: profile.url,
            commit_time: profile.commit_time,
            parent_project,
            canceled: false,
            plugin: profile.plugin,
        });
        Ok(id)
    }

    /// `id` followed by its ancestor projects, nearest first.
    ///
    /// Walks at most `limit` records; a longer ancestry is reported as
    /// `DepthExceeded`.
    pub fn lineage(&self, id: AdminId, limit: usize) -> LedgerResult<Vec<AdminId>> {
        let mut lineage = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if lineage.len() == limit {
                return Err(LedgerError::DepthExceeded { limit });
            }
            lineage.push(current);
            cursor = self.get(current)?.parent_project;
        }
        Ok(lineage)
    }

    /// Nesting depth of a project; root projects have depth 1.
    pub fn project_depth(&self, id: AdminId, limit: usize) -> LedgerResult<usize> {
        Ok(self.lineage(id, limit)?.len())
    }

    /// The first canceled project among `id` and its ancestors, if any.
    ///
    /// Givers and delegates are never canceled.
    pub fn canceled_in_lineage(
        &self,
        id: AdminId,
        limit: usize,
    ) -> LedgerResult<Option<AdminId>> {
        for admin in self.lineage(id, limit)? {
            if self.get(admin)?.canceled {
                return Ok(Some(admin));
            }
        }
        Ok(None)
    }

    pub fn is_canceled(&self, id: AdminId, limit: usize) -> LedgerResult<bool> {
        Ok(self.canceled_in_lineage(id, limit)?.is_some())
    }

    /// Returns `true` if `caller` controls `id` or one of its ancestors.
    pub fn is_controlled_in_lineage(
        &self,
        id: AdminId,
        caller: &Address,
        limit: usize,
    ) -> LedgerResult<bool> {
        for admin in self.lineage(id, limit)? {
            if self.get(admin)?.is_controlled_by(caller) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Mark a project canceled. Cancellation is permanent.
    pub fn cancel(&mut self, id: AdminId) -> LedgerResult<()> {
        let admin = self.get_mut(id)?;
        if !admin.is_project() {
            return Err(LedgerError::WrongAdminKind {
                id,
                expected: AdminKind::Project,
                actual: admin.kind,
            });
        }
        if admin.canceled {
            return Err(LedgerError::AlreadyCanceled(id));
        }
        admin.canceled = true;
        Ok(())
    }

    pub fn update(&mut self, id: AdminId, update: &AdminUpdate) -> LedgerResult<()> {
        update.apply_to(self.get_mut(id)?);
        Ok(())
    }

    fn get_mut(&mut self, id: AdminId) -> LedgerResult<&mut Admin> {
        id.index()
            .and_then(|i| self.admins.get_mut(i))
            .ok_or(LedgerError::AdminNotFound(id))
    }
}
