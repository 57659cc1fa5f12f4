use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::{Address, AdminId, PluginId};

/// Role an admin plays in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminKind {
    /// Originates donations and owns them until they reach a project.
    Giver,
    /// Redirects pledges it has been granted without owning them.
    Delegate,
    /// Receives, holds, and withdraws funds. May be nested.
    Project,
}

impl fmt::Display for AdminKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Giver => "Giver",
            Self::Delegate => "Delegate",
            Self::Project => "Project",
        };
        f.write_str(s)
    }
}

/// Identity record for a giver, delegate, or project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub kind: AdminKind,
    /// Address allowed to act as this admin.
    pub controller: Address,
    pub name: String,
    pub url: String,
    /// How long a pledge must wait with this admin involved before a
    /// proposal to a project commits.
    pub commit_time: Duration,
    /// Parent project, for projects only.
    pub parent_project: Option<AdminId>,
    /// Set once; never cleared. Only projects can be canceled.
    pub canceled: bool,
    pub plugin: Option<PluginId>,
}

impl Admin {
    pub fn is_giver(&self) -> bool {
        self.kind == AdminKind::Giver
    }

    pub fn is_delegate(&self) -> bool {
        self.kind == AdminKind::Delegate
    }

    pub fn is_project(&self) -> bool {
        self.kind == AdminKind::Project
    }

    /// Returns `true` if `caller` controls this admin.
    pub fn is_controlled_by(&self, caller: &Address) -> bool {
        self.controller == *caller
    }
}

/// Metadata changes an admin's controller may apply.
///
/// `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUpdate {
    pub controller: Option<Address>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub commit_time: Option<Duration>,
}

impl AdminUpdate {
    /// Returns `true` if the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.controller.is_none()
            && self.name.is_none()
            && self.url.is_none()
            && self.commit_time.is_none()
    }

    /// Apply this update to `admin` in place.
    pub fn apply_to(&self, admin: &mut Admin) {
        if let Some(controller) = self.controller {
            admin.controller = controller;
        }
        if let Some(name) = &self.name {
            admin.name = name.clone();
        }
        if let Some(url) = &self.url {
            admin.url = url.clone();
        }
        if let Some(commit_time) = self.commit_time {
            admin.commit_time = commit_time;
        }
    }
}
