use serde::{Deserialize, Serialize};

use crate::user::{CurrentWorkspace, User};

/// Shown for organizations the provider returns without a name.
pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";
pub const DEFAULT_AVATAR: char = 'M';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl WorkspaceSummary {
    pub fn from_organization(code: String, name: Option<String>) -> Self {
        let avatar = avatar_for(name.as_deref()).to_string();
        let name = name.unwrap_or_else(|| DEFAULT_WORKSPACE_NAME.to_string());
        Self {
            id: code,
            name,
            avatar,
        }
    }
}

/// First character of the name, uppercased. Falls back to `'M'`.
pub fn avatar_for(name: Option<&str>) -> char {
    name.and_then(|name| name.chars().next())
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or(DEFAULT_AVATAR)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWorkspacesResponse {
    pub workspaces: Vec<WorkspaceSummary>,
    pub user: User,
    pub current_workspace: CurrentWorkspace,
}
