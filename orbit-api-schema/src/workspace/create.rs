use serde::{Deserialize, Serialize};

/// Body of `POST /workspace` as it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceResponse {
    pub org_code: String,
    pub workspace_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyName => f.write_str("Workspace name is required"),
        }
    }
}

/// A create-workspace input that passed validation.
///
/// The only way to obtain one is [`WorkspaceInput::new`] (or `TryFrom` on the
/// wire request), so holding a value proves the name is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceInput {
    name: String,
}

impl WorkspaceInput {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_request(&self) -> CreateWorkspaceRequest {
        CreateWorkspaceRequest {
            name: self.name.clone(),
        }
    }
}

impl TryFrom<CreateWorkspaceRequest> for WorkspaceInput {
    type Error = ValidationError;

    fn try_from(request: CreateWorkspaceRequest) -> Result<Self, Self::Error> {
        WorkspaceInput::new(&request.name)
    }
}
