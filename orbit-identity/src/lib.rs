use std::fmt::Debug;

pub mod kinde;
pub mod memory;
pub mod provider;

/// Tokens identifying one signed-in browser or CLI session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityOrganization {
    pub code: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationUser {
    pub id: String,
    pub roles: Vec<String>,
}

#[derive(Debug)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

#[derive(Debug)]
pub struct CreateOrganizationResponse {
    /// `None` when the provider acknowledged the call but returned no code.
    pub org_code: Option<String>,
}

#[derive(Debug)]
pub struct AddOrganizationUsersRequest {
    pub org_code: String,
    pub users: Vec<OrganizationUser>,
}

#[derive(Debug)]
pub struct AddOrganizationUsersResponse {}

#[derive(Debug)]
pub struct DeleteOrganizationRequest {
    pub org_code: String,
}

#[derive(Debug)]
pub struct DeleteOrganizationResponse {}

#[derive(Debug)]
pub struct GetSessionRequest {
    pub tokens: SessionTokens,
}

#[derive(Debug)]
pub enum GetSessionResponse {
    Found {
        user: IdentityUser,
        /// Organization carried by the session itself, if the provider tracks one.
        org_code: Option<String>,
    },
    NotFound,
}

#[derive(Debug)]
pub struct GetUserOrganizationsRequest {
    pub tokens: SessionTokens,
    pub user_id: String,
}

#[derive(Debug)]
pub enum GetUserOrganizationsResponse {
    Found {
        organizations: Vec<IdentityOrganization>,
    },
    NotFound,
}

#[derive(Debug)]
pub struct RefreshTokensRequest {
    pub tokens: SessionTokens,
}

#[derive(Debug)]
pub struct RefreshTokensResponse {
    pub tokens: SessionTokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityOperation {
    CreateOrganization,
    AddOrganizationUsers,
    DeleteOrganization,
    GetSession,
    GetUserOrganizations,
    RefreshTokens,
}

#[derive(Debug)]
pub enum IdentityProviderError {
    Ureq(Box<ureq::Error>),
    IO(Box<std::io::Error>),
    OrganizationNotFound,
    MissingRefreshToken,
    InvalidRefreshToken,
    /// The provider answered with a body that lacks a required field.
    MalformedReply(&'static str),
    Unavailable(IdentityOperation),
}

impl std::fmt::Display for IdentityProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityProviderError::Ureq(e) => write!(f, "identity provider request failed: {e}"),
            IdentityProviderError::IO(e) => write!(f, "identity provider reply unreadable: {e}"),
            IdentityProviderError::OrganizationNotFound => f.write_str("organization not found"),
            IdentityProviderError::MissingRefreshToken => {
                f.write_str("session has no refresh token")
            }
            IdentityProviderError::InvalidRefreshToken => f.write_str("refresh token rejected"),
            IdentityProviderError::MalformedReply(field) => {
                write!(f, "identity provider reply has no {field}")
            }
            IdentityProviderError::Unavailable(op) => {
                write!(f, "identity provider unavailable during {op:?}")
            }
        }
    }
}

/// Calls this system makes against the external identity provider.
///
/// Every call is blocking; the server runs them on its blocking pool.
pub trait IdentityProviderTrait: Debug {
    fn create_organization(
        &self,
        request: CreateOrganizationRequest,
    ) -> Result<CreateOrganizationResponse, IdentityProviderError>;

    fn add_organization_users(
        &self,
        request: AddOrganizationUsersRequest,
    ) -> Result<AddOrganizationUsersResponse, IdentityProviderError>;

    fn delete_organization(
        &self,
        request: DeleteOrganizationRequest,
    ) -> Result<DeleteOrganizationResponse, IdentityProviderError>;

    fn get_session(
        &self,
        request: GetSessionRequest,
    ) -> Result<GetSessionResponse, IdentityProviderError>;

    fn get_user_organizations(
        &self,
        request: GetUserOrganizationsRequest,
    ) -> Result<GetUserOrganizationsResponse, IdentityProviderError>;

    fn refresh_tokens(
        &self,
        request: RefreshTokensRequest,
    ) -> Result<RefreshTokensResponse, IdentityProviderError>;
}
