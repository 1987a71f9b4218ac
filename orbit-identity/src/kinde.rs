use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime},
};

use orbit_common::clock::Clock;
use serde::{Deserialize, Serialize};

use crate::*;

/// Management tokens are renewed this long before the provider expires them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct ManagementToken {
    access_token: String,
    expires_at: SystemTime,
}

/// Kinde-style identity provider reached over HTTP.
///
/// Organization writes go through the management API with a client-credentials
/// token; session lookups use the caller's own access token.
#[derive(Clone)]
pub struct KindeIdentityProvider {
    issuer_url: String,
    client_id: String,
    client_secret: String,
    agent: ureq::Agent,
    clock: Clock,
    management_token: Arc<Mutex<Option<ManagementToken>>>,
}

impl std::fmt::Debug for KindeIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindeIdentityProvider")
            .field("issuer_url", &self.issuer_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct CreateOrganizationBody<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateOrganizationReply {
    organization: Option<CreatedOrganization>,
}

impl CreateOrganizationReply {
    /// An empty code is as good as none.
    fn org_code(self) -> Option<String> {
        self.organization
            .and_then(|org| org.code)
            .filter(|code| !code.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedOrganization {
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct AddOrganizationUsersBody<'a> {
    users: &'a [OrganizationUserBody<'a>],
}

#[derive(Debug, Serialize)]
struct OrganizationUserBody<'a> {
    id: &'a str,
    roles: &'a [String],
}

#[derive(Debug, Deserialize)]
struct UserProfileReply {
    id: Option<String>,
    sub: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

impl UserProfileReply {
    /// Kinde sends the user id as `id`, `sub` or both.
    fn into_user(self) -> Result<IdentityUser, IdentityProviderError> {
        let id = self
            .id
            .or(self.sub)
            .filter(|id| !id.is_empty())
            .ok_or(IdentityProviderError::MalformedReply("user id"))?;
        Ok(IdentityUser {
            id,
            given_name: self.given_name,
            family_name: self.family_name,
            email: self.email,
            picture: self.picture,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserReply {
    organizations: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OrganizationReply {
    code: String,
    name: Option<String>,
}

fn ureq_error(e: ureq::Error) -> IdentityProviderError {
    IdentityProviderError::Ureq(Box::new(e))
}

fn io_error(e: std::io::Error) -> IdentityProviderError {
    IdentityProviderError::IO(Box::new(e))
}

fn is_unauthorized(e: &ureq::Error) -> bool {
    matches!(e, ureq::Error::Status(401 | 403, _))
}

impl KindeIdentityProvider {
    pub fn new(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        timeout: Duration,
        clock: Clock,
    ) -> Self {
        let mut issuer_url = issuer_url;
        if issuer_url.ends_with('/') {
            issuer_url.pop();
        }
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            issuer_url,
            client_id,
            client_secret,
            agent,
            clock,
            management_token: Arc::new(Mutex::new(None)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.issuer_url, path)
    }

    fn management_token(&self) -> Result<String, IdentityProviderError> {
        let mut cached = self
            .management_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref() {
            if !self.clock.has_passed(token.expires_at) {
                return Ok(token.access_token.clone());
            }
        }

        log::debug!("requesting management token from {}", self.issuer_url);
        let audience = self.url("/api");
        let reply: TokenReply = self
            .agent
            .post(&self.url("/oauth2/token"))
            .send_form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("audience", audience.as_str()),
            ])
            .map_err(ureq_error)?
            .into_json()
            .map_err(io_error)?;

        let lifetime = Duration::from_secs(reply.expires_in.unwrap_or(0))
            .saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(ManagementToken {
            access_token: reply.access_token.clone(),
            expires_at: self.clock.deadline_after(lifetime),
        });
        Ok(reply.access_token)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    fn organization_name(
        &self,
        management_token: &str,
        org_code: &str,
    ) -> Result<Option<String>, IdentityProviderError> {
        let reply: OrganizationReply = self
            .agent
            .get(&self.url("/api/v1/organization"))
            .query("code", org_code)
            .set("Authorization", &Self::bearer(management_token))
            .call()
            .map_err(ureq_error)?
            .into_json()
            .map_err(io_error)?;
        if reply.code != org_code {
            log::warn!("asked for organization {org_code}, provider answered {}", reply.code);
        }
        Ok(reply.name)
    }
}

impl IdentityProviderTrait for KindeIdentityProvider {
    fn create_organization(
        &self,
        request: CreateOrganizationRequest,
    ) -> Result<CreateOrganizationResponse, IdentityProviderError> {
        let token = self.management_token()?;
        let reply: CreateOrganizationReply = self
            .agent
            .post(&self.url("/api/v1/organization"))
            .set("Authorization", &Self::bearer(&token))
            .send_json(CreateOrganizationBody {
                name: &request.name,
            })
            .map_err(ureq_error)?
            .into_json()
            .map_err(io_error)?;
        Ok(CreateOrganizationResponse {
            org_code: reply.org_code(),
        })
    }

    fn add_organization_users(
        &self,
        request: AddOrganizationUsersRequest,
    ) -> Result<AddOrganizationUsersResponse, IdentityProviderError> {
        let token = self.management_token()?;
        let users: Vec<OrganizationUserBody> = request
            .users
            .iter()
            .map(|user| OrganizationUserBody {
                id: &user.id,
                roles: &user.roles,
            })
            .collect();
        self.agent
            .post(&self.url(&format!("/api/v1/organizations/{}/users", request.org_code)))
            .set("Authorization", &Self::bearer(&token))
            .send_json(AddOrganizationUsersBody { users: &users })
            .map_err(ureq_error)?;
        Ok(AddOrganizationUsersResponse {})
    }

    fn delete_organization(
        &self,
        request: DeleteOrganizationRequest,
    ) -> Result<DeleteOrganizationResponse, IdentityProviderError> {
        let token = self.management_token()?;
        match self
            .agent
            .delete(&self.url(&format!("/api/v1/organization/{}", request.org_code)))
            .set("Authorization", &Self::bearer(&token))
            .call()
        {
            Ok(_) => Ok(DeleteOrganizationResponse {}),
            Err(ureq::Error::Status(404, _)) => Err(IdentityProviderError::OrganizationNotFound),
            Err(e) => Err(ureq_error(e)),
        }
    }

    fn get_session(
        &self,
        request: GetSessionRequest,
    ) -> Result<GetSessionResponse, IdentityProviderError> {
        let res = self
            .agent
            .get(&self.url("/oauth2/v2/user_profile"))
            .set("Authorization", &Self::bearer(&request.tokens.access_token))
            .call();
        let profile: UserProfileReply = match res {
            Ok(res) => res.into_json().map_err(io_error)?,
            Err(e) if is_unauthorized(&e) => return Ok(GetSessionResponse::NotFound),
            Err(e) => return Err(ureq_error(e)),
        };
        Ok(GetSessionResponse::Found {
            user: profile.into_user()?,
            // The profile endpoint does not carry the active organization.
            org_code: None,
        })
    }

    fn get_user_organizations(
        &self,
        request: GetUserOrganizationsRequest,
    ) -> Result<GetUserOrganizationsResponse, IdentityProviderError> {
        let token = self.management_token()?;
        let res = self
            .agent
            .get(&self.url("/api/v1/user"))
            .query("id", &request.user_id)
            .query("expand", "organizations")
            .set("Authorization", &Self::bearer(&token))
            .call();
        let user: UserReply = match res {
            Ok(res) => res.into_json().map_err(io_error)?,
            Err(ureq::Error::Status(404, _)) => return Ok(GetUserOrganizationsResponse::NotFound),
            Err(e) => return Err(ureq_error(e)),
        };
        let Some(codes) = user.organizations else {
            return Ok(GetUserOrganizationsResponse::NotFound);
        };

        let mut organizations = Vec::with_capacity(codes.len());
        for code in codes {
            let name = self.organization_name(&token, &code)?;
            organizations.push(IdentityOrganization { code, name });
        }
        Ok(GetUserOrganizationsResponse::Found { organizations })
    }

    fn refresh_tokens(
        &self,
        request: RefreshTokensRequest,
    ) -> Result<RefreshTokensResponse, IdentityProviderError> {
        let refresh_token = request
            .tokens
            .refresh_token
            .ok_or(IdentityProviderError::MissingRefreshToken)?;
        let res = self
            .agent
            .post(&self.url("/oauth2/token"))
            .send_form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ]);
        let reply: TokenReply = match res {
            Ok(res) => res.into_json().map_err(io_error)?,
            Err(ureq::Error::Status(400 | 401, _)) => {
                return Err(IdentityProviderError::InvalidRefreshToken)
            }
            Err(e) => return Err(ureq_error(e)),
        };
        Ok(RefreshTokensResponse {
            tokens: SessionTokens {
                access_token: reply.access_token,
                // Providers that do not rotate refresh tokens omit it from the reply.
                refresh_token: reply.refresh_token.or(Some(refresh_token)),
            },
        })
    }
}
