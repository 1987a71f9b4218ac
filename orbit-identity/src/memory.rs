use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, SystemTime},
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use orbit_common::clock::Clock;
use rand::RngCore;

use crate::*;

const SESSION_TTL: Duration = Duration::from_secs(60 * 60);
/// Only the most recent calls are kept for [`InMemoryIdentityProvider::calls`].
const MAX_RECORDED_CALLS: usize = 1024;

#[derive(Debug, Clone)]
struct MemoryOrganization {
    code: String,
    name: Option<String>,
    members: Vec<OrganizationUser>,
}

#[derive(Debug, Clone)]
struct MemorySession {
    user_id: String,
    org_code: Option<String>,
    expires_at: Option<SystemTime>,
}

struct MemoryState {
    users: HashMap<String, IdentityUser>,
    organizations: Vec<MemoryOrganization>,
    sessions: HashMap<String, MemorySession>,
    refresh_tokens: HashMap<String, String>,
    calls: VecDeque<IdentityOperation>,
    failures: VecDeque<IdentityOperation>,
    omit_org_code: bool,
    rng: Box<dyn RngCore + Send>,
}

/// Identity provider kept entirely in process memory.
///
/// Used for local development and tests. Besides implementing
/// [`IdentityProviderTrait`] it records every call it receives and can be told
/// to fail specific operations.
#[derive(Clone)]
pub struct InMemoryIdentityProvider {
    state: Arc<Mutex<MemoryState>>,
    clock: Clock,
}

impl std::fmt::Debug for InMemoryIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIdentityProvider")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl InMemoryIdentityProvider {
    pub fn new<Rng: RngCore + Send + 'static>(rng: Rng, clock: Clock) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                users: HashMap::new(),
                organizations: vec![],
                sessions: HashMap::new(),
                refresh_tokens: HashMap::new(),
                calls: VecDeque::new(),
                failures: VecDeque::new(),
                omit_org_code: false,
                rng: Box::new(rng),
            })),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, user: IdentityUser) {
        self.lock().users.insert(user.id.clone(), user);
    }

    /// Registers fixed tokens for `user_id` that never expire.
    pub fn add_session(&self, user_id: &str, tokens: &SessionTokens, org_code: Option<&str>) {
        let mut state = self.lock();
        state.sessions.insert(
            tokens.access_token.clone(),
            MemorySession {
                user_id: user_id.to_string(),
                org_code: org_code.map(str::to_string),
                expires_at: None,
            },
        );
        if let Some(refresh_token) = &tokens.refresh_token {
            state
                .refresh_tokens
                .insert(refresh_token.clone(), user_id.to_string());
        }
    }

    /// Issues fresh tokens for `user_id`; the access token expires after an hour.
    pub fn issue_session(&self, user_id: &str, org_code: Option<&str>) -> SessionTokens {
        let mut state = self.lock();
        self.prune_expired(&mut state);
        let tokens = SessionTokens {
            access_token: generate_token(&mut state),
            refresh_token: Some(generate_token(&mut state)),
        };
        state.sessions.insert(
            tokens.access_token.clone(),
            MemorySession {
                user_id: user_id.to_string(),
                org_code: org_code.map(str::to_string),
                expires_at: Some(self.clock.deadline_after(SESSION_TTL)),
            },
        );
        if let Some(refresh_token) = &tokens.refresh_token {
            state
                .refresh_tokens
                .insert(refresh_token.clone(), user_id.to_string());
        }
        tokens
    }

    pub fn add_organization(&self, code: &str, name: Option<&str>, members: &[OrganizationUser]) {
        self.lock().organizations.push(MemoryOrganization {
            code: code.to_string(),
            name: name.map(str::to_string),
            members: members.to_vec(),
        });
    }

    /// The next call of `operation` fails with [`IdentityProviderError::Unavailable`].
    pub fn fail_next(&self, operation: IdentityOperation) {
        self.lock().failures.push_back(operation);
    }

    /// Makes `create_organization` acknowledge requests without returning a code.
    pub fn set_omit_org_code(&self, omit: bool) {
        self.lock().omit_org_code = omit;
    }

    pub fn calls(&self) -> Vec<IdentityOperation> {
        self.lock().calls.iter().copied().collect()
    }

    pub fn organizations(&self) -> Vec<IdentityOrganization> {
        self.lock()
            .organizations
            .iter()
            .map(|org| IdentityOrganization {
                code: org.code.clone(),
                name: org.name.clone(),
            })
            .collect()
    }

    pub fn members_of(&self, org_code: &str) -> Vec<OrganizationUser> {
        self.lock()
            .organizations
            .iter()
            .find(|org| org.code == org_code)
            .map(|org| org.members.clone())
            .unwrap_or_default()
    }

    fn begin(
        &self,
        operation: IdentityOperation,
    ) -> Result<MutexGuard<'_, MemoryState>, IdentityProviderError> {
        let mut state = self.lock();
        if state.calls.len() == MAX_RECORDED_CALLS {
            state.calls.pop_front();
        }
        state.calls.push_back(operation);
        if let Some(pos) = state.failures.iter().position(|op| *op == operation) {
            state.failures.remove(pos);
            log::debug!("injected failure for {operation:?}");
            return Err(IdentityProviderError::Unavailable(operation));
        }
        Ok(state)
    }

    fn prune_expired(&self, state: &mut MemoryState) {
        let clock = &self.clock;
        state.sessions.retain(|_, session| {
            session
                .expires_at
                .map_or(true, |expires_at| !clock.has_passed(expires_at))
        });
    }

    fn live_session(&self, state: &MemoryState, access_token: &str) -> Option<MemorySession> {
        let session = state.sessions.get(access_token)?;
        match session.expires_at {
            Some(expires_at) if self.clock.has_passed(expires_at) => None,
            _ => Some(session.clone()),
        }
    }
}

fn generate_token(state: &mut MemoryState) -> String {
    let mut bytes = [0u8; 32];
    state.rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn generate_org_code(state: &mut MemoryState) -> String {
    // Same shape as provider-issued codes: "org_" and 11 hex digits.
    format!("org_{:011x}", state.rng.next_u64() & 0xfff_ffff_ffff)
}

impl IdentityProviderTrait for InMemoryIdentityProvider {
    fn create_organization(
        &self,
        request: CreateOrganizationRequest,
    ) -> Result<CreateOrganizationResponse, IdentityProviderError> {
        let mut state = self.begin(IdentityOperation::CreateOrganization)?;
        if state.omit_org_code {
            return Ok(CreateOrganizationResponse { org_code: None });
        }
        let code = generate_org_code(&mut state);
        state.organizations.push(MemoryOrganization {
            code: code.clone(),
            name: Some(request.name),
            members: vec![],
        });
        Ok(CreateOrganizationResponse {
            org_code: Some(code),
        })
    }

    fn add_organization_users(
        &self,
        request: AddOrganizationUsersRequest,
    ) -> Result<AddOrganizationUsersResponse, IdentityProviderError> {
        let mut state = self.begin(IdentityOperation::AddOrganizationUsers)?;
        let org = state
            .organizations
            .iter_mut()
            .find(|org| org.code == request.org_code)
            .ok_or(IdentityProviderError::OrganizationNotFound)?;
        for user in request.users {
            match org.members.iter_mut().find(|member| member.id == user.id) {
                Some(member) => {
                    for role in user.roles {
                        if !member.roles.contains(&role) {
                            member.roles.push(role);
                        }
                    }
                }
                None => org.members.push(user),
            }
        }
        Ok(AddOrganizationUsersResponse {})
    }

    fn delete_organization(
        &self,
        request: DeleteOrganizationRequest,
    ) -> Result<DeleteOrganizationResponse, IdentityProviderError> {
        let mut state = self.begin(IdentityOperation::DeleteOrganization)?;
        let before = state.organizations.len();
        state.organizations.retain(|org| org.code != request.org_code);
        if state.organizations.len() == before {
            return Err(IdentityProviderError::OrganizationNotFound);
        }
        Ok(DeleteOrganizationResponse {})
    }

    fn get_session(
        &self,
        request: GetSessionRequest,
    ) -> Result<GetSessionResponse, IdentityProviderError> {
        let state = self.begin(IdentityOperation::GetSession)?;
        let Some(session) = self.live_session(&state, &request.tokens.access_token) else {
            return Ok(GetSessionResponse::NotFound);
        };
        match state.users.get(&session.user_id) {
            Some(user) => Ok(GetSessionResponse::Found {
                user: user.clone(),
                org_code: session.org_code,
            }),
            None => Ok(GetSessionResponse::NotFound),
        }
    }

    fn get_user_organizations(
        &self,
        request: GetUserOrganizationsRequest,
    ) -> Result<GetUserOrganizationsResponse, IdentityProviderError> {
        let state = self.begin(IdentityOperation::GetUserOrganizations)?;
        if !state.users.contains_key(&request.user_id) {
            return Ok(GetUserOrganizationsResponse::NotFound);
        }
        let organizations = state
            .organizations
            .iter()
            .filter(|org| org.members.iter().any(|m| m.id == request.user_id))
            .map(|org| IdentityOrganization {
                code: org.code.clone(),
                name: org.name.clone(),
            })
            .collect();
        Ok(GetUserOrganizationsResponse::Found { organizations })
    }

    fn refresh_tokens(
        &self,
        request: RefreshTokensRequest,
    ) -> Result<RefreshTokensResponse, IdentityProviderError> {
        let mut state = self.begin(IdentityOperation::RefreshTokens)?;
        let refresh_token = request
            .tokens
            .refresh_token
            .ok_or(IdentityProviderError::MissingRefreshToken)?;
        let user_id = state
            .refresh_tokens
            .remove(&refresh_token)
            .ok_or(IdentityProviderError::InvalidRefreshToken)?;
        let previous = state.sessions.remove(&request.tokens.access_token);
        self.prune_expired(&mut state);

        let tokens = SessionTokens {
            access_token: generate_token(&mut state),
            refresh_token: Some(generate_token(&mut state)),
        };
        state.sessions.insert(
            tokens.access_token.clone(),
            MemorySession {
                user_id: user_id.clone(),
                org_code: previous.and_then(|session| session.org_code),
                expires_at: Some(self.clock.deadline_after(SESSION_TTL)),
            },
        );
        if let Some(refresh_token) = &tokens.refresh_token {
            state.refresh_tokens.insert(refresh_token.clone(), user_id);
        }
        Ok(RefreshTokensResponse { tokens })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use rand::rngs::mock::StepRng;

    use super::*;

    fn fixed_clock() -> Clock {
        Clock::new_with_fixed_time(
            SystemTime::UNIX_EPOCH + Duration::from_secs(40 * 365 * 24 * 60 * 60),
        )
    }

    fn ada() -> IdentityUser {
        IdentityUser {
            id: "kp_ada".to_string(),
            given_name: Some("Ada".to_string()),
            family_name: None,
            email: Some("ada@example.com".to_string()),
            picture: None,
        }
    }

    fn provider() -> InMemoryIdentityProvider {
        let provider = InMemoryIdentityProvider::new(StepRng::new(1, 1), fixed_clock());
        provider.add_user(ada());
        provider
    }

    #[test]
    fn test_created_codes_are_deterministic_with_step_rng() {
        let provider = provider();
        let res = provider
            .create_organization(CreateOrganizationRequest {
                name: "Acme".to_string(),
            })
            .unwrap();
        assert_eq!(res.org_code.as_deref(), Some("org_00000000001"));
        let res = provider
            .create_organization(CreateOrganizationRequest {
                name: "Beta".to_string(),
            })
            .unwrap();
        assert_eq!(res.org_code.as_deref(), Some("org_00000000002"));
        assert_eq!(provider.organizations().len(), 2);
    }

    #[test]
    fn test_user_organizations_follow_membership() {
        let provider = provider();
        let tokens = provider.issue_session("kp_ada", None);
        provider.add_organization(
            "org_a",
            Some("A"),
            &[OrganizationUser {
                id: "kp_ada".to_string(),
                roles: vec!["admin".to_string()],
            }],
        );
        provider.add_organization("org_b", Some("B"), &[]);

        let res = provider
            .get_user_organizations(GetUserOrganizationsRequest {
                tokens: tokens.clone(),
                user_id: "kp_ada".to_string(),
            })
            .unwrap();
        let GetUserOrganizationsResponse::Found { organizations } = res else {
            panic!("expected organizations");
        };
        assert_eq!(
            organizations,
            vec![IdentityOrganization {
                code: "org_a".to_string(),
                name: Some("A".to_string()),
            }]
        );

        let res = provider
            .get_user_organizations(GetUserOrganizationsRequest {
                tokens,
                user_id: "kp_nobody".to_string(),
            })
            .unwrap();
        assert!(matches!(res, GetUserOrganizationsResponse::NotFound));
    }

    #[test]
    fn test_add_users_merges_roles() {
        let provider = provider();
        provider.add_organization(
            "org_a",
            None,
            &[OrganizationUser {
                id: "kp_ada".to_string(),
                roles: vec!["member".to_string()],
            }],
        );
        provider
            .add_organization_users(AddOrganizationUsersRequest {
                org_code: "org_a".to_string(),
                users: vec![OrganizationUser {
                    id: "kp_ada".to_string(),
                    roles: vec!["admin".to_string(), "member".to_string()],
                }],
            })
            .unwrap();
        assert_eq!(
            provider.members_of("org_a"),
            vec![OrganizationUser {
                id: "kp_ada".to_string(),
                roles: vec!["member".to_string(), "admin".to_string()],
            }]
        );
    }

    #[test]
    fn test_add_users_to_unknown_organization_fails() {
        let provider = provider();
        let res = provider.add_organization_users(AddOrganizationUsersRequest {
            org_code: "org_missing".to_string(),
            users: vec![],
        });
        assert!(matches!(res, Err(IdentityProviderError::OrganizationNotFound)));
    }

    #[test]
    fn test_session_expires() {
        let clock = fixed_clock();
        let provider = InMemoryIdentityProvider::new(StepRng::new(1, 1), clock.clone());
        provider.add_user(ada());
        let tokens = provider.issue_session("kp_ada", Some("org_a"));

        let res = provider
            .get_session(GetSessionRequest {
                tokens: tokens.clone(),
            })
            .unwrap();
        let GetSessionResponse::Found { user, org_code } = res else {
            panic!("expected a live session");
        };
        assert_eq!(user, ada());
        assert_eq!(org_code.as_deref(), Some("org_a"));

        let later = InMemoryIdentityProvider {
            state: provider.state.clone(),
            clock: clock.advanced_by(SESSION_TTL),
        };
        let res = later.get_session(GetSessionRequest { tokens }).unwrap();
        assert!(matches!(res, GetSessionResponse::NotFound));
    }

    #[test]
    fn test_expired_sessions_are_pruned() {
        let clock = Clock::new_with_fixed_time(SystemTime::UNIX_EPOCH + SESSION_TTL);
        let provider = InMemoryIdentityProvider::new(StepRng::new(1, 1), clock.clone());
        provider.add_user(ada());
        provider.issue_session("kp_ada", None);
        provider.add_session(
            "kp_ada",
            &SessionTokens {
                access_token: "fixed".to_string(),
                refresh_token: None,
            },
            None,
        );

        let later = InMemoryIdentityProvider {
            state: provider.state.clone(),
            clock: clock.advanced_by(SESSION_TTL),
        };
        let fresh = later.issue_session("kp_ada", None);
        let state = provider.lock();
        assert_eq!(state.sessions.len(), 2);
        assert!(state.sessions.contains_key("fixed"));
        assert!(state.sessions.contains_key(&fresh.access_token));
    }

    #[test]
    fn test_call_log_is_bounded() {
        let provider = provider();
        for _ in 0..MAX_RECORDED_CALLS + 5 {
            let _ = provider.get_user_organizations(GetUserOrganizationsRequest {
                tokens: SessionTokens {
                    access_token: "x".to_string(),
                    refresh_token: None,
                },
                user_id: "kp_ada".to_string(),
            });
        }
        assert_eq!(provider.calls().len(), MAX_RECORDED_CALLS);
    }

    #[test]
    fn test_refresh_rotates_tokens_and_keeps_org() {
        let provider = provider();
        let tokens = provider.issue_session("kp_ada", Some("org_a"));
        let refreshed = provider
            .refresh_tokens(RefreshTokensRequest {
                tokens: tokens.clone(),
            })
            .unwrap()
            .tokens;
        assert_ne!(refreshed.access_token, tokens.access_token);
        assert_ne!(refreshed.refresh_token, tokens.refresh_token);

        let old = provider
            .get_session(GetSessionRequest {
                tokens: tokens.clone(),
            })
            .unwrap();
        assert!(matches!(old, GetSessionResponse::NotFound));
        let new = provider
            .get_session(GetSessionRequest { tokens: refreshed })
            .unwrap();
        assert!(matches!(
            new,
            GetSessionResponse::Found { org_code: Some(ref code), .. } if code == "org_a"
        ));

        let reused = provider.refresh_tokens(RefreshTokensRequest { tokens });
        assert!(matches!(reused, Err(IdentityProviderError::InvalidRefreshToken)));
    }

    #[test]
    fn test_injected_failure_applies_once_and_is_recorded() {
        let provider = provider();
        provider.fail_next(IdentityOperation::CreateOrganization);
        let res = provider.create_organization(CreateOrganizationRequest {
            name: "Acme".to_string(),
        });
        assert!(matches!(
            res,
            Err(IdentityProviderError::Unavailable(IdentityOperation::CreateOrganization))
        ));
        let res = provider.create_organization(CreateOrganizationRequest {
            name: "Acme".to_string(),
        });
        assert!(res.is_ok());
        assert_eq!(
            provider.calls(),
            vec![
                IdentityOperation::CreateOrganization,
                IdentityOperation::CreateOrganization
            ]
        );
    }

    #[test]
    fn test_omitted_code_creates_nothing() {
        let provider = provider();
        provider.set_omit_org_code(true);
        let res = provider
            .create_organization(CreateOrganizationRequest {
                name: "Acme".to_string(),
            })
            .unwrap();
        assert_eq!(res.org_code, None);
        assert!(provider.organizations().is_empty());
    }

    #[test]
    fn test_delete_organization() {
        let provider = provider();
        provider.add_organization("org_a", None, &[]);
        provider
            .delete_organization(DeleteOrganizationRequest {
                org_code: "org_a".to_string(),
            })
            .unwrap();
        assert!(provider.organizations().is_empty());
        let res = provider.delete_organization(DeleteOrganizationRequest {
            org_code: "org_a".to_string(),
        });
        assert!(matches!(res, Err(IdentityProviderError::OrganizationNotFound)));
    }
}
