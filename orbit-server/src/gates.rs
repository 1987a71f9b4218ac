//! Preconditions every workspace procedure runs before its handler.
//!
//! The authentication gate turns session tokens into an [`AuthContext`]; the
//! workspace gate consumes that context and produces a [`WorkspaceContext`].
//! Both are exposed as actix-web extractors, so a handler taking a
//! `WorkspaceContext` runs the two gates in order and never starts when
//! either fails.

use std::{future::Future, pin::Pin};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use orbit_api_schema::user::{CurrentWorkspace, User};
use orbit_identity::{
    GetSessionRequest, GetSessionResponse, GetUserOrganizationsRequest,
    GetUserOrganizationsResponse, IdentityOrganization, IdentityProviderTrait, IdentityUser,
    SessionTokens,
};

use crate::{error::ApiError, session, state::ApiState};

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub tokens: SessionTokens,
    /// Organization the provider attached to the session, if any.
    pub session_org_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub auth: AuthContext,
    pub workspace: CurrentWorkspace,
}

/// Inputs of the workspace gate besides the authenticated caller.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSelection {
    /// From the `org_code` cookie.
    pub requested: Option<String>,
    /// From the server configuration.
    pub default_org_code: Option<String>,
}

fn to_api_user(user: IdentityUser) -> User {
    User {
        id: user.id,
        given_name: user.given_name,
        family_name: user.family_name,
        email: user.email,
        picture: user.picture,
    }
}

pub fn authenticate<P: IdentityProviderTrait>(
    identity: &P,
    tokens: Option<SessionTokens>,
) -> Result<AuthContext, ApiError> {
    let tokens = tokens.ok_or(ApiError::Unauthorized)?;
    let res = identity
        .get_session(GetSessionRequest {
            tokens: tokens.clone(),
        })
        .map_err(|e| {
            log::error!("session lookup failed: {e}");
            ApiError::Internal
        })?;
    match res {
        GetSessionResponse::Found { user, org_code } => Ok(AuthContext {
            user: to_api_user(user),
            tokens,
            session_org_code: org_code,
        }),
        GetSessionResponse::NotFound => Err(ApiError::Unauthorized),
    }
}

pub fn resolve_workspace<P: IdentityProviderTrait>(
    identity: &P,
    auth: AuthContext,
    selection: &WorkspaceSelection,
) -> Result<WorkspaceContext, ApiError> {
    let res = identity
        .get_user_organizations(GetUserOrganizationsRequest {
            tokens: auth.tokens.clone(),
            user_id: auth.user.id.clone(),
        })
        .map_err(|e| {
            log::warn!("cannot enumerate organizations of {}: {e}", auth.user.id);
            ApiError::NotFound
        })?;
    let GetUserOrganizationsResponse::Found { organizations } = res else {
        return Err(ApiError::NotFound);
    };

    let find = |code: &str| organizations.iter().find(|org| org.code == code);

    let chosen: &IdentityOrganization = if let Some(requested) = &selection.requested {
        find(requested.as_str()).ok_or_else(|| {
            log::info!("{} asked for workspace {requested} without membership", auth.user.id);
            ApiError::Forbidden("Workspace not accessible".to_string())
        })?
    } else {
        auth.session_org_code
            .as_deref()
            .and_then(find)
            .or_else(|| selection.default_org_code.as_deref().and_then(find))
            .or_else(|| organizations.first())
            .ok_or(ApiError::NotFound)?
    };

    let workspace = CurrentWorkspace {
        org_code: chosen.code.clone(),
        org_name: chosen.name.clone(),
    };
    Ok(WorkspaceContext { auth, workspace })
}

type GateFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>>>>;

fn api_state(req: &HttpRequest) -> Option<web::Data<ApiState>> {
    let state = req.app_data::<web::Data<ApiState>>().cloned();
    if state.is_none() {
        log::error!("ApiState is not registered on the app");
    }
    state
}

impl FromRequest for AuthContext {
    type Error = ApiError;
    type Future = GateFuture<Self>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = api_state(req);
        let tokens = session::tokens_from_request(req);
        Box::pin(async move {
            let state = state.ok_or(ApiError::Internal)?;
            web::block(move || authenticate(&state.identity, tokens))
                .await
                .map_err(|_| ApiError::Internal)?
        })
    }
}

impl FromRequest for WorkspaceContext {
    type Error = ApiError;
    type Future = GateFuture<Self>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth = AuthContext::from_request(req, payload);
        let state = api_state(req);
        let requested = session::requested_org_code(req);
        Box::pin(async move {
            let auth = auth.await?;
            let state = state.ok_or(ApiError::Internal)?;
            let selection = WorkspaceSelection {
                requested,
                default_org_code: state.default_org_code.clone(),
            };
            web::block(move || resolve_workspace(&state.identity, auth, &selection))
                .await
                .map_err(|_| ApiError::Internal)?
        })
    }
}
