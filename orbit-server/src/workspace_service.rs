use orbit_api_schema::workspace::{
    create::{CreateWorkspaceResponse, WorkspaceInput},
    list::{ListWorkspacesResponse, WorkspaceSummary},
};
use orbit_common::clock::Clock;
use orbit_identity::{
    AddOrganizationUsersRequest, CreateOrganizationRequest, DeleteOrganizationRequest,
    GetUserOrganizationsRequest, GetUserOrganizationsResponse, IdentityProviderTrait,
    OrganizationUser, RefreshTokensRequest, SessionTokens,
};

use crate::{
    error::ApiError,
    gates::WorkspaceContext,
    reconciliation::{OrphanedOrganization, ReconciliationLog},
};

/// Result of a completed create: the response body and the caller's
/// refreshed session.
#[derive(Debug)]
pub struct CreatedWorkspace {
    pub response: CreateWorkspaceResponse,
    pub tokens: SessionTokens,
}

pub struct WorkspaceService<'a, P: IdentityProviderTrait> {
    pub identity: &'a P,
    pub admin_role: &'a str,
    pub reconciliation: &'a ReconciliationLog,
    pub clock: &'a Clock,
}

impl<'a, P: IdentityProviderTrait> WorkspaceService<'a, P> {
    pub fn list_workspaces(
        &self,
        ctx: &WorkspaceContext,
    ) -> Result<ListWorkspacesResponse, ApiError> {
        let res = self
            .identity
            .get_user_organizations(GetUserOrganizationsRequest {
                tokens: ctx.auth.tokens.clone(),
                user_id: ctx.auth.user.id.clone(),
            })
            .map_err(|e| {
                log::warn!("listing organizations of {} failed: {e}", ctx.auth.user.id);
                ApiError::NotFound
            })?;
        let GetUserOrganizationsResponse::Found { organizations } = res else {
            return Err(ApiError::NotFound);
        };

        let workspaces = organizations
            .into_iter()
            .filter(|org| !org.code.is_empty())
            .map(|org| WorkspaceSummary::from_organization(org.code, org.name))
            .collect();

        Ok(ListWorkspacesResponse {
            workspaces,
            user: ctx.auth.user.clone(),
            current_workspace: ctx.workspace.clone(),
        })
    }

    /// Creates the organization, makes the caller its admin and refreshes the
    /// caller's tokens so the new membership shows up in later requests.
    ///
    /// If the membership cannot be added the organization is deleted again;
    /// if that fails too it is recorded in the reconciliation log.
    pub fn create_workspace(
        &self,
        ctx: &WorkspaceContext,
        input: &WorkspaceInput,
    ) -> Result<CreatedWorkspace, ApiError> {
        let user_id = &ctx.auth.user.id;

        let created = self
            .identity
            .create_organization(CreateOrganizationRequest {
                name: input.name().to_string(),
            })
            .map_err(|e| {
                log::error!("creating organization {:?} failed: {e}", input.name());
                ApiError::Internal
            })?;
        let Some(org_code) = created.org_code.filter(|code| !code.is_empty()) else {
            log::error!("provider created {:?} without an organization code", input.name());
            return Err(ApiError::Forbidden("Organization not found".to_string()));
        };
        log::info!("created organization {org_code} for {user_id}");

        let add_member = self
            .identity
            .add_organization_users(AddOrganizationUsersRequest {
                org_code: org_code.clone(),
                users: vec![OrganizationUser {
                    id: user_id.clone(),
                    roles: vec![self.admin_role.to_string()],
                }],
            });
        if let Err(e) = add_member {
            log::error!("adding {user_id} to {org_code} failed: {e}");
            self.roll_back(&org_code, input.name(), user_id);
            return Err(ApiError::Internal);
        }

        let refreshed = self
            .identity
            .refresh_tokens(RefreshTokensRequest {
                tokens: ctx.auth.tokens.clone(),
            })
            .map_err(|e| {
                log::error!("refreshing tokens of {user_id} after creating {org_code} failed: {e}");
                ApiError::Internal
            })?;

        Ok(CreatedWorkspace {
            response: CreateWorkspaceResponse {
                org_code,
                workspace_name: input.name().to_string(),
            },
            tokens: refreshed.tokens,
        })
    }

    fn roll_back(&self, org_code: &str, workspace_name: &str, user_id: &str) {
        let res = self.identity.delete_organization(DeleteOrganizationRequest {
            org_code: org_code.to_string(),
        });
        match res {
            Ok(_) => log::warn!("deleted organization {org_code} after failed member add"),
            Err(e) => {
                log::error!("deleting organization {org_code} failed: {e}");
                self.reconciliation.record(OrphanedOrganization {
                    org_code: org_code.to_string(),
                    workspace_name: workspace_name.to_string(),
                    user_id: user_id.to_string(),
                    recorded_at: self.clock.now(),
                });
            }
        }
    }
}
