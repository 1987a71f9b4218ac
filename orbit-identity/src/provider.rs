use crate::{
    kinde::KindeIdentityProvider, memory::InMemoryIdentityProvider, AddOrganizationUsersRequest,
    AddOrganizationUsersResponse, CreateOrganizationRequest, CreateOrganizationResponse,
    DeleteOrganizationRequest, DeleteOrganizationResponse, GetSessionRequest, GetSessionResponse,
    GetUserOrganizationsRequest, GetUserOrganizationsResponse, IdentityProviderError,
    IdentityProviderTrait, RefreshTokensRequest, RefreshTokensResponse,
};

#[derive(Debug, Clone)]
pub enum IdentityProvider {
    Kinde(KindeIdentityProvider),
    Memory(InMemoryIdentityProvider),
}

impl IdentityProviderTrait for IdentityProvider {
    fn create_organization(
        &self,
        request: CreateOrganizationRequest,
    ) -> Result<CreateOrganizationResponse, IdentityProviderError> {
        match self {
            IdentityProvider::Kinde(p) => p.create_organization(request),
            IdentityProvider::Memory(p) => p.create_organization(request),
        }
    }

    fn add_organization_users(
        &self,
        request: AddOrganizationUsersRequest,
    ) -> Result<AddOrganizationUsersResponse, IdentityProviderError> {
        match self {
            IdentityProvider::Kinde(p) => p.add_organization_users(request),
            IdentityProvider::Memory(p) => p.add_organization_users(request),
        }
    }

    fn delete_organization(
        &self,
        request: DeleteOrganizationRequest,
    ) -> Result<DeleteOrganizationResponse, IdentityProviderError> {
        match self {
            IdentityProvider::Kinde(p) => p.delete_organization(request),
            IdentityProvider::Memory(p) => p.delete_organization(request),
        }
    }

    fn get_session(
        &self,
        request: GetSessionRequest,
    ) -> Result<GetSessionResponse, IdentityProviderError> {
        match self {
            IdentityProvider::Kinde(p) => p.get_session(request),
            IdentityProvider::Memory(p) => p.get_session(request),
        }
    }

    fn get_user_organizations(
        &self,
        request: GetUserOrganizationsRequest,
    ) -> Result<GetUserOrganizationsResponse, IdentityProviderError> {
        match self {
            IdentityProvider::Kinde(p) => p.get_user_organizations(request),
            IdentityProvider::Memory(p) => p.get_user_organizations(request),
        }
    }

    fn refresh_tokens(
        &self,
        request: RefreshTokensRequest,
    ) -> Result<RefreshTokensResponse, IdentityProviderError> {
        match self {
            IdentityProvider::Kinde(p) => p.refresh_tokens(request),
            IdentityProvider::Memory(p) => p.refresh_tokens(request),
        }
    }
}
