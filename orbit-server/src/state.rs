use orbit_common::clock::Clock;
use orbit_identity::provider::IdentityProvider;

use crate::{
    reconciliation::ReconciliationLog, session::CookieSettings,
    workspace_service::WorkspaceService,
};

#[derive(Debug, Clone)]
pub struct ApiState {
    pub identity: IdentityProvider,
    pub clock: Clock,
    pub cookies: CookieSettings,
    pub default_org_code: Option<String>,
    pub admin_role: String,
    pub reconciliation: ReconciliationLog,
}

impl ApiState {
    pub fn new(
        identity: IdentityProvider,
        clock: Clock,
        cookies: CookieSettings,
        default_org_code: Option<String>,
        admin_role: String,
    ) -> Self {
        Self {
            identity,
            clock,
            cookies,
            default_org_code,
            admin_role,
            reconciliation: ReconciliationLog::new(),
        }
    }

    pub fn workspace_service(&self) -> WorkspaceService<'_, IdentityProvider> {
        WorkspaceService {
            identity: &self.identity,
            admin_role: &self.admin_role,
            reconciliation: &self.reconciliation,
            clock: &self.clock,
        }
    }
}
