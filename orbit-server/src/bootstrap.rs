use std::time::Duration;

use orbit_common::clock::Clock;
use orbit_config_file::{IdentityConfigToml, MemoryIdentityConfigToml};
use orbit_identity::{
    kinde::KindeIdentityProvider, memory::InMemoryIdentityProvider, provider::IdentityProvider,
    IdentityUser, OrganizationUser, SessionTokens,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Debug, PartialEq, Eq)]
pub enum BootstrapError {
    MissingClientSecret,
}

impl std::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapError::MissingClientSecret => {
                f.write_str("identity.client_secret or identity.client_secret_env must be set")
            }
        }
    }
}

/// Builds the identity provider named by the `[identity]` table.
pub fn identity_from_config(
    config: &IdentityConfigToml,
    admin_role: &str,
    clock: Clock,
) -> Result<IdentityProvider, BootstrapError> {
    match config {
        IdentityConfigToml::Kinde(kinde) => {
            let client_secret = kinde
                .client_secret()
                .ok_or(BootstrapError::MissingClientSecret)?;
            Ok(IdentityProvider::Kinde(KindeIdentityProvider::new(
                kinde.issuer_url.clone(),
                kinde.client_id.clone(),
                client_secret,
                Duration::from_secs(kinde.timeout_secs),
                clock,
            )))
        }
        IdentityConfigToml::Memory(memory) => Ok(IdentityProvider::Memory(seeded_memory_provider(
            memory,
            admin_role,
            ChaCha20Rng::from_entropy(),
            clock,
        ))),
    }
}

pub fn seeded_memory_provider(
    config: &MemoryIdentityConfigToml,
    admin_role: &str,
    rng: ChaCha20Rng,
    clock: Clock,
) -> InMemoryIdentityProvider {
    let provider = InMemoryIdentityProvider::new(rng, clock);
    for user in &config.users {
        provider.add_user(IdentityUser {
            id: user.id.clone(),
            given_name: user.given_name.clone(),
            family_name: user.family_name.clone(),
            email: user.email.clone(),
            picture: None,
        });
        let tokens = SessionTokens {
            access_token: user.access_token.clone(),
            refresh_token: user.refresh_token.clone(),
        };
        provider.add_session(&user.id, &tokens, None);
    }
    for org in &config.organizations {
        let members: Vec<OrganizationUser> = org
            .members
            .iter()
            .map(|id| OrganizationUser {
                id: id.clone(),
                roles: vec![admin_role.to_string()],
            })
            .collect();
        provider.add_organization(&org.code, org.name.as_deref(), &members);
    }
    log::info!(
        "in-memory identity provider seeded with {} users and {} organizations",
        config.users.len(),
        config.organizations.len()
    );
    provider
}
