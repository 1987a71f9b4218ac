use std::time::{Duration, SystemTime};

use orbit_api_client::{ClientSession, OrbitApiClient, OrbitApiClientError};
use orbit_api_schema::{error::ApiErrorCode, workspace::create::ValidationError};
use orbit_common::clock::Clock;
use orbit_identity::{
    memory::InMemoryIdentityProvider, provider::IdentityProvider, IdentityOperation,
    IdentityUser, OrganizationUser, SessionTokens,
};
use orbit_server::api::{run_server, ServerConfig};
use rand::rngs::mock::StepRng;
use serial_test::serial;
use tokio::runtime::{Builder, Runtime};

const ACCESS_TOKEN: &str = "ada-access";
const REFRESH_TOKEN: &str = "ada-refresh";

fn fixed_clock() -> Clock {
    let fixed_system_time = SystemTime::UNIX_EPOCH + Duration::from_secs(40 * 365 * 24 * 60 * 60);
    Clock::new_with_fixed_time(fixed_system_time)
}

fn seeded_provider() -> InMemoryIdentityProvider {
    let provider = InMemoryIdentityProvider::new(StepRng::new(1, 1), fixed_clock());
    provider.add_user(IdentityUser {
        id: "kp_ada".to_string(),
        given_name: Some("Ada".to_string()),
        family_name: Some("Lovelace".to_string()),
        email: Some("ada@example.com".to_string()),
        picture: None,
    });
    provider.add_session(
        "kp_ada",
        &SessionTokens {
            access_token: ACCESS_TOKEN.to_string(),
            refresh_token: Some(REFRESH_TOKEN.to_string()),
        },
        None,
    );
    provider.add_organization(
        "org_home",
        Some("Home"),
        &[OrganizationUser {
            id: "kp_ada".to_string(),
            roles: vec!["admin".to_string()],
        }],
    );
    provider.add_organization("org_other", Some("Other"), &[]);
    provider
}

/// Starts the server on `port`. The returned runtime must outlive the test.
fn start_server(port: u16, provider: &InMemoryIdentityProvider) -> Runtime {
    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();

    let config = ServerConfig {
        bind: "127.0.0.1".to_string(),
        port,
        allowed_origins: vec![],
        identity: IdentityProvider::Memory(provider.clone()),
        clock: fixed_clock(),
        default_org_code: None,
        admin_role: "admin".to_string(),
        secure_cookies: false,
    };
    runtime.spawn(async {
        run_server(config).await.unwrap();
    });
    std::thread::sleep(Duration::from_secs(1));
    runtime
}

fn signed_in_client(port: u16) -> OrbitApiClient {
    OrbitApiClient::new(
        format!("http://localhost:{port}"),
        ClientSession {
            access_token: Some(ACCESS_TOKEN.to_string()),
            refresh_token: Some(REFRESH_TOKEN.to_string()),
            org_code: None,
        },
    )
}

fn create_calls(provider: &InMemoryIdentityProvider) -> Vec<IdentityOperation> {
    provider
        .calls()
        .into_iter()
        .filter(|op| {
            !matches!(
                op,
                IdentityOperation::GetSession | IdentityOperation::GetUserOrganizations
            )
        })
        .collect()
}

#[test]
#[serial]
fn test_list_then_create() {
    let provider = seeded_provider();
    let _runtime = start_server(18601, &provider);
    let client = signed_in_client(18601);

    let list = client.list_workspaces().unwrap();
    insta::assert_debug_snapshot!(list.workspaces, @r###"
    [
        WorkspaceSummary {
            id: "org_home",
            name: "Home",
            avatar: "H",
        },
    ]
    "###);
    assert_eq!(list.user.id, "kp_ada");
    assert_eq!(list.current_workspace.org_code, "org_home");
    assert_eq!(list.current_workspace.org_name.as_deref(), Some("Home"));

    let created = client.create_workspace_named("  acme  ").unwrap();
    assert_eq!(created.workspace_name, "acme");
    assert_eq!(created.org_code, "org_00000000001");
    assert_eq!(
        create_calls(&provider),
        vec![
            IdentityOperation::CreateOrganization,
            IdentityOperation::AddOrganizationUsers,
            IdentityOperation::RefreshTokens,
        ]
    );
    let members = provider.members_of(&created.org_code);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, "kp_ada");
    assert_eq!(members[0].roles, vec!["admin".to_string()]);

    // The response rotated the session cookies.
    let session = client.session();
    assert_ne!(session.access_token.as_deref(), Some(ACCESS_TOKEN));
    assert_ne!(session.refresh_token.as_deref(), Some(REFRESH_TOKEN));

    let list = client.list_workspaces().unwrap();
    let names: Vec<(&str, &str)> = list
        .workspaces
        .iter()
        .map(|w| (w.name.as_str(), w.avatar.as_str()))
        .collect();
    assert_eq!(names, vec![("Home", "H"), ("acme", "A")]);

    // The rotated-out token no longer authenticates.
    let stale = signed_in_client(18601);
    let err = stale.list_workspaces().unwrap_err();
    assert_eq!(err.code(), ApiErrorCode::Unauthorized);
}

#[test]
#[serial]
fn test_empty_name_is_rejected_before_any_call() {
    let provider = seeded_provider();
    let _runtime = start_server(18602, &provider);
    let client = signed_in_client(18602);

    let err = client.create_workspace_named("   ").unwrap_err();
    assert!(matches!(
        err,
        OrbitApiClientError::Validation(ValidationError::EmptyName)
    ));
    assert!(provider.calls().is_empty());
}

#[test]
#[serial]
fn test_unauthenticated_requests() {
    let provider = seeded_provider();
    let _runtime = start_server(18603, &provider);

    let anonymous = OrbitApiClient::new(
        "http://localhost:18603".to_string(),
        ClientSession::default(),
    );
    let err = anonymous.list_workspaces().unwrap_err();
    assert_eq!(err.code(), ApiErrorCode::Unauthorized);
    let err = anonymous.create_workspace_named("Acme").unwrap_err();
    assert_eq!(err.code(), ApiErrorCode::Unauthorized);
    assert!(provider.calls().is_empty());

    let forged = OrbitApiClient::new(
        "http://localhost:18603".to_string(),
        ClientSession {
            access_token: Some("forged".to_string()),
            ..ClientSession::default()
        },
    );
    let err = forged.list_workspaces().unwrap_err();
    assert_eq!(err.code(), ApiErrorCode::Unauthorized);
}

#[test]
#[serial]
fn test_requested_workspace_outside_membership() {
    let provider = seeded_provider();
    let _runtime = start_server(18604, &provider);
    let client = OrbitApiClient::new(
        "http://localhost:18604".to_string(),
        ClientSession {
            access_token: Some(ACCESS_TOKEN.to_string()),
            refresh_token: Some(REFRESH_TOKEN.to_string()),
            org_code: Some("org_other".to_string()),
        },
    );
    let err = client.list_workspaces().unwrap_err();
    match err {
        OrbitApiClientError::Api { code, message } => {
            assert_eq!(code, ApiErrorCode::Forbidden);
            assert_eq!(message, "Workspace not accessible");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
#[serial]
fn test_create_failures() {
    let provider = seeded_provider();
    let _runtime = start_server(18605, &provider);
    let client = signed_in_client(18605);

    // Organization creation throws: nothing else is attempted.
    provider.fail_next(IdentityOperation::CreateOrganization);
    let err = client.create_workspace_named("Acme").unwrap_err();
    assert_eq!(err.code(), ApiErrorCode::Internal);
    assert_eq!(
        create_calls(&provider),
        vec![IdentityOperation::CreateOrganization]
    );

    // Organization created without a code.
    provider.set_omit_org_code(true);
    let err = client.create_workspace_named("Acme").unwrap_err();
    assert_eq!(err.code(), ApiErrorCode::Forbidden);
    assert_eq!(
        create_calls(&provider),
        vec![
            IdentityOperation::CreateOrganization,
            IdentityOperation::CreateOrganization,
        ]
    );
    provider.set_omit_org_code(false);

    // Member-add fails: the new organization is deleted again.
    let before = provider.organizations().len();
    provider.fail_next(IdentityOperation::AddOrganizationUsers);
    let err = client.create_workspace_named("Acme").unwrap_err();
    assert_eq!(err.code(), ApiErrorCode::Internal);
    assert_eq!(provider.organizations().len(), before);
    assert_eq!(
        create_calls(&provider)[2..],
        [
            IdentityOperation::CreateOrganization,
            IdentityOperation::AddOrganizationUsers,
            IdentityOperation::DeleteOrganization,
        ]
    );

    // The session was never rotated, so the original tokens still work.
    assert_eq!(client.session().access_token.as_deref(), Some(ACCESS_TOKEN));
    assert_eq!(client.list_workspaces().unwrap().workspaces.len(), 1);
}
