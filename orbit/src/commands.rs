use std::path::Path;

use orbit_api_client::{ClientSession, OrbitApiClient, OrbitApiClientError};
use orbit_api_schema::{
    error::ApiErrorCode,
    workspace::{
        create::{CreateWorkspaceResponse, ValidationError, WorkspaceInput},
        list::ListWorkspacesResponse,
    },
};
use orbit_config_file::{ConfigFileError, OrbitClientConfigToml};
use orbit_dashboard::{
    create_dialog::{CreateWorkspaceDialog, WorkspaceApi},
    query::{QueryCache, QueryKey},
    toast::{Toast, ToastKind},
};

use crate::args::{Commands, WorkspaceSubcommands};

#[derive(Debug)]
pub enum CliError {
    Config(ConfigFileError),
    Client(OrbitApiClientError),
    Validation(ValidationError),
    CreateFailed(ApiErrorCode),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "{e}"),
            CliError::Client(e) => write!(f, "{e}"),
            CliError::Validation(e) => write!(f, "{e}"),
            CliError::CreateFailed(code) => write!(f, "create workspace failed: {code}"),
        }
    }
}

/// Adapts the HTTP client to the dialog's view of the create procedure.
pub struct RemoteWorkspaceApi<'a>(pub &'a OrbitApiClient);

impl WorkspaceApi for RemoteWorkspaceApi<'_> {
    fn create_workspace(
        &self,
        input: &WorkspaceInput,
    ) -> Result<CreateWorkspaceResponse, ApiErrorCode> {
        self.0.create_workspace(input).map_err(|e| {
            log::debug!("create workspace: {e}");
            e.code()
        })
    }
}

pub fn client_from_config(config: &OrbitClientConfigToml) -> OrbitApiClient {
    OrbitApiClient::new(
        config.server_url.clone(),
        ClientSession {
            access_token: config.access_token.clone(),
            refresh_token: config.refresh_token.clone(),
            org_code: config.org_code.clone(),
        },
    )
}

pub fn render_workspace_list(res: &ListWorkspacesResponse) -> String {
    let mut out = String::new();
    for workspace in &res.workspaces {
        out.push_str(&format!(
            "[{}] {} ({})",
            workspace.avatar, workspace.name, workspace.id
        ));
        if workspace.id == res.current_workspace.org_code {
            out.push_str(" *");
        }
        out.push('\n');
    }
    out
}

fn print_toast(toast: &Toast) {
    match toast.kind {
        ToastKind::Success => println!("{}", toast.message),
        ToastKind::Error => eprintln!("{}", toast.message),
    }
}

fn list(client: &OrbitApiClient) -> Result<(), CliError> {
    let mut cache = QueryCache::new();
    let res = cache
        .get_or_fetch(&QueryKey::workspace_list(), || client.list_workspaces())
        .map_err(CliError::Client)?;
    print!("{}", render_workspace_list(res));
    Ok(())
}

fn create(client: &OrbitApiClient, name: &str) -> Result<(), CliError> {
    let mut cache: QueryCache<ListWorkspacesResponse> = QueryCache::new();
    let mut toasts: Vec<Toast> = Vec::new();
    let mut dialog = CreateWorkspaceDialog::new();
    dialog.open();
    dialog.set_name(name);

    let result = dialog.submit_with(&RemoteWorkspaceApi(client), &mut cache, &mut toasts);
    toasts.iter().for_each(print_toast);
    match result {
        None => Err(CliError::Validation(
            dialog.name_error().unwrap_or(ValidationError::EmptyName),
        )),
        Some(Ok(created)) => {
            log::info!("created {} ({})", created.workspace_name, created.org_code);
            Ok(())
        }
        Some(Err(code)) => Err(CliError::CreateFailed(code)),
    }
}

/// Writes tokens the server rotated back to the session file.
fn persist_session(
    path: &Path,
    config: &OrbitClientConfigToml,
    client: &OrbitApiClient,
) -> Result<(), CliError> {
    let session = client.session();
    let updated = OrbitClientConfigToml {
        server_url: config.server_url.clone(),
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        org_code: session.org_code,
    };
    if &updated == config {
        return Ok(());
    }
    orbit_config_file::save_client_config(path, &updated).map_err(CliError::Config)?;
    log::debug!("session saved to {}", path.display());
    Ok(())
}

pub fn run(config_path: &Path, command: Commands) -> Result<(), CliError> {
    let config = orbit_config_file::load_client_config(config_path).map_err(CliError::Config)?;
    let client = client_from_config(&config);

    let result = match command {
        Commands::Workspace { subcommand } => match subcommand {
            Some(WorkspaceSubcommands::List) | None => list(&client),
            Some(WorkspaceSubcommands::Create { name }) => create(&client, &name),
        },
    };
    persist_session(config_path, &config, &client)?;
    result
}
