use gloo_net::http::{Request, Response};
use orbit_api_schema::{
    error::{ApiErrorBody, ApiErrorCode},
    workspace::{
        create::{CreateWorkspaceResponse, WorkspaceInput},
        list::ListWorkspacesResponse,
        WORKSPACE_PATH,
    },
};
use web_sys::RequestCredentials;

fn api_base() -> &'static str {
    option_env!("ORBIT_API_URL").unwrap_or("http://localhost:8512")
}

fn transport_error(e: gloo_net::Error) -> ApiErrorCode {
    log::warn!("request failed: {e}");
    ApiErrorCode::Internal
}

async fn error_code(response: Response) -> ApiErrorCode {
    match response.json::<ApiErrorBody>().await {
        Ok(body) => body.code,
        Err(_) => ApiErrorCode::from_status(response.status()),
    }
}

pub async fn list_workspaces() -> Result<ListWorkspacesResponse, ApiErrorCode> {
    let url = format!("{}{}", api_base(), WORKSPACE_PATH);
    let response = Request::get(&url)
        .credentials(RequestCredentials::Include)
        .send()
        .await
        .map_err(transport_error)?;
    if !response.ok() {
        return Err(error_code(response).await);
    }
    response.json().await.map_err(transport_error)
}

pub async fn create_workspace(
    input: &WorkspaceInput,
) -> Result<CreateWorkspaceResponse, ApiErrorCode> {
    let url = format!("{}{}", api_base(), WORKSPACE_PATH);
    let response = Request::post(&url)
        .credentials(RequestCredentials::Include)
        .json(&input.to_request())
        .map_err(transport_error)?
        .send()
        .await
        .map_err(transport_error)?;
    if !response.ok() {
        return Err(error_code(response).await);
    }
    response.json().await.map_err(transport_error)
}
