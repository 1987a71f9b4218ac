use actix_web::{post, web, HttpResponse};
use orbit_api_schema::workspace::create::{CreateWorkspaceRequest, WorkspaceInput};

use crate::{error::ApiError, gates::WorkspaceContext, session, state::ApiState};

#[post("/workspace")]
pub async fn workspace_create(
    state: web::Data<ApiState>,
    ctx: WorkspaceContext,
    req: Result<web::Json<CreateWorkspaceRequest>, actix_web::Error>,
) -> Result<HttpResponse, ApiError> {
    // The body is only judged once both gates have passed.
    let req = req.map_err(|e| match e.as_error::<ApiError>() {
        Some(err) => err.clone(),
        None => ApiError::BadRequest(e.to_string()),
    })?;
    let input = WorkspaceInput::try_from(req.into_inner())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let cookie_settings = state.cookies.clone();
    let created = web::block(move || state.workspace_service().create_workspace(&ctx, &input))
        .await
        .map_err(|_| ApiError::Internal)??;

    let mut res = HttpResponse::Ok();
    for cookie in session::session_cookies(&created.tokens, &cookie_settings) {
        res.cookie(cookie);
    }
    Ok(res.json(created.response))
}
