use std::sync::{Arc, Mutex, PoisonError};

use cookie::Cookie;
use orbit_api_schema::{
    error::{ApiErrorBody, ApiErrorCode},
    workspace::{
        create::{CreateWorkspaceResponse, ValidationError, WorkspaceInput},
        list::ListWorkspacesResponse,
        WORKSPACE_PATH,
    },
};

/// Session cookies the client sends and keeps up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub org_code: Option<String>,
}

impl ClientSession {
    fn cookie_header(&self) -> Option<String> {
        let pairs: Vec<String> = [
            ("access_token", &self.access_token),
            ("refresh_token", &self.refresh_token),
            ("org_code", &self.org_code),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|value| format!("{name}={value}")))
        .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    fn apply_set_cookie(&mut self, header: &str) {
        let Ok(cookie) = Cookie::parse(header) else {
            log::debug!("ignoring unparsable Set-Cookie header");
            return;
        };
        let value = Some(cookie.value().to_string());
        match cookie.name() {
            "access_token" => self.access_token = value,
            "refresh_token" => self.refresh_token = value,
            "org_code" => self.org_code = value,
            _ => {}
        }
    }
}

#[derive(Debug)]
pub enum OrbitApiClientError {
    Ureq(Box<ureq::Error>),
    IO(Box<std::io::Error>),
    Api { code: ApiErrorCode, message: String },
    Validation(ValidationError),
}

impl OrbitApiClientError {
    /// The error class shown to the user. Transport failures count as internal.
    pub fn code(&self) -> ApiErrorCode {
        match self {
            OrbitApiClientError::Ureq(_) | OrbitApiClientError::IO(_) => ApiErrorCode::Internal,
            OrbitApiClientError::Api { code, .. } => *code,
            OrbitApiClientError::Validation(_) => ApiErrorCode::BadRequest,
        }
    }
}

impl std::fmt::Display for OrbitApiClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitApiClientError::Ureq(e) => write!(f, "request failed: {e}"),
            OrbitApiClientError::IO(e) => write!(f, "unreadable response: {e}"),
            OrbitApiClientError::Api { code, message } => write!(f, "{code:?}: {message}"),
            OrbitApiClientError::Validation(e) => write!(f, "{e}"),
        }
    }
}

fn into_client_error(e: ureq::Error) -> OrbitApiClientError {
    match e {
        ureq::Error::Status(status, response) => {
            let code = ApiErrorCode::from_status(status);
            match response.into_json::<ApiErrorBody>() {
                Ok(body) => OrbitApiClientError::Api {
                    code: body.code,
                    message: body.message,
                },
                Err(_) => OrbitApiClientError::Api {
                    code,
                    message: code.default_message().to_string(),
                },
            }
        }
        e => OrbitApiClientError::Ureq(Box::new(e)),
    }
}

#[derive(Debug, Clone)]
pub struct OrbitApiClient {
    pub base_url: String,
    session: Arc<Mutex<ClientSession>>,
}

impl OrbitApiClient {
    pub fn new(base_url: String, session: ClientSession) -> Self {
        let mut base_url = base_url;
        if base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Current session, including tokens refreshed by the server.
    pub fn session(&self) -> ClientSession {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_session(&self, request: ureq::Request) -> ureq::Request {
        match self.session().cookie_header() {
            Some(cookies) => request.set("Cookie", &cookies),
            None => request,
        }
    }

    fn remember_cookies(&self, response: &ureq::Response) {
        let headers = response.all("set-cookie");
        if headers.is_empty() {
            return;
        }
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        for header in headers {
            session.apply_set_cookie(header);
        }
        log::debug!("session cookies updated by {}", response.get_url());
    }

    pub fn list_workspaces(&self) -> Result<ListWorkspacesResponse, OrbitApiClientError> {
        let url = format!("{}{}", self.base_url, WORKSPACE_PATH);
        let list_workspaces_res: ListWorkspacesResponse = self
            .with_session(ureq::get(&url))
            .call()
            .map_err(into_client_error)?
            .into_json()
            .map_err(|e| OrbitApiClientError::IO(Box::new(e)))?;
        Ok(list_workspaces_res)
    }

    pub fn create_workspace(
        &self,
        input: &WorkspaceInput,
    ) -> Result<CreateWorkspaceResponse, OrbitApiClientError> {
        let url = format!("{}{}", self.base_url, WORKSPACE_PATH);
        let response = self
            .with_session(ureq::post(&url))
            .send_json(input.to_request())
            .map_err(into_client_error)?;
        self.remember_cookies(&response);
        let create_workspace_res: CreateWorkspaceResponse = response
            .into_json()
            .map_err(|e| OrbitApiClientError::IO(Box::new(e)))?;
        Ok(create_workspace_res)
    }

    /// Validates `name` locally and only then sends the request.
    pub fn create_workspace_named(
        &self,
        name: &str,
    ) -> Result<CreateWorkspaceResponse, OrbitApiClientError> {
        let input = WorkspaceInput::new(name).map_err(OrbitApiClientError::Validation)?;
        self.create_workspace(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OrbitApiClient::new("http://localhost:8512/".to_string(), ClientSession::default());
        assert_eq!(client.base_url, "http://localhost:8512");
    }

    #[test]
    fn test_cookie_header() {
        assert_eq!(ClientSession::default().cookie_header(), None);
        let session = ClientSession {
            access_token: Some("a".to_string()),
            refresh_token: None,
            org_code: Some("org_1".to_string()),
        };
        assert_eq!(
            session.cookie_header().as_deref(),
            Some("access_token=a; org_code=org_1")
        );
    }

    #[test]
    fn test_set_cookie_updates_session() {
        let mut session = ClientSession {
            access_token: Some("old".to_string()),
            refresh_token: Some("old-refresh".to_string()),
            org_code: None,
        };
        session.apply_set_cookie("access_token=new; HttpOnly; SameSite=Lax; Path=/");
        session.apply_set_cookie("refresh_token=new-refresh; Path=/");
        session.apply_set_cookie("tracking=1");
        session.apply_set_cookie("garbage");
        session.apply_set_cookie("=orphan; Path=/");
        assert_eq!(
            session,
            ClientSession {
                access_token: Some("new".to_string()),
                refresh_token: Some("new-refresh".to_string()),
                org_code: None,
            }
        );
    }

    #[test]
    fn test_empty_name_is_rejected_before_any_request() {
        // Nothing listens on the discard port; reaching the network would
        // produce a transport error instead.
        let client = OrbitApiClient::new("http://127.0.0.1:9".to_string(), ClientSession::default());
        let err = client.create_workspace_named("   ").unwrap_err();
        assert!(matches!(
            err,
            OrbitApiClientError::Validation(ValidationError::EmptyName)
        ));
        assert_eq!(err.code(), ApiErrorCode::BadRequest);
    }
}
