use actix_web::{
    cookie::{Cookie, SameSite},
    http::header,
    HttpRequest,
};
use orbit_identity::SessionTokens;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
/// Workspace the user picked in the UI.
pub const ORG_CODE_COOKIE: &str = "org_code";

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub secure: bool,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

fn cookie_value(req: &HttpRequest, name: &str) -> Option<String> {
    let cookie = req.cookie(name)?;
    let value = cookie.value();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

/// Session tokens sent with the request. An `Authorization: Bearer` header
/// takes precedence over the access token cookie.
pub fn tokens_from_request(req: &HttpRequest) -> Option<SessionTokens> {
    let access_token = bearer_token(req).or_else(|| cookie_value(req, ACCESS_TOKEN_COOKIE))?;
    Some(SessionTokens {
        access_token,
        refresh_token: cookie_value(req, REFRESH_TOKEN_COOKIE),
    })
}

pub fn requested_org_code(req: &HttpRequest) -> Option<String> {
    cookie_value(req, ORG_CODE_COOKIE)
}

/// Cookies replacing the session after a token refresh.
pub fn session_cookies(tokens: &SessionTokens, settings: &CookieSettings) -> Vec<Cookie<'static>> {
    let mut cookies = vec![build_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        settings,
    )];
    if let Some(refresh_token) = &tokens.refresh_token {
        cookies.push(build_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh_token.clone(),
            settings,
        ));
    }
    cookies
}

fn build_cookie(name: &'static str, value: String, settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .finish()
}
