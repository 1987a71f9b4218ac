use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use orbit_common::clock::Clock;
use orbit_identity::provider::IdentityProvider;

use crate::{error::ApiError, session::CookieSettings, state::ApiState};

use self::workspace::{create::workspace_create, list::workspace_list};

pub mod workspace;

pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub identity: IdentityProvider,
    pub clock: Clock,
    pub default_org_code: Option<String>,
    pub admin_role: String,
    pub secure_cookies: bool,
}

/// Registers the workspace procedures. Malformed JSON bodies are answered
/// with the same error body as every other failure.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("rejected request body: {err}");
        ApiError::BadRequest(err.to_string()).into()
    });
    cfg.app_data(json_config)
        .service(workspace_list)
        .service(workspace_create);
}

fn cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials();
    for origin in allowed_origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let state = ApiState::new(
        config.identity,
        config.clock,
        CookieSettings {
            secure: config.secure_cookies,
        },
        config.default_org_code,
        config.admin_role,
    );
    let allowed_origins = config.allowed_origins;
    let reconciliation = state.reconciliation.clone();

    log::info!("listening on {}:{}", config.bind, config.port);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .bind((config.bind.as_str(), config.port))?
    .run();
    let result = server.await;

    let pending = reconciliation.report_pending();
    if pending > 0 {
        log::error!("stopping with {pending} organizations still needing reconciliation");
    }
    result
}
