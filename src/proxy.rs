//! CORS proxy for browser clients.
//!
//! Forwards `GET /{endpoint}` to the upstream feed producer for the two
//! configured feed names only, and answers with the raw protobuf plus CORS
//! headers for allow-listed origins.

use actix_web::http::{Method, StatusCode};
use actix_web::{App, HttpRequest, HttpResponse, HttpResponseBuilder, HttpServer, web};
use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use crate::config::{FeedsConfig, ProxyConfig};
use crate::fetch::{BasicClient, WithHeader, fetch_bytes};

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

pub struct ProxyState {
    client: WithHeader<BasicClient>,
    feeds: FeedsConfig,
    proxy: ProxyConfig,
}

impl ProxyState {
    pub fn new(feeds: FeedsConfig, proxy: ProxyConfig) -> Result<Self> {
        let client = WithHeader::user_agent(BasicClient::new()?, &feeds.user_agent)?;
        Ok(Self {
            client,
            feeds,
            proxy,
        })
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.proxy.allowed_origins.iter().any(|o| o == origin) || origin.ends_with(".github.io")
    }

    fn with_cors(&self, req: &HttpRequest, mut builder: HttpResponseBuilder) -> HttpResponseBuilder {
        builder
            .insert_header(("Access-Control-Allow-Methods", "GET, OPTIONS"))
            .insert_header(("Access-Control-Allow-Headers", "Content-Type"))
            .insert_header(("Access-Control-Max-Age", "86400"));

        if let Some(origin) = req.headers().get("Origin").and_then(|o| o.to_str().ok()) {
            if self.origin_allowed(origin) {
                builder.insert_header(("Access-Control-Allow-Origin", origin));
            }
        }

        builder
    }
}

async fn handle(req: HttpRequest, state: web::Data<ProxyState>) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return state
            .with_cors(&req, HttpResponse::build(StatusCode::NO_CONTENT))
            .finish();
    }

    let endpoint = req.path().strip_prefix('/').unwrap_or(req.path());
    if !state.feeds.endpoints().contains(&endpoint) {
        warn!(endpoint, "Rejected proxy request for unknown endpoint");
        return state
            .with_cors(&req, HttpResponse::build(StatusCode::BAD_REQUEST))
            .json(json!({ "error": "Invalid endpoint" }));
    }

    let url = state.feeds.url_for(endpoint);
    match fetch_bytes(&state.client, &url).await {
        Ok(bytes) => {
            info!(endpoint, bytes = bytes.len(), "Proxied feed");
            state
                .with_cors(&req, HttpResponse::build(StatusCode::OK))
                .insert_header(("Content-Type", PROTOBUF_CONTENT_TYPE))
                .insert_header((
                    "Cache-Control",
                    format!("public, max-age={}", state.proxy.cache_max_age_secs),
                ))
                .body(bytes)
        }
        Err(e) => {
            warn!(endpoint, error = %e, "Upstream fetch failed");
            state
                .with_cors(&req, HttpResponse::build(StatusCode::BAD_GATEWAY))
                .json(json!({ "error": e.to_string() }))
        }
    }
}

/// Registers the proxy route; every path and method goes through [`handle`].
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{endpoint:.*}", web::route().to(handle));
}

/// Runs the proxy until the server is stopped.
pub async fn serve(feeds: FeedsConfig, proxy: ProxyConfig, bind: &str) -> Result<()> {
    let state = web::Data::new(ProxyState::new(feeds, proxy)?);

    info!(bind, "Starting feed proxy");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(bind)
        .with_context(|| format!("Failed to bind proxy to {bind}"))?
        .run()
        .await?;

    Ok(())
}
