//! HTTP middleware (CORS, 404 handler)

use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::types::ApiError;
use crate::core::config::is_all_interfaces;

/// Origins allowed to call the API from a browser
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    /// Derive the origins from the bind address
    pub fn new(host: &str, port: u16) -> Self {
        let is_all = is_all_interfaces(host);

        // Loopback and wildcard binds are reachable as both localhost and 127.0.0.1
        let base_hosts: Vec<&str> = if is_all || host == "127.0.0.1" || host == "localhost" {
            vec!["localhost", "127.0.0.1"]
        } else {
            vec![host]
        };

        let mut origins: Vec<String> = base_hosts
            .iter()
            .flat_map(|h| [format!("http://{}:{}", h, port), format!("http://{}", h)])
            .collect();

        if is_all && let Ok(interfaces) = local_ip_address::list_afinet_netifas() {
            origins.extend(
                interfaces
                    .iter()
                    .filter(|(_, ip)| ip.is_ipv4() && !ip.is_loopback())
                    .map(|(_, ip)| format!("http://{}:{}", ip, port)),
            );
        }

        Self { origins }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }

    fn as_header_values(&self) -> Vec<HeaderValue> {
        self.origins.iter().filter_map(|o| o.parse().ok()).collect()
    }
}

/// CORS for the generated CRUD methods
pub fn cors(allowed: &AllowedOrigins) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed.as_header_values()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
}

/// Fallback for unknown routes, including unregistered entity names
pub async fn handle_404(req: Request) -> Response {
    tracing::debug!(method = %req.method(), uri = %req.uri(), "No route");
    ApiError::not_found(
        "NOT_FOUND",
        format!("No route for {} {}", req.method(), req.uri().path()),
    )
    .into_response()
}
