//! Local HTTP API
//!
//! Listens on 127.0.0.1 and serves JSON:
//! - GET /ping, GET /modules, GET /modules/{id}, GET /badges
//! - POST /users (registration)
//! - GET /users/me, GET /progress, GET /progress/modules/{id}
//! - GET /exercises/{id}, POST /exercises/{id}/submit
//!
//! The acting user is named by `X-Learnpath-User`. When `server.auth_token`
//! is set every request must also carry it in `X-Learnpath-Token`.
//!
//! The token is shared and not bound to a user: any client holding it can
//! act as any user by setting `X-Learnpath-User`. Keep the server on
//! localhost or put an authenticating proxy in front of it.

mod handlers;
mod types;

pub use handlers::{dispatch, error_response};
pub use types::{
    ApiRequest, ApiResponse, ExerciseResponse, ExerciseSummary, ModuleResponse, RegisterRequest,
    SubmitRequest,
};

use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use tiny_http::{Request, Response, Server};
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use crate::config::ServerSettings;
use crate::pipeline::SubmissionPipeline;

const AUTH_HEADER: &str = "X-Learnpath-Token";
const USER_HEADER: &str = "X-Learnpath-User";

/// Running server; requests are accepted until [`HttpServer::shutdown`]
pub struct HttpServer {
    server: Arc<Server>,
    thread: Option<JoinHandle<()>>,
    port: u16,
}

impl HttpServer {
    /// Bind and start accepting on a background thread.
    ///
    /// Each request is handled as a task on `runtime`. Port 0 picks a free port.
    pub fn start(
        settings: &ServerSettings,
        pipeline: SubmissionPipeline,
        runtime: Handle,
    ) -> Result<Self> {
        let bind_addr = format!("127.0.0.1:{}", settings.port);
        let server = Server::http(&bind_addr)
            .map_err(|e| anyhow!("Failed to start server on {}: {}", bind_addr, e))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .unwrap_or(settings.port);
        let server = Arc::new(server);

        let auth_token = Some(settings.auth_token.clone()).filter(|t| !t.trim().is_empty());
        info!(
            "[learnpath:http] Server listening on http://127.0.0.1:{} (auth: {})",
            port,
            if auth_token.is_some() { "enabled" } else { "disabled" }
        );

        let max_body = settings.max_body_bytes;
        let accept = server.clone();
        let thread = thread::spawn(move || {
            for mut request in accept.incoming_requests() {
                if !is_authorized(&request, auth_token.as_deref()) {
                    respond_json(
                        request,
                        ApiResponse::error(401, "unauthorized", "missing or wrong token"),
                    );
                    continue;
                }

                let body = match read_request_body(&mut request, max_body) {
                    Ok(body) => body,
                    Err(response) => {
                        respond_json(request, response);
                        continue;
                    }
                };

                let api_request = ApiRequest {
                    method: request.method().to_string(),
                    path: request.url().to_string(),
                    user: header_value(&request, USER_HEADER),
                    body,
                };

                let pipeline = pipeline.clone();
                runtime.spawn(async move {
                    debug!(
                        "[learnpath:http] {} {}",
                        api_request.method, api_request.path
                    );
                    let response = dispatch(&pipeline, api_request).await;
                    // tiny_http writes are blocking
                    let _ = tokio::task::spawn_blocking(move || respond_json(request, response))
                        .await;
                });
            }
            debug!("[learnpath:http] Accept loop stopped");
        });

        Ok(Self {
            server,
            thread: Some(thread),
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting and wait for the accept loop to exit
    pub fn shutdown(mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("[learnpath:http] Accept thread panicked");
            }
        }
    }
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

fn is_authorized(request: &Request, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    header_value(request, AUTH_HEADER).is_some_and(|v| v == expected)
}

fn json_content_type() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header is valid")
}

fn read_request_body(request: &mut Request, max_body: usize) -> Result<String, ApiResponse> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((max_body + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("[learnpath:http] Failed to read body: {}", e);
        return Err(ApiResponse::error(400, "bad_request", e));
    }

    if body.len() > max_body {
        return Err(ApiResponse::error(
            413,
            "payload_too_large",
            format!("body exceeds {max_body} bytes"),
        ));
    }

    Ok(body)
}

fn respond_json(request: Request, response: ApiResponse) {
    let body = serde_json::to_string(&response.body)
        .unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(response.status)
        .with_header(json_content_type());
    if let Err(e) = request.respond(response) {
        debug!("[learnpath:http] Client went away: {}", e);
    }
}
