//! Blocking HTTP implementation of `PlannerBackend`.
//!
//! # Responsibility
//! - Map each backend operation to its REST method and path.
//! - Translate transport failures, non-2xx responses and undecodable bodies
//!   into `BackendError`.
//!
//! # Invariants
//! - Path segments are percent-encoded; ids never alter the route shape.
//! - Session cookies persist across calls (credentials included).
//! - Only ids, methods and status codes are logged, never bodies.

use crate::config::ClientConfig;
use crate::model::planner::{Card, Lane, Planner};
use crate::model::template::PlannerTemplate;
use crate::sync::backend::{
    AddCardRequest, AddLaneRequest, CreatePlannerRequest, ImportMarkdownRequest, MoveCardRequest,
    PlannerBackend, ReorderCardsRequest, ReorderLanesRequest, SplitLaneRequest,
    UpdateCardRequest, UpdateLaneRequest, UpdatePlannerRequest,
};
use crate::sync::error::{BackendError, BackendResult};
use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Instant;

/// REST client for the planner backend.
#[derive(Debug, Clone)]
pub struct HttpPlannerBackend {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpPlannerBackend {
    /// Builds a client from validated configuration.
    ///
    /// # Errors
    /// - `BackendError::Network` when the base URL or TLS setup is unusable.
    pub fn new(config: &ClientConfig) -> BackendResult<Self> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|err| {
            BackendError::Network(format!("invalid base url `{}`: {err}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Network(format!(
                "base url `{}` cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| BackendError::Network(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    /// Joins `segments` onto the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                BackendError::Network(format!("base url `{}` cannot carry a path", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> BackendResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    fn execute(&self, method: Method, segments: &[&str], builder: RequestBuilder) -> BackendResult<Response> {
        let started_at = Instant::now();
        let route = segments.join("/");
        let response = match builder.send() {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "event=http_request module=sync status=error method={} route={} duration_ms={} error_code=network_error error={}",
                    method,
                    route,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(BackendError::Network(err.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            warn!(
                "event=http_request module=sync status=error method={} route={} duration_ms={} http_status={}",
                method,
                route,
                started_at.elapsed().as_millis(),
                status.as_u16()
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!(
            "event=http_request module=sync status=ok method={} route={} duration_ms={} http_status={}",
            method,
            route,
            started_at.elapsed().as_millis(),
            status.as_u16()
        );
        Ok(response)
    }

    fn call_json<T: DeserializeOwned>(&self, method: Method, segments: &[&str]) -> BackendResult<T> {
        let builder = self.request(method.clone(), segments)?;
        decode_json(self.execute(method, segments, builder)?)
    }

    fn call_json_with<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> BackendResult<T> {
        let builder = self.request(method.clone(), segments)?.json(body);
        decode_json(self.execute(method, segments, builder)?)
    }

    fn call_empty(&self, method: Method, segments: &[&str]) -> BackendResult<()> {
        let builder = self.request(method.clone(), segments)?;
        self.execute(method, segments, builder).map(drop)
    }

    fn call_empty_with<B: Serialize>(&self, method: Method, segments: &[&str], body: &B) -> BackendResult<()> {
        let builder = self.request(method.clone(), segments)?.json(body);
        self.execute(method, segments, builder).map(drop)
    }
}

fn decode_json<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    let body = response
        .text()
        .map_err(|err| BackendError::Network(format!("failed to read response body: {err}")))?;
    serde_json::from_str(&body).map_err(|err| BackendError::InvalidResponse(err.to_string()))
}

impl PlannerBackend for HttpPlannerBackend {
    fn list_templates(&self) -> BackendResult<Vec<PlannerTemplate>> {
        self.call_json(Method::GET, &["planner", "templates"])
    }

    fn create_planner(&self, request: &CreatePlannerRequest) -> BackendResult<Planner> {
        self.call_json_with(Method::POST, &["planner"], request)
    }

    fn get_planner(&self, planner_id: &str) -> BackendResult<Planner> {
        self.call_json(Method::GET, &["planner", planner_id])
    }

    fn update_planner(&self, planner_id: &str, request: &UpdatePlannerRequest) -> BackendResult<Planner> {
        self.call_json_with(Method::PUT, &["planner", planner_id], request)
    }

    fn delete_planner(&self, planner_id: &str) -> BackendResult<()> {
        self.call_empty(Method::DELETE, &["planner", planner_id])
    }

    fn add_lane(&self, planner_id: &str, request: &AddLaneRequest) -> BackendResult<Lane> {
        self.call_json_with(Method::POST, &["planner", planner_id, "lane"], request)
    }

    fn update_lane(&self, planner_id: &str, lane_id: &str, request: &UpdateLaneRequest) -> BackendResult<Lane> {
        self.call_json_with(Method::PUT, &["planner", planner_id, "lane", lane_id], request)
    }

    fn delete_lane(&self, planner_id: &str, lane_id: &str) -> BackendResult<()> {
        self.call_empty(Method::DELETE, &["planner", planner_id, "lane", lane_id])
    }

    fn split_lane(&self, planner_id: &str, lane_id: &str, request: &SplitLaneRequest) -> BackendResult<Lane> {
        self.call_json_with(
            Method::POST,
            &["planner", planner_id, "lane", lane_id, "split"],
            request,
        )
    }

    fn reorder_lanes(&self, planner_id: &str, request: &ReorderLanesRequest) -> BackendResult<()> {
        self.call_empty_with(Method::PUT, &["planner", planner_id, "lanes", "reorder"], request)
    }

    fn add_card(&self, planner_id: &str, lane_id: &str, request: &AddCardRequest) -> BackendResult<Card> {
        self.call_json_with(
            Method::POST,
            &["planner", planner_id, "lane", lane_id, "card"],
            request,
        )
    }

    fn update_card(
        &self,
        planner_id: &str,
        lane_id: &str,
        card_id: &str,
        request: &UpdateCardRequest,
    ) -> BackendResult<Card> {
        self.call_json_with(
            Method::PUT,
            &["planner", planner_id, "lane", lane_id, "card", card_id],
            request,
        )
    }

    fn delete_card(&self, planner_id: &str, lane_id: &str, card_id: &str) -> BackendResult<()> {
        self.call_empty(
            Method::DELETE,
            &["planner", planner_id, "lane", lane_id, "card", card_id],
        )
    }

    fn reorder_cards(&self, planner_id: &str, lane_id: &str, request: &ReorderCardsRequest) -> BackendResult<()> {
        self.call_empty_with(
            Method::PUT,
            &["planner", planner_id, "lane", lane_id, "cards", "reorder"],
            request,
        )
    }

    fn move_card(&self, planner_id: &str, card_id: &str, request: &MoveCardRequest) -> BackendResult<Card> {
        self.call_json_with(
            Method::PUT,
            &["planner", planner_id, "card", card_id, "move"],
            request,
        )
    }

    fn export_markdown(&self, planner_id: &str) -> BackendResult<String> {
        let segments = ["planner", planner_id, "export"];
        let builder = self.request(Method::GET, &segments)?;
        self.execute(Method::GET, &segments, builder)?
            .text()
            .map_err(|err| BackendError::Network(format!("failed to read response body: {err}")))
    }

    fn import_markdown(&self, request: &ImportMarkdownRequest) -> BackendResult<Planner> {
        self.call_json_with(Method::POST, &["planner", "import"], request)
    }
}
