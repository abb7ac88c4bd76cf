//! HTTP client for the dispatch service.
//!
//! Transport failures become `Network`, non-2xx statuses become
//! `ServiceRejection`, undecodable bodies become `ParseFailure`. Shape
//! normalization is delegated to `wire`.

use crate::api::DispatchApi;
use crate::config::{RouteParamStyle, ServiceConfig};
use crate::wire;
use anyhow::{Context, Result};
use async_trait::async_trait;
use dispatch_shared::{
    Coord, DispatchError, DispatchResult, FacilityLookup, Incident, ResponderLookup, RoutePath,
    Zone,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest rejection body we keep for logs
const MAX_DETAIL_CHARS: usize = 200;

pub struct HttpDispatchClient {
    http: reqwest::Client,
    base_url: String,
    route_params: RouteParamStyle,
}

impl HttpDispatchClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("dispatchctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            route_params: config.route_params,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> DispatchResult<Value> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| DispatchError::Network(format!("{}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let mut detail = response.text().await.unwrap_or_default();
            detail.truncate(
                detail
                    .char_indices()
                    .nth(MAX_DETAIL_CHARS)
                    .map_or(detail.len(), |(i, _)| i),
            );
            warn!("{} returned HTTP {}", path, status.as_u16());
            return Err(DispatchError::ServiceRejection {
                status: status.as_u16(),
                detail,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DispatchError::Network(format!("{}: {}", path, e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DispatchError::ParseFailure(format!("{}: {}", path, e)))
    }
}

fn incident_query(at: Coord) -> [(&'static str, String); 2] {
    [
        ("event_latitude", at.latitude.to_string()),
        ("event_longitude", at.longitude.to_string()),
    ]
}

#[async_trait]
impl DispatchApi for HttpDispatchClient {
    async fn fetch_incidents(&self) -> DispatchResult<Vec<Incident>> {
        let body = self.get_json("/get_event_data", &[]).await?;
        wire::parse_incidents(&body)
    }

    async fn classify_zone(&self, incident: Coord) -> DispatchResult<Zone> {
        let body = self
            .get_json("/classify_zone", &incident_query(incident))
            .await?;
        wire::parse_zone(&body)
    }

    async fn nearest_responder(&self, incident: Coord) -> DispatchResult<ResponderLookup> {
        let body = self
            .get_json("/get_ambulance_data", &incident_query(incident))
            .await?;
        wire::parse_responder_lookup(&body)
    }

    async fn shortest_path(&self, start: Coord, end: Coord) -> DispatchResult<RoutePath> {
        let [start_lat, start_lon, end_lat, end_lon] = self.route_params.names();
        let query = [
            (start_lat, start.latitude.to_string()),
            (start_lon, start.longitude.to_string()),
            (end_lat, end.latitude.to_string()),
            (end_lon, end.longitude.to_string()),
        ];
        let body = self.get_json("/get_shortest_path", &query).await?;
        wire::parse_route(&body)
    }

    async fn nearest_facility(&self, incident: Coord) -> DispatchResult<FacilityLookup> {
        let body = self
            .get_json("/get_hospital_data", &incident_query(incident))
            .await?;
        wire::parse_facility_lookup(&body)
    }
}
