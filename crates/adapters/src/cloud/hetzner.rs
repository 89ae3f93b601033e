// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hetzner Cloud REST client.

use super::{
    Action, ActionStatus, CloudError, CloudProvider, Created, Price, Server, ServerRequest,
    ServerStatus, ServerType, SshKey, Volume, VolumeRequest,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.hetzner.cloud/v1";

const PAGE_SIZE: &str = "50";

/// Cloud provider backed by the Hetzner Cloud API.
#[derive(Clone)]
pub struct HetznerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HetznerClient {
    pub fn new(token: impl Into<String>) -> Result<Self, CloudError> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, CloudError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ham/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CloudError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_request(&self, path: &str, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(&self.token).query(query)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CloudError> {
        let response = self
            .get_request(path, query)
            .send()
            .await
            .map_err(|e| CloudError::Http(e.to_string()))?;
        decode(response).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, CloudError> {
        let response = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| CloudError::Http(e.to_string()))?;
        decode(response).await
    }

    async fn delete(&self, path: &str) -> Result<Option<ActionEnvelope>, CloudError> {
        let response = self
            .http
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| CloudError::Http(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }
}

/// Turn a response into `T`, or into a `CloudError` carrying the API's
/// error envelope.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CloudError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| CloudError::Decode(e.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

fn api_error(status: u16, body: &str) -> CloudError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if status == 404 => CloudError::NotFound(envelope.error.message),
        Ok(envelope) => CloudError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => CloudError::Api { status, code: "unknown".into(), message: body.to_string() },
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

#[derive(Deserialize)]
struct Meta {
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct Pagination {
    next_page: Option<u32>,
}

#[derive(Deserialize)]
struct ServersPage {
    servers: Vec<ApiServer>,
    meta: Option<Meta>,
}

#[derive(Deserialize)]
struct ApiServer {
    id: u64,
    name: String,
    status: String,
    public_net: ApiPublicNet,
}

#[derive(Deserialize)]
struct ApiPublicNet {
    ipv4: Option<ApiIp>,
    ipv6: Option<ApiIp>,
}

#[derive(Deserialize)]
struct ApiIp {
    ip: String,
}

impl From<ApiServer> for Server {
    fn from(s: ApiServer) -> Self {
        Server {
            id: s.id,
            name: s.name,
            status: ServerStatus::parse(&s.status),
            ipv4: s.public_net.ipv4.map(|ip| ip.ip),
            ipv6_net: s.public_net.ipv6.map(|ip| ip.ip),
        }
    }
}

#[derive(Deserialize)]
struct ApiAction {
    id: u64,
    status: String,
    error: Option<ApiErrorBody>,
}

impl From<ApiAction> for Action {
    fn from(a: ApiAction) -> Self {
        let status = match a.status.as_str() {
            "success" => ActionStatus::Success,
            "error" => ActionStatus::Error,
            _ => ActionStatus::Running,
        };
        Action { id: a.id, status, error: a.error.map(|e| e.message) }
    }
}

#[derive(Deserialize)]
struct ActionEnvelope {
    action: Option<ApiAction>,
}

#[derive(Deserialize)]
struct CreatedServer {
    server: ApiServer,
    action: Option<ApiAction>,
}

#[derive(Deserialize)]
struct ApiVolume {
    id: u64,
    name: String,
    linux_device: Option<String>,
    server: Option<u64>,
}

impl From<ApiVolume> for Volume {
    fn from(v: ApiVolume) -> Self {
        Volume { id: v.id, name: v.name, linux_device: v.linux_device, server: v.server }
    }
}

#[derive(Deserialize)]
struct VolumesPage {
    volumes: Vec<ApiVolume>,
}

#[derive(Deserialize)]
struct CreatedVolume {
    volume: ApiVolume,
    action: Option<ApiAction>,
}

#[derive(Deserialize)]
struct NamedResource {
    #[allow(dead_code)]
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct ImagesPage {
    images: Vec<NamedResource>,
}

#[derive(Deserialize)]
struct LocationsPage {
    locations: Vec<NamedResource>,
}

#[derive(Deserialize)]
struct ApiSshKey {
    id: u64,
    name: String,
    fingerprint: String,
    public_key: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl From<ApiSshKey> for SshKey {
    fn from(k: ApiSshKey) -> Self {
        SshKey {
            id: k.id,
            name: k.name,
            fingerprint: k.fingerprint,
            public_key: k.public_key,
            labels: k.labels,
        }
    }
}

#[derive(Deserialize)]
struct SshKeysPage {
    ssh_keys: Vec<ApiSshKey>,
}

#[derive(Deserialize)]
struct SshKeyEnvelope {
    ssh_key: ApiSshKey,
}

#[derive(Deserialize)]
struct ServerTypesPage {
    server_types: Vec<ApiServerType>,
}

#[derive(Deserialize)]
struct ApiServerType {
    name: String,
    cores: u32,
    memory: f64,
    disk: u32,
    #[serde(default)]
    deprecated: Option<bool>,
    #[serde(default)]
    deprecation: Option<serde_json::Value>,
    prices: Vec<ApiPrice>,
}

#[derive(Deserialize)]
struct ApiPrice {
    location: String,
    price_hourly: ApiAmount,
    price_monthly: ApiAmount,
}

#[derive(Deserialize)]
struct ApiAmount {
    gross: String,
}

impl From<ApiServerType> for ServerType {
    fn from(t: ApiServerType) -> Self {
        let deprecated =
            t.deprecated.unwrap_or(false) || t.deprecation.is_some_and(|d| !d.is_null());
        let prices = t
            .prices
            .into_iter()
            .filter_map(|p| {
                Some(Price {
                    location: p.location,
                    hourly_gross: p.price_hourly.gross.parse().ok()?,
                    monthly_gross: p.price_monthly.gross.parse().ok()?,
                })
            })
            .collect();
        ServerType {
            name: t.name,
            cores: t.cores,
            memory_gb: t.memory,
            disk_gb: t.disk,
            deprecated,
            prices,
        }
    }
}

#[derive(Serialize)]
struct CreateServerBody<'a> {
    name: &'a str,
    server_type: &'a str,
    image: &'a str,
    location: &'a str,
    ssh_keys: &'a [u64],
    volumes: &'a [u64],
    labels: &'a BTreeMap<String, String>,
    start_after_create: bool,
    automount: bool,
    public_net: PublicNetBody,
}

#[derive(Serialize)]
struct PublicNetBody {
    enable_ipv4: bool,
    enable_ipv6: bool,
}

#[derive(Serialize)]
struct CreateVolumeBody<'a> {
    name: &'a str,
    size: u32,
    location: &'a str,
    automount: bool,
}

#[derive(Serialize)]
struct LabelsBody<'a> {
    labels: &'a BTreeMap<String, String>,
}

// ── Provider impl ───────────────────────────────────────────────────────

#[async_trait]
impl CloudProvider for HetznerClient {
    async fn list_servers(&self) -> Result<Vec<Server>, CloudError> {
        let mut servers = Vec::new();
        let mut page = 1;
        loop {
            let page_arg = page.to_string();
            let result: ServersPage = self
                .get("/servers", &[("page", &page_arg), ("per_page", PAGE_SIZE)])
                .await?;
            servers.extend(result.servers.into_iter().map(Server::from));
            match result.meta.and_then(|m| m.pagination).and_then(|p| p.next_page) {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }
        Ok(servers)
    }

    async fn create_server(
        &self,
        request: &ServerRequest,
    ) -> Result<Created<Server>, CloudError> {
        let body = CreateServerBody {
            name: &request.name,
            server_type: &request.server_type,
            image: &request.image,
            location: &request.location,
            ssh_keys: &request.ssh_keys,
            volumes: &request.volumes,
            labels: &request.labels,
            start_after_create: true,
            automount: false,
            public_net: PublicNetBody { enable_ipv4: true, enable_ipv6: true },
        };
        let created: CreatedServer =
            self.send_json(reqwest::Method::POST, "/servers", &body).await?;
        Ok(Created { resource: created.server.into(), action: created.action.map(Action::from) })
    }

    async fn delete_server(&self, id: u64) -> Result<Option<Action>, CloudError> {
        let envelope = self.delete(&format!("/servers/{id}")).await?;
        Ok(envelope.and_then(|e| e.action).map(Action::from))
    }

    async fn find_volume(&self, name: &str) -> Result<Option<Volume>, CloudError> {
        let page: VolumesPage = self.get("/volumes", &[("name", name)]).await?;
        Ok(page.volumes.into_iter().find(|v| v.name == name).map(Volume::from))
    }

    async fn create_volume(
        &self,
        request: &VolumeRequest,
    ) -> Result<Created<Volume>, CloudError> {
        let body = CreateVolumeBody {
            name: &request.name,
            size: request.size_gb,
            location: &request.location,
            automount: request.automount,
        };
        let created: CreatedVolume =
            self.send_json(reqwest::Method::POST, "/volumes", &body).await?;
        Ok(Created { resource: created.volume.into(), action: created.action.map(Action::from) })
    }

    async fn delete_volume(&self, id: u64) -> Result<(), CloudError> {
        self.delete(&format!("/volumes/{id}")).await.map(|_| ())
    }

    async fn get_action(&self, id: u64) -> Result<Action, CloudError> {
        let envelope: ActionEnvelope = self.get(&format!("/actions/{id}"), &[]).await?;
        envelope
            .action
            .map(Action::from)
            .ok_or_else(|| CloudError::Decode(format!("action {id} missing from response")))
    }

    async fn image_exists(&self, name: &str) -> Result<bool, CloudError> {
        let page: ImagesPage = self.get("/images", &[("name", name)]).await?;
        Ok(page.images.iter().any(|i| i.name == name))
    }

    async fn location_exists(&self, name: &str) -> Result<bool, CloudError> {
        let page: LocationsPage =
            self.get("/locations", &[("name", name)]).await?;
        Ok(page.locations.iter().any(|l| l.name == name))
    }

    async fn find_ssh_key(&self, name: &str) -> Result<Option<SshKey>, CloudError> {
        let page: SshKeysPage = self.get("/ssh_keys", &[("name", name)]).await?;
        Ok(page.ssh_keys.into_iter().find(|k| k.name == name).map(SshKey::from))
    }

    async fn set_ssh_key_labels(
        &self,
        id: u64,
        labels: &BTreeMap<String, String>,
    ) -> Result<SshKey, CloudError> {
        let envelope: SshKeyEnvelope = self
            .send_json(reqwest::Method::PUT, &format!("/ssh_keys/{id}"), &LabelsBody { labels })
            .await?;
        Ok(envelope.ssh_key.into())
    }

    async fn list_server_types(&self) -> Result<Vec<ServerType>, CloudError> {
        let page: ServerTypesPage = self.get("/server_types", &[("per_page", PAGE_SIZE)]).await?;
        Ok(page.server_types.into_iter().map(ServerType::from).collect())
    }
}

#[cfg(test)]
#[path = "hetzner_tests.rs"]
mod tests;
