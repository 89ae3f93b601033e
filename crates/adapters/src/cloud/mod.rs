// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud provider adapter
//!
//! The orchestrator only talks to the provider through [`CloudProvider`].
//! Servers and volumes are addressed by name (unique per account) or by
//! numeric id; asynchronous operations hand back an [`Action`] that can be
//! polled until it reaches a terminal status.

mod hetzner;

pub use hetzner::{HetznerClient, DEFAULT_API_URL};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CloudCall, FakeCloudProvider};

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from cloud provider operations
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("api error {status} ({code}): {message}")]
    Api { status: u16, code: String, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Lifecycle status of a server as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Initializing,
    Starting,
    Running,
    Stopping,
    Off,
    Deleting,
    Other,
}

impl ServerStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "initializing" => ServerStatus::Initializing,
            "starting" => ServerStatus::Starting,
            "running" => ServerStatus::Running,
            "stopping" => ServerStatus::Stopping,
            "off" => ServerStatus::Off,
            "deleting" => ServerStatus::Deleting,
            _ => ServerStatus::Other,
        }
    }
}

/// A rented server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub id: u64,
    pub name: String,
    pub status: ServerStatus,
    pub ipv4: Option<String>,
    /// IPv6 network in CIDR form (e.g. `2001:db8:1::/64`).
    pub ipv6_net: Option<String>,
}

impl Server {
    /// `host:22` address for SSH; IPv4 preferred, otherwise the first host
    /// of the IPv6 network.
    pub fn ssh_address(&self) -> Option<String> {
        if let Some(ip) = &self.ipv4 {
            return Some(format!("{ip}:22"));
        }
        let net = self.ipv6_net.as_deref()?;
        let prefix = net.split('/').next()?;
        let host = if prefix.ends_with("::") { format!("{prefix}1") } else { prefix.to_string() };
        Some(format!("[{host}]:22"))
    }
}

/// A block-storage volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub id: u64,
    pub name: String,
    /// Device path on the guest (e.g. `/dev/disk/by-id/scsi-0HC_Volume_42`).
    pub linux_device: Option<String>,
    pub server: Option<u64>,
}

/// Terminal-or-not status of an asynchronous provider action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Running,
    Success,
    Error,
}

/// Handle to an asynchronous provider operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: u64,
    pub status: ActionStatus,
    pub error: Option<String>,
}

/// A freshly created resource plus the action that is still provisioning it.
#[derive(Debug, Clone)]
pub struct Created<T> {
    pub resource: T,
    pub action: Option<Action>,
}

/// Parameters for a new volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRequest {
    pub name: String,
    pub size_gb: u32,
    pub location: String,
    pub automount: bool,
}

impl VolumeRequest {
    pub const MIN_SIZE_GB: u32 = 10;
    pub const MAX_SIZE_GB: u32 = 10_240;

    /// Check the request before sending it.
    pub fn validate(&self) -> Result<(), CloudError> {
        if self.name.is_empty() {
            return Err(CloudError::Invalid("volume name is empty".into()));
        }
        if self.location.is_empty() {
            return Err(CloudError::Invalid("volume location is empty".into()));
        }
        if !(Self::MIN_SIZE_GB..=Self::MAX_SIZE_GB).contains(&self.size_gb) {
            return Err(CloudError::Invalid(format!(
                "volume size {} GB outside {}..={}",
                self.size_gb,
                Self::MIN_SIZE_GB,
                Self::MAX_SIZE_GB
            )));
        }
        Ok(())
    }
}

/// Parameters for a new server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRequest {
    pub name: String,
    pub server_type: String,
    pub image: String,
    pub location: String,
    pub ssh_keys: Vec<u64>,
    pub volumes: Vec<u64>,
    pub labels: BTreeMap<String, String>,
}

/// An SSH key registered with the account. Its labels double as the
/// durable label store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
    pub fingerprint: String,
    pub public_key: String,
    pub labels: BTreeMap<String, String>,
}

impl SshKey {
    /// Compare the key material with an OpenSSH public key line, ignoring
    /// the trailing comment.
    pub fn matches_public_key(&self, public_key: &str) -> bool {
        fn material(key: &str) -> Vec<&str> {
            key.split_whitespace().take(2).collect()
        }
        let ours = material(public_key);
        ours.len() == 2 && ours == material(&self.public_key)
    }
}

/// Price of a server type at one location.
#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub location: String,
    pub hourly_gross: f64,
    pub monthly_gross: f64,
}

/// A purchasable server size.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerType {
    pub name: String,
    pub cores: u32,
    pub memory_gb: f64,
    pub disk_gb: u32,
    pub deprecated: bool,
    pub prices: Vec<Price>,
}

impl ServerType {
    pub fn price_at(&self, location: &str) -> Option<&Price> {
        self.prices.iter().find(|p| p.location == location)
    }
}

/// Adapter for the cloud provider's API
#[async_trait]
pub trait CloudProvider: Clone + Send + Sync + 'static {
    /// All servers on the account.
    async fn list_servers(&self) -> Result<Vec<Server>, CloudError>;

    /// Create a server. The returned action tracks provisioning.
    async fn create_server(&self, request: &ServerRequest)
        -> Result<Created<Server>, CloudError>;

    /// Delete a server by id.
    async fn delete_server(&self, id: u64) -> Result<Option<Action>, CloudError>;

    async fn find_volume(&self, name: &str) -> Result<Option<Volume>, CloudError>;

    async fn create_volume(&self, request: &VolumeRequest)
        -> Result<Created<Volume>, CloudError>;

    async fn delete_volume(&self, id: u64) -> Result<(), CloudError>;

    /// Current state of an action.
    async fn get_action(&self, id: u64) -> Result<Action, CloudError>;

    /// Whether an OS image with this name is available.
    async fn image_exists(&self, name: &str) -> Result<bool, CloudError>;

    /// Whether a location with this name exists.
    async fn location_exists(&self, name: &str) -> Result<bool, CloudError>;

    async fn find_ssh_key(&self, name: &str) -> Result<Option<SshKey>, CloudError>;

    /// Replace the labels of an SSH key.
    async fn set_ssh_key_labels(
        &self,
        id: u64,
        labels: &BTreeMap<String, String>,
    ) -> Result<SshKey, CloudError>;

    async fn list_server_types(&self) -> Result<Vec<ServerType>, CloudError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
