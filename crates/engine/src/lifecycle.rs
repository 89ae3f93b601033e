// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server lifecycle: discovery, creation with its data volume, and teardown.
//!
//! Provider errors propagate as-is; nothing here retries. Creation cleans up
//! the volume it made when a later step fails.

use ham_adapters::{
    Action, ActionStatus, CloudError, CloudProvider, Server, ServerRequest, ServerStatus,
    ServerType, SshKey, VolumeRequest,
};
use ham_core::{BuildIdentity, ACTION_POLL_INTERVAL};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// OS image every build server boots.
pub const IMAGE: &str = "ubuntu-24.04";
/// Datacenter location for servers, volumes and prices.
pub const LOCATION: &str = "nbg1";
/// SSH key that must exist on the account; its labels hold build outcomes.
pub const SSH_KEY_NAME: &str = "ham-ssh-key";
/// Account key added to servers when present.
pub const DEFAULT_KEY_NAME: &str = "default";
/// Size of the build data volume.
pub const VOLUME_SIZE_GB: u32 = 400;

/// Errors from server lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error("image {0} is not available")]
    ImageMissing(String),
    #[error("location {0} does not exist")]
    LocationMissing(String),
    #[error("ssh key {0} not found on the account")]
    SshKeyMissing(String),
    #[error("ssh key {0} does not match the configured public key")]
    SshKeyMismatch(String),
    #[error("action {id} failed: {message}")]
    ActionFailed { id: u64, message: String },
    #[error("no server type available under {}", format_ceiling(.ceiling))]
    NoServerType { ceiling: Option<f64> },
    #[error("server {0} has no public address")]
    NoAddress(String),
}

fn format_ceiling(ceiling: &Option<f64>) -> String {
    match ceiling {
        Some(price) => format!("{price:.4}/h"),
        None => "any price".to_string(),
    }
}

/// A located build server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRef {
    pub id: u64,
    pub identity: BuildIdentity,
    /// `host:22` address for SSH.
    pub address: String,
}

impl ServerRef {
    fn from_server(identity: &BuildIdentity, server: &Server) -> Result<Self, LifecycleError> {
        let address =
            server.ssh_address().ok_or_else(|| LifecycleError::NoAddress(server.name.clone()))?;
        Ok(Self { id: server.id, identity: identity.clone(), address })
    }
}

/// Finds, creates and destroys build servers.
#[derive(Clone)]
pub struct ServerLifecycle<P: CloudProvider> {
    cloud: P,
}

impl<P: CloudProvider> ServerLifecycle<P> {
    pub fn new(cloud: P) -> Self {
        Self { cloud }
    }

    /// The server named after `identity`, if one exists.
    pub async fn find_existing(
        &self,
        identity: &BuildIdentity,
    ) -> Result<Option<ServerRef>, LifecycleError> {
        let servers = self.cloud.list_servers().await?;
        match servers.iter().find(|s| s.name == identity.as_str()) {
            Some(server) => {
                tracing::info!(server = %identity, id = server.id, "found existing server");
                ServerRef::from_server(identity, server).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Check that the designated SSH key exists and matches `public_key`.
    pub async fn verify_ssh_key(&self, public_key: &str) -> Result<SshKey, LifecycleError> {
        let key = self
            .cloud
            .find_ssh_key(SSH_KEY_NAME)
            .await?
            .ok_or_else(|| LifecycleError::SshKeyMissing(SSH_KEY_NAME.to_string()))?;
        if !key.matches_public_key(public_key) {
            return Err(LifecycleError::SshKeyMismatch(SSH_KEY_NAME.to_string()));
        }
        Ok(key)
    }

    /// Create the data volume, then the server with the volume attached.
    pub async fn create_server(
        &self,
        identity: &BuildIdentity,
        server_type: &str,
    ) -> Result<ServerRef, LifecycleError> {
        if !self.cloud.image_exists(IMAGE).await? {
            return Err(LifecycleError::ImageMissing(IMAGE.to_string()));
        }
        if !self.cloud.location_exists(LOCATION).await? {
            return Err(LifecycleError::LocationMissing(LOCATION.to_string()));
        }
        let ssh_keys = self.resolve_ssh_keys().await?;

        let volume_request = VolumeRequest {
            name: identity.volume_name(),
            size_gb: VOLUME_SIZE_GB,
            location: LOCATION.to_string(),
            automount: false,
        };
        volume_request.validate()?;
        let volume = self.cloud.create_volume(&volume_request).await?;
        let volume_id = volume.resource.id;
        tracing::info!(volume = %volume_request.name, id = volume_id, "volume created");
        if let Err(e) = self.wait_for_action(volume.action.as_ref()).await {
            self.rollback_volume(volume_id).await;
            return Err(e);
        }

        let request = ServerRequest {
            name: identity.to_string(),
            server_type: server_type.to_string(),
            image: IMAGE.to_string(),
            location: LOCATION.to_string(),
            ssh_keys,
            volumes: vec![volume_id],
            labels: BTreeMap::from([("managed-by".to_string(), "ham".to_string())]),
        };
        let created = match self.cloud.create_server(&request).await {
            Ok(created) => created,
            Err(e) => {
                self.rollback_volume(volume_id).await;
                return Err(e.into());
            }
        };
        tracing::info!(server = %identity, id = created.resource.id, %server_type, "server created");
        if let Err(e) = self.wait_for_action(created.action.as_ref()).await {
            self.rollback_volume(volume_id).await;
            return Err(e);
        }
        ServerRef::from_server(identity, &created.resource)
    }

    /// Block until a provider action finishes.
    pub async fn wait_for_action(&self, action: Option<&Action>) -> Result<(), LifecycleError> {
        let Some(action) = action else {
            return Ok(());
        };
        let mut current = action.clone();
        loop {
            match current.status {
                ActionStatus::Success => return Ok(()),
                ActionStatus::Error => {
                    return Err(LifecycleError::ActionFailed {
                        id: current.id,
                        message: current.error.unwrap_or_else(|| "unknown error".to_string()),
                    })
                }
                ActionStatus::Running => {
                    tokio::time::sleep(ACTION_POLL_INTERVAL).await;
                    current = self.cloud.get_action(current.id).await?;
                }
            }
        }
    }

    /// Pick the most capable non-deprecated type priced at [`LOCATION`],
    /// optionally under a gross hourly price ceiling.
    pub async fn select_server_type(
        &self,
        ceiling: Option<f64>,
    ) -> Result<(f64, ServerType), LifecycleError> {
        let types = self.cloud.list_server_types().await?;
        types
            .into_iter()
            .filter(|t| !t.deprecated)
            .filter_map(|t| {
                let price = t.price_at(LOCATION)?.hourly_gross;
                Some((price, t))
            })
            .filter(|(price, _)| ceiling.map_or(true, |max| *price <= max))
            .max_by(|(_, a), (_, b)| performance(a, b))
            .ok_or(LifecycleError::NoServerType { ceiling })
    }

    /// Linux device of the build's data volume.
    pub async fn volume_device_for(
        &self,
        identity: &BuildIdentity,
    ) -> Result<Option<String>, LifecycleError> {
        let volume = self.cloud.find_volume(&identity.volume_name()).await?;
        Ok(volume.and_then(|v| v.linux_device))
    }

    /// Delete leftover build servers that have powered off.
    pub async fn reap_dead_servers(&self) -> Result<usize, LifecycleError> {
        let servers = self.cloud.list_servers().await?;
        let mut reaped = 0;
        for server in servers
            .iter()
            .filter(|s| s.status == ServerStatus::Off && BuildIdentity::is_build_name(&s.name))
        {
            tracing::info!(server = %server.name, id = server.id, "reaping powered-off server");
            let action = self.cloud.delete_server(server.id).await?;
            self.wait_for_action(action.as_ref()).await?;
            self.delete_volume_of(&BuildIdentity::from_name(&server.name)).await?;
            reaped += 1;
        }
        Ok(reaped)
    }

    /// Delete the build's server (if any) and then its data volume.
    ///
    /// Returns whether a server was deleted.
    pub async fn destroy(&self, identity: &BuildIdentity) -> Result<bool, LifecycleError> {
        let servers = self.cloud.list_servers().await?;
        let deleted = match servers.iter().find(|s| s.name == identity.as_str()) {
            Some(server) => {
                let action = self.cloud.delete_server(server.id).await?;
                self.wait_for_action(action.as_ref()).await?;
                tracing::info!(server = %identity, id = server.id, "server deleted");
                true
            }
            None => false,
        };
        self.delete_volume_of(identity).await?;
        Ok(deleted)
    }

    async fn delete_volume_of(&self, identity: &BuildIdentity) -> Result<(), LifecycleError> {
        if let Some(volume) = self.cloud.find_volume(&identity.volume_name()).await? {
            self.cloud.delete_volume(volume.id).await?;
            tracing::info!(volume = %volume.name, id = volume.id, "volume deleted");
        }
        Ok(())
    }

    async fn resolve_ssh_keys(&self) -> Result<Vec<u64>, LifecycleError> {
        let designated = self
            .cloud
            .find_ssh_key(SSH_KEY_NAME)
            .await?
            .ok_or_else(|| LifecycleError::SshKeyMissing(SSH_KEY_NAME.to_string()))?;
        let mut ids = vec![designated.id];
        if let Some(default) = self.cloud.find_ssh_key(DEFAULT_KEY_NAME).await? {
            ids.push(default.id);
        }
        Ok(ids)
    }

    async fn rollback_volume(&self, volume_id: u64) {
        match self.cloud.delete_volume(volume_id).await {
            Ok(()) => tracing::info!(id = volume_id, "rolled back volume"),
            Err(e) => tracing::error!(id = volume_id, error = %e, "volume rollback failed"),
        }
    }
}

/// Order server types by cores, then memory, then disk.
fn performance(a: &ServerType, b: &ServerType) -> Ordering {
    a.cores
        .cmp(&b.cores)
        .then(a.memory_gb.total_cmp(&b.memory_gb))
        .then(a.disk_gb.cmp(&b.disk_gb))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
