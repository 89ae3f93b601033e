// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory cloud provider for tests.

use super::{
    Action, ActionStatus, CloudError, CloudProvider, Created, Server, ServerRequest,
    ServerStatus, ServerType, SshKey, Volume, VolumeRequest,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudCall {
    ListServers,
    CreateServer(ServerRequest),
    DeleteServer(u64),
    FindVolume(String),
    CreateVolume(VolumeRequest),
    DeleteVolume(u64),
    GetAction(u64),
    ImageExists(String),
    LocationExists(String),
    FindSshKey(String),
    SetSshKeyLabels { id: u64, labels: BTreeMap<String, String> },
    ListServerTypes,
}

struct PendingAction {
    /// `get_action` calls that still report `running`.
    polls_left: u32,
    outcome: Action,
}

struct FakeCloudState {
    next_id: u64,
    servers: Vec<Server>,
    volumes: Vec<Volume>,
    ssh_keys: Vec<SshKey>,
    server_types: Vec<ServerType>,
    images: Vec<String>,
    locations: Vec<String>,
    actions: HashMap<u64, PendingAction>,
    calls: Vec<CloudCall>,
    volume_create_error: Option<String>,
    server_create_error: Option<String>,
    server_action_error: Option<String>,
    failing_server_deletes: u32,
    action_polls: u32,
}

impl FakeCloudState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn pending_action(&mut self, error: Option<String>) -> Action {
        let id = self.next_id();
        let status = if error.is_some() { ActionStatus::Error } else { ActionStatus::Success };
        self.actions.insert(
            id,
            PendingAction { polls_left: self.action_polls, outcome: Action { id, status, error } },
        );
        Action { id, status: ActionStatus::Running, error: None }
    }
}

/// Fake cloud provider for testing
#[derive(Clone)]
pub struct FakeCloudProvider {
    inner: Arc<Mutex<FakeCloudState>>,
}

impl Default for FakeCloudProvider {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeCloudState {
                next_id: 0,
                servers: Vec::new(),
                volumes: Vec::new(),
                ssh_keys: Vec::new(),
                server_types: Vec::new(),
                images: vec!["ubuntu-24.04".to_string()],
                locations: vec!["nbg1".to_string()],
                actions: HashMap::new(),
                calls: Vec::new(),
                volume_create_error: None,
                server_create_error: None,
                server_action_error: None,
                failing_server_deletes: 0,
                action_polls: 1,
            })),
        }
    }
}

impl FakeCloudProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an SSH key. Returns its id.
    pub fn add_ssh_key(&self, name: &str, public_key: &str) -> u64 {
        let mut state = self.inner.lock();
        let id = state.next_id();
        state.ssh_keys.push(SshKey {
            id,
            name: name.to_string(),
            fingerprint: format!("fp:{id}"),
            public_key: public_key.to_string(),
            labels: BTreeMap::new(),
        });
        id
    }

    /// Add an existing server with a public IPv4 address.
    pub fn add_server(&self, name: &str, status: ServerStatus) -> Server {
        let mut state = self.inner.lock();
        let id = state.next_id();
        let server = Server {
            id,
            name: name.to_string(),
            status,
            ipv4: Some(format!("10.0.0.{id}")),
            ipv6_net: None,
        };
        state.servers.push(server.clone());
        server
    }

    /// Add an unattached volume.
    pub fn add_volume(&self, name: &str) -> Volume {
        let mut state = self.inner.lock();
        let id = state.next_id();
        let volume = Volume {
            id,
            name: name.to_string(),
            linux_device: Some(device_path(id)),
            server: None,
        };
        state.volumes.push(volume.clone());
        volume
    }

    pub fn set_server_types(&self, types: Vec<ServerType>) {
        self.inner.lock().server_types = types;
    }

    pub fn remove_image(&self, name: &str) {
        self.inner.lock().images.retain(|i| i != name);
    }

    /// Make volume creation fail with an API error.
    pub fn fail_volume_create(&self, message: &str) {
        self.inner.lock().volume_create_error = Some(message.to_string());
    }

    /// Make server creation fail with an API error.
    pub fn fail_server_create(&self, message: &str) {
        self.inner.lock().server_create_error = Some(message.to_string());
    }

    /// Accept server creation but finish its action with an error.
    pub fn fail_server_action(&self, message: &str) {
        self.inner.lock().server_action_error = Some(message.to_string());
    }

    /// Fail the next `n` server deletions.
    pub fn fail_server_deletes(&self, n: u32) {
        self.inner.lock().failing_server_deletes = n;
    }

    /// How many polls new actions report `running` before finishing.
    pub fn set_action_polls(&self, polls: u32) {
        self.inner.lock().action_polls = polls;
    }

    pub fn servers(&self) -> Vec<Server> {
        self.inner.lock().servers.clone()
    }

    pub fn volumes(&self) -> Vec<Volume> {
        self.inner.lock().volumes.clone()
    }

    pub fn ssh_key(&self, name: &str) -> Option<SshKey> {
        self.inner.lock().ssh_keys.iter().find(|k| k.name == name).cloned()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<CloudCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of recorded calls matching a predicate.
    pub fn count_calls(&self, pred: impl Fn(&CloudCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| pred(c)).count()
    }
}

fn device_path(volume_id: u64) -> String {
    format!("/dev/disk/by-id/scsi-0HC_Volume_{volume_id}")
}

#[async_trait]
impl CloudProvider for FakeCloudProvider {
    async fn list_servers(&self) -> Result<Vec<Server>, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::ListServers);
        Ok(state.servers.clone())
    }

    async fn create_server(
        &self,
        request: &ServerRequest,
    ) -> Result<Created<Server>, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::CreateServer(request.clone()));
        if let Some(message) = state.server_create_error.clone() {
            return Err(CloudError::Api { status: 422, code: "invalid_input".into(), message });
        }
        if state.servers.iter().any(|s| s.name == request.name) {
            return Err(CloudError::Api {
                status: 409,
                code: "uniqueness_error".into(),
                message: format!("server name {} is already used", request.name),
            });
        }
        let id = state.next_id();
        let server = Server {
            id,
            name: request.name.clone(),
            status: ServerStatus::Running,
            ipv4: Some(format!("10.0.0.{id}")),
            ipv6_net: Some("2001:db8::/64".to_string()),
        };
        for volume in state.volumes.iter_mut().filter(|v| request.volumes.contains(&v.id)) {
            volume.server = Some(id);
        }
        state.servers.push(server.clone());
        let error = state.server_action_error.clone();
        let action = state.pending_action(error);
        Ok(Created { resource: server, action: Some(action) })
    }

    async fn delete_server(&self, id: u64) -> Result<Option<Action>, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::DeleteServer(id));
        if state.failing_server_deletes > 0 {
            state.failing_server_deletes -= 1;
            return Err(CloudError::Http("connection reset".into()));
        }
        let before = state.servers.len();
        state.servers.retain(|s| s.id != id);
        if state.servers.len() == before {
            return Err(CloudError::NotFound(format!("server {id}")));
        }
        for volume in state.volumes.iter_mut().filter(|v| v.server == Some(id)) {
            volume.server = None;
        }
        let action = state.pending_action(None);
        Ok(Some(action))
    }

    async fn find_volume(&self, name: &str) -> Result<Option<Volume>, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::FindVolume(name.to_string()));
        Ok(state.volumes.iter().find(|v| v.name == name).cloned())
    }

    async fn create_volume(
        &self,
        request: &VolumeRequest,
    ) -> Result<Created<Volume>, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::CreateVolume(request.clone()));
        if let Some(message) = state.volume_create_error.clone() {
            return Err(CloudError::Api { status: 422, code: "invalid_input".into(), message });
        }
        let id = state.next_id();
        let volume = Volume {
            id,
            name: request.name.clone(),
            linux_device: Some(device_path(id)),
            server: None,
        };
        state.volumes.push(volume.clone());
        let action = state.pending_action(None);
        Ok(Created { resource: volume, action: Some(action) })
    }

    async fn delete_volume(&self, id: u64) -> Result<(), CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::DeleteVolume(id));
        let before = state.volumes.len();
        state.volumes.retain(|v| v.id != id);
        if state.volumes.len() == before {
            return Err(CloudError::NotFound(format!("volume {id}")));
        }
        Ok(())
    }

    async fn get_action(&self, id: u64) -> Result<Action, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::GetAction(id));
        let pending = state
            .actions
            .get_mut(&id)
            .ok_or_else(|| CloudError::NotFound(format!("action {id}")))?;
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return Ok(Action { id, status: ActionStatus::Running, error: None });
        }
        Ok(pending.outcome.clone())
    }

    async fn image_exists(&self, name: &str) -> Result<bool, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::ImageExists(name.to_string()));
        Ok(state.images.iter().any(|i| i == name))
    }

    async fn location_exists(&self, name: &str) -> Result<bool, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::LocationExists(name.to_string()));
        Ok(state.locations.iter().any(|l| l == name))
    }

    async fn find_ssh_key(&self, name: &str) -> Result<Option<SshKey>, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::FindSshKey(name.to_string()));
        Ok(state.ssh_keys.iter().find(|k| k.name == name).cloned())
    }

    async fn set_ssh_key_labels(
        &self,
        id: u64,
        labels: &BTreeMap<String, String>,
    ) -> Result<SshKey, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::SetSshKeyLabels { id, labels: labels.clone() });
        let key = state
            .ssh_keys
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| CloudError::NotFound(format!("ssh key {id}")))?;
        key.labels = labels.clone();
        Ok(key.clone())
    }

    async fn list_server_types(&self) -> Result<Vec<ServerType>, CloudError> {
        let mut state = self.inner.lock();
        state.calls.push(CloudCall::ListServerTypes);
        Ok(state.server_types.clone())
    }
}
