// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key/value labels shared with the remote build agent.
//!
//! Build outcomes are recorded under the build identity as key. The store
//! is backed by the labels of a long-lived SSH key object on the provider
//! account, so it survives every server the builds create and destroy.

use crate::cloud::{CloudError, CloudProvider};
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from label store operations
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("label holder {0:?} not found")]
    HolderMissing(String),
    #[error(transparent)]
    Cloud(#[from] CloudError),
}

/// Adapter for the durable label store
#[async_trait]
pub trait LabelStore: Clone + Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, LabelError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), LabelError>;

    async fn list(&self) -> Result<BTreeMap<String, String>, LabelError>;
}

/// Label store backed by the labels of a named SSH key.
#[derive(Clone)]
pub struct SshKeyLabelStore<P: CloudProvider> {
    provider: P,
    holder: String,
}

impl<P: CloudProvider> SshKeyLabelStore<P> {
    pub fn new(provider: P, holder: impl Into<String>) -> Self {
        Self { provider, holder: holder.into() }
    }

    async fn labels(&self) -> Result<(u64, BTreeMap<String, String>), LabelError> {
        let key = self
            .provider
            .find_ssh_key(&self.holder)
            .await?
            .ok_or_else(|| LabelError::HolderMissing(self.holder.clone()))?;
        Ok((key.id, key.labels))
    }
}

#[async_trait]
impl<P: CloudProvider> LabelStore for SshKeyLabelStore<P> {
    async fn get(&self, key: &str) -> Result<Option<String>, LabelError> {
        let (_, mut labels) = self.labels().await?;
        Ok(labels.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LabelError> {
        let (id, mut labels) = self.labels().await?;
        labels.insert(key.to_string(), value.to_string());
        self.provider.set_ssh_key_labels(id, &labels).await?;
        tracing::debug!(holder = %self.holder, %key, %value, "label updated");
        Ok(())
    }

    async fn list(&self) -> Result<BTreeMap<String, String>, LabelError> {
        Ok(self.labels().await?.1)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{LabelError, LabelStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeLabelState {
        labels: BTreeMap<String, String>,
        /// Values returned by upcoming `get` calls, ahead of `labels`.
        scripted: VecDeque<Option<String>>,
        gets: usize,
        sets: Vec<(String, String)>,
    }

    /// Fake label store for testing
    #[derive(Clone, Default)]
    pub struct FakeLabelStore {
        inner: Arc<Mutex<FakeLabelState>>,
    }

    impl FakeLabelStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, key: &str, value: &str) {
            self.inner.lock().labels.insert(key.to_string(), value.to_string());
        }

        /// Queue the results of the next `get` calls.
        pub fn script_reads(&self, reads: impl IntoIterator<Item = Option<&'static str>>) {
            self.inner.lock().scripted.extend(reads.into_iter().map(|r| r.map(str::to_string)));
        }

        pub fn get_count(&self) -> usize {
            self.inner.lock().gets
        }

        /// All recorded `set` calls
        pub fn sets(&self) -> Vec<(String, String)> {
            self.inner.lock().sets.clone()
        }
    }

    #[async_trait]
    impl LabelStore for FakeLabelStore {
        async fn get(&self, key: &str) -> Result<Option<String>, LabelError> {
            let mut state = self.inner.lock();
            state.gets += 1;
            if let Some(value) = state.scripted.pop_front() {
                return Ok(value);
            }
            Ok(state.labels.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), LabelError> {
            let mut state = self.inner.lock();
            state.labels.insert(key.to_string(), value.to_string());
            state.sets.push((key.to_string(), value.to_string()));
            Ok(())
        }

        async fn list(&self) -> Result<BTreeMap<String, String>, LabelError> {
            Ok(self.inner.lock().labels.clone())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLabelStore;

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
