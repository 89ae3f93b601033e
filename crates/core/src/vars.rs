// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved build variables and the guest-side vars document.

use crate::guest;
use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;

/// A resolved value for one recipe argument.
#[derive(Clone, PartialEq, Eq)]
pub enum VarValue {
    Value(String),
    Secret(String),
    FilePath(PathBuf),
}

impl fmt::Debug for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            VarValue::Secret(_) => f.debug_tuple("Secret").field(&"<redacted>").finish(),
            VarValue::FilePath(p) => f.debug_tuple("FilePath").field(p).finish(),
        }
    }
}

/// Resolved variables, in recipe argument order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildVariables {
    vars: IndexMap<String, VarValue>,
}

/// A local file scheduled for upload to a fixed guest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub local: PathBuf,
    pub remote: String,
}

/// JSON document uploaded to `/ham-files/vars.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VarsDocument(pub IndexMap<String, String>);

impl VarsDocument {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl BuildVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, id: impl Into<String>, value: VarValue) {
        self.vars.insert(id.into(), value);
    }

    pub fn get(&self, id: &str) -> Option<&VarValue> {
        self.vars.get(id)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Local paths of every file variable, in order.
    pub fn file_paths(&self) -> impl Iterator<Item = (&str, &PathBuf)> {
        self.vars.iter().filter_map(|(id, v)| match v {
            VarValue::FilePath(p) => Some((id.as_str(), p)),
            _ => None,
        })
    }

    /// Split into the vars document and the file uploads it references.
    ///
    /// The Nth file variable (1-based) is uploaded to `/ham-files/N`; the
    /// document carries that destination instead of the local path. Empty
    /// values are left out.
    pub fn to_document(&self) -> (VarsDocument, Vec<FileUpload>) {
        let mut doc = IndexMap::new();
        let mut uploads = Vec::new();
        for (id, value) in &self.vars {
            match value {
                VarValue::Value(v) | VarValue::Secret(v) => {
                    if !v.is_empty() {
                        doc.insert(id.clone(), v.clone());
                    }
                }
                VarValue::FilePath(local) => {
                    let remote = guest::file_slot(uploads.len() + 1);
                    doc.insert(id.clone(), remote.clone());
                    uploads.push(FileUpload { local: local.clone(), remote });
                }
            }
        }
        (VarsDocument(doc), uploads)
    }
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
