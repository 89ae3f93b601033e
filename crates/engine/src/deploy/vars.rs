// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build variable collection.

use super::DeployError;
use ham_adapters::Prompter;
use ham_core::{ArgKind, BuildIdentity, BuildVariables, Recipe, VarValue, VarsDocument};
use std::path::{Path, PathBuf};

/// Pre-supplied argument values (`--answers` file), keyed by argument id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers(VarsDocument);

impl Answers {
    /// Parse a JSON object of string values.
    pub fn parse(json: &str) -> Result<Self, DeployError> {
        serde_json::from_str(json).map(Self).map_err(|e| DeployError::Answers(e.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id)
    }
}

/// Resolve a value for every recipe argument, in order.
///
/// For each argument: the answers document wins; otherwise an optional
/// argument is skipped under `no_confirm`; otherwise the user is prompted.
/// Required arguments must end up non-empty and file arguments must exist.
pub fn collect_variables(
    recipe: &Recipe,
    answers: Option<&Answers>,
    no_confirm: bool,
    prompter: &dyn Prompter,
) -> Result<BuildVariables, DeployError> {
    let mut vars = BuildVariables::new();
    for arg in &recipe.args {
        let value = match answers.and_then(|a| a.get(&arg.id)) {
            Some(value) => value.to_string(),
            None if no_confirm && !arg.required => {
                tracing::debug!(arg = %arg.id, "optional argument skipped");
                continue;
            }
            None => prompter.ask(&arg.prompt, arg.kind == ArgKind::Secret)?,
        };

        if value.is_empty() {
            if arg.required {
                return Err(DeployError::RequiredEmpty(arg.id.clone()));
            }
            if arg.kind == ArgKind::File {
                continue;
            }
        }

        let value = match arg.kind {
            ArgKind::Value => VarValue::Value(value),
            ArgKind::Secret => VarValue::Secret(value),
            ArgKind::File => {
                let path = PathBuf::from(&value);
                if !path.is_file() {
                    return Err(DeployError::MissingFile { id: arg.id.clone(), path });
                }
                VarValue::FilePath(path)
            }
        };
        vars.put(arg.id.clone(), value);
    }
    Ok(vars)
}

/// Write the vars document as `<dir>/<identity>-vars.json`.
pub fn write_vars_document(
    document: &VarsDocument,
    dir: &Path,
    identity: &BuildIdentity,
) -> Result<PathBuf, DeployError> {
    let path = dir.join(identity.vars_file_name());
    std::fs::write(&path, serde_json::to_vec_pretty(document)?)?;
    Ok(path)
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
