//! Delta engine
//!
//! Turns a list of file-level changes between two commits, already
//! classified ADD/MODIFY/DELETE by the version-control collaborator,
//! into a typed [`SystemChange`]. ADD and MODIFY deltas carry the
//! re-extracted class from the new working tree; DELETE deltas do not,
//! consumers look up the prior shape in the old snapshot by path.
//!
//! The engine is idempotent: the same change list over the same working
//! tree always yields a value-equal `SystemChange`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::builder::Diagnostic;
use crate::catalog::{is_build_descriptor, is_source_file};
use crate::config::Config;
use crate::extractor::extract_class;
use crate::model::{ChangeKind, Delta, MicroserviceSystem, SystemChange};

/// One raw change record as reported by the version-control collaborator.
/// A rename arrives as a single record with both paths set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub kind: ChangeKind,
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub new_path: Option<String>,
}

impl FileChange {
    fn path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }
}

/// Fatal delta-engine errors. These indicate an upstream mismatch between
/// the change list and the snapshots, not a recoverable per-file problem.
#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("change record carries neither an old nor a new path")]
    MissingPath,

    #[error("delta references microservice '{0}' absent from both snapshots")]
    UnknownMicroservice(String),
}

impl DeltaError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DeltaError::MissingPath => 7,
            DeltaError::UnknownMicroservice(_) => 8,
        }
    }
}

/// A built change set plus the diagnostics accumulated along the way.
#[derive(Debug)]
pub struct DeltaBuild {
    pub change: SystemChange,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build a [`SystemChange`] from raw change records.
///
/// Changes outside the configured service roots, and non-source files
/// other than build descriptors, are excluded silently. Build-descriptor
/// changes are recorded without a re-extracted class; rule-checking
/// consumers skip them when evaluating source-structural rules. A file
/// that cannot be read or parsed on ADD/MODIFY yields a diagnostic and
/// no delta. Exactly one delta survives per path; duplicates in the
/// input keep the first occurrence.
pub fn extract_system_change(
    config: &Config,
    repo_root: &Path,
    old_system: &MicroserviceSystem,
    new_system: &MicroserviceSystem,
    changes: &[FileChange],
    old_commit: &str,
    new_commit: &str,
) -> Result<DeltaBuild, DeltaError> {
    let mut deltas = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for change in changes {
        let path = change.path().ok_or(DeltaError::MissingPath)?;

        let Some((service, _)) = config.owning_service(path) else {
            continue;
        };
        if !seen.insert(path.to_string()) {
            continue;
        }

        if matches!(change.kind, ChangeKind::Modify | ChangeKind::Delete)
            && old_system.microservice(&service).is_none()
            && new_system.microservice(&service).is_none()
        {
            return Err(DeltaError::UnknownMicroservice(service));
        }

        if is_build_descriptor(path) {
            deltas.push(Delta {
                old_path: change.old_path.clone(),
                new_path: change.new_path.clone(),
                kind: change.kind,
                changed_file: None,
            });
            continue;
        }
        if !is_source_file(path) {
            continue;
        }

        let changed_file = match change.kind {
            ChangeKind::Delete => None,
            ChangeKind::Add | ChangeKind::Modify => {
                match reextract(repo_root, path, &service) {
                    Ok(class) => Some(class),
                    Err(diag) => {
                        diagnostics.push(diag);
                        continue;
                    }
                }
            }
        };

        deltas.push(Delta {
            old_path: change.old_path.clone(),
            new_path: change.new_path.clone(),
            kind: change.kind,
            changed_file,
        });
    }

    Ok(DeltaBuild {
        change: SystemChange {
            old_commit: old_commit.to_string(),
            new_commit: new_commit.to_string(),
            deltas,
        },
        diagnostics,
    })
}

fn reextract(
    repo_root: &Path,
    path: &str,
    service: &str,
) -> Result<crate::model::JClass, Diagnostic> {
    let source = fs::read_to_string(repo_root.join(path)).map_err(|e| Diagnostic {
        path: path.to_string(),
        message: format!("failed to read changed file: {e}"),
    })?;
    extract_class(path, &source, service).map_err(|e| Diagnostic {
        path: path.to_string(),
        message: e.to_string(),
    })
}
