//! Full-system extraction
//!
//! Walks each configured microservice root, extracts every Java source
//! file in parallel and assembles the results into one
//! [`MicroserviceSystem`] snapshot. Per-file failures never abort the
//! build: each one becomes a [`Diagnostic`] and the file is skipped.
//!
//! Output is deterministic regardless of walk or scheduling order:
//! services are sorted by name and files by repository-relative path.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::catalog::is_source_file;
use crate::config::Config;
use crate::extractor::extract_class;
use crate::model::{JClass, MethodCall, Microservice, MicroserviceSystem};

/// A recoverable problem encountered while building a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Repository-relative path the problem was found at.
    pub path: String,
    pub message: String,
}

/// A built snapshot together with the diagnostics accumulated along
/// the way.
#[derive(Debug)]
pub struct SystemBuild {
    pub system: MicroserviceSystem,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build a snapshot of the whole system rooted at `repo_root`.
///
/// Each configured service root is walked recursively for `.java` files;
/// everything else is ignored. A missing root directory yields a
/// diagnostic and that service is skipped, so a partially checked-out
/// repository still produces a usable snapshot of the rest.
pub fn build_system(config: &Config, repo_root: &Path, commit: &str) -> SystemBuild {
    let services: Vec<(String, &str)> = config.services().collect();
    let known_names: Vec<&str> = services.iter().map(|(name, _)| name.as_str()).collect();

    let mut diagnostics = Vec::new();
    let mut microservices = Vec::new();

    for (name, root) in &services {
        if !repo_root.join(root).is_dir() {
            diagnostics.push(Diagnostic {
                path: (*root).to_string(),
                message: format!("microservice root not found under repository: {root}"),
            });
            continue;
        }
        let (mut files, mut service_diags) = build_service(repo_root, name, root);
        for file in &mut files {
            validate_targets(file, &known_names);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        diagnostics.append(&mut service_diags);
        microservices.push(Microservice {
            name: name.clone(),
            path: (*root).to_string(),
            files,
        });
    }

    microservices.sort_by(|a, b| a.name.cmp(&b.name));

    SystemBuild {
        system: MicroserviceSystem {
            name: config.system_name.clone(),
            commit_id: commit.to_string(),
            microservices,
        },
        diagnostics,
    }
}

/// Walk one service root and extract its source files in parallel.
fn build_service(
    repo_root: &Path,
    service: &str,
    root: &str,
) -> (Vec<JClass>, Vec<Diagnostic>) {
    let service_dir = repo_root.join(root);
    let sources: Vec<String> = WalkDir::new(&service_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| relative_path(repo_root, entry.path()))
        .filter(|path| is_source_file(path))
        .collect();

    let results: Vec<Result<JClass, Diagnostic>> = sources
        .par_iter()
        .map(|path| extract_one(repo_root, service, path))
        .collect();

    let mut files = Vec::new();
    let mut diagnostics = Vec::new();
    for result in results {
        match result {
            Ok(class) => files.push(class),
            Err(diag) => diagnostics.push(diag),
        }
    }
    (files, diagnostics)
}

fn extract_one(repo_root: &Path, service: &str, path: &str) -> Result<JClass, Diagnostic> {
    let source = fs::read_to_string(repo_root.join(path)).map_err(|e| Diagnostic {
        path: path.to_string(),
        message: format!("failed to read source file: {e}"),
    })?;
    extract_class(path, &source, service).map_err(|e| Diagnostic {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Blank out rest-call targets that do not name a configured service.
/// The extractor records any host token it finds; only tokens matching a
/// real service name survive into the snapshot.
fn validate_targets(class: &mut JClass, known_names: &[&str]) {
    for call in &mut class.method_calls {
        if let MethodCall::Rest(rest) = call {
            if !rest.target.is_empty() && !known_names.contains(&rest.target.as_str()) {
                rest.target.clear();
            }
        }
    }
}

fn relative_path(repo_root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(repo_root).ok()?;
    let text = relative.to_str()?;
    // Keep paths portable in serialized snapshots
    Some(text.replace('\\', "/"))
}
