//! Retrieval-and-extraction driver
//!
//! Processes one function identifier at a time: cache check, resolve,
//! branch on package type, download if absent, extract if absent. Every
//! failure is isolated at the identifier boundary; nothing a single
//! identifier does can halt the loop over the rest.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{error, info};

use crate::aws::lambda::{FunctionApi, FunctionCode, PackageType};
use crate::cache::ArtifactCache;
use crate::discover::{self, artifact_key};

/// What the driver does after the archive is on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Workflow-scoped flow: archive plus extracted tree
    DownloadAndExtract,
    /// Account-wide flow: archive only
    DownloadOnly,
}

/// Terminal state of one identifier's processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Extracted,
    AlreadyExtracted,
    Downloaded,
    ArchiveCached,
    ImageSkipped,
}

impl Outcome {
    /// True when the artifact is on disk, whether this run put it there
    /// or found it there
    pub fn materialized(self) -> bool {
        !matches!(self, Outcome::ImageSkipped)
    }
}

/// Operator-facing totals for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub materialized: usize,
}

/// Drive one function identifier to a terminal state
///
/// Errors returned here are per-identifier failures; callers catch them at
/// the loop boundary.
pub async fn process_function<A: FunctionApi + ?Sized>(
    api: &A,
    cache: &ArtifactCache,
    identifier: &str,
    mode: Mode,
) -> Result<Outcome> {
    let key = artifact_key(identifier);

    match mode {
        Mode::DownloadAndExtract if cache.has_extracted(key) => {
            info!("Skipping {} (already extracted)", key);
            return Ok(Outcome::AlreadyExtracted);
        }
        Mode::DownloadOnly if cache.has_archive(key) => {
            info!("Skipping {} (already downloaded)", key);
            return Ok(Outcome::ArchiveCached);
        }
        _ => {}
    }

    info!("Fetching {}...", key);
    let descriptor = api
        .get_function(identifier)
        .await
        .with_context(|| format!("Failed to resolve '{}'", identifier))?;

    let location = match descriptor.code {
        FunctionCode::Image => {
            info!("{} uses a container image, skipping archive download", key);
            return Ok(Outcome::ImageSkipped);
        }
        FunctionCode::Archive { location } => location,
    };

    if cache.has_archive(key) {
        info!("Using cached archive {:?}", cache.archive_path(key));
    } else {
        let bytes = api
            .download_archive(&location)
            .await
            .with_context(|| format!("Failed to download archive for '{}'", key))?;
        let path = cache.write_archive(key, &bytes)?;
        info!("Downloaded {:?}", path);
    }

    if mode == Mode::DownloadOnly {
        return Ok(Outcome::Downloaded);
    }

    let tree = cache
        .extract_archive(key)
        .with_context(|| format!("Failed to extract archive for '{}'", key))?;
    info!("Extracted into {:?}", tree);
    Ok(Outcome::Extracted)
}

/// Run the driver over a batch of identifiers, isolating every failure
///
/// Two distinct identifiers that collapse to the same artifact key would
/// silently overwrite each other on disk; the later one is reported as a
/// failure instead.
pub async fn process_all<A: FunctionApi + ?Sized>(
    api: &A,
    cache: &ArtifactCache,
    identifiers: &[String],
    mode: Mode,
) -> RunSummary {
    let mut summary = RunSummary {
        discovered: identifiers.len(),
        materialized: 0,
    };
    let mut claimed: HashMap<String, String> = HashMap::new();

    for identifier in identifiers {
        let key = artifact_key(identifier);
        if let Some(previous) = claimed.get(key) {
            if previous != identifier {
                error!(
                    "Failed to process {}: artifact key '{}' collides with {}",
                    identifier, key, previous
                );
                continue;
            }
        } else {
            claimed.insert(key.to_string(), identifier.clone());
        }

        match process_function(api, cache, identifier, mode).await {
            Ok(outcome) if outcome.materialized() => summary.materialized += 1,
            Ok(_) => {}
            Err(err) => error!("Failed to process {}: {:#}", identifier, err),
        }
    }

    summary
}

/// Workflow-scoped flow: walk one definition document, download and
/// extract every Lambda it references
pub async fn run_workflow<A: FunctionApi + ?Sized>(
    api: &A,
    cache: &ArtifactCache,
    definition: &Value,
) -> RunSummary {
    let functions = discover::lambda_resources(definition);
    info!(
        "Found {} Lambda function(s) in the state machine definition",
        functions.len()
    );

    process_all(api, cache, &functions, Mode::DownloadAndExtract).await
}

/// Account-wide flow: paginate the full function inventory, download
/// every archive-packaged function (no extraction)
///
/// A listing failure aborts the flow; per-function failures do not.
pub async fn run_account<A: FunctionApi + ?Sized>(
    api: &A,
    cache: &ArtifactCache,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut marker: Option<String> = None;

    loop {
        let page = api
            .list_functions(marker.as_deref())
            .await
            .context("Failed to list functions")?;

        for function in &page.functions {
            summary.discovered += 1;

            // The listing already names the package type; no resolve round
            // trip needed to skip image-packaged functions
            if function.package_type == PackageType::Image {
                info!(
                    "{} uses a container image, skipping archive download",
                    function.function_name
                );
                continue;
            }

            match process_function(api, cache, &function.function_name, Mode::DownloadOnly).await {
                Ok(outcome) if outcome.materialized() => summary.materialized += 1,
                Ok(_) => {}
                Err(err) => error!("Failed to process {}: {:#}", function.function_name, err),
            }
        }

        marker = page.next_marker;
        if marker.is_none() {
            break;
        }
    }

    Ok(summary)
}
