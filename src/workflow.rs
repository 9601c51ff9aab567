//! Upload → analyze → poll workflow
//!
//! A [`Session`] owns the state one user works with: the identity, the
//! currently selected images, and the ids the backend returned for them.
//! Each action reports its own failures to the [`Surface`] (alert plus an
//! `error!` log line) and always clears the busy indicator before
//! returning, whether it succeeded or not.

use crate::api::{AnalyzeError, ApiClient, AssetId, FetchError, UploadError};
use crate::cancel::CancellationToken;
use crate::config::{ClientConfig, IdTracking, PollSchedule};
use crate::db::Database;
use crate::poll::{PollReport, QuickPoll};
use crate::status::{classify_records, ResultRow};
use crate::surface::Surface;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Extensions picked up when a directory is selected
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif", "tif", "tiff",
];

pub const MSG_SELECT_FIRST: &str = "Select at least one image first.";
pub const MSG_ANALYSIS_STARTED: &str = "Analysis started. Results will follow shortly...";
pub const MSG_LOADING: &str = "Fetching results...";
pub const MSG_NOT_READY: &str = "Results are not ready yet. Try again in a moment.";
pub const MSG_FETCH_FAILED: &str = "Could not load results. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("no images selected")]
    NothingSelected,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub struct Session {
    client: ApiClient,
    identity: String,
    tracking: IdTracking,
    poll: QuickPoll,
    selected: Vec<PathBuf>,
    uploaded: Vec<AssetId>,
    history: Option<Database>,
}

impl Session {
    pub fn new(client: ApiClient, identity: impl Into<String>, config: &ClientConfig) -> Self {
        Self {
            client,
            identity: identity.into(),
            tracking: config.id_tracking,
            poll: QuickPoll::new(config.poll),
            selected: Vec::new(),
            uploaded: Vec::new(),
            history: None,
        }
    }

    /// Store a snapshot of every non-empty fetch
    pub fn with_history(mut self, db: Database) -> Self {
        self.history = Some(db);
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn schedule(&self) -> PollSchedule {
        self.poll.schedule()
    }

    pub fn selected(&self) -> &[PathBuf] {
        &self.selected
    }

    pub fn uploaded(&self) -> &[AssetId] {
        &self.uploaded
    }

    /// Replace the selection. Directories expand to the images inside them.
    /// Returns the number of selected files.
    pub fn select<P: AsRef<Path>>(&mut self, paths: &[P]) -> usize {
        self.selected = discover_images(paths);
        for file in &self.selected {
            info!(file = %file.display(), "image selected");
        }
        self.selected.len()
    }

    /// Adopt ids uploaded elsewhere, e.g. from an earlier run
    pub fn adopt_uploaded(&mut self, ids: Vec<AssetId>) {
        self.record_uploaded(ids);
    }

    /// Upload the current selection
    pub fn upload(&mut self, surface: &mut dyn Surface) -> Result<&[AssetId], WorkflowError> {
        surface.set_busy(Some("Uploading..."));
        let result = self.upload_selected();
        surface.set_busy(None);

        match result {
            Ok(()) => Ok(&self.uploaded),
            Err(e) => Err(report_failure(surface, "upload", e)),
        }
    }

    /// Trigger analysis of the uploaded ids
    pub fn analyze(&mut self, surface: &mut dyn Surface) -> Result<(), WorkflowError> {
        surface.set_busy(Some("Requesting analysis..."));
        let result = self.request_analysis();
        surface.set_busy(None);

        match result {
            Ok(()) => {
                surface.set_status(MSG_ANALYSIS_STARTED);
                Ok(())
            }
            Err(e) => Err(report_failure(surface, "analysis", e)),
        }
    }

    /// One fetch-and-render cycle
    pub fn refresh(&self, surface: &mut dyn Surface) -> Result<Vec<ResultRow>, WorkflowError> {
        refresh_results(&self.client, &self.identity, surface, self.history.as_ref())
            .map_err(WorkflowError::from)
    }

    /// Fetch immediately, then on the session's schedule until the window
    /// closes or `token` is cancelled
    pub fn quick_poll(&self, surface: &mut dyn Surface, token: &CancellationToken) -> PollReport {
        self.poll.run(token, || self.refresh(surface).is_ok())
    }

    /// Fetch once right away, then quick poll. The first fetch is counted in
    /// the returned report, so `all_failed` means no fetch succeeded at all.
    pub fn fetch_and_poll(&self, surface: &mut dyn Surface, token: &CancellationToken) -> PollReport {
        let first_ok = self.refresh(surface).is_ok();
        let mut report = self.quick_poll(surface, token);
        report.cycles += 1;
        if !first_ok {
            report.failures += 1;
        }
        report
    }

    /// The full flow behind "start analysis": upload the selection, request
    /// analysis, then fetch once and quick poll.
    pub fn run(
        &mut self,
        surface: &mut dyn Surface,
        token: &CancellationToken,
    ) -> Result<PollReport, WorkflowError> {
        surface.set_busy(Some("Uploading and analyzing..."));
        let result = self.upload_selected().and_then(|()| self.request_analysis());
        surface.set_busy(None);

        if let Err(e) = result {
            return Err(report_failure(surface, "analysis", e));
        }

        info!(assets = self.uploaded.len(), "analysis requested");
        surface.alert(MSG_ANALYSIS_STARTED);
        surface.set_status(MSG_ANALYSIS_STARTED);

        Ok(self.fetch_and_poll(surface, token))
    }

    fn upload_selected(&mut self) -> Result<(), WorkflowError> {
        if self.selected.is_empty() {
            return Err(WorkflowError::NothingSelected);
        }
        info!(files = self.selected.len(), "uploading selection");
        let ids = self.client.upload(&self.selected, &self.identity)?;
        info!(ids = ids.len(), "upload complete");
        self.record_uploaded(ids);
        Ok(())
    }

    fn request_analysis(&self) -> Result<(), WorkflowError> {
        self.client.analyze(&self.uploaded, &self.identity)?;
        Ok(())
    }

    fn record_uploaded(&mut self, ids: Vec<AssetId>) {
        match self.tracking {
            IdTracking::Replace => {
                self.uploaded = dedup(ids);
            }
            IdTracking::Cumulative => {
                self.uploaded.extend(ids);
                self.uploaded = dedup(std::mem::take(&mut self.uploaded));
            }
        }
    }
}

/// Fetch, classify and render results for `identity`.
///
/// Errors are reported to the surface before being returned.
pub fn refresh_results(
    client: &ApiClient,
    identity: &str,
    surface: &mut dyn Surface,
    history: Option<&Database>,
) -> Result<Vec<ResultRow>, FetchError> {
    surface.set_status(MSG_LOADING);

    let records = match client.fetch_results(identity) {
        Ok(extracted) => extracted.into_items(),
        Err(e) => {
            error!(error = %e, "result fetch failed");
            surface.alert(&format!("{}\n\nReason: {}", MSG_FETCH_FAILED, e));
            surface.set_status(MSG_FETCH_FAILED);
            return Err(e);
        }
    };

    let rows = classify_records(&records);
    surface.render(&rows);

    if rows.is_empty() {
        surface.set_status(MSG_NOT_READY);
    } else {
        surface.set_status(&format!("Loaded {} result(s).", rows.len()));
        if let Some(db) = history {
            if let Err(e) = db.insert_snapshot(identity, &rows) {
                warn!(error = %e, "failed to store result snapshot");
            }
        }
    }
    info!(count = rows.len(), "results fetched");

    Ok(rows)
}

/// Expand paths into image files. Files are kept as given; directories are
/// walked for known image extensions. Order is preserved, duplicates dropped.
pub fn discover_images<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_image(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.to_path_buf());
        }
    }

    dedup(files)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn dedup<T: Clone + Eq + std::hash::Hash>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

fn report_failure(surface: &mut dyn Surface, action: &str, e: WorkflowError) -> WorkflowError {
    match &e {
        WorkflowError::NothingSelected => {
            surface.alert(MSG_SELECT_FIRST);
        }
        WorkflowError::Analyze(AnalyzeError::NoAssets) => {
            surface.alert("Upload images before requesting analysis.");
        }
        other => {
            error!(action, error = %other, "workflow action failed");
            surface.alert(&format!(
                "Processing failed. Please try again shortly.\n\nReason: {}",
                other
            ));
        }
    }
    e
}
