//! Recording download pipeline.
//!
//! Walks a [`RecordingIndex`], derives a dated filename for every non-audio
//! file and fetches the ones not already on disk. A failed download is logged
//! and counted; it never stops the remaining files.

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::zoom::{RecordingFile, RecordingIndex, RetryPolicy, Transport};

pub mod filename;

pub use filename::{sanitize, target_path};

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Downloaded { path: PathBuf, bytes: usize },
    Skipped { path: PathBuf },
}

/// Counters for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub audio_only: usize,
    pub bytes: u64,
}

pub struct DownloadPipeline<'a> {
    transport: &'a dyn Transport,
    retry: RetryPolicy,
    destination: PathBuf,
    run_date: NaiveDate,
    show_progress: bool,
}

impl<'a> DownloadPipeline<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        retry: RetryPolicy,
        destination: impl Into<PathBuf>,
        run_date: NaiveDate,
    ) -> Self {
        Self {
            transport,
            retry,
            destination: destination.into(),
            run_date,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Download every non-audio file in `index`.
    pub async fn run(&self, index: &RecordingIndex, access_token: &str) -> DownloadReport {
        let authorization = format!("Bearer {access_token}");
        let mut report = DownloadReport::default();

        let total = index
            .users
            .iter()
            .flat_map(|entry| entry.recordings.iter())
            .flat_map(|recording| recording.recording_files.iter())
            .filter(|file| !file.is_audio_only())
            .count();
        let progress = self.progress_bar(total as u64);

        for entry in &index.users {
            debug!(
                "Processing {} recordings for user {}",
                entry.recordings.len(),
                entry.user_id
            );
            for recording in &entry.recordings {
                for file in &recording.recording_files {
                    if file.is_audio_only() {
                        report.audio_only += 1;
                        continue;
                    }

                    progress.set_message(recording.topic.clone());
                    match self.download_file(&recording.topic, file, &authorization).await {
                        Ok(FileOutcome::Downloaded { bytes, .. }) => {
                            report.downloaded += 1;
                            report.bytes += bytes as u64;
                        }
                        Ok(FileOutcome::Skipped { .. }) => report.skipped += 1,
                        Err(err) => {
                            warn!("{}", err);
                            report.failed += 1;
                        }
                    }
                    progress.inc(1);
                }
            }
        }

        progress.finish_and_clear();
        info!(
            "Downloads finished: {} downloaded, {} skipped, {} failed, {} audio-only ignored",
            report.downloaded, report.skipped, report.failed, report.audio_only
        );
        report
    }

    /// Fetch one file unless its dated target already exists.
    pub async fn download_file(
        &self,
        topic: &str,
        file: &RecordingFile,
        authorization: &str,
    ) -> Result<FileOutcome> {
        let path = target_path(&self.destination, self.run_date, topic, &file.id);

        if path.exists() {
            info!("Recording {} exists, skipped.", path.display());
            return Ok(FileOutcome::Skipped { path });
        }

        if file.download_url.is_empty() {
            return Err(SyncError::Download {
                url: String::new(),
                status: None,
                message: format!("file {} of \"{}\" has no download_url", file.id, topic),
            });
        }

        let reply = self
            .retry
            .download(self.transport, &file.download_url, authorization)
            .await
            .map_err(|err| SyncError::Download {
                url: file.download_url.clone(),
                status: None,
                message: err.to_string(),
            })?;

        if !reply.is_ok() {
            return Err(SyncError::Download {
                url: file.download_url.clone(),
                status: Some(reply.status),
                message: format!("HTTP {}. Check your access token", reply.status),
            });
        }

        self.write_atomically(&path, &reply.body)
            .map_err(|err| SyncError::Download {
                url: file.download_url.clone(),
                status: Some(reply.status),
                message: format!("failed to write {}: {err}", path.display()),
            })?;

        info!(
            "Recording downloaded successfully as {} ({} bytes).",
            path.display(),
            reply.body.len()
        );
        Ok(FileOutcome::Downloaded {
            path,
            bytes: reply.body.len(),
        })
    }

    fn write_atomically(&self, path: &Path, body: &[u8]) -> std::io::Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(".zoomdl-")
            .suffix(".part")
            .tempfile_in(&self.destination)?;
        tmp.write_all(body)?;
        tmp.as_file().sync_all()?;
        persist(tmp, path)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb
    }
}

fn persist(tmp: NamedTempFile, path: &Path) -> std::io::Result<()> {
    tmp.persist(path).map(|_| ()).map_err(|err| err.error)
}
