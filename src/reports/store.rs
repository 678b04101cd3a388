// On-disk report store
// Author: kelexine (https://github.com/kelexine)

use crate::error::{AppError, Result};
use crate::models::{ReportMetadata, ReportStatus, REPORT_PAGE_COUNT};
use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A report file located on disk.
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub report_id: Uuid,
    pub path: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub file_size: u64,
}

/// Generated PDFs live in one directory as `report_<uuid>_<millis>.pdf`.
/// The id prefix addresses a report; the millisecond suffix records when it
/// was generated. Reports past the retention period are treated as gone.
pub struct ReportStore {
    dir: PathBuf,
    retention: Duration,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>, retention_days: i64) -> Self {
        Self {
            dir: dir.into(),
            retention: Duration::days(retention_days.max(0)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn download_url(report_id: &Uuid) -> String {
        format!("/api/reports/download/{}", report_id)
    }

    pub fn expires_at(&self, generated_at: DateTime<Utc>) -> DateTime<Utc> {
        generated_at + self.retention
    }

    /// Write `pdf` under a fresh file name for `report_id`.
    pub async fn save(&self, report_id: Uuid, pdf: &[u8]) -> Result<StoredReport> {
        tokio::fs::create_dir_all(&self.dir).await?;

        // The file name only keeps milliseconds.
        let generated_at = Utc::now().trunc_subsecs(3);
        let file_name = format!("report_{}_{}.pdf", report_id, generated_at.timestamp_millis());
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, pdf).await?;

        debug!("Saved report {} to {}", report_id, path.display());
        Ok(StoredReport {
            report_id,
            path,
            generated_at,
            file_size: pdf.len() as u64,
        })
    }

    /// Locate a live report. Unknown, malformed and expired ids are all `None`.
    pub async fn find(&self, report_id: &str) -> Result<Option<StoredReport>> {
        let Ok(id) = Uuid::parse_str(report_id) else {
            return Ok(None);
        };
        let prefix = format!("report_{}_", id);

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(&prefix) {
                continue;
            }

            let stored = Self::describe(id, &entry.path(), &name).await?;
            if self.is_expired(&stored) {
                debug!("Report {} has expired", id);
                return Ok(None);
            }
            return Ok(Some(stored));
        }
        Ok(None)
    }

    /// Metadata re-derived from the file. Market and user are not persisted
    /// alongside the PDF, so they read as `unknown`.
    pub async fn metadata(&self, report_id: &str) -> Result<ReportMetadata> {
        let stored = self.require(report_id).await?;
        Ok(self.metadata_for(&stored, "unknown", "unknown"))
    }

    pub fn metadata_for(&self, stored: &StoredReport, market_id: &str, user_id: &str) -> ReportMetadata {
        ReportMetadata {
            report_id: stored.report_id.to_string(),
            market_id: market_id.to_string(),
            user_id: user_id.to_string(),
            generated_at: stored.generated_at.to_rfc3339(),
            status: ReportStatus::Completed,
            download_url: Some(Self::download_url(&stored.report_id)),
            expires_at: Some(self.expires_at(stored.generated_at).to_rfc3339()),
            page_count: REPORT_PAGE_COUNT,
            file_size: Some(stored.file_size),
        }
    }

    /// PDF bytes of a live report.
    pub async fn read(&self, report_id: &str) -> Result<(StoredReport, Vec<u8>)> {
        let stored = self.require(report_id).await?;
        let bytes = tokio::fs::read(&stored.path).await?;
        Ok((stored, bytes))
    }

    /// Delete one report file. Failures are logged; the file then ages out.
    pub async fn remove(&self, stored: &StoredReport) {
        if let Err(e) = tokio::fs::remove_file(&stored.path).await {
            warn!("Failed to remove report {}: {}", stored.report_id, e);
        }
    }

    /// Delete every report past the retention period.
    pub async fn purge_expired(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(id) = parse_report_id(&name) else {
                continue;
            };

            let stored = Self::describe(id, &entry.path(), &name).await?;
            if self.is_expired(&stored) {
                match tokio::fs::remove_file(&stored.path).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove expired report {}: {}", name, e),
                }
            }
        }

        if removed > 0 {
            info!("Purged {} expired reports", removed);
        }
        crate::metrics::record_reports_purged(removed);
        Ok(removed)
    }

    async fn require(&self, report_id: &str) -> Result<StoredReport> {
        self.find(report_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
    }

    fn is_expired(&self, stored: &StoredReport) -> bool {
        Utc::now() >= self.expires_at(stored.generated_at)
    }

    async fn describe(report_id: Uuid, path: &Path, name: &str) -> Result<StoredReport> {
        let meta = tokio::fs::metadata(path).await?;
        let generated_at = match parse_generated_millis(name) {
            Some(at) => at,
            None => meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now()),
        };

        Ok(StoredReport {
            report_id,
            path: path.to_path_buf(),
            generated_at,
            file_size: meta.len(),
        })
    }
}

fn report_stem(name: &str) -> Option<(&str, &str)> {
    name.strip_prefix("report_")?
        .strip_suffix(".pdf")?
        .rsplit_once('_')
}

fn parse_report_id(name: &str) -> Option<Uuid> {
    report_stem(name).and_then(|(id, _)| Uuid::parse_str(id).ok())
}

fn parse_generated_millis(name: &str) -> Option<DateTime<Utc>> {
    let (_, millis) = report_stem(name)?;
    Utc.timestamp_millis_opt(millis.parse().ok()?).single()
}
