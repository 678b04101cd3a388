// Report generation flow: validation, gates, content, printing, storage
// Author: kelexine (https://github.com/kelexine)

use super::content::{
    baseline_content, historical_section, market_context_section, sample_content,
    SAMPLE_MARKET_QUESTION,
};
use super::generator::PdfGenerator;
use super::store::{ReportStore, StoredReport};
use crate::error::{AppError, Result};
use crate::models::{Feature, IntelligenceData, ReportContent, ReportMetadata, ReportRequest, UsageKind};
use crate::perplexity::PerplexityClient;
use crate::subscriptions::SubscriptionService;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Metadata of a freshly written report and how long it took.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub metadata: ReportMetadata,
    pub duration: Duration,
}

pub struct ReportService {
    generator: PdfGenerator,
    store: ReportStore,
    intelligence: Option<Arc<PerplexityClient>>,
    subscriptions: Arc<SubscriptionService>,
    enforce_feature_gates: bool,
}

impl ReportService {
    pub fn new(
        generator: PdfGenerator,
        store: ReportStore,
        intelligence: Option<Arc<PerplexityClient>>,
        subscriptions: Arc<SubscriptionService>,
        enforce_feature_gates: bool,
    ) -> Self {
        Self {
            generator,
            store,
            intelligence,
            subscriptions,
            enforce_feature_gates,
        }
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub async fn generate(&self, request: &ReportRequest) -> Result<GeneratedReport> {
        let started = Instant::now();
        let market_id = request.market_id.trim();
        let user_id = request.user_id.trim();
        if market_id.is_empty() || user_id.is_empty() {
            return Err(AppError::InvalidInput(
                "marketId and userId are required".to_string(),
            ));
        }

        if self.enforce_feature_gates {
            self.subscriptions
                .require_feature(user_id, Feature::PdfReports)
                .await?;
            if request.include_perplexity {
                self.subscriptions
                    .require_feature(user_id, Feature::PerplexityIntelligence)
                    .await?;
            }
            self.subscriptions
                .ensure_quota(user_id, UsageKind::PdfReport)
                .await?;
        }

        let report_id = Uuid::new_v4();
        let content = self.build_content(market_id, request.include_perplexity).await;
        let pdf = self
            .generator
            .generate(&content, request.include_perplexity)
            .await?;
        let stored = self.store.save(report_id, &pdf).await.map_err(|e| {
            AppError::PdfGeneration(format!("Failed to store report {}: {}", report_id, e))
        })?;

        // Only delivered reports count against the quota.
        if self.enforce_feature_gates {
            if let Err(e) = self
                .subscriptions
                .track_usage(user_id, UsageKind::PdfReport)
                .await
            {
                self.store.remove(&stored).await;
                return Err(e);
            }
        }

        let duration = started.elapsed();
        info!(
            "Report {} generated in {}ms ({:.2}KB)",
            report_id,
            duration.as_millis(),
            stored.file_size as f64 / 1024.0
        );

        Ok(GeneratedReport {
            metadata: self.store.metadata_for(&stored, market_id, user_id),
            duration,
        })
    }

    pub async fn status(&self, report_id: &str) -> Result<ReportMetadata> {
        self.store.metadata(report_id).await
    }

    pub async fn download(&self, report_id: &str) -> Result<(StoredReport, Vec<u8>)> {
        self.store.read(report_id).await
    }

    pub async fn purge_expired(&self) -> Result<usize> {
        self.store.purge_expired().await
    }

    pub async fn close(&self) {
        self.generator.close().await;
    }

    async fn build_content(&self, market_id: &str, include_perplexity: bool) -> ReportContent {
        if !include_perplexity {
            return baseline_content(SAMPLE_MARKET_QUESTION);
        }

        let Some(client) = &self.intelligence else {
            return sample_content(SAMPLE_MARKET_QUESTION, true);
        };

        let mut content = baseline_content(SAMPLE_MARKET_QUESTION);
        let (context, trends) = tokio::join!(
            client.get_market_context(market_id),
            client.get_historical_trends(market_id)
        );

        match context.map(|r| r.data) {
            Ok(IntelligenceData::Context(data)) => {
                content.market_context = Some(market_context_section(&data))
            }
            Ok(other) => warn!("Unexpected context payload: {}", other.endpoint()),
            Err(e) => warn!("Market context unavailable for {}: {}", market_id, e),
        }
        match trends.map(|r| r.data) {
            Ok(IntelligenceData::Trends(data)) => {
                content.historical_comparison = Some(historical_section(&data))
            }
            Ok(other) => warn!("Unexpected trends payload: {}", other.endpoint()),
            Err(e) => warn!("Historical trends unavailable for {}: {}", market_id, e),
        }
        content
    }
}
