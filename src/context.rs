// Application context owning every long-lived component
// Author: kelexine (https://github.com/kelexine)

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::perplexity::PerplexityClient;
use crate::reports::{
    ChromiumBackend, PdfGenerator, PrintBackend, PrintOptions, ReportService, ReportStore,
    ReportTemplate,
};
use crate::subscriptions::{MemoryStore, SubscriptionService, SubscriptionStore};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Built once at startup and shared with the HTTP layer.
///
/// Owns the Perplexity client (and its cache), the report service (and its
/// browser), the subscription service and the maintenance task that sweeps
/// expired cache entries and reports.
pub struct AppContext {
    pub config: AppConfig,
    intelligence: Option<Arc<PerplexityClient>>,
    pub reports: Arc<ReportService>,
    pub subscriptions: Arc<SubscriptionService>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    /// Production wiring: headless chromium and the in-memory subscription store.
    pub fn new(config: AppConfig) -> Result<Self> {
        let backend: Arc<dyn PrintBackend> = Arc::new(ChromiumBackend::new(&config.reports));
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: AppConfig, backend: Arc<dyn PrintBackend>) -> Result<Self> {
        let store: Arc<dyn SubscriptionStore> = Arc::new(MemoryStore::from_config(&config.stripe));
        Self::with_parts(config, backend, store)
    }

    pub fn with_parts(
        config: AppConfig,
        backend: Arc<dyn PrintBackend>,
        subscription_store: Arc<dyn SubscriptionStore>,
    ) -> Result<Self> {
        let intelligence = if config.perplexity.api_key.trim().is_empty() {
            warn!("PERPLEXITY_API_KEY not set; intelligence routes are disabled");
            None
        } else {
            Some(Arc::new(PerplexityClient::new(
                &config.perplexity,
                &config.cache,
            )?))
        };

        let subscriptions = Arc::new(SubscriptionService::new(
            &config.stripe,
            subscription_store,
        )?);

        let template = match &config.reports.template_dir {
            Some(dir) => ReportTemplate::load(Path::new(dir))?,
            None => ReportTemplate::embedded(),
        };
        let generator = PdfGenerator::new(
            template,
            backend,
            PrintOptions::from_config(&config.reports),
        );
        let store = ReportStore::new(&config.reports.output_dir, config.reports.retention_days);

        let reports = Arc::new(ReportService::new(
            generator,
            store,
            intelligence.clone(),
            subscriptions.clone(),
            config.reports.enforce_feature_gates,
        ));

        Ok(Self {
            config,
            intelligence,
            reports,
            subscriptions,
            maintenance: Mutex::new(None),
        })
    }

    /// The Perplexity client, or `SERVICE_UNAVAILABLE` without an API key.
    pub fn intelligence(&self) -> Result<&PerplexityClient> {
        self.intelligence.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable("Perplexity API key not configured".to_string())
        })
    }

    pub fn has_intelligence(&self) -> bool {
        self.intelligence.is_some()
    }

    /// Spawn the periodic sweep. Must be called inside a tokio runtime;
    /// calling it again replaces the running task.
    pub fn start_maintenance(&self) {
        let period = Duration::from_secs(self.config.cache.sweep_interval_seconds.max(1));
        let intelligence = self.intelligence.clone();
        let reports = self.reports.clone();

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;

                if let Some(client) = &intelligence {
                    let removed = client.sweep_cache();
                    if removed > 0 {
                        debug!("Swept {} expired cache entries", removed);
                    }
                }
                if let Err(e) = reports.purge_expired().await {
                    warn!("Report purge failed: {}", e);
                }
            }
        });

        if let Some(previous) = self.maintenance.lock().replace(handle) {
            previous.abort();
        }
        info!("Maintenance task running every {}s", period.as_secs());
    }

    /// Stop the maintenance task and close the browser.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.maintenance.lock().take() {
            handle.abort();
        }
        self.reports.close().await;
        info!("Application context shut down");
    }
}
