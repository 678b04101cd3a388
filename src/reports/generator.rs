// PDF report generator: template population + printing
// Author: kelexine (https://github.com/kelexine)

use super::backend::{PrintBackend, PrintOptions};
use super::template::ReportTemplate;
use crate::error::Result;
use crate::models::ReportContent;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Renders report content into the HTML template and prints it.
/// Failures surface as `PDF_GENERATION_ERROR` and are not retried.
pub struct PdfGenerator {
    template: ReportTemplate,
    backend: Arc<dyn PrintBackend>,
    options: PrintOptions,
}

impl PdfGenerator {
    pub fn new(template: ReportTemplate, backend: Arc<dyn PrintBackend>, options: PrintOptions) -> Self {
        Self {
            template,
            backend,
            options,
        }
    }

    /// Populated HTML for `content`, before printing.
    pub fn render_html(&self, content: &ReportContent, include_perplexity: bool) -> Result<String> {
        self.template.render(content, include_perplexity)
    }

    pub async fn generate(&self, content: &ReportContent, include_perplexity: bool) -> Result<Vec<u8>> {
        let started = Instant::now();

        let result = match self.render_html(content, include_perplexity) {
            Ok(html) => {
                debug!("Rendered report HTML ({} bytes)", html.len());
                self.backend.print_pdf(&html, &self.options).await
            }
            Err(e) => Err(e),
        };

        let elapsed = started.elapsed();
        crate::metrics::record_pdf_generation(result.is_ok(), include_perplexity, elapsed.as_secs_f64());

        match &result {
            Ok(pdf) => debug!(
                "Printed report via {} in {}ms ({:.2}KB)",
                self.backend.name(),
                elapsed.as_millis(),
                pdf.len() as f64 / 1024.0
            ),
            Err(e) => error!("Report printing failed via {}: {}", self.backend.name(), e),
        }
        result
    }

    /// Shut down the print backend.
    pub async fn close(&self) {
        self.backend.shutdown().await;
    }
}
