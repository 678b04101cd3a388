//! PDF report generation.
//!
//! Report content is flattened into a static HTML template ([`template`]),
//! printed by a [`backend::PrintBackend`] (headless chromium in production)
//! and written to a retention-bounded directory ([`store`]).
//! [`service::ReportService`] ties the steps together for the HTTP routes.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod backend;
pub mod content;
pub mod generator;
pub mod service;
pub mod store;
pub mod template;

pub use backend::{ChromiumBackend, PrintBackend, PrintOptions};
pub use generator::PdfGenerator;
pub use service::{GeneratedReport, ReportService};
pub use store::{ReportStore, StoredReport};
pub use template::ReportTemplate;
