//! Report request, content and metadata records.

use super::intelligence::RiskLevel;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/reports/generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportRequest {
    pub market_id: String,
    pub user_id: String,
    /// Include the premium Market Context and Historical Comparison pages.
    pub include_perplexity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub report_id: String,
    pub market_id: String,
    pub user_id: String,
    pub generated_at: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub page_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Every report has the same ten-page layout.
pub const REPORT_PAGE_COUNT: u32 = 10;

/// Section-by-section content of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportContent {
    pub cover: CoverSection,
    pub executive_summary: ExecutiveSummarySection,
    pub market_overview: MarketOverviewSection,
    pub price_chart: PriceChartSection,
    pub sentiment_analysis: SentimentAnalysisSection,
    pub ai_predictions: AiPredictionsSection,
    /// Premium only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_context: Option<MarketContextSection>,
    /// Premium only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_comparison: Option<HistoricalComparisonSection>,
    pub risk_disclaimer: RiskDisclaimerSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverSection {
    pub market_question: String,
    pub sentimark_branding: bool,
    pub generated_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummarySection {
    pub ai_prediction: String,
    pub confidence: f64,
    pub key_insights: Vec<String>,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverviewSection {
    pub price: f64,
    pub volume: f64,
    pub liquidity: f64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: String,
    pub price: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChartSection {
    /// Chart image, usually a `data:` URI.
    pub chart_image_url: String,
    pub price_history: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSentiment {
    pub source: String,
    pub sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAnalysisSection {
    /// -1 to 1.
    pub overall_sentiment: f64,
    pub source_breakdown: Vec<SourceSentiment>,
    pub trend_chart: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPredictionsSection {
    pub predicted_outcome: String,
    pub reasoning: String,
    pub confidence_analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContextSection {
    pub background: String,
    pub key_events: Vec<String>,
    pub expert_opinions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalComparisonSection {
    pub similar_markets: Vec<String>,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskDisclaimerSection {
    pub risk_factors: Vec<String>,
    pub legal_disclaimer: String,
    pub caveats: Vec<String>,
}
