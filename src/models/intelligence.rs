//! Intelligence payloads returned by the five research endpoints.
//!
//! Every endpoint answers with an [`IntelligenceResponse`]; the `data` field
//! is tagged by `type` so clients can switch on it without knowing which
//! route produced it.

use serde::{Deserialize, Serialize};

/// The five research endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Context,
    News,
    Experts,
    Brief,
    Trends,
}

/// Qualitative staleness of a payload: < 1h, < 24h, > 24h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Realtime,
    Recent,
    Historical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceResponse {
    pub market_id: String,
    pub endpoint: Endpoint,
    pub timestamp: String,
    pub data: IntelligenceData,
    pub metadata: IntelligenceMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceMetadata {
    pub sources: usize,
    pub confidence: f64,
    pub freshness: Freshness,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_expiry: Option<String>,
    /// Upstream content was not the requested JSON; `data` holds defaults.
    #[serde(default)]
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IntelligenceData {
    Context(MarketContextData),
    News(NewsFlashData),
    Experts(ExpertAnalysisData),
    Brief(DailyBriefData),
    Trends(HistoricalTrendsData),
}

impl IntelligenceData {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            IntelligenceData::Context(_) => Endpoint::Context,
            IntelligenceData::News(_) => Endpoint::News,
            IntelligenceData::Experts(_) => Endpoint::Experts,
            IntelligenceData::Brief(_) => Endpoint::Brief,
            IntelligenceData::Trends(_) => Endpoint::Trends,
        }
    }
}

// ============================================================================
// MARKET CONTEXT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContextData {
    pub background: String,
    pub key_events: Vec<KeyEvent>,
    pub expert_opinions: Vec<ExpertOpinion>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyEvent {
    pub date: String,
    pub event: String,
    pub impact: Impact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    #[default]
    Medium,
    Low,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpertOpinion {
    pub expert: String,
    pub affiliation: String,
    pub quote: String,
    pub source_url: String,
}

// ============================================================================
// NEWS FLASH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsFlashData {
    pub breaking: Vec<NewsItem>,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub published_at: String,
    pub source: String,
    pub source_url: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

// ============================================================================
// EXPERT ANALYSIS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertAnalysisData {
    pub consensus: Consensus,
    pub consensus_strength: f64,
    pub predictions: Vec<ExpertPrediction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consensus {
    Bullish,
    Bearish,
    #[default]
    Neutral,
    Divided,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpertPrediction {
    pub expert: String,
    pub prediction: String,
    pub rationale: String,
    pub confidence: f64,
    pub source_url: String,
}

// ============================================================================
// DAILY BRIEF
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBriefData {
    pub summary: String,
    pub key_insights: Vec<String>,
    pub market_mood: MarketMood,
    pub risk_level: RiskLevel,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketMood {
    Optimistic,
    Pessimistic,
    #[default]
    Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

// ============================================================================
// HISTORICAL TRENDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalTrendsData {
    pub similar_markets: Vec<SimilarMarket>,
    pub patterns: Vec<TrendPattern>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimilarMarket {
    pub question: String,
    pub resolved_date: String,
    pub outcome: String,
    pub similarity: f64,
    pub lessons: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrendPattern {
    pub pattern: String,
    pub occurrences: u32,
    pub success_rate: f64,
}
