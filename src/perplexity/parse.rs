//! Lenient parsing of upstream research content.
//!
//! The model is asked for JSON but may answer with prose, wrap the JSON in a
//! markdown fence or prefix it with a reasoning block. Parsing therefore
//! never fails the request: a payload that is not a JSON object comes back as
//! [`RawFallback`] and is turned into the endpoint's default structure by
//! [`fallback_data`]. Inside a valid object, missing or mistyped fields take
//! their defaults and malformed list items are skipped.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::models::{
    DailyBriefData, Endpoint, ExpertAnalysisData, HistoricalTrendsData, IntelligenceData,
    MarketContextData, NewsFlashData,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const NO_BACKGROUND: &str = "No background information available.";
const NO_SUMMARY: &str = "No summary available.";
const DEFAULT_RECOMMENDATION: &str = "Monitor closely.";
const DEFAULT_CONSENSUS_STRENGTH: f64 = 0.5;

lazy_static! {
    static ref THINK_BLOCK: Regex = Regex::new(r"(?s)^\s*<think>.*?</think>").unwrap();
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").unwrap();
}

/// Upstream content that could not be read as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFallback {
    pub content: String,
    pub reason: String,
}

type Parsed<T> = std::result::Result<T, RawFallback>;

/// Parse `content` into the data shape of `endpoint`.
pub fn parse(endpoint: Endpoint, content: &str) -> Parsed<IntelligenceData> {
    Ok(match endpoint {
        Endpoint::Context => IntelligenceData::Context(parse_market_context(content)?),
        Endpoint::News => IntelligenceData::News(parse_news_flash(content)?),
        Endpoint::Experts => IntelligenceData::Experts(parse_expert_analysis(content)?),
        Endpoint::Brief => IntelligenceData::Brief(parse_daily_brief(content)?),
        Endpoint::Trends => IntelligenceData::Trends(parse_historical_trends(content)?),
    })
}

/// Default structure for content that did not parse. Context and brief keep
/// the raw text so the answer is not lost.
pub fn fallback_data(endpoint: Endpoint, fallback: &RawFallback) -> IntelligenceData {
    match endpoint {
        Endpoint::Context => IntelligenceData::Context(MarketContextData {
            background: fallback.content.clone(),
            key_events: Vec::new(),
            expert_opinions: Vec::new(),
        }),
        Endpoint::News => IntelligenceData::News(NewsFlashData {
            breaking: Vec::new(),
            last_updated: now_rfc3339(),
        }),
        Endpoint::Experts => IntelligenceData::Experts(ExpertAnalysisData {
            consensus: Default::default(),
            consensus_strength: DEFAULT_CONSENSUS_STRENGTH,
            predictions: Vec::new(),
        }),
        Endpoint::Brief => IntelligenceData::Brief(DailyBriefData {
            summary: fallback.content.clone(),
            key_insights: Vec::new(),
            market_mood: Default::default(),
            risk_level: Default::default(),
            recommendation: DEFAULT_RECOMMENDATION.to_string(),
        }),
        Endpoint::Trends => IntelligenceData::Trends(HistoricalTrendsData {
            similar_markets: Vec::new(),
            patterns: Vec::new(),
        }),
    }
}

pub fn parse_market_context(content: &str) -> Parsed<MarketContextData> {
    let obj = json_object(content)?;
    Ok(MarketContextData {
        background: non_empty_string(&obj, "background")
            .unwrap_or_else(|| NO_BACKGROUND.to_string()),
        key_events: items(&obj, "keyEvents"),
        expert_opinions: items(&obj, "expertOpinions"),
    })
}

pub fn parse_news_flash(content: &str) -> Parsed<NewsFlashData> {
    let obj = json_object(content)?;
    Ok(NewsFlashData {
        breaking: items(&obj, "breaking"),
        last_updated: non_empty_string(&obj, "lastUpdated").unwrap_or_else(now_rfc3339),
    })
}

pub fn parse_expert_analysis(content: &str) -> Parsed<ExpertAnalysisData> {
    let obj = json_object(content)?;
    Ok(ExpertAnalysisData {
        consensus: field(&obj, "consensus").unwrap_or_default(),
        consensus_strength: field::<f64>(&obj, "consensusStrength")
            .filter(|s| *s != 0.0)
            .unwrap_or(DEFAULT_CONSENSUS_STRENGTH),
        predictions: items(&obj, "predictions"),
    })
}

pub fn parse_daily_brief(content: &str) -> Parsed<DailyBriefData> {
    let obj = json_object(content)?;
    Ok(DailyBriefData {
        summary: non_empty_string(&obj, "summary").unwrap_or_else(|| NO_SUMMARY.to_string()),
        key_insights: items(&obj, "keyInsights"),
        market_mood: field(&obj, "marketMood").unwrap_or_default(),
        risk_level: field(&obj, "riskLevel").unwrap_or_default(),
        recommendation: non_empty_string(&obj, "recommendation")
            .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
    })
}

pub fn parse_historical_trends(content: &str) -> Parsed<HistoricalTrendsData> {
    let obj = json_object(content)?;
    Ok(HistoricalTrendsData {
        similar_markets: items(&obj, "similarMarkets"),
        patterns: items(&obj, "patterns"),
    })
}

fn json_object(content: &str) -> Parsed<Map<String, Value>> {
    let body = strip_wrappers(content);
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(RawFallback {
            content: content.to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(RawFallback {
            content: content.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn strip_wrappers(content: &str) -> &str {
    let mut body = content.trim();
    if let Some(m) = THINK_BLOCK.find(body) {
        body = body[m.end()..].trim();
    }
    if let Some(inner) = CODE_FENCE.captures(body).and_then(|c| c.get(1)) {
        body = inner.as_str();
    }
    body
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    obj.get(key)
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn non_empty_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    field::<String>(obj, key).filter(|s| !s.trim().is_empty())
}

/// Items of the array at `key` that deserialize; anything else is dropped.
fn items<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Vec<T> {
    match obj.get(key) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Consensus, Impact, MarketMood, RiskLevel, Sentiment};

    #[test]
    fn test_context_parses_structured_json() {
        let content = r#"{
            "background": "Election in November.",
            "keyEvents": [{"date": "2025-11-01", "event": "Debate", "impact": "high"}],
            "expertOpinions": [{"expert": "A. Analyst", "affiliation": "Uni", "quote": "Close race", "sourceUrl": "https://x"}]
        }"#;
        let data = parse_market_context(content).unwrap();
        assert_eq!(data.background, "Election in November.");
        assert_eq!(data.key_events[0].impact, Impact::High);
        assert_eq!(data.expert_opinions[0].source_url, "https://x");
    }

    #[test]
    fn test_prose_falls_back_with_raw_text() {
        let fallback = parse_market_context("The market is quiet today.").unwrap_err();
        assert_eq!(fallback.content, "The market is quiet today.");

        match fallback_data(Endpoint::Context, &fallback) {
            IntelligenceData::Context(data) => {
                assert_eq!(data.background, "The market is quiet today.");
                assert!(data.key_events.is_empty());
            }
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_brief_fallback_defaults() {
        let fallback = parse_daily_brief("not json").unwrap_err();
        match fallback_data(Endpoint::Brief, &fallback) {
            IntelligenceData::Brief(data) => {
                assert_eq!(data.summary, "not json");
                assert_eq!(data.market_mood, MarketMood::Uncertain);
                assert_eq!(data.risk_level, RiskLevel::Medium);
                assert_eq!(data.recommendation, "Monitor closely.");
            }
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let brief = parse_daily_brief("{}").unwrap();
        assert_eq!(brief.summary, "No summary available.");
        assert_eq!(brief.recommendation, "Monitor closely.");

        let context = parse_market_context(r#"{"keyEvents": null}"#).unwrap();
        assert_eq!(context.background, "No background information available.");
        assert!(context.key_events.is_empty());

        let experts = parse_expert_analysis(r#"{"consensus": "sideways"}"#).unwrap();
        assert_eq!(experts.consensus, Consensus::Neutral);
        assert_eq!(experts.consensus_strength, 0.5);
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let content = r#"{"breaking": [
            {"title": "Ok", "sentiment": "bullish"},
            {"title": "Bad", "sentiment": "euphoric"},
            "not an object"
        ]}"#;
        let news = parse_news_flash(content).unwrap();
        assert_eq!(news.breaking.len(), 1);
        assert_eq!(news.breaking[0].sentiment, Sentiment::Bullish);
        assert!(!news.last_updated.is_empty());
    }

    #[test]
    fn test_fenced_and_reasoning_wrapped_json() {
        let content = "<think>weighing sources</think>\n```json\n{\"patterns\": [{\"pattern\": \"Late swing\", \"occurrences\": 4, \"successRate\": 0.75}]}\n```";
        let trends = parse_historical_trends(content).unwrap();
        assert_eq!(trends.patterns[0].occurrences, 4);
        assert!(trends.similar_markets.is_empty());
    }

    #[test]
    fn test_non_object_json_falls_back() {
        let fallback = parse(Endpoint::Trends, "[1, 2, 3]").unwrap_err();
        assert!(fallback.reason.contains("an array"));
    }
}
