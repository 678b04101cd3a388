// Report content assembly
// Author: kelexine (https://github.com/kelexine)

use crate::models::{
    AiPredictionsSection, CoverSection, ExecutiveSummarySection, HistoricalComparisonSection,
    HistoricalTrendsData, MarketContextData, MarketContextSection, MarketOverviewSection,
    PriceChartSection, ReportContent, RiskDisclaimerSection, RiskLevel, SentimentAnalysisSection,
    SourceSentiment,
};

const PRICE_CHART_PLACEHOLDER: &str = "data:image/svg+xml;base64,PHN2ZyB3aWR0aD0iODAwIiBoZWlnaHQ9IjMwMCIgeG1sbnM9Imh0dHA6Ly93d3cudzMub3JnLzIwMDAvc3ZnIj48cmVjdCB3aWR0aD0iODAwIiBoZWlnaHQ9IjMwMCIgZmlsbD0iI2Y4ZmFmYyIvPjx0ZXh0IHg9IjQwMCIgeT0iMTUwIiBmb250LXNpemU9IjE4IiBmaWxsPSIjNjQ3NDhiIiB0ZXh0LWFuY2hvcj0ibWlkZGxlIj5QcmljZSBDaGFydCAoUGxhY2Vob2xkZXIpPC90ZXh0Pjwvc3ZnPg==";
const SENTIMENT_CHART_PLACEHOLDER: &str = "data:image/svg+xml;base64,PHN2ZyB3aWR0aD0iODAwIiBoZWlnaHQ9IjMwMCIgeG1sbnM9Imh0dHA6Ly93d3cudzMub3JnLzIwMDAvc3ZnIj48cmVjdCB3aWR0aD0iODAwIiBoZWlnaHQ9IjMwMCIgZmlsbD0iI2Y4ZmFmYyIvPjx0ZXh0IHg9IjQwMCIgeT0iMTUwIiBmb250LXNpemU9IjE4IiBmaWxsPSIjNjQ3NDhiIiB0ZXh0LWFuY2hvcj0ibWlkZGxlIj5TZW50aW1lbnQgVHJlbmQgKFBsYWNlaG9sZGVyKTwvdGV4dD48L3N2Zz4=";

const LEGAL_DISCLAIMER: &str = "This report is generated using artificial intelligence models and is \
provided for informational purposes only. It does not constitute investment advice, financial advice, \
trading advice, or any other sort of advice. You should not treat any of the report's content as such. \
Sentimark does not recommend that any cryptocurrency should be bought, sold, or held by you. Do conduct \
your own due diligence and consult your financial advisor before making any investment decisions. Past \
performance is not indicative of future results.";

pub const SAMPLE_MARKET_QUESTION: &str = "Will Bitcoin reach $100,000 by December 31, 2025?";

/// Human-readable timestamp shown on the cover, e.g. `November 15, 2025, 03:04 PM`.
pub fn generated_date(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%B %-d, %Y, %I:%M %p").to_string()
}

/// Core report sections without the premium pages.
///
/// Market, sentiment and prediction figures come from a fixed snapshot until
/// a market-data source is wired in.
pub fn baseline_content(market_question: &str) -> ReportContent {
    ReportContent {
        cover: CoverSection {
            market_question: market_question.to_string(),
            sentimark_branding: true,
            generated_date: generated_date(chrono::Utc::now()),
        },
        executive_summary: ExecutiveSummarySection {
            ai_prediction: "YES".to_string(),
            confidence: 72.0,
            key_insights: strings(&[
                "Strong bullish momentum with 68% positive social sentiment",
                "Institutional inflows increasing by 23% month-over-month",
                "Technical indicators show support above $95,000",
                "Market liquidity remains robust at $5.2M open interest",
            ]),
            risk_level: RiskLevel::Medium,
        },
        market_overview: MarketOverviewSection {
            price: 0.72,
            volume: 2_450_000.0,
            liquidity: 5_200_000.0,
            active: true,
        },
        price_chart: PriceChartSection {
            chart_image_url: PRICE_CHART_PLACEHOLDER.to_string(),
            price_history: Vec::new(),
        },
        sentiment_analysis: SentimentAnalysisSection {
            overall_sentiment: 0.72,
            source_breakdown: vec![
                source("Social Media (Twitter/X)", 0.68),
                source("News Articles", 0.75),
                source("On-Chain Metrics", 0.71),
                source("Market Maker Positions", 0.69),
            ],
            trend_chart: SENTIMENT_CHART_PLACEHOLDER.to_string(),
        },
        ai_predictions: AiPredictionsSection {
            predicted_outcome: "YES - Bitcoin will reach $100,000 by December 31, 2025".to_string(),
            reasoning: "Based on analysis of 4 key factors: (1) Technical analysis shows strong support \
levels above $95K with bullish momentum indicators, (2) Sentiment analysis reveals 72% positive sentiment \
across social media and news sources, (3) Institutional adoption is accelerating with increasing inflows, \
(4) Market dynamics show healthy liquidity and low volatility risk."
                .to_string(),
            confidence_analysis: "The 72% confidence score reflects strong technical and sentiment \
indicators, tempered by external risk factors including regulatory uncertainty and potential \
macroeconomic headwinds. Historical data on similar market conditions suggests an 88% success rate for \
predictions in this confidence range."
                .to_string(),
        },
        market_context: None,
        historical_comparison: None,
        risk_disclaimer: RiskDisclaimerSection {
            risk_factors: strings(&[
                "Black swan events are unpredictable and can cause sudden market reversals",
                "Regulatory changes could significantly impact market dynamics",
                "Market manipulation and whale activity can distort prices",
                "Flash crashes may occur during low liquidity periods",
                "Sentiment can shift rapidly based on news events",
            ]),
            legal_disclaimer: LEGAL_DISCLAIMER.to_string(),
            caveats: strings(&[
                "AI predictions carry inherent uncertainty and should not be relied upon exclusively",
                "Market conditions can change rapidly, affecting prediction accuracy",
                "This report represents a snapshot in time and may become outdated quickly",
                "Sentiment analysis is based on available data and may not capture all market nuances",
            ]),
        },
    }
}

/// Baseline content plus, when `premium` is set, static premium pages.
/// Used for previews and tests where no research client is available.
pub fn sample_content(market_question: &str, premium: bool) -> ReportContent {
    let mut content = baseline_content(market_question);
    if premium {
        content.market_context = Some(MarketContextSection {
            background: "Bitcoin has experienced significant volatility throughout 2025, with \
institutional adoption continuing to grow. Recent macroeconomic factors, including Federal Reserve policy \
decisions and geopolitical tensions, have influenced crypto markets."
                .to_string(),
            key_events: strings(&[
                "November 12, 2025: Major institutional investor announced $500M Bitcoin allocation",
                "November 8, 2025: Federal Reserve maintains current interest rate policy",
                "November 5, 2025: Bitcoin ETF inflows reach record $1.2B weekly high",
            ]),
            expert_opinions: strings(&[
                "Traditional analysts remain cautiously optimistic, citing strong technical support levels",
                "On-chain analysts point to increasing whale accumulation as bullish indicator",
            ]),
        });
        content.historical_comparison = Some(HistoricalComparisonSection {
            similar_markets: strings(&[
                "\"Will Ethereum reach $5,000 by Q4 2024?\" - Resolved YES (Accuracy: 88%)",
                "\"Will S&P 500 gain 10% in 2024?\" - Resolved YES (Accuracy: 92%)",
            ]),
            patterns: strings(&[
                "Markets with 70%+ sentiment scores resolved favorably in 89% of cases",
                "Positive momentum continuation occurred in 78% of similar setups",
            ]),
        });
    }
    content
}

/// Flatten research context into the report's Market Context page.
pub fn market_context_section(data: &MarketContextData) -> MarketContextSection {
    MarketContextSection {
        background: data.background.clone(),
        key_events: data
            .key_events
            .iter()
            .map(|e| {
                if e.date.is_empty() {
                    format!("{} ({} impact)", e.event, e.impact.as_str())
                } else {
                    format!("{}: {} ({} impact)", e.date, e.event, e.impact.as_str())
                }
            })
            .collect(),
        expert_opinions: data
            .expert_opinions
            .iter()
            .map(|o| match (o.expert.is_empty(), o.affiliation.is_empty()) {
                (false, false) => format!("{} ({}): \"{}\"", o.expert, o.affiliation, o.quote),
                (false, true) => format!("{}: \"{}\"", o.expert, o.quote),
                _ => o.quote.clone(),
            })
            .collect(),
    }
}

/// Flatten historical research into the report's Historical Comparison page.
pub fn historical_section(data: &HistoricalTrendsData) -> HistoricalComparisonSection {
    HistoricalComparisonSection {
        similar_markets: data
            .similar_markets
            .iter()
            .map(|m| {
                format!(
                    "\"{}\" - Resolved {} (Similarity: {:.0}%)",
                    m.question,
                    m.outcome,
                    m.similarity * 100.0
                )
            })
            .collect(),
        patterns: data
            .patterns
            .iter()
            .map(|p| {
                format!(
                    "{} ({} occurrences, {:.0}% success rate)",
                    p.pattern,
                    p.occurrences,
                    p.success_rate * 100.0
                )
            })
            .collect(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn source(name: &str, sentiment: f64) -> SourceSentiment {
    SourceSentiment {
        source: name.to_string(),
        sentiment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpertOpinion, Impact, KeyEvent, SimilarMarket, TrendPattern};
    use chrono::TimeZone;

    #[test]
    fn test_generated_date_format() {
        let at = chrono::Utc.with_ymd_and_hms(2025, 11, 5, 15, 4, 0).unwrap();
        assert_eq!(generated_date(at), "November 5, 2025, 03:04 PM");
    }

    #[test]
    fn test_baseline_has_no_premium_pages() {
        let content = baseline_content(SAMPLE_MARKET_QUESTION);
        assert!(content.market_context.is_none());
        assert!(content.historical_comparison.is_none());
        assert!(sample_content("Q", true).market_context.is_some());
    }

    #[test]
    fn test_research_is_flattened() {
        let context = MarketContextData {
            background: "Background".to_string(),
            key_events: vec![KeyEvent {
                date: "2025-11-12".to_string(),
                event: "Allocation announced".to_string(),
                impact: Impact::High,
            }],
            expert_opinions: vec![ExpertOpinion {
                expert: "J. Doe".to_string(),
                affiliation: "Fund".to_string(),
                quote: "Bullish".to_string(),
                source_url: String::new(),
            }],
        };
        let section = market_context_section(&context);
        assert_eq!(section.key_events[0], "2025-11-12: Allocation announced (high impact)");
        assert_eq!(section.expert_opinions[0], "J. Doe (Fund): \"Bullish\"");

        let trends = HistoricalTrendsData {
            similar_markets: vec![SimilarMarket {
                question: "ETH to $5k?".to_string(),
                outcome: "YES".to_string(),
                similarity: 0.9,
                ..Default::default()
            }],
            patterns: vec![TrendPattern {
                pattern: "Late swing".to_string(),
                occurrences: 5,
                success_rate: 0.75,
            }],
        };
        let section = historical_section(&trends);
        assert_eq!(section.similar_markets[0], "\"ETH to $5k?\" - Resolved YES (Similarity: 90%)");
        assert_eq!(section.patterns[0], "Late swing (5 occurrences, 75% success rate)");
    }
}
