// HTML report template population
// Author: kelexine (https://github.com/kelexine)

use crate::error::{AppError, Result};
use crate::models::ReportContent;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

const EMBEDDED_TEMPLATE: &str = include_str!("../../templates/report-template.html");
const EMBEDDED_STYLES: &str = include_str!("../../templates/report-styles.css");

pub const TEMPLATE_FILE: &str = "report-template.html";
pub const STYLES_FILE: &str = "report-styles.css";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{([A-Z_]+)\}\}").unwrap();
    static ref PERPLEXITY_SECTION: Regex =
        Regex::new(r"(?s)<!-- PERPLEXITY_START -->.*?<!-- PERPLEXITY_END -->").unwrap();
    static ref HISTORICAL_SECTION: Regex =
        Regex::new(r"(?s)<!-- HISTORICAL_START -->.*?<!-- HISTORICAL_END -->").unwrap();
}

/// The report's HTML template and stylesheet.
#[derive(Debug, Clone)]
pub struct ReportTemplate {
    html: String,
    styles: String,
}

impl ReportTemplate {
    /// Template and styles compiled into the binary.
    pub fn embedded() -> Self {
        Self::from_parts(EMBEDDED_TEMPLATE, EMBEDDED_STYLES)
    }

    pub fn from_parts(html: impl Into<String>, styles: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            styles: styles.into(),
        }
    }

    /// Read `report-template.html` and `report-styles.css` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let read = |name: &str| {
            std::fs::read_to_string(dir.join(name)).map_err(|e| {
                AppError::Config(format!(
                    "Cannot read report template {}: {}",
                    dir.join(name).display(),
                    e
                ))
            })
        };
        Ok(Self::from_parts(read(TEMPLATE_FILE)?, read(STYLES_FILE)?))
    }

    /// Populate the template with `content`.
    ///
    /// Premium sections are removed unless `include_perplexity` is set and
    /// the matching content is present. Substitution is a single pass, so
    /// placeholder-like text inside values is never expanded. Every piece of
    /// content is HTML-escaped.
    pub fn render(&self, content: &ReportContent, include_perplexity: bool) -> Result<String> {
        let mut html = self.html.clone();

        let market_context = content
            .market_context
            .as_ref()
            .filter(|_| include_perplexity);
        let historical = content
            .historical_comparison
            .as_ref()
            .filter(|_| include_perplexity);

        if market_context.is_none() {
            html = PERPLEXITY_SECTION.replace_all(&html, "").into_owned();
        }
        if historical.is_none() {
            html = HISTORICAL_SECTION.replace_all(&html, "").into_owned();
        }

        let summary = &content.executive_summary;
        let overview = &content.market_overview;
        let sentiment = &content.sentiment_analysis;
        let predictions = &content.ai_predictions;
        let disclaimer = &content.risk_disclaimer;

        let mut values: HashMap<&'static str, String> = HashMap::from([
            ("STYLES", self.styles.clone()),
            ("MARKET_QUESTION", escape_html(&content.cover.market_question)),
            ("GENERATED_DATE", escape_html(&content.cover.generated_date)),
            ("AI_PREDICTION", escape_html(&summary.ai_prediction)),
            ("CONFIDENCE", summary.confidence.to_string()),
            ("KEY_INSIGHTS", list_items(&summary.key_insights, "")),
            ("RISK_LEVEL", summary.risk_level.as_str().to_uppercase()),
            ("RISK_CLASS", format!("risk-{}", summary.risk_level.as_str())),
            ("PRICE", format!("{:.2}", overview.price)),
            ("VOLUME", format_currency(overview.volume)),
            ("LIQUIDITY", format_currency(overview.liquidity)),
            (
                "MARKET_STATUS",
                if overview.active { "Active" } else { "Closed" }.to_string(),
            ),
            ("PRICE_CHART_IMAGE", escape_html(&content.price_chart.chart_image_url)),
            ("OVERALL_SENTIMENT", format_percent(sentiment.overall_sentiment)),
            ("SENTIMENT_SOURCES", sentiment_rows(content)),
            ("SENTIMENT_TREND_CHART", escape_html(&sentiment.trend_chart)),
            ("PREDICTED_OUTCOME", escape_html(&predictions.predicted_outcome)),
            ("REASONING", escape_html(&predictions.reasoning)),
            ("CONFIDENCE_ANALYSIS", escape_html(&predictions.confidence_analysis)),
            ("RISK_FACTORS", list_items(&disclaimer.risk_factors, "⚠ ")),
            ("LEGAL_DISCLAIMER", escape_html(&disclaimer.legal_disclaimer)),
            ("CAVEATS", list_items(&disclaimer.caveats, "")),
        ]);

        if let Some(context) = market_context {
            values.insert("MARKET_BACKGROUND", escape_html(&context.background));
            values.insert("KEY_EVENTS", list_items(&context.key_events, ""));
            values.insert("EXPERT_OPINIONS", list_items(&context.expert_opinions, ""));
        }
        if let Some(history) = historical {
            values.insert("SIMILAR_MARKETS", list_items(&history.similar_markets, ""));
            values.insert("PATTERNS", list_items(&history.patterns, ""));
        }

        substitute(&html, &values)
    }
}

fn substitute(html: &str, values: &HashMap<&'static str, String>) -> Result<String> {
    let mut out = String::with_capacity(html.len() + values.values().map(String::len).sum::<usize>());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(html) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = values.get(name.as_str()).ok_or_else(|| {
            AppError::PdfGeneration(format!("Unknown template placeholder: {}", whole.as_str()))
        })?;
        out.push_str(&html[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&html[last..]);

    Ok(out)
}

fn list_items(items: &[String], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("<li>{}{}</li>", prefix, escape_html(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sentiment_rows(content: &ReportContent) -> String {
    content
        .sentiment_analysis
        .source_breakdown
        .iter()
        .map(|s| {
            format!(
                "<tr>\n  <td>{}</td>\n  <td class=\"sentiment-value\">{}%</td>\n</tr>",
                escape_html(&s.source),
                format_percent(s.sentiment)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Dollar amount with an M/K suffix above a million/thousand.
pub fn format_currency(amount: f64) -> String {
    if amount >= 1_000_000.0 {
        format!("${:.2}M", amount / 1_000_000.0)
    } else if amount >= 1_000.0 {
        format!("${:.2}K", amount / 1_000.0)
    } else {
        format!("${:.2}", amount)
    }
}

/// A -1..1 score as a percentage with one decimal.
pub fn format_percent(score: f64) -> String {
    format!("{:.1}", score * 100.0)
}
