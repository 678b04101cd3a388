// Prompt construction for the five research endpoints
// Author: kelexine (https://github.com/kelexine)

use crate::models::Endpoint;

pub const SYSTEM_PROMPT: &str = "You are a financial intelligence analyst. Provide factual, \
well-sourced analysis with proper citations. Format responses as structured JSON when possible.";

/// Build the user prompt asking for the endpoint's JSON shape.
pub fn build(endpoint: Endpoint, market_id: &str) -> String {
    match endpoint {
        Endpoint::Context => format!(
            r#"Provide comprehensive market context for prediction market ID: {market_id}.

Include:
1. Background information (2-3 paragraphs)
2. Key recent events (last 30 days) with dates, descriptions, and impact levels (high/medium/low)
3. Expert opinions from credible sources with quotes and affiliations

Format as JSON with this structure:
{{
  "background": "string",
  "keyEvents": [{{"date": "ISO8601", "event": "string", "impact": "high|medium|low"}}],
  "expertOpinions": [{{"expert": "string", "affiliation": "string", "quote": "string", "sourceUrl": "string"}}]
}}"#
        ),
        Endpoint::News => format!(
            r#"Find the latest breaking news (last 24 hours) relevant to prediction market ID: {market_id}.

Include:
1. Title, summary, published date, source, and sentiment (bullish/bearish/neutral)
2. Prioritize authoritative sources (Reuters, Bloomberg, WSJ, etc.)

Format as JSON:
{{
  "breaking": [{{"title": "string", "summary": "string", "publishedAt": "ISO8601", "source": "string", "sourceUrl": "string", "sentiment": "bullish|bearish|neutral"}}],
  "lastUpdated": "ISO8601"
}}"#
        ),
        Endpoint::Experts => format!(
            r#"Analyze expert predictions and consensus for prediction market ID: {market_id}.

Include:
1. Overall consensus (bullish/bearish/neutral/divided)
2. Consensus strength (0-1, where 1 = unanimous)
3. Individual expert predictions with rationale and confidence levels

Format as JSON:
{{
  "consensus": "bullish|bearish|neutral|divided",
  "consensusStrength": 0.85,
  "predictions": [{{"expert": "string", "prediction": "string", "rationale": "string", "confidence": 0.8, "sourceUrl": "string"}}]
}}"#
        ),
        Endpoint::Brief => format!(
            r#"Generate an executive daily brief for prediction market ID: {market_id}.

Include:
1. One-paragraph summary (100-150 words)
2. 3-5 key insights (bullet points)
3. Market mood assessment (optimistic/pessimistic/uncertain)
4. Risk level (low/medium/high)
5. Recommendation (1-2 sentences)

Format as JSON:
{{
  "summary": "string",
  "keyInsights": ["string", "string", "string"],
  "marketMood": "optimistic|pessimistic|uncertain",
  "riskLevel": "low|medium|high",
  "recommendation": "string"
}}"#
        ),
        Endpoint::Trends => format!(
            r#"Analyze historical trends and similar markets for prediction market ID: {market_id}.

Include:
1. Similar past markets with outcomes and resolution dates
2. Similarity scores (0-1)
3. Lessons learned from each
4. Recurring patterns with success rates

Format as JSON:
{{
  "similarMarkets": [{{"question": "string", "resolvedDate": "ISO8601", "outcome": "string", "similarity": 0.9, "lessons": "string"}}],
  "patterns": [{{"pattern": "string", "occurrences": 5, "successRate": 0.75}}]
}}"#
        ),
    }
}
