use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced block pattern is valid")
});

/// The two fields a labeling completion must carry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelFields {
    pub topic_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    FencedBlock,
    BraceScan,
    WholeText,
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseStrategy::FencedBlock => "fenced-block",
            ParseStrategy::BraceScan => "brace-scan",
            ParseStrategy::WholeText => "whole-text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLabel {
    pub fields: LabelFields,
    pub strategy: ParseStrategy,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("no usable label JSON in completion after {tried} attempt(s): {reason}")]
pub struct ParseFailure {
    pub tried: usize,
    pub reason: String,
}

/// Extracts label fields from free-form model output.
///
/// Tries a fenced code block, then the span from the first `{` to the last
/// `}`, then the whole text. The first candidate that deserializes with a
/// non-empty `topic_name` wins.
pub fn parse_label(text: &str) -> Result<ParsedLabel, ParseFailure> {
    let mut tried = 0;
    let mut reason = String::from("no JSON object found");

    for (strategy, candidate) in candidates(text) {
        tried += 1;
        match decode(candidate) {
            Ok(fields) => return Ok(ParsedLabel { fields, strategy }),
            Err(e) => reason = format!("{}: {}", strategy, e),
        }
    }

    Err(ParseFailure { tried, reason })
}

fn candidates(text: &str) -> Vec<(ParseStrategy, &str)> {
    let mut out = Vec::with_capacity(3);

    if let Some(body) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        out.push((ParseStrategy::FencedBlock, body.as_str()));
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            out.push((ParseStrategy::BraceScan, &text[start..=end]));
        }
    }

    out.push((ParseStrategy::WholeText, text.trim()));
    out
}

fn decode(candidate: &str) -> Result<LabelFields, String> {
    let fields: LabelFields = serde_json::from_str(candidate).map_err(|e| e.to_string())?;
    let topic_name = fields.topic_name.trim();
    if topic_name.is_empty() {
        return Err("topic_name is empty".to_string());
    }

    Ok(LabelFields {
        topic_name: topic_name.to_string(),
        description: fields.description.trim().to_string(),
    })
}
