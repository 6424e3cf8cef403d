//! Query response types.
//!
//! These are the shapes printed to stdout, written to the result file and
//! returned by the HTTP API.

use crate::data::MovieMetadata;
use crate::error::{PlotlineError, Result};
use crate::llm::ResponseSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// What the language model returns for one movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationFromLlm {
    /// Why the movie fits the query.
    pub reason: String,
    /// Short theme tags.
    pub highlights: Vec<String>,
}

impl RecommendationFromLlm {
    /// Strict JSON Schema handed to the model for structured output.
    pub fn json_schema() -> ResponseSchema {
        ResponseSchema {
            name: "recommendation".to_string(),
            description: Some(
                "Why a movie matches a search, with short theme highlights".to_string(),
            ),
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "reason": {
                        "type": "string",
                        "description": "Why this movie is a good recommendation for the search"
                    },
                    "highlights": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Key themes of the movie as short tags"
                    }
                },
                "required": ["reason", "highlights"],
                "additionalProperties": false
            }),
        }
    }

    /// Parse a model reply.
    pub fn from_json(reply: &str) -> Result<Self> {
        serde_json::from_str(reply.trim())
            .map_err(|e| PlotlineError::Schema(format!("recommendation: {}", e)))
    }
}

/// One retrieved movie with its model-written recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRecommendation {
    pub id: String,
    pub metadata: MovieMetadata,
    pub structured: RecommendationFromLlm,
}

/// Result of a structured query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub recommendations: Vec<FinalRecommendation>,
}

impl QueryResponse {
    /// Parse and validate a serialized response.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PlotlineError::Schema(format!("query response: {}", e)))
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the pretty JSON to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        info!("Saved query response to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueryResponse {
        QueryResponse {
            query: "ships lost at sea".to_string(),
            recommendations: vec![FinalRecommendation {
                id: "7".to_string(),
                metadata: MovieMetadata {
                    title: Some("Titanic".to_string()),
                    year: Some(1997),
                    ..MovieMetadata::default()
                },
                structured: RecommendationFromLlm {
                    reason: "A liner sinks.".to_string(),
                    highlights: vec!["disaster".to_string(), "romance".to_string()],
                },
            }],
        }
    }

    #[test]
    fn test_json_shape() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();

        assert_eq!(value["query"], "ships lost at sea");
        let rec = &value["recommendations"][0];
        assert_eq!(rec["id"], "7");
        assert_eq!(rec["metadata"]["title"], "Titanic");
        assert!(rec["metadata"]["genre"].is_null());
        assert_eq!(rec["structured"]["highlights"][1], "romance");
    }

    #[test]
    fn test_from_json_validates_types() {
        let json = sample().to_json().unwrap();
        assert_eq!(QueryResponse::from_json(&json).unwrap(), sample());

        let empty = r#"{"query": "q", "recommendations": []}"#;
        assert!(QueryResponse::from_json(empty).unwrap().recommendations.is_empty());

        assert!(matches!(
            QueryResponse::from_json(r#"{"query": "q"}"#),
            Err(PlotlineError::Schema(_))
        ));
        assert!(QueryResponse::from_json(r#"{"query": 3, "recommendations": []}"#).is_err());
    }

    #[test]
    fn test_recommendation_reply_parsing() {
        let parsed =
            RecommendationFromLlm::from_json(r#" {"reason": "fits", "highlights": ["heist"]} "#)
                .unwrap();
        assert_eq!(parsed.highlights, vec!["heist"]);

        assert!(RecommendationFromLlm::from_json(r#"{"reason": "fits"}"#).is_err());
        assert!(RecommendationFromLlm::from_json("not json").is_err());
    }

    #[test]
    fn test_schema_requires_both_fields() {
        let schema = RecommendationFromLlm::json_schema();
        assert_eq!(schema.schema["required"], serde_json::json!(["reason", "highlights"]));
        assert_eq!(schema.schema["additionalProperties"], false);
    }

    #[test]
    fn test_save_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query_result.json");
        sample().save_to(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(QueryResponse::from_json(&saved).unwrap(), sample());
    }
}
