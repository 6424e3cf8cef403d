//! Prompt templates for Plotline.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use crate::error::{PlotlineError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub recommend: RecommendPrompts,
    pub summarize: SummarizePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for per-movie structured recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RecommendPrompts {
    fn default() -> Self {
        Self {
            system: "You are helping a movie recommendation system. You answer only with the requested JSON object.".to_string(),

            user: r#"A user searched for: {{query}}

Based on the following movie plot, explain why this movie is a good recommendation
for that search, and highlight its key themes as short tags.

Movie: {{title}}

Movie Plot:
{{plot}}"#
                .to_string(),
        }
    }
}

/// Prompts for summarizing all retrieved movies at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizePrompts {
    pub system: String,
    pub user: String,
}

impl Default for SummarizePrompts {
    fn default() -> Self {
        Self {
            system: "You summarize movie plots for someone deciding what to watch.".to_string(),

            user: r#"Write a concise summary of the following movies, as they relate to the search "{{query}}":

{{documents}}

CONCISE SUMMARY:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let recommend_path = custom_path.join("recommend.toml");
            if recommend_path.exists() {
                let content = std::fs::read_to_string(&recommend_path)?;
                prompts.recommend = toml::from_str(&content)?;
            }

            let summarize_path = custom_path.join("summarize.toml");
            if summarize_path.exists() {
                let content = std::fs::read_to_string(&summarize_path)?;
                prompts.summarize = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in one pass, so substituted text is never
    /// expanded again. Unknown placeholders are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> Result<String> {
        let placeholder = Regex::new(r"\{\{(\w+)\}\}")
            .map_err(|e| PlotlineError::Config(format!("Invalid placeholder pattern: {}", e)))?;

        let rendered = placeholder.replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        });
        Ok(rendered.into_owned())
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> Result<String> {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
