//! Prompt templates and the layered prompt builder.
//!
//! Prompts are plain-text files under `config/prompts/`. A
//! [`PromptTemplate`] is one required file rendered with `{{key}}`
//! substitution; [`PromptBuilder`] puts the persona layer in front of it.
//!
//! A placeholder with no matching variable is left as-is.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::AppError;

const SEPARATOR: &str = "\n\n";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder regex is valid"));

/// Replace every `{{key}}` in `text` whose key is in `vars`.
pub fn substitute(text: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &regex::Captures<'_>| match vars.get(&caps[1]) {
            Some(v) => v.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// A single prompt file.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    text: String,
}

impl PromptTemplate {
    /// Load `name` (file name including extension) from `dir`.
    pub fn load(dir: &Path, name: &str) -> Result<Self, AppError> {
        let path = dir.join(name);
        let text = fs::read_to_string(&path)
            .map_err(|e| AppError::Prompt(format!("cannot read {}: {e}", path.display())))?;
        Ok(Self { name: name.to_string(), text: text.trim().to_string() })
    }

    /// Template from an in-memory string, e.g. a user-supplied custom prompt.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for caps in PLACEHOLDER_RE.captures_iter(&self.text) {
            let name = caps[1].to_string();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }

    pub fn render<'a, I>(&self, vars: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let vars: HashMap<String, String> =
            vars.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        substitute(&self.text, &vars)
    }
}

/// File name of the persona layer shared by every agent.
pub const PERSONA: &str = "id.md";

/// A prompt assembled from stacked layers: the persona (when present)
/// followed by the agent template. Variables are substituted once over the
/// joined text so a value can never introduce a new placeholder.
#[derive(Debug, Default)]
pub struct PromptBuilder {
    layers: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `name` from `dir` if it exists and is non-empty.
    pub fn optional_layer(mut self, dir: &Path, name: &str) -> Self {
        match PromptTemplate::load(dir, name) {
            Ok(t) => self.push(t.text),
            Err(e) => debug!(layer = name, error = %e, "prompt layer skipped"),
        }
        self
    }

    pub fn template(mut self, template: &PromptTemplate) -> Self {
        self.push(template.text.clone());
        self
    }

    pub fn vars<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.vars.extend(vars.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    pub fn build(self) -> String {
        substitute(&self.layers.join(SEPARATOR), &self.vars)
    }

    fn push(&mut self, text: String) {
        let text = text.trim();
        if !text.is_empty() {
            self.layers.push(text.to_string());
        }
    }
}

/// Builder already holding the persona layer from `prompts_dir`.
pub fn preamble(prompts_dir: &Path) -> PromptBuilder {
    PromptBuilder::new().optional_layer(prompts_dir, PERSONA)
}
