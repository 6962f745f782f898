//! Recipe document (meta.yaml) parsing
//!
//! Feedstock recipes are Jinja-templated YAML. Parsing renders the
//! template with an empty context first, tolerating one known failure
//! mode: references to the recipe directory (`{{ environ["RECIPE_DIR"] }}/`
//! or `{{ RECIPE_DIR }}/`), which are stripped and the render retried once.
//! Anything else that fails to render or parse is reported as a parse
//! failure, never raised past this module.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tera::{Context, Tera};

use crate::{Error, Result};

/// Tool names that are implicit in every recipe and never block a
/// same-batch update.
pub const IMPLICIT_TOOLS: [&str; 2] = ["python", "setuptools"];

fn recipe_dir_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*(?:environ\["RECIPE_DIR"\]|RECIPE_DIR)\s*\}\}/"#).unwrap()
    })
}

/// Render a recipe template with an empty context and parse it as YAML.
///
/// Retries once with the recipe-directory placeholder stripped when the
/// first render hits an undefined reference.
pub fn parse_recipe(text: &str) -> Result<serde_yaml::Value> {
    let rendered = match Tera::one_off(text, &Context::new(), false) {
        Ok(rendered) => rendered,
        Err(_) => {
            let stripped = recipe_dir_pattern().replace_all(text, "");
            Tera::one_off(&stripped, &Context::new(), false)
                .map_err(|e| Error::ParseFailure(e.to_string()))?
        }
    };

    serde_yaml::from_str(&rendered).map_err(|e| Error::ParseFailure(e.to_string()))
}

/// Parsed recipe data needed to tick a feedstock.
#[derive(Debug, Clone)]
pub struct RecipeRecord {
    /// Current version declared by the recipe (`package.version`).
    pub version: String,
    /// Source archive filename (`source.fn`).
    pub source_filename: String,
    /// Source archive checksum (`source.sha256`).
    pub source_checksum: String,
    /// Declared build/runtime requirement names, lowercased, with the
    /// implicit tool names removed.
    pub requirements: HashSet<String>,
    /// The unmodified document body the patch is applied to.
    pub raw_text: String,
    /// Blob identifier of `raw_text` as stored remotely. A commit against
    /// any other blob must be rejected as stale.
    pub content_handle: String,
}

impl RecipeRecord {
    /// Parse a raw recipe document into a record.
    ///
    /// Each of `package.version`, `source.fn` and `source.sha256` missing
    /// is reported with its dotted path: a malformed recipe the maintainer
    /// can act on, unlike a generic parse failure.
    pub fn from_document(text: &str, content_handle: &str) -> Result<Self> {
        let doc = parse_recipe(text)?;

        let version = scalar_at(&doc, "package", "version")?;
        let source_filename = scalar_at(&doc, "source", "fn")?;
        let source_checksum = scalar_at(&doc, "source", "sha256")?;

        let mut requirements = HashSet::new();
        if let Some(stages) = doc.get("requirements").and_then(|r| r.as_mapping()) {
            for entries in stages.values() {
                let Some(entries) = entries.as_sequence() else {
                    continue;
                };
                for entry in entries {
                    // Only the leading name token; constraints follow after
                    // whitespace ("widget >=1.0").
                    let Some(name) = entry
                        .as_str()
                        .and_then(|s| s.split_whitespace().next())
                    else {
                        continue;
                    };
                    requirements.insert(name.to_ascii_lowercase());
                }
            }
        }
        for tool in IMPLICIT_TOOLS {
            requirements.remove(tool);
        }

        Ok(RecipeRecord {
            version,
            source_filename,
            source_checksum,
            requirements,
            raw_text: text.to_string(),
            content_handle: content_handle.to_string(),
        })
    }
}

/// Extract a trimmed scalar at `outer.inner`, reporting the dotted path
/// when absent.
fn scalar_at(doc: &serde_yaml::Value, outer: &str, inner: &str) -> Result<String> {
    let value = doc
        .get(outer)
        .and_then(|v| v.get(inner))
        .ok_or_else(|| Error::MissingField(format!("{outer}.{inner}")))?;

    let text = match value {
        serde_yaml::Value::String(s) => s.trim().to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        _ => return Err(Error::MissingField(format!("{outer}.{inner}"))),
    };
    if text.is_empty() {
        return Err(Error::MissingField(format!("{outer}.{inner}")));
    }
    Ok(text)
}
