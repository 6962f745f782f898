//! Package index client
//!
//! Resolves the latest published release of a package from the PyPI JSON
//! API and scrapes the project page for the source archive's SHA256.
//! Lookups are single-shot: a failure is reported for that package only
//! and never aborts a batch.

use regex::Regex;
use serde::Deserialize;

use crate::{Error, Result};

const PYPI_API_BASE: &str = "https://pypi.org/pypi";
const PYPI_PROJECT_BASE: &str = "https://pypi.org/project";

/// Release info subset of the index's JSON document.
#[derive(Debug, Deserialize)]
struct ProjectDocument {
    info: ProjectInfo,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    version: String,
}

/// PyPI client
#[derive(Clone)]
pub struct PyPiClient {
    client: reqwest::Client,
}

impl PyPiClient {
    /// Create a new index client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("feedstock-tick/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Latest published version of `package`, trimmed.
    ///
    /// A missing record or unreachable index is a per-package
    /// [`Error::LookupFailed`]; there are no retries.
    pub async fn latest_version(&self, package: &str) -> Result<String> {
        let url = format!("{}/{}/json", PYPI_API_BASE, package);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::LookupFailed(format!("{}: {}", package, e)))?;

        if !response.status().is_success() {
            return Err(Error::LookupFailed(format!(
                "{}: index returned {}",
                package,
                response.status()
            )));
        }

        let document: ProjectDocument = response
            .json()
            .await
            .map_err(|e| Error::LookupFailed(format!("{}: {}", package, e)))?;

        Ok(document.info.version.trim().to_string())
    }

    /// Scrape the project files page for the SHA256 of the source archive
    /// `<package>-<version><suffix>`.
    ///
    /// Locates the download hyperlink whose target matches the hosted
    /// archive URL, then the checksum displayed alongside it. Any markup
    /// mismatch fails soft as [`Error::ChecksumUnavailable`].
    pub async fn source_sha256(
        &self,
        package: &str,
        version: &str,
        suffix: &str,
    ) -> Result<String> {
        let unavailable = || Error::ChecksumUnavailable {
            package: package.to_string(),
            version: version.to_string(),
        };

        let url = format!("{}/{}/{}/#files", PYPI_PROJECT_BASE, package, version);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| unavailable())?;
        if !response.status().is_success() {
            return Err(unavailable());
        }
        let page = response.text().await.map_err(|_| unavailable())?;

        extract_archive_sha256(&page, package, version, suffix).ok_or_else(unavailable)
    }
}

/// Find the archive hyperlink in the rendered page and the 64-hex checksum
/// displayed next to it.
fn extract_archive_sha256(
    page: &str,
    package: &str,
    version: &str,
    suffix: &str,
) -> Option<String> {
    let href = Regex::new(&format!(
        r#"href="https://files\.pythonhosted\.org[^"]*{}-{}{}""#,
        regex::escape(package),
        regex::escape(version),
        regex::escape(suffix),
    ))
    .ok()?;
    let anchor = href.find(page)?;

    // The checksum sits in a copy-to-clipboard attribute shortly after the
    // download link.
    let mut end = (anchor.end() + 4096).min(page.len());
    while !page.is_char_boundary(end) {
        end += 1;
    }
    let window = &page[anchor.end()..end];
    let sha = Regex::new(r#"data-clipboard-text="([0-9a-f]{64})""#).ok()?;
    sha.captures(window)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn page_for(filename: &str) -> String {
        format!(
            r#"<div class="file">
  <a href="https://files.pythonhosted.org/packages/ab/cd/{filename}">{filename}</a>
  <button data-clipboard-text="{SHA}">Copy SHA256</button>
</div>"#
        )
    }

    #[test]
    fn test_extracts_checksum_next_to_archive_link() {
        let page = page_for("widget-1.2.0.tar.gz");
        assert_eq!(
            extract_archive_sha256(&page, "widget", "1.2.0", ".tar.gz").as_deref(),
            Some(SHA)
        );
    }

    #[test]
    fn test_wrong_version_fails_soft() {
        let page = page_for("widget-1.2.0.tar.gz");
        assert!(extract_archive_sha256(&page, "widget", "1.3.0", ".tar.gz").is_none());
    }

    #[test]
    fn test_missing_checksum_attribute_fails_soft() {
        let page = r#"<a href="https://files.pythonhosted.org/packages/widget-1.2.0.tar.gz">x</a>"#;
        assert!(extract_archive_sha256(page, "widget", "1.2.0", ".tar.gz").is_none());
    }

    #[test]
    fn test_package_name_with_regex_metachars() {
        let page = page_for("widget.plus-1.2.0.tar.gz");
        assert_eq!(
            extract_archive_sha256(&page, "widget.plus", "1.2.0", ".tar.gz").as_deref(),
            Some(SHA)
        );
    }
}
