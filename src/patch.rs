//! Patch construction
//!
//! Builds the content-update payload that ticks a recipe to a new upstream
//! version: fetch the new archive checksum, literal find-and-replace of
//! the old version and checksum strings, and a base64 commit body pinned
//! to the blob the document was read from.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;

use crate::pypi::PyPiClient;
use crate::recipe::RecipeRecord;
use crate::{Error, Result};

/// JSON body for the hosting content PUT.
///
/// `sha` is the blob identifier the patch was computed against; the remote
/// rejects the write if the file has moved on since (optimistic
/// concurrency).
#[derive(Debug, Clone, Serialize)]
pub struct ContentUpdate {
    pub message: String,
    pub content: String,
    pub sha: String,
}

/// Split a source filename into the bare package name and archive suffix.
///
/// `widget-1.0.0.tar.gz` with version `1.0.0` yields
/// `("widget", ".tar.gz")`: the name is everything before the trailing
/// `-<version>` segment, the suffix everything after the version.
pub fn archive_parts(source_filename: &str, version: &str) -> Result<(String, String)> {
    let marker = format!("-{}", version);
    let name_end = source_filename
        .rfind(&marker)
        .ok_or_else(|| Error::PatchRejected(format!(
            "source filename {:?} does not embed version {:?}",
            source_filename, version
        )))?;
    let name = &source_filename[..name_end];
    let suffix = &source_filename[name_end + marker.len()..];
    Ok((name.to_string(), suffix.to_string()))
}

/// Apply the version/checksum replacement and package the commit payload.
///
/// Rejects the patch unless both the old version and the old checksum are
/// literally present in the document; replacing only one would push a
/// recipe whose checksum no longer matches its source.
pub fn apply_patch(
    record: &RecipeRecord,
    new_version: &str,
    new_checksum: &str,
) -> Result<ContentUpdate> {
    if !record.raw_text.contains(&record.version)
        || !record.raw_text.contains(&record.source_checksum)
    {
        return Err(Error::PatchRejected(
            "couldn't find current version or SHA in meta.yaml".to_string(),
        ));
    }

    // Literal tokens, version first. Replacing the checksum first could
    // cross-contaminate if one token embeds the other.
    let new_text = record
        .raw_text
        .replace(&record.version, new_version)
        .replace(&record.source_checksum, new_checksum);

    Ok(ContentUpdate {
        message: format!("Tick version to {}", new_version),
        content: BASE64.encode(new_text.as_bytes()),
        sha: record.content_handle.clone(),
    })
}

/// Build the full patch for a record: resolve the new archive checksum
/// from the index, then rewrite the document.
///
/// Any failure here is fatal for this repository's update only, never for
/// the batch.
pub async fn build_patch(
    index: &PyPiClient,
    record: &RecipeRecord,
    new_version: &str,
) -> Result<ContentUpdate> {
    let (package, suffix) = archive_parts(&record.source_filename, &record.version)?;
    let new_checksum = index.source_sha256(&package, new_version, &suffix).await?;
    apply_patch(record, new_version, &new_checksum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(raw_text: &str, version: &str, checksum: &str) -> RecipeRecord {
        RecipeRecord {
            version: version.to_string(),
            source_filename: format!("widget-{}.tar.gz", version),
            source_checksum: checksum.to_string(),
            requirements: HashSet::new(),
            raw_text: raw_text.to_string(),
            content_handle: "blob-sha-1".to_string(),
        }
    }

    #[test]
    fn test_archive_parts() {
        let (name, suffix) = archive_parts("widget-1.0.0.tar.gz", "1.0.0").unwrap();
        assert_eq!(name, "widget");
        assert_eq!(suffix, ".tar.gz");
    }

    #[test]
    fn test_archive_parts_hyphenated_name() {
        let (name, suffix) = archive_parts("my-widget-2.1.zip", "2.1").unwrap();
        assert_eq!(name, "my-widget");
        assert_eq!(suffix, ".zip");
    }

    #[test]
    fn test_archive_parts_version_absent() {
        assert!(archive_parts("widget.tar.gz", "1.0.0").is_err());
    }

    #[test]
    fn test_patch_replaces_all_occurrences() {
        let text = "package:\n  version: \"1.0.0\"\nsource:\n  fn: widget-1.0.0.tar.gz\n  sha256: aaa111\n";
        let update = apply_patch(&record(text, "1.0.0", "aaa111"), "1.2.0", "bbb222").unwrap();

        let new_text = String::from_utf8(BASE64.decode(&update.content).unwrap()).unwrap();
        assert!(!new_text.contains("1.0.0"));
        assert!(!new_text.contains("aaa111"));
        assert!(new_text.contains("version: \"1.2.0\""));
        assert!(new_text.contains("widget-1.2.0.tar.gz"));
        assert!(new_text.contains("sha256: bbb222"));
    }

    #[test]
    fn test_patch_carries_handle_and_message() {
        let text = "version: 1.0.0\nsha256: aaa111\n";
        let update = apply_patch(&record(text, "1.0.0", "aaa111"), "1.2.0", "bbb222").unwrap();
        assert_eq!(update.sha, "blob-sha-1");
        assert_eq!(update.message, "Tick version to 1.2.0");
    }

    #[test]
    fn test_patch_rejected_when_version_missing() {
        let text = "sha256: aaa111\n";
        match apply_patch(&record(text, "1.0.0", "aaa111"), "1.2.0", "bbb222") {
            Err(Error::PatchRejected(_)) => {}
            other => panic!("expected PatchRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_patch_rejected_when_checksum_missing() {
        let text = "version: 1.0.0\n";
        match apply_patch(&record(text, "1.0.0", "aaa111"), "1.2.0", "bbb222") {
            Err(Error::PatchRejected(_)) => {}
            other => panic!("expected PatchRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_serializes_expected_fields() {
        let text = "version: 1.0.0\nsha256: aaa111\n";
        let update = apply_patch(&record(text, "1.0.0", "aaa111"), "1.2.0", "bbb222").unwrap();
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("message").is_some());
        assert!(json.get("content").is_some());
        assert_eq!(json.get("sha").and_then(|v| v.as_str()), Some("blob-sha-1"));
    }
}
