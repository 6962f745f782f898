//! Feedstock status evaluation
//!
//! For one maintained repository: fetch the recipe, parse it, resolve the
//! package's latest index release, and classify the repository as
//! up-to-date, needing an update, unparseable, or lookup-failed. Every
//! outcome is per-repository; nothing here aborts the batch.

use tracing::debug;

use crate::github::{GitHubClient, Repository};
use crate::pypi::PyPiClient;
use crate::recipe::RecipeRecord;
use crate::version::PackageVersion;

/// Organizational prefix every feedstock full name carries.
pub const ORG_PREFIX: &str = "conda-forge/";
/// Suffix every feedstock repository name carries.
pub const FEEDSTOCK_SUFFIX: &str = "-feedstock";
/// Canonical recipe location inside a feedstock.
pub const RECIPE_PATH: &str = "recipe/meta.yaml";

/// Everything needed to tick one feedstock.
#[derive(Debug, Clone)]
pub struct UpdateCandidate {
    pub record: RecipeRecord,
    pub latest_version: String,
}

/// Outcome of evaluating one feedstock. Exactly one variant holds per
/// repository per pass.
#[derive(Debug)]
pub enum FeedstockStatus {
    UpToDate,
    NeedsUpdate(UpdateCandidate),
    Unparseable(String),
    LookupFailed(String),
}

/// Package name of a feedstock: full name minus the organizational prefix
/// and the feedstock suffix. `None` when the name doesn't follow the
/// convention.
pub fn package_name(full_name: &str) -> Option<&str> {
    full_name
        .strip_prefix(ORG_PREFIX)?
        .strip_suffix(FEEDSTOCK_SUFFIX)
}

/// Whether the recipe's declared version is already at or past the index's
/// latest release, under numeric-aware ordering.
pub fn is_up_to_date(current: &str, latest: &str) -> bool {
    PackageVersion::parse(current) >= PackageVersion::parse(latest)
}

/// Evaluate one feedstock repository.
pub async fn evaluate_feedstock(
    github: &GitHubClient,
    pypi: &PyPiClient,
    repo: &Repository,
) -> FeedstockStatus {
    let file = match github.file_contents(&repo.full_name, RECIPE_PATH).await {
        Ok(file) => file,
        Err(e) => return FeedstockStatus::Unparseable(e.to_string()),
    };
    let text = match file.decoded() {
        Ok(text) => text,
        Err(e) => return FeedstockStatus::Unparseable(e.to_string()),
    };

    // ParseFailure and MissingField stay distinguishable through their
    // rendered reasons in the final report.
    let record = match RecipeRecord::from_document(&text, &file.sha) {
        Ok(record) => record,
        Err(e) => return FeedstockStatus::Unparseable(e.to_string()),
    };

    let Some(package) = package_name(&repo.full_name) else {
        return FeedstockStatus::LookupFailed(format!(
            "{} is not a feedstock name",
            repo.full_name
        ));
    };
    let latest = match pypi.latest_version(package).await {
        Ok(latest) => latest,
        Err(e) => return FeedstockStatus::LookupFailed(e.to_string()),
    };

    if is_up_to_date(&record.version, &latest) {
        debug!("{} already at {} (index has {})", repo.full_name, record.version, latest);
        return FeedstockStatus::UpToDate;
    }

    FeedstockStatus::NeedsUpdate(UpdateCandidate {
        record,
        latest_version: latest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name_stripping() {
        assert_eq!(package_name("conda-forge/widget-feedstock"), Some("widget"));
        assert_eq!(
            package_name("conda-forge/my-widget-feedstock"),
            Some("my-widget")
        );
        assert_eq!(package_name("conda-forge/widget"), None);
        assert_eq!(package_name("elsewhere/widget-feedstock"), None);
    }

    #[test]
    fn test_up_to_date_when_equal_or_newer() {
        assert!(is_up_to_date("1.2.0", "1.2.0"));
        assert!(is_up_to_date("1.2.0", "0.9.0"));
        assert!(is_up_to_date("1.0", "1.0.0"));
    }

    #[test]
    fn test_needs_update_when_older() {
        assert!(!is_up_to_date("1.0.0", "1.2.0"));
        assert!(!is_up_to_date("1.9", "1.10"));
        assert!(!is_up_to_date("1.0rc1", "1.0"));
    }
}
