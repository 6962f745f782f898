//! Independent-batch planning
//!
//! Updating package A in the same batch where package B — also being
//! updated — is a declared requirement of A would build A against a
//! version/checksum of B that is about to change. The planner excludes
//! those candidates instead of trying to order or retry them.

use std::collections::HashSet;

use crate::github::Repository;
use crate::status::{package_name, UpdateCandidate};

/// Split the needs-update candidates into (planned, deferred).
///
/// A candidate is planned when its requirement set shares no name with any
/// package present in the batch; otherwise it is deferred to a later run,
/// by which time its requirements have settled.
pub fn plan_independent_updates(
    candidates: Vec<(Repository, UpdateCandidate)>,
) -> (
    Vec<(Repository, UpdateCandidate)>,
    Vec<(Repository, UpdateCandidate)>,
) {
    let batch_names: HashSet<String> = candidates
        .iter()
        .filter_map(|(repo, _)| package_name(&repo.full_name))
        .map(str::to_string)
        .collect();

    candidates.into_iter().partition(|(_, candidate)| {
        candidate
            .record
            .requirements
            .is_disjoint(&batch_names)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::Owner;
    use crate::recipe::RecipeRecord;

    fn feedstock(package: &str) -> Repository {
        Repository {
            name: format!("{package}-feedstock"),
            full_name: format!("conda-forge/{package}-feedstock"),
            owner: Owner {
                login: "conda-forge".to_string(),
            },
            default_branch: "main".to_string(),
        }
    }

    fn candidate(requirements: &[&str]) -> UpdateCandidate {
        UpdateCandidate {
            record: RecipeRecord {
                version: "1.0.0".to_string(),
                source_filename: "pkg-1.0.0.tar.gz".to_string(),
                source_checksum: "aaa".to_string(),
                requirements: requirements.iter().map(|s| s.to_string()).collect(),
                raw_text: String::new(),
                content_handle: "sha".to_string(),
            },
            latest_version: "1.2.0".to_string(),
        }
    }

    #[test]
    fn test_dependent_candidate_is_deferred() {
        let batch = vec![
            (feedstock("aaa-tool"), candidate(&["bbb-lib"])),
            (feedstock("bbb-lib"), candidate(&[])),
        ];
        let (planned, deferred) = plan_independent_updates(batch);

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].0.full_name, "conda-forge/bbb-lib-feedstock");
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].0.full_name, "conda-forge/aaa-tool-feedstock");
    }

    #[test]
    fn test_unrelated_requirements_keep_everything() {
        let batch = vec![
            (feedstock("aaa-tool"), candidate(&["requests", "numpy"])),
            (feedstock("bbb-lib"), candidate(&["six"])),
        ];
        let (planned, deferred) = plan_independent_updates(batch);
        assert_eq!(planned.len(), 2);
        assert!(deferred.is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let batch = vec![
            (feedstock("zzz"), candidate(&[])),
            (feedstock("aaa"), candidate(&[])),
        ];
        let (planned, _) = plan_independent_updates(batch);
        assert_eq!(planned[0].0.full_name, "conda-forge/zzz-feedstock");
        assert_eq!(planned[1].0.full_name, "conda-forge/aaa-feedstock");
    }

    #[test]
    fn test_empty_batch() {
        let (planned, deferred) = plan_independent_updates(Vec::new());
        assert!(planned.is_empty());
        assert!(deferred.is_empty());
    }
}
