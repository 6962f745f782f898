//! Fork synchronization
//!
//! Ensures the user has a personal fork of a feedstock that is not behind
//! the upstream default branch. Tri-state reconciliation, deliberately
//! asymmetric: a fork *ahead* of upstream holds the user's local work and
//! is never touched; a fork *behind* upstream holds nothing of value and
//! is deleted and recreated fresh; an even fork is used as-is.

use tracing::{info, warn};

use crate::github::{Comparison, GitHubClient, Repository};
use crate::Result;

/// What to do with an existing fork, given its relation to upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkAction {
    /// Fork has commits upstream lacks; leave it alone.
    LeaveAlone,
    /// Fork is behind upstream; delete and recreate.
    Recreate,
    /// Fork is even with upstream; use unchanged.
    UseAsIs,
}

/// Decide the reconciliation action from ahead/behind counts.
pub fn fork_action(comparison: Comparison) -> ForkAction {
    if comparison.ahead_by > 0 {
        ForkAction::LeaveAlone
    } else if comparison.behind_by > 0 {
        ForkAction::Recreate
    } else {
        ForkAction::UseAsIs
    }
}

/// Return the user's existing fork of `repo`, creating one if absent.
pub async fn get_or_create_fork(
    github: &GitHubClient,
    user: &str,
    repo: &Repository,
) -> Result<Repository> {
    let forks = github.list_forks(&repo.full_name).await?;
    if let Some(fork) = forks.into_iter().find(|f| f.owner.login == user) {
        return Ok(fork);
    }
    info!("forking {} for {}", repo.full_name, user);
    github.create_fork(&repo.full_name).await
}

/// Ensure a fork of `repo` that is even with the upstream default branch.
///
/// `Ok(None)` means the fork must not be used: either it is ahead of
/// upstream, or it was stale and could not be deleted — in both cases
/// giving up beats risking the user's work or an inconsistent state.
pub async fn ensure_synced_fork(
    github: &GitHubClient,
    user: &str,
    repo: &Repository,
) -> Result<Option<Repository>> {
    let fork = get_or_create_fork(github, user, repo).await?;

    let branch = &repo.default_branch;
    let base = format!("{}:{}", repo.owner.login, branch);
    let head = format!("{}:{}", user, branch);
    let comparison = github.compare(&repo.full_name, &base, &head).await?;

    match fork_action(comparison) {
        ForkAction::LeaveAlone => {
            info!(
                "{} fork is ahead of upstream by {}; leaving it alone",
                fork.full_name, comparison.ahead_by
            );
            Ok(None)
        }
        ForkAction::Recreate => {
            info!(
                "{} fork is behind upstream by {}; recreating",
                fork.full_name, comparison.behind_by
            );
            if let Err(e) = github.delete_repo(&fork.full_name).await {
                warn!("couldn't delete stale fork {}: {}", fork.full_name, e);
                return Ok(None);
            }
            let fresh = github.create_fork(&repo.full_name).await?;
            Ok(Some(fresh))
        }
        ForkAction::UseAsIs => Ok(Some(fork)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(ahead_by: u64, behind_by: u64) -> Comparison {
        Comparison { ahead_by, behind_by }
    }

    #[test]
    fn test_ahead_fork_is_never_touched() {
        assert_eq!(fork_action(cmp(1, 0)), ForkAction::LeaveAlone);
        assert_eq!(fork_action(cmp(5, 3)), ForkAction::LeaveAlone);
    }

    #[test]
    fn test_behind_fork_is_recreated() {
        assert_eq!(fork_action(cmp(0, 1)), ForkAction::Recreate);
        assert_eq!(fork_action(cmp(0, 40)), ForkAction::Recreate);
    }

    #[test]
    fn test_even_fork_is_used_as_is() {
        assert_eq!(fork_action(cmp(0, 0)), ForkAction::UseAsIs);
    }
}
