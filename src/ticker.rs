//! End-to-end run
//!
//! Drives the whole sequence: authenticate, enumerate maintained
//! feedstocks, evaluate each, plan the independent subset, patch + fork +
//! push each planned update, hand successful forks to the external
//! re-render tool, and report. Per-repository failures are collected and
//! reported; only authentication and the top-level enumeration are
//! run-fatal.

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::fork::ensure_synced_fork;
use crate::github::{GitHubClient, Repository};
use crate::patch::build_patch;
use crate::planner::plan_independent_updates;
use crate::pypi::PyPiClient;
use crate::status::{evaluate_feedstock, FeedstockStatus, FEEDSTOCK_SUFFIX, ORG_PREFIX, RECIPE_PATH};
use crate::{Error, Result};

/// Script invoked once per successfully pushed fork to regenerate the
/// feedstock's build scaffolding.
const RENDERER_SCRIPT: &str = "./renderer.sh";

/// What one run did, for the closing report.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Repositories ticked, pushed, and re-rendered.
    pub updated: Vec<String>,
    /// Repositories that could not be updated, with the reason.
    pub not_updated: Vec<(String, String)>,
    /// Repositories where applying the update failed partway.
    pub failed: Vec<String>,
}

impl RunReport {
    /// Print the two report sections to stdout.
    pub fn print(&self) {
        println!("Couldn't update:");
        for (name, reason) in &self.not_updated {
            println!("  {}: {}", name, reason);
        }
        println!("Failed to update:");
        for name in &self.failed {
            println!("  {}", name);
        }
    }
}

/// One-shot feedstock ticker bound to a hosting session.
pub struct Ticker {
    github: GitHubClient,
    pypi: PyPiClient,
    credential: String,
}

impl Ticker {
    pub fn new(credential: String, username: Option<String>) -> Result<Self> {
        Ok(Ticker {
            github: GitHubClient::new(credential.clone(), username)?,
            pypi: PyPiClient::new()?,
            credential,
        })
    }

    /// Feedstocks the user maintains: each conda-forge team manages exactly
    /// one feedstock, so teams with any other repository count are skipped.
    async fn user_feedstocks(&self) -> Result<Vec<Repository>> {
        let mut feedstocks = Vec::new();
        for team in self.github.user_teams().await? {
            if team.repos_count != 1 {
                continue;
            }
            let repos = self.github.team_repos(team.id).await?;
            let Some(repo) = repos.into_iter().next() else {
                continue;
            };
            if repo.full_name.starts_with(ORG_PREFIX)
                && repo.full_name.ends_with(FEEDSTOCK_SUFFIX)
            {
                feedstocks.push(repo);
            }
        }
        Ok(feedstocks)
    }

    /// Run the whole tick sequence and return the report.
    ///
    /// Errors returned here are run-fatal (failed authentication or
    /// repository enumeration); everything downstream lands in the report.
    pub async fn run(&self) -> Result<RunReport> {
        let user = self.github.authenticated_user().await?.login;
        info!("authenticated as {}", user);

        let feedstocks = self.user_feedstocks().await?;
        info!("found {} maintained feedstocks", feedstocks.len());

        let mut report = RunReport::default();
        let mut candidates = Vec::new();
        for repo in feedstocks {
            match evaluate_feedstock(&self.github, &self.pypi, &repo).await {
                FeedstockStatus::NeedsUpdate(candidate) => {
                    info!(
                        "{}: {} -> {}",
                        repo.full_name, candidate.record.version, candidate.latest_version
                    );
                    candidates.push((repo, candidate));
                }
                FeedstockStatus::UpToDate => {
                    debug!("{} is up to date", repo.full_name);
                }
                FeedstockStatus::Unparseable(reason)
                | FeedstockStatus::LookupFailed(reason) => {
                    report.not_updated.push((repo.full_name, reason));
                }
            }
        }

        let (planned, deferred) = plan_independent_updates(candidates);
        for (repo, _) in deferred {
            report.not_updated.push((
                repo.full_name,
                "depends on a package updated in this batch".to_string(),
            ));
        }

        let mut rendered_forks = Vec::new();
        for (repo, candidate) in planned {
            let patch =
                match build_patch(&self.pypi, &candidate.record, &candidate.latest_version).await {
                    Ok(patch) => patch,
                    Err(e) => {
                        warn!("{}: {}", repo.full_name, e);
                        report.failed.push(repo.full_name);
                        continue;
                    }
                };

            let fork = match ensure_synced_fork(&self.github, &user, &repo).await {
                Ok(Some(fork)) => fork,
                Ok(None) => {
                    warn!("{}: no usable fork", repo.full_name);
                    report.failed.push(repo.full_name);
                    continue;
                }
                Err(e) => {
                    warn!("{}: {}", repo.full_name, e);
                    report.failed.push(repo.full_name);
                    continue;
                }
            };

            if let Err(e) = self
                .github
                .put_contents(&fork.full_name, RECIPE_PATH, &patch)
                .await
            {
                warn!("{}: {}", repo.full_name, e);
                report.failed.push(repo.full_name);
                continue;
            }

            rendered_forks.push((repo.full_name, fork));
        }

        self.upgrade_render_tool().await;
        for (upstream_name, fork) in rendered_forks {
            match self.rerender(&user, &fork).await {
                Ok(()) => report.updated.push(upstream_name),
                Err(e) => {
                    warn!("{}: {}", upstream_name, e);
                    report.failed.push(upstream_name);
                }
            }
        }

        info!(
            "run complete: {} updated, {} skipped, {} failed",
            report.updated.len(),
            report.not_updated.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Self-update the re-render toolchain once per run. Best-effort: the
    /// installed version still renders if the upgrade fails.
    async fn upgrade_render_tool(&self) {
        match Command::new("conda")
            .args(["update", "-y", "conda-smithy"])
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                debug!("conda-smithy is current");
            }
            Ok(output) => {
                warn!(
                    "conda-smithy upgrade failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => warn!("couldn't invoke conda: {}", e),
        }
    }

    /// Invoke the external re-render step for one pushed fork.
    ///
    /// A nonzero exit demotes the repository from updated to failed; a
    /// push whose scaffolding was never regenerated is not a finished
    /// update.
    async fn rerender(&self, user: &str, fork: &Repository) -> Result<()> {
        let repo_arg = fork
            .full_name
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&fork.full_name);

        let output = Command::new(RENDERER_SCRIPT)
            .args([user, self.credential.as_str(), repo_arg])
            .output()
            .await
            .map_err(|e| Error::RenderFailed(format!("{}: {}", fork.full_name, e)))?;

        if !output.status.success() {
            return Err(Error::RenderFailed(format!(
                "{}: renderer exited with {}",
                fork.full_name,
                output.status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_prints_both_sections() {
        let report = RunReport {
            updated: vec!["conda-forge/ok-feedstock".to_string()],
            not_updated: vec![(
                "conda-forge/widget-feedstock".to_string(),
                "couldn't parse meta.yaml: bad".to_string(),
            )],
            failed: vec!["conda-forge/broken-feedstock".to_string()],
        };
        // Shape check only; print() writes to stdout.
        assert_eq!(report.not_updated.len(), 1);
        assert_eq!(report.failed.len(), 1);
        report.print();
    }
}
