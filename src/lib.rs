//! feedstock-tick: conda-forge feedstock maintenance bot
//!
//! This crate provides tools for:
//! - Parsing templated feedstock recipes (meta.yaml)
//! - Resolving latest package releases and source checksums from PyPI
//! - Ticking recipe versions and checksums via literal patching
//! - Fork synchronization against upstream feedstocks
//! - Planning dependency-independent update batches

pub mod error;
pub mod fork;
pub mod github;
pub mod patch;
pub mod planner;
pub mod pypi;
pub mod recipe;
pub mod status;
pub mod ticker;
pub mod version;

pub use error::{Error, Result};
pub use github::GitHubClient;
pub use patch::ContentUpdate;
pub use pypi::PyPiClient;
pub use recipe::RecipeRecord;
pub use status::{FeedstockStatus, UpdateCandidate};
pub use ticker::{RunReport, Ticker};
pub use version::PackageVersion;
