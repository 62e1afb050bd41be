//! Slipway Core Library
//!
//! Domain logic for monorepo change detection: the pure change-set resolver,
//! the data model it operates on, validated deployment configuration, and the
//! tracing bootstrap shared by the CLI and pipeline crates.

pub mod config;
pub mod domain;
pub mod git;
pub mod obs;
pub mod resolver;
pub mod telemetry;

pub use config::{Config, DeployConfig, RepoConfig, ServiceEntry};

pub use domain::{
    ChangeComparisonSpec, ChangedFile, ImpactedServiceSet, RemoteDescriptor, Result, ServiceRoot,
    SlipwayError,
};

pub use git::{is_work_tree, rev_parse};

pub use resolver::ChangeSetResolver;

pub use telemetry::init_tracing;
