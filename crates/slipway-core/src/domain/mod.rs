//! Domain model for change detection and deployment.

pub mod change;
pub mod compare;
pub mod error;

pub use change::{ChangedFile, ImpactedServiceSet, ServiceRoot};
pub use compare::{ChangeComparisonSpec, RemoteDescriptor};
pub use error::{Result, SlipwayError};
