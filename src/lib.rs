//! Resolution engine for Visual Studio solutions: finds the `.sln`, reads
//! the conditional XML of each project, locates a matching toolchain, and
//! lists the output artifacts per (project, configuration) pair.

pub mod artifact;
pub mod condition;
pub mod error;
pub mod locator;
pub mod project;
pub mod property;
pub mod solution;
pub mod toolchain;

pub use artifact::{artifact_path, list_artifacts, project_descriptors};
pub use error::{Error, Result};
pub use project::{ProjectDescriptor, load_project, read_project};
pub use property::PropertyStore;
pub use solution::Solution;
pub use toolchain::{ResolveOptions, ToolchainCandidate, resolve};
