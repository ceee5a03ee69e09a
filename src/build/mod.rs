// ABOUTME: Artifact builder: turns a build context into a content-addressed image.
// ABOUTME: Validates the context before handing it to the external build tool.

mod builder;
mod error;
mod spec;
mod tool;

pub use builder::{ArtifactBuilder, ImageBuilder};
pub use error::{BuildError, BuildStage};
pub use spec::BuildSpec;
pub use tool::{BuildRequest, BuildTool, DockerCli};
