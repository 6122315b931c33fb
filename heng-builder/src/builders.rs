pub mod compile;
pub mod java;
pub mod project;
pub mod python;

use crate::container::ContainerPointer;
use crate::error::Result;
use crate::executable::ExecutablePtr;
use crate::types::{BuildResult, OwnerId, ResourceLimits, Source};

pub type BuilderPtr = Box<dyn Builder>;

pub trait Builder: Send + Sync {
    /// Runs one build.
    ///
    /// Returns `Ok(None)` when the submission does not build, in which case
    /// `result` explains why. `Err` is reserved for failures unrelated to the
    /// submission.
    fn build(
        &self,
        container: &ContainerPointer,
        owner_id: OwnerId,
        source: &Source,
        resource_limits: &ResourceLimits,
        result: &mut BuildResult,
    ) -> Result<Option<ExecutablePtr>>;
}
