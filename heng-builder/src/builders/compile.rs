//! The build protocol shared by single-file builders.

use crate::config::Config;
use crate::container::{self, AccessMode, ContainerPointer, Process, Stream};
use crate::executable::ExecutablePtr;
use crate::types::{BuildResult, BuildStatus, Name, OwnerId, ResourceLimits, Source};
use crate::workspace::{self, Workspace};

use heng_utils::fs::read_first;

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

pub const COMPILABLE_PATH: &str = "/builders_compilable";
pub const LOG_PATH: &str = "log";

pub const REJECTED_LOG: &str = "Build log is not a regular file";

pub trait Compile {
    fn name(&self, source: &Source) -> Name;

    /// The checker or compiler bound to `name`, started in the workspace.
    fn create_process(&self, name: &Name) -> Process;

    fn create_executable(
        &self,
        container: ContainerPointer,
        workspace: Workspace,
        name: Name,
    ) -> ExecutablePtr;
}

#[tracing::instrument(skip(lang, container, source, resource_limits, result))]
pub fn build<C: Compile + ?Sized>(
    lang: &C,
    name: Name,
    container: &ContainerPointer,
    owner_id: OwnerId,
    source: &Source,
    resource_limits: &ResourceLimits,
    result: &mut BuildResult,
) -> Result<Option<ExecutablePtr>> {
    if source.has_archiver() {
        result.fail("Single file source is required");
        return Ok(None);
    }

    let config = Config::global();
    let filesystem = container.filesystem();

    let workspace = Workspace::create(&**container, Path::new(COMPILABLE_PATH))?;
    filesystem.set_owner_id(workspace.virtual_path(), owner_id)?;

    let src_path = workspace.path().join(&name.source);
    fs::write(&src_path, &source.data)
        .with_context(|| format!("failed to write source: path = {}", src_path.display()))?;
    filesystem.set_owner_id(&workspace.virtual_path().join(&name.source), owner_id)?;

    let mut process_group = container.create_process_group()?;
    let mut process = lang.create_process(&name);
    process
        .current_path(workspace.virtual_path())
        .owner_id(owner_id)
        .stream(2, Stream::FdAlias(1))
        .stream(
            1,
            Stream::File {
                path: LOG_PATH.into(),
                mode: AccessMode::WriteOnly,
            },
        );
    container::setup(&mut *process_group, &mut process, resource_limits);
    let process_id = process_group.add_process(process);

    let group_result = process_group.synchronized_call()?;
    let process_result = group_result
        .process(process_id)
        .context("process result is missing")?;
    let success = container::parse_result(&group_result, process_result, &mut result.execution);

    let log_accepted = read_log(&workspace.path().join(LOG_PATH), result)?;

    debug!(success, execution = ?result.execution, "process is finished");

    if !success || !log_accepted {
        result.status = BuildStatus::Failed;
        return Ok(None);
    }

    workspace::post_build(config.executor.privileged_id(), workspace.path())?;

    result.status = BuildStatus::Ok;
    Ok(Some(lang.create_executable(container.clone(), workspace, name)))
}

/// Copies the head of the build log into `result.output`.
///
/// The log lives in a directory writable by the build, so anything but a
/// regular file is refused and `false` is returned.
pub(crate) fn read_log(log_path: &Path, result: &mut BuildResult) -> Result<bool> {
    let limit = Config::global().executor.log_limit();
    match read_first(log_path, limit) {
        Ok(output) => {
            result.output = output;
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            warn!(%err, path = %log_path.display(), "build log is rejected");
            result.output = REJECTED_LOG.to_owned();
            Ok(false)
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to read log: path = {}", log_path.display()))
        }
    }
}
