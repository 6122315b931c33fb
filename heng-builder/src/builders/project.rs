use super::compile;
use super::Builder;
use crate::archiver;
use crate::args::Argument;
use crate::config::Config;
use crate::container::{self, AccessMode, Container, ContainerPointer, Process, Stream};
use crate::error::{Error, Result};
use crate::executable::{ExecutablePtr, ProjectExecutable};
use crate::types::{BuildResult, BuildStatus, OwnerId, ResourceLimits, Source};
use crate::workspace::{self, Workspace};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const PROJECT_PATH: &str = "/builders_project";

const SOURCE_PATH: &str = "source";
const SOURCE_ARCHIVE_PATH: &str = "source_archive";
const EXECUTABLE_PATH: &str = "executable";
const LOG_PATH: &str = "log";

const SOLUTION_EXTENSION: &str = "sln";

/// Builds a multi-file project by handing its solution to an external
/// build command.
pub struct Project {
    configuration: String,
}

enum Solution {
    Found(PathBuf),
    NotFound,
    Multiple(PathBuf, PathBuf),
}

impl Project {
    pub fn new(arguments: &[String]) -> Result<Self> {
        let mut configuration = String::from("Release");
        for arg in arguments {
            match Argument::parse(arg)? {
                Argument::KeyValue {
                    key: "configuration",
                    value,
                } => configuration = value.to_owned(),
                _ => return Err(Error::invalid_argument(arg)),
            }
        }
        Ok(Self { configuration })
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    #[tracing::instrument(skip(self, container, source, resource_limits, result))]
    fn build_project(
        &self,
        container: &ContainerPointer,
        owner_id: OwnerId,
        source: &Source,
        resource_limits: &ResourceLimits,
        result: &mut BuildResult,
    ) -> anyhow::Result<Option<ExecutablePtr>> {
        if !source.has_archiver() {
            result.fail("Directory tree source is required");
            return Ok(None);
        }

        let filesystem = container.filesystem();

        let workspace = Workspace::create(&**container, Path::new(PROJECT_PATH))?;
        filesystem.set_owner_id(workspace.virtual_path(), owner_id)?;
        fs::create_dir(workspace.path().join(SOURCE_PATH))?;

        if let Err(err) = extract(source, workspace.path()) {
            info!(?err, "failed to extract project");
            result.fail(format!("{:#}", err));
            return Ok(None);
        }

        // the container /tmp must not exist yet, it is removed afterwards
        let tmp = filesystem.keep_in_root(Path::new("/tmp"));
        fs::create_dir(&tmp)
            .with_context(|| format!("failed to create directory: path = {}", tmp.display()))?;
        scopeguard::defer! {
            if let Err(err) = fs::remove_dir_all(&tmp) {
                warn!(%err, "failed to remove container /tmp");
            }
        }
        filesystem.set_mode(Path::new("/tmp"), 0o1777)?;

        let root = workspace.path().to_owned();
        workspace::pre_build(owner_id, &root)?;

        let source_dir = workspace.virtual_path().join(SOURCE_PATH);
        let exe = self.build_extracted(
            container,
            owner_id,
            workspace,
            &source_dir,
            resource_limits,
            result,
        )?;

        if exe.is_some() {
            let config = Config::global();
            workspace::post_build(config.executor.privileged_id(), &root)?;
            result.status = BuildStatus::Ok;
        }
        Ok(exe)
    }

    fn build_extracted(
        &self,
        container: &ContainerPointer,
        owner_id: OwnerId,
        workspace: Workspace,
        source_dir: &Path,
        resource_limits: &ResourceLimits,
        result: &mut BuildResult,
    ) -> anyhow::Result<Option<ExecutablePtr>> {
        let config = Config::global();

        let solution = match find_solution(&**container, source_dir)? {
            Solution::Found(path) => path,
            Solution::NotFound => {
                result.fail("Solution (*.sln) not found");
                return Ok(None);
            }
            Solution::Multiple(first, second) => {
                result.fail(format!(
                    "Multiple solutions found: {} and {}",
                    first.display(),
                    second.display()
                ));
                return Ok(None);
            }
        };
        debug!(solution = %solution.display(), "solution is found");

        let root = workspace.virtual_path();
        let executable = root.join(EXECUTABLE_PATH);

        let mut process_group = container.create_process_group()?;
        let mut process = Process::new(&config.executor.compilers.solution);
        process
            .arg("--configuration")
            .arg(&self.configuration)
            .arg("--output")
            .arg(&executable)
            .arg(&solution);
        container::setup(&mut *process_group, &mut process, resource_limits);
        process
            .current_path(root)
            .owner_id(owner_id)
            .stream(2, Stream::FdAlias(1))
            .stream(
                1,
                Stream::File {
                    path: LOG_PATH.into(),
                    mode: AccessMode::WriteOnly,
                },
            );
        let process_id = process_group.add_process(process);

        let group_result = process_group.synchronized_call()?;
        let process_result = group_result
            .process(process_id)
            .context("process result is missing")?;
        let success = container::parse_result(&group_result, process_result, &mut result.execution);

        let log_accepted = compile::read_log(&workspace.path().join(LOG_PATH), result)?;

        if !success || !log_accepted {
            debug!(execution = ?result.execution, "solution build failed");
            result.status = BuildStatus::Failed;
            return Ok(None);
        }

        let exe = ProjectExecutable::new(container.clone(), workspace, SOURCE_PATH, EXECUTABLE_PATH);
        Ok(Some(Box::new(exe)))
    }
}

fn extract(source: &Source, root: &Path) -> anyhow::Result<()> {
    let info = source
        .archiver
        .as_ref()
        .context("archiver is not specified")?;
    let archiver = archiver::instance(info)?;

    let archive_path = root.join(SOURCE_ARCHIVE_PATH);
    fs::write(&archive_path, &source.data).context("failed to write source archive")?;

    archiver.unpack(&archive_path, &root.join(SOURCE_PATH))
}

/// Looks for exactly one solution under the virtual `source_dir`.
///
/// Reported paths are virtual.
fn find_solution(container: &dyn Container, source_dir: &Path) -> anyhow::Result<Solution> {
    let filesystem = container.filesystem();
    let real_source = filesystem.keep_in_root(source_dir);

    let mut found: Option<PathBuf> = None;
    for entry in WalkDir::new(&real_source) {
        let entry = entry?;
        let is_solution = entry.file_type().is_file()
            && entry.path().extension().map_or(false, |ext| ext == SOLUTION_EXTENSION);
        if !is_solution {
            continue;
        }
        let path = filesystem.container_path(entry.path())?;
        match found {
            Some(first) => return Ok(Solution::Multiple(first, path)),
            None => found = Some(path),
        }
    }

    Ok(match found {
        Some(path) => Solution::Found(path),
        None => Solution::NotFound,
    })
}

impl Builder for Project {
    fn build(
        &self,
        container: &ContainerPointer,
        owner_id: OwnerId,
        source: &Source,
        resource_limits: &ResourceLimits,
        result: &mut BuildResult,
    ) -> Result<Option<ExecutablePtr>> {
        self.build_project(container, owner_id, source, resource_limits, result)
            .map_err(Error::Build)
    }
}
