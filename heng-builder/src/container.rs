//! Interfaces of the sandbox runtime consumed by builders.
//!
//! Paths passed to a [`Container`] are virtual: they are interpreted
//! relative to the container root. [`Filesystem::keep_in_root`] maps a
//! virtual path to the real one and [`Filesystem::container_path`] does the
//! reverse.

use crate::types::{Execution, ExecutionStatus, OwnerId, ResourceLimits};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

pub type ContainerPointer = Arc<dyn Container>;

pub trait Container: Send + Sync {
    fn filesystem(&self) -> &dyn Filesystem;
    fn create_process_group(&self) -> Result<Box<dyn ProcessGroup>>;
}

pub trait Filesystem: Send + Sync {
    /// Maps a virtual path to a real path under the container root.
    fn keep_in_root(&self, path: &Path) -> PathBuf;

    /// Maps a real path under the container root to a virtual path.
    fn container_path(&self, path: &Path) -> Result<PathBuf>;

    fn set_owner_id(&self, path: &Path, owner_id: OwnerId) -> Result<()>;
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stream {
    /// A file relative to the process current path.
    File { path: PathBuf, mode: AccessMode },
    /// Duplicates another descriptor of the same process.
    FdAlias(u32),
}

/// Description of a process to be started inside a process group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub executable: PathBuf,
    pub arguments: Vec<OsString>,
    pub current_path: Option<PathBuf>,
    pub owner_id: Option<OwnerId>,
    pub streams: Vec<(u32, Stream)>,
    pub resource_limits: Option<ResourceLimits>,
}

impl Process {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
            current_path: None,
            owner_id: None,
            streams: Vec::new(),
            resource_limits: None,
        }
    }

    pub fn arg(&mut self, a: impl Into<OsString>) -> &mut Self {
        self.arguments.push(a.into());
        self
    }

    pub fn args<I>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.current_path = Some(path.into());
        self
    }

    pub fn owner_id(&mut self, owner_id: OwnerId) -> &mut Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Replaces the previous binding of `fd`, if any.
    pub fn stream(&mut self, fd: u32, stream: Stream) -> &mut Self {
        self.streams.retain(|&(f, _)| f != fd);
        self.streams.push((fd, stream));
        self
    }

    pub fn get_stream(&self, fd: u32) -> Option<&Stream> {
        self.streams.iter().find(|(f, _)| *f == fd).map(|(_, s)| s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub usize);

pub trait ProcessGroup: Send {
    fn add_process(&mut self, process: Process) -> ProcessId;
    fn set_resource_limits(&mut self, limits: &ResourceLimits);

    /// Starts every process of the group and blocks until all of them exit.
    fn synchronized_call(&mut self) -> Result<ProcessGroupResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCompletion {
    Ok,
    RealTimeLimitExceeded,
    MemoryLimitExceeded,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub time_limit_exceeded: bool,
    pub output_limit_exceeded: bool,

    pub cpu_time: u64, // milliseconds
    pub memory: u64,   // KiB
}

impl ProcessResult {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
            time_limit_exceeded: false,
            output_limit_exceeded: false,
            cpu_time: 0,
            memory: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
            && self.signal.is_none()
            && !self.time_limit_exceeded
            && !self.output_limit_exceeded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessGroupResult {
    pub completion: GroupCompletion,
    pub real_time: u64, // milliseconds
    pub processes: Vec<ProcessResult>,
}

impl ProcessGroupResult {
    pub fn process(&self, id: ProcessId) -> Option<&ProcessResult> {
        self.processes.get(id.0)
    }
}

/// Applies `limits` to the process and to its group.
pub fn setup(group: &mut dyn ProcessGroup, process: &mut Process, limits: &ResourceLimits) {
    group.set_resource_limits(limits);
    process.resource_limits = Some(limits.clone());
}

/// Converts raw results into execution statistics, returns whether the
/// process completed successfully.
pub fn parse_result(
    group: &ProcessGroupResult,
    process: &ProcessResult,
    execution: &mut Execution,
) -> bool {
    execution.exit_status = process.code;
    execution.term_sig = process.signal;
    execution.real_time = group.real_time;
    execution.cpu_time = process.cpu_time;
    execution.memory = process.memory;

    execution.status = match group.completion {
        GroupCompletion::RealTimeLimitExceeded => ExecutionStatus::RealTimeLimitExceeded,
        GroupCompletion::MemoryLimitExceeded => ExecutionStatus::MemoryLimitExceeded,
        GroupCompletion::Stopped => ExecutionStatus::Failed,
        GroupCompletion::Ok => {
            if process.time_limit_exceeded {
                ExecutionStatus::TimeLimitExceeded
            } else if process.output_limit_exceeded {
                ExecutionStatus::OutputLimitExceeded
            } else if process.signal.is_some() {
                ExecutionStatus::TerminatedBySignal
            } else if process.code != Some(0) {
                ExecutionStatus::AbnormalExit
            } else {
                ExecutionStatus::Ok
            }
        }
    };

    execution.status == ExecutionStatus::Ok
}
