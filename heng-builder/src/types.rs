use std::path::PathBuf;

use nix::unistd::{self, Gid, Uid};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId {
    pub uid: u32,
    pub gid: u32,
}

impl OwnerId {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// The identity of the running service.
    pub fn current() -> Self {
        Self {
            uid: unistd::getuid().as_raw(),
            gid: unistd::getgid().as_raw(),
        }
    }

    pub fn uid(&self) -> Uid {
        Uid::from_raw(self.uid)
    }

    pub fn gid(&self) -> Gid {
        Gid::from_raw(self.gid)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub time_limit: Option<u64>,       // milliseconds
    pub real_time_limit: Option<u64>,  // milliseconds
    pub memory_limit: Option<u64>,     // bytes
    pub output_limit: Option<u64>,     // bytes
    pub number_of_processes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Ok,
    AbnormalExit,
    TerminatedBySignal,
    TimeLimitExceeded,
    RealTimeLimitExceeded,
    MemoryLimitExceeded,
    OutputLimitExceeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub status: ExecutionStatus,
    pub exit_status: Option<i32>,
    pub term_sig: Option<i32>,

    pub real_time: u64, // milliseconds
    pub cpu_time: u64,  // milliseconds
    pub memory: u64,    // KiB
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            status: ExecutionStatus::Failed,
            exit_status: None,
            term_sig: None,
            real_time: 0,
            cpu_time: 0,
            memory: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub status: BuildStatus,
    pub output: String,
    pub execution: Execution,
}

impl Default for BuildResult {
    fn default() -> Self {
        Self {
            status: BuildStatus::Failed,
            output: String::new(),
            execution: Execution::default(),
        }
    }
}

impl BuildResult {
    pub fn is_ok(&self) -> bool {
        self.status == BuildStatus::Ok
    }

    pub(crate) fn fail(&mut self, output: impl Into<String>) {
        self.status = BuildStatus::Failed;
        self.output = output.into();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiverInfo {
    #[serde(rename = "type")]
    pub type_: String,
    pub format: String,
}

/// A submitted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub archiver: Option<ArchiverInfo>,
    pub data: Vec<u8>,
}

impl Source {
    pub fn text(data: impl Into<String>) -> Self {
        Self {
            archiver: None,
            data: data.into().into_bytes(),
        }
    }

    pub fn archive(type_: impl Into<String>, format: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            archiver: Some(ArchiverInfo {
                type_: type_.into(),
                format: format.into(),
            }),
            data,
        }
    }

    pub fn has_archiver(&self) -> bool {
        self.archiver.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub source: PathBuf,
    pub executable: PathBuf,
}
