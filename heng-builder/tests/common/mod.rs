#![allow(dead_code)]

use heng_builder::container::{
    Container, Filesystem, GroupCompletion, Process, ProcessGroup, ProcessGroupResult,
    ProcessId, ProcessResult, Stream,
};
use heng_builder::{OwnerId, ResourceLimits};
use heng_utils::tracing::setup_tracing;

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use nix::unistd::{self, FchownatFlags};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        setup_tracing();
    });
}

pub struct Outcome {
    pub code: i32,
    pub output: String,
}

impl Outcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            code: 0,
            output: output.into(),
        }
    }

    pub fn fail(output: impl Into<String>) -> Self {
        Self {
            code: 1,
            output: output.into(),
        }
    }
}

pub type Handler = dyn Fn(&Process, &RootFs) -> Outcome + Send + Sync;

#[derive(Debug, Clone)]
pub struct Run {
    pub process: Process,
    pub group_limits: Option<ResourceLimits>,
}

pub struct RootFs {
    root: PathBuf,
}

/// Runs processes by calling a handler instead of spawning them.
pub struct ScriptedContainer {
    _dir: TempDir,
    fs: RootFs,
    handler: Arc<Handler>,
    runs: Arc<Mutex<Vec<Run>>>,
    broken: bool,
}

struct ScriptedGroup {
    handler: Arc<Handler>,
    root: PathBuf,
    processes: Vec<Process>,
    limits: Option<ResourceLimits>,
    runs: Arc<Mutex<Vec<Run>>>,
}

impl ScriptedContainer {
    pub fn new(handler: impl Fn(&Process, &RootFs) -> Outcome + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self::create(handler, false))
    }

    /// A container whose process groups cannot be created.
    pub fn broken() -> Arc<Self> {
        Arc::new(Self::create(|_, _| Outcome::ok(""), true))
    }

    fn create(
        handler: impl Fn(&Process, &RootFs) -> Outcome + Send + Sync + 'static,
        broken: bool,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_owned();
        Self {
            _dir: dir,
            fs: RootFs { root },
            handler: Arc::new(handler),
            runs: Arc::new(Mutex::new(Vec::new())),
            broken,
        }
    }

    pub fn real(&self, path: impl AsRef<Path>) -> PathBuf {
        self.fs.keep_in_root(path.as_ref())
    }

    pub fn host_root(&self) -> &Path {
        &self.fs.root
    }

    pub fn runs(&self) -> Vec<Run> {
        self.runs.lock().unwrap().clone()
    }
}

impl RootFs {
    pub fn cwd(&self, process: &Process) -> PathBuf {
        match process.current_path {
            Some(ref p) => self.keep_in_root(p),
            None => self.root.clone(),
        }
    }
}

impl Container for ScriptedContainer {
    fn filesystem(&self) -> &dyn Filesystem {
        &self.fs
    }

    fn create_process_group(&self) -> Result<Box<dyn ProcessGroup>> {
        if self.broken {
            anyhow::bail!("container is broken")
        }
        Ok(Box::new(ScriptedGroup {
            handler: self.handler.clone(),
            root: self.fs.root.clone(),
            processes: Vec::new(),
            limits: None,
            runs: self.runs.clone(),
        }))
    }
}

impl Filesystem for RootFs {
    fn keep_in_root(&self, path: &Path) -> PathBuf {
        match path.strip_prefix("/") {
            Ok(p) => self.root.join(p),
            Err(_) => self.root.join(path),
        }
    }

    fn container_path(&self, path: &Path) -> Result<PathBuf> {
        Ok(Path::new("/").join(path.strip_prefix(&self.root)?))
    }

    fn set_owner_id(&self, path: &Path, owner_id: OwnerId) -> Result<()> {
        unistd::fchownat(
            None,
            &self.keep_in_root(path),
            Some(owner_id.uid()),
            Some(owner_id.gid()),
            FchownatFlags::NoFollowSymlink,
        )?;
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        fs::set_permissions(self.keep_in_root(path), fs::Permissions::from_mode(mode))?;
        Ok(())
    }
}

impl ProcessGroup for ScriptedGroup {
    fn add_process(&mut self, process: Process) -> ProcessId {
        self.processes.push(process);
        ProcessId(self.processes.len() - 1)
    }

    fn set_resource_limits(&mut self, limits: &ResourceLimits) {
        self.limits = Some(limits.clone());
    }

    fn synchronized_call(&mut self) -> Result<ProcessGroupResult> {
        let fs = RootFs {
            root: self.root.clone(),
        };
        let mut processes = Vec::new();
        for process in &self.processes {
            debug!(?process, "scripted run");

            // stdout is opened before the process starts
            let mut stdout = match process.get_stream(1) {
                Some(Stream::File { path, .. }) => Some(File::create(fs.cwd(process).join(path))?),
                _ => None,
            };

            let outcome = (self.handler)(process, &fs);

            if let Some(ref mut stdout) = stdout {
                stdout.write_all(outcome.output.as_bytes())?;
            }

            self.runs.lock().unwrap().push(Run {
                process: process.clone(),
                group_limits: self.limits.clone(),
            });
            processes.push(ProcessResult::exited(outcome.code));
        }
        Ok(ProcessGroupResult {
            completion: GroupCompletion::Ok,
            real_time: 1,
            processes,
        })
    }
}

pub fn owner() -> OwnerId {
    OwnerId::current()
}

pub fn limits() -> ResourceLimits {
    ResourceLimits {
        time_limit: Some(5000),
        real_time_limit: Some(10000),
        memory_limit: Some(256 * 1024 * 1024),
        output_limit: Some(64 * 1024 * 1024),
        number_of_processes: Some(32),
    }
}

pub fn arg_str(process: &Process, idx: usize) -> &str {
    process.arguments[idx].to_str().unwrap()
}

/// Every entry under `dir`, the directory included.
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .map(|entry| entry.unwrap().into_path())
        .collect()
}

pub fn mode_of(path: &Path) -> u32 {
    fs::symlink_metadata(path).unwrap().permissions().mode() & 0o7777
}

pub fn owner_of(path: &Path) -> OwnerId {
    let meta = fs::symlink_metadata(path).unwrap();
    OwnerId::new(meta.uid(), meta.gid())
}

pub fn is_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut it) => it.next().is_none(),
        Err(_) => true,
    }
}
