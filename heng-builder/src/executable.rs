use crate::container::{ContainerPointer, Process};
use crate::types::Name;
use crate::workspace::Workspace;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub type ExecutablePtr = Box<dyn Executable>;

/// An artifact produced by a successful build.
///
/// Paths are virtual, relative to the container root.
pub trait Executable: Send + Sync {
    fn container(&self) -> &ContainerPointer;

    fn dir(&self) -> PathBuf;
    fn source(&self) -> PathBuf;
    fn executable(&self) -> PathBuf;

    /// Describes a new process running the artifact with `arguments`.
    fn create_process(&self, arguments: &[OsString]) -> Process;
}

/// A single source file run by an interpreter.
pub struct InterpretableExecutable {
    container: ContainerPointer,
    workspace: Workspace,
    name: Name,
    interpreter: String,
    flags: Vec<String>,
}

impl InterpretableExecutable {
    pub fn new(
        container: ContainerPointer,
        workspace: Workspace,
        name: Name,
        interpreter: impl Into<String>,
        flags: Vec<String>,
    ) -> Self {
        Self {
            container,
            workspace,
            name,
            interpreter: interpreter.into(),
            flags,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn launch(&self, mut head: Vec<OsString>, arguments: &[OsString]) -> Process {
        head.extend(arguments.iter().cloned());
        let mut process = Process::new(&self.interpreter);
        process.args(head);
        process
    }
}

impl Executable for InterpretableExecutable {
    fn container(&self) -> &ContainerPointer {
        &self.container
    }

    fn dir(&self) -> PathBuf {
        self.workspace.virtual_path().to_owned()
    }

    fn source(&self) -> PathBuf {
        self.dir().join(&self.name.source)
    }

    fn executable(&self) -> PathBuf {
        self.dir().join(&self.name.executable)
    }

    fn create_process(&self, arguments: &[OsString]) -> Process {
        let mut head: Vec<OsString> = self.flags.iter().map(Into::into).collect();
        head.push(self.source().into());
        self.launch(head, arguments)
    }
}

/// A compiled class run by the java launcher.
pub struct JavaExecutable {
    inner: InterpretableExecutable,
}

impl JavaExecutable {
    pub fn new(inner: InterpretableExecutable) -> Self {
        Self { inner }
    }

    pub fn class_name(&self) -> &Path {
        &self.inner.name().executable
    }
}

impl Executable for JavaExecutable {
    fn container(&self) -> &ContainerPointer {
        self.inner.container()
    }

    fn dir(&self) -> PathBuf {
        self.inner.dir()
    }

    fn source(&self) -> PathBuf {
        self.inner.source()
    }

    fn executable(&self) -> PathBuf {
        self.inner.executable()
    }

    fn create_process(&self, arguments: &[OsString]) -> Process {
        let mut head: Vec<OsString> = self.inner.flags().iter().map(Into::into).collect();
        head.push("-classpath".into());
        head.push(self.dir().into());
        head.push(self.class_name().into());
        self.inner.launch(head, arguments)
    }
}

/// A binary produced by an external project build.
pub struct ProjectExecutable {
    container: ContainerPointer,
    workspace: Workspace,
    source: PathBuf,
    executable: PathBuf,
}

impl ProjectExecutable {
    pub fn new(
        container: ContainerPointer,
        workspace: Workspace,
        source: impl Into<PathBuf>,
        executable: impl Into<PathBuf>,
    ) -> Self {
        Self {
            container,
            workspace,
            source: source.into(),
            executable: executable.into(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

impl Executable for ProjectExecutable {
    fn container(&self) -> &ContainerPointer {
        &self.container
    }

    fn dir(&self) -> PathBuf {
        self.workspace.virtual_path().to_owned()
    }

    fn source(&self) -> PathBuf {
        self.dir().join(&self.source)
    }

    fn executable(&self) -> PathBuf {
        self.dir().join(&self.executable)
    }

    fn create_process(&self, arguments: &[OsString]) -> Process {
        let mut process = Process::new(self.executable());
        process.args(arguments.iter().cloned());
        process
    }
}
