use super::compile::{self, Compile};
use super::Builder;
use crate::args::Argument;
use crate::config::Config;
use crate::container::{ContainerPointer, Process};
use crate::error::{Error, Result};
use crate::executable::{ExecutablePtr, InterpretableExecutable};
use crate::types::{BuildResult, Name, OwnerId, ResourceLimits, Source};
use crate::workspace::Workspace;

const SOURCE_NAME: &str = "source.py";

const SYNTAX_CHECK: &str = r#"
import sys
import py_compile

if __name__ == '__main__':
    src = sys.argv[1]
    try:
        py_compile.compile(src, doraise=True)
    except py_compile.PyCompileError as e:
        sys.stderr.write(e.msg)
        sys.exit(1)
"#;

/// Checks the syntax of a python script, the script itself is interpreted
/// at run time.
pub struct Python {
    lang: String,
}

impl Python {
    pub fn new(arguments: &[String]) -> Result<Self> {
        let mut lang = String::new();
        for arg in arguments {
            match Argument::parse(arg)? {
                Argument::KeyValue { key: "lang", value } => lang = value.to_owned(),
                _ => return Err(Error::invalid_argument(arg)),
            }
        }
        Ok(Self { lang })
    }

    pub fn interpreter(&self) -> String {
        let config = Config::global();
        format!("{}{}", config.executor.runtimes.python, self.lang)
    }
}

impl Compile for Python {
    fn name(&self, _: &Source) -> Name {
        Name {
            source: SOURCE_NAME.into(),
            executable: SOURCE_NAME.into(),
        }
    }

    fn create_process(&self, name: &Name) -> Process {
        let mut process = Process::new(self.interpreter());
        process.arg("-c").arg(SYNTAX_CHECK).arg(&name.source);
        process
    }

    fn create_executable(
        &self,
        container: ContainerPointer,
        workspace: Workspace,
        name: Name,
    ) -> ExecutablePtr {
        let exe = InterpretableExecutable::new(
            container,
            workspace,
            name,
            self.interpreter(),
            Vec::new(),
        );
        Box::new(exe)
    }
}

impl Builder for Python {
    fn build(
        &self,
        container: &ContainerPointer,
        owner_id: OwnerId,
        source: &Source,
        resource_limits: &ResourceLimits,
        result: &mut BuildResult,
    ) -> Result<Option<ExecutablePtr>> {
        let name = self.name(source);
        compile::build(
            self,
            name,
            container,
            owner_id,
            source,
            resource_limits,
            result,
        )
        .map_err(Error::Build)
    }
}
