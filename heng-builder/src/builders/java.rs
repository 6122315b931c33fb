use super::compile::{self, Compile};
use super::Builder;
use crate::args::Argument;
use crate::config::Config;
use crate::container::{ContainerPointer, Process};
use crate::error::{Error, Result};
use crate::executable::{ExecutablePtr, InterpretableExecutable, JavaExecutable};
use crate::types::{BuildResult, Name, OwnerId, ResourceLimits, Source};
use crate::workspace::Workspace;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

const DEFAULT_CLASS: &str = "Main";

static FILENAME_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"class (\S+) is public, should be declared in a file named (\S+)\.java").unwrap()
});

/// Finds the public class javac wants a file for.
///
/// Both class names in the diagnostic must be the same.
pub fn mismatched_class(output: &str) -> Option<&str> {
    FILENAME_ERROR.captures_iter(output).find_map(|caps| {
        let declared = caps.get(1)?.as_str();
        let expected = caps.get(2)?.as_str();
        if declared == expected {
            Some(declared)
        } else {
            None
        }
    })
}

pub struct Java {
    flags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Default,
    Corrected,
}

struct JavaClass<'a> {
    flags: &'a [String],
    class: &'a str,
}

impl Java {
    pub fn new(arguments: &[String]) -> Result<Self> {
        let mut flags = Vec::new();
        for arg in arguments {
            match Argument::parse(arg)? {
                Argument::Positional(flag) => flags.push(format!("-{}", flag)),
                Argument::KeyValue { .. } => return Err(Error::invalid_argument(arg)),
            }
        }
        Ok(Self { flags })
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    fn build_with_retry(
        &self,
        container: &ContainerPointer,
        owner_id: OwnerId,
        source: &Source,
        resource_limits: &ResourceLimits,
        result: &mut BuildResult,
    ) -> anyhow::Result<Option<ExecutablePtr>> {
        let mut class = DEFAULT_CLASS.to_owned();
        let mut attempt = Attempt::Default;
        loop {
            let target = JavaClass {
                flags: &self.flags,
                class: &class,
            };
            let name = target.name(source);
            let exe = compile::build(
                &target,
                name,
                container,
                owner_id,
                source,
                resource_limits,
                result,
            )?;
            if exe.is_some() {
                return Ok(exe);
            }

            if attempt == Attempt::Corrected {
                return Ok(None);
            }
            match mismatched_class(&result.output) {
                Some(corrected) => {
                    info!(from = %class, to = %corrected, "retrying with corrected class name");
                    class = corrected.to_owned();
                    attempt = Attempt::Corrected;
                }
                None => return Ok(None),
            }
        }
    }
}

impl Compile for JavaClass<'_> {
    fn name(&self, _: &Source) -> Name {
        Name {
            source: format!("{}.java", self.class).into(),
            executable: self.class.into(),
        }
    }

    fn create_process(&self, name: &Name) -> Process {
        let config = Config::global();
        let mut process = Process::new(&config.executor.compilers.javac);
        process.arg("-encoding").arg("UTF-8");
        process.arg(&name.source);
        process
    }

    fn create_executable(
        &self,
        container: ContainerPointer,
        workspace: Workspace,
        name: Name,
    ) -> ExecutablePtr {
        let config = Config::global();
        let inner = InterpretableExecutable::new(
            container,
            workspace,
            name,
            &config.executor.runtimes.java,
            self.flags.to_vec(),
        );
        Box::new(JavaExecutable::new(inner))
    }
}

impl Builder for Java {
    fn build(
        &self,
        container: &ContainerPointer,
        owner_id: OwnerId,
        source: &Source,
        resource_limits: &ResourceLimits,
        result: &mut BuildResult,
    ) -> Result<Option<ExecutablePtr>> {
        self.build_with_retry(container, owner_id, source, resource_limits, result)
            .map_err(Error::Build)
    }
}

#[cfg(test)]
mod tests {
    use super::mismatched_class;

    #[test]
    fn matches_javac_diagnostic() {
        let output = "Main.java:1: error: class Solution is public, should be declared in a file named Solution.java\n\
                      public class Solution {\n\
                             ^\n\
                      1 error\n";
        assert_eq!(mismatched_class(output), Some("Solution"));
    }

    #[test]
    fn requires_same_class_name() {
        let output = "class Solution is public, should be declared in a file named Other.java";
        assert_eq!(mismatched_class(output), None);
        assert_eq!(mismatched_class("Main.java:3: error: ';' expected"), None);
    }
}
