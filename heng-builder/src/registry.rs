use crate::builders::java::Java;
use crate::builders::project::Project;
use crate::builders::python::Python;
use crate::builders::BuilderPtr;
use crate::error::{Error, Result};

use std::collections::HashMap;

use once_cell::sync::OnceCell;

pub type Constructor = fn(&[String]) -> Result<BuilderPtr>;

/// Builder constructors by name.
#[derive(Default, Clone)]
pub struct Registry {
    map: HashMap<String, Constructor>,
}

static GLOBAL_REGISTRY: OnceCell<Registry> = OnceCell::new();

impl Registry {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// A registry with every builder of this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("java", java);
        registry.register("python", python);
        registry.register("project", project);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, ctor: Constructor) -> Option<Constructor> {
        self.map.insert(name.into(), ctor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.map.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn instance(&self, name: &str, arguments: &[String]) -> Result<BuilderPtr> {
        match self.map.get(name) {
            Some(ctor) => ctor(arguments),
            None => Err(Error::UnknownBuilder(name.to_owned())),
        }
    }

    pub fn install_global(self) -> anyhow::Result<&'static Self> {
        if GLOBAL_REGISTRY.set(self).is_err() {
            anyhow::bail!("global registry has been installed")
        }
        GLOBAL_REGISTRY
            .get()
            .ok_or_else(|| anyhow::anyhow!("global registry is missing"))
    }

    /// The installed registry, `None` before [`Registry::install_global`].
    pub fn global() -> Option<&'static Self> {
        GLOBAL_REGISTRY.get()
    }
}

fn java(arguments: &[String]) -> Result<BuilderPtr> {
    Ok(Box::new(Java::new(arguments)?))
}

fn python(arguments: &[String]) -> Result<BuilderPtr> {
    Ok(Box::new(Python::new(arguments)?))
}

fn project(arguments: &[String]) -> Result<BuilderPtr> {
    Ok(Box::new(Project::new(arguments)?))
}
