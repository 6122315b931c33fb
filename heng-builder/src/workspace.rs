use crate::container::Container;
use crate::types::OwnerId;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nix::unistd::{self, FchownatFlags};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

/// A sandbox-scoped temporary directory.
///
/// The directory is visible to the container as `<root>/<name>` and is
/// removed together with its content when the workspace is dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    virtual_path: PathBuf,
}

impl Workspace {
    pub fn create(container: &dyn Container, root: &Path) -> Result<Self> {
        let real_root = container.filesystem().keep_in_root(root);
        fs::create_dir_all(&real_root).with_context(|| {
            format!("failed to create directory: path = {}", real_root.display())
        })?;

        let dir = tempfile::Builder::new()
            .prefix("build-")
            .tempdir_in(&real_root)
            .context("failed to create workspace")?;

        let name = dir
            .path()
            .file_name()
            .context("workspace has no file name")?
            .to_owned();
        let virtual_path = root.join(name);

        debug!(path = %virtual_path.display(), "workspace is created");
        Ok(Self { dir, virtual_path })
    }

    /// Real path on the host.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path as seen from inside the container.
    pub fn virtual_path(&self) -> &Path {
        &self.virtual_path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // sealed directories must be writable again to be removed by an unprivileged service
        for entry in WalkDir::new(self.dir.path()).into_iter().flatten() {
            if entry.file_type().is_dir() {
                let path = entry.path();
                if let Ok(meta) = entry.metadata() {
                    let mode = meta.permissions().mode() & 0o7777;
                    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o700));
                }
            }
        }
        debug!(path = %self.virtual_path.display(), "workspace is removed");
    }
}

fn lchown(path: &Path, owner_id: OwnerId) -> Result<()> {
    unistd::fchownat(
        None,
        path,
        Some(owner_id.uid()),
        Some(owner_id.gid()),
        FchownatFlags::NoFollowSymlink,
    )
    .with_context(|| format!("failed to change owner: path = {}", path.display()))
}

/// Hands every entry under `root` over to the submitting identity.
pub fn pre_build(owner_id: OwnerId, root: &Path) -> Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry?;
        lchown(entry.path(), owner_id)?;
    }
    Ok(())
}

/// Seals every entry under `root`: owned by `privileged_id`, readable by
/// everyone, writable by nobody, no set-id bits. Owner-executable entries
/// become executable by everyone.
pub fn post_build(privileged_id: OwnerId, root: &Path) -> Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry?;
        let path = entry.path();
        lchown(path, privileged_id)?;

        if entry.path_is_symlink() {
            continue;
        }

        let mode = entry.metadata()?.permissions().mode() & 0o7777;
        let mode = sealed_mode(mode);
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("failed to set permissions: path = {}", path.display()))?;
    }
    Ok(())
}

fn sealed_mode(mode: u32) -> u32 {
    let mut mode = (mode & !0o6222) | 0o444;
    if mode & 0o100 != 0 {
        mode |= 0o111;
    }
    mode
}
