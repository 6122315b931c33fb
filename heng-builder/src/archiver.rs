use crate::types::ArchiverInfo;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tracing::debug;
use zip::ZipArchive;

pub trait Archiver {
    fn unpack(&self, archive: &Path, target_dir: &Path) -> Result<()>;
}

pub struct Zip;

pub struct Tar {
    gzip: bool,
}

/// Resolves the unpacker for `info`.
pub fn instance(info: &ArchiverInfo) -> Result<Box<dyn Archiver>> {
    match (info.type_.as_str(), info.format.as_str()) {
        ("zip", "") => Ok(Box::new(Zip)),
        ("tar", "") => Ok(Box::new(Tar { gzip: false })),
        ("tar", "gz") | ("tar", "gzip") => Ok(Box::new(Tar { gzip: true })),
        ("zip", fmt) | ("tar", fmt) => anyhow::bail!(
            "unsupported archive format: type = {}, format = {}",
            info.type_,
            fmt
        ),
        (ty, _) => anyhow::bail!("unsupported archiver: type = {}", ty),
    }
}

impl Archiver for Zip {
    fn unpack(&self, archive: &Path, target_dir: &Path) -> Result<()> {
        let file = File::open(archive)?;
        let reader = BufReader::with_capacity(4 * 1024 * 1024, file);
        let mut zip = ZipArchive::new(reader).context("failed to open zip archive")?;
        debug!(entries = zip.len(), "unpacking zip archive");
        zip.extract(target_dir)
            .context("failed to extract zip archive")?;
        Ok(())
    }
}

impl Archiver for Tar {
    fn unpack(&self, archive: &Path, target_dir: &Path) -> Result<()> {
        let file = BufReader::new(File::open(archive)?);
        let reader: Box<dyn Read> = if self.gzip {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let mut tar = tar::Archive::new(reader);
        tar.set_preserve_permissions(false);
        debug!(gzip = self.gzip, "unpacking tar archive");
        tar.unpack(target_dir)
            .context("failed to extract tar archive")?;
        Ok(())
    }
}
