use std::fs::OpenOptions;
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;

/// Reads at most `limit` bytes from the beginning of a regular file.
///
/// A missing file reads as empty. Invalid UTF-8 is replaced.
///
/// The last path component is never followed. A symlink or any other
/// non-regular file is rejected with [`io::ErrorKind::InvalidData`],
/// without blocking on FIFOs.
pub fn read_first(path: impl AsRef<Path>, limit: usize) -> io::Result<String> {
    let flags = OFlag::O_NOFOLLOW | OFlag::O_NONBLOCK | OFlag::O_CLOEXEC;
    let file = match OpenOptions::new()
        .read(true)
        .custom_flags(flags.bits())
        .open(path)
    {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) if e.raw_os_error() == Some(Errno::ELOOP as i32) => {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "file is a symlink"))
        }
        Err(e) => return Err(e),
    };

    if !file.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file is not a regular file",
        ));
    }

    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::read_first;

    use std::fs;
    use std::io;
    use std::os::unix::fs::symlink;

    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;

    #[test]
    fn bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        fs::write(&path, "0123456789").unwrap();

        assert_eq!(read_first(&path, 4).unwrap(), "0123");
        assert_eq!(read_first(&path, 100).unwrap(), "0123456789");
        assert_eq!(read_first(dir.path().join("missing"), 4).unwrap(), "");
    }

    #[test]
    fn rejects_symlink_and_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::write(&target, "secret").unwrap();

        let link = dir.path().join("link");
        symlink(&target, &link).unwrap();
        let err = read_first(&link, 100).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let fifo = dir.path().join("fifo");
        mkfifo(&fifo, Mode::S_IRUSR | Mode::S_IWUSR).unwrap();
        let err = read_first(&fifo, 100).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = read_first(dir.path(), 100).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
