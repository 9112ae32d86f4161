use std::io;
use std::path::Path;

use frame_hooks_common::config::ProbeBackend;
use sysinfo::Disks;

use crate::filter::FilterError;

/// Reports the bytes available to unprivileged users on the filesystem
/// holding `path`.
pub trait SpaceProbe: Send + Sync {
    fn available_bytes(&self, path: &Path) -> io::Result<u64>;
}

impl<F> SpaceProbe for F
where
    F: Fn(&Path) -> io::Result<u64> + Send + Sync,
{
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        self(path)
    }
}

/// `statvfs(3)`: `f_bavail * f_bsize`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct StatvfsProbe;

#[cfg(unix)]
impl SpaceProbe for StatvfsProbe {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(path)?;
        // Field widths differ between platforms.
        #[allow(clippy::unnecessary_cast)]
        let available =
            (stat.blocks_available() as u64).saturating_mul(stat.block_size() as u64);
        Ok(available)
    }
}

/// Resolves `path` to the mounted disk with the longest matching mount
/// point and reports that disk's available space.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProbe;

impl SpaceProbe for SysinfoProbe {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        let target = std::fs::canonicalize(path)?;
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|disk| target.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no mounted disk holds {}", target.display()),
                )
            })
    }
}

pub fn probe_for(backend: ProbeBackend) -> Result<Box<dyn SpaceProbe>, FilterError> {
    match backend {
        #[cfg(unix)]
        ProbeBackend::Statvfs => Ok(Box::new(StatvfsProbe)),
        #[cfg(not(unix))]
        ProbeBackend::Statvfs => Err(FilterError::InvalidOption {
            filter: "storage",
            reason: "the statvfs backend needs a unix platform, use backend = \"sysinfo\"".into(),
        }),
        ProbeBackend::Sysinfo => Ok(Box::new(SysinfoProbe)),
    }
}
