//! Local-filesystem backend over `/proc/self/mounts` + `statvfs`.
//!
//! Each persistent mount becomes a logical drive whose id is derived from
//! its mount path (`/` becomes `root`, `/mnt/data` becomes `data`). Virtual
//! paths are `"{drive_id}/{relative...}"` with forward slashes; the first
//! segment selects the mount and the rest resolves beneath it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::backend::{DirEntry, DriveKind, DriveSnapshot, EntryKind, StorageBackend};
use crate::core::errors::{DdsError, Result};
use crate::core::vpath;

/// One mounted filesystem considered worth exposing as a drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub id: String,
    pub path: PathBuf,
    pub device: String,
    pub fs_type: String,
}

/// [`StorageBackend`] over the host filesystem.
pub struct LocalBackend {
    mounts_cache: RwLock<(Vec<MountPoint>, Instant)>,
    cache_ttl: Duration,
}

impl LocalBackend {
    pub fn new() -> Result<Self> {
        let mounts = read_mounts()?;
        Ok(Self {
            mounts_cache: RwLock::new((mounts, Instant::now())),
            cache_ttl: Duration::from_secs(5),
        })
    }

    /// Build a backend over a fixed mount set, bypassing `/proc`.
    #[must_use]
    pub fn with_mounts(mounts: Vec<MountPoint>) -> Self {
        Self {
            mounts_cache: RwLock::new((mounts, Instant::now())),
            // Effectively never refresh a fixed set.
            cache_ttl: Duration::from_secs(u64::MAX),
        }
    }

    fn mounts(&self) -> Result<Vec<MountPoint>> {
        {
            let cache = self.mounts_cache.read();
            if cache.1.elapsed() < self.cache_ttl {
                return Ok(cache.0.clone());
            }
        }
        let mounts = read_mounts()?;
        *self.mounts_cache.write() = (mounts.clone(), Instant::now());
        Ok(mounts)
    }

    /// Resolve a virtual path to a real one. The first segment selects
    /// the mount; the remainder resolves beneath its root. Segments that
    /// would escape the mount are rejected outright.
    fn resolve(&self, virtual_path: &str) -> Result<PathBuf> {
        let normalized = vpath::normalize(virtual_path);
        let segments = vpath::segments(&normalized);
        let Some((drive_id, rest)) = segments.split_first() else {
            return Err(DdsError::NotFound {
                path: virtual_path.to_string(),
            });
        };
        let mounts = self.mounts()?;
        let mount = mounts
            .iter()
            .find(|mount| mount.id == *drive_id)
            .ok_or_else(|| DdsError::NotFound {
                path: virtual_path.to_string(),
            })?;
        let mut real = mount.path.clone();
        for segment in rest {
            if *segment == ".." || *segment == "." {
                return Err(DdsError::NotFound {
                    path: virtual_path.to_string(),
                });
            }
            real.push(segment);
        }
        Ok(real)
    }
}

impl StorageBackend for LocalBackend {
    fn list_drives(&self) -> Result<Vec<DriveSnapshot>> {
        let mut drives = Vec::new();
        for mount in self.mounts()? {
            match snapshot_mount(&mount) {
                Ok(snapshot) => drives.push(snapshot),
                Err(err) => {
                    // One unreadable mount must not hide the rest.
                    eprintln!("[DDS-PLATFORM] warning: skipping {}: {err}", mount.id);
                }
            }
        }
        Ok(drives)
    }

    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>> {
        let real = self.resolve(path)?;
        let reader = fs::read_dir(&real).map_err(|source| map_fs_error(&real, source))?;
        let mut entries = Vec::new();
        for dirent in reader {
            let dirent = dirent.map_err(|source| DdsError::io(&real, source))?;
            let meta = dirent
                .metadata()
                .map_err(|source| DdsError::io(dirent.path(), source))?;
            let kind = if meta.is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name: dirent.file_name().to_string_lossy().into_owned(),
                size: if meta.is_dir() { 0 } else { meta.len() },
                kind,
            });
        }
        entries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(entries)
    }

    fn move_item(&self, source: &str, destination: &str) -> Result<bool> {
        let from = self.resolve(source)?;
        let to = self.resolve(destination)?;
        fs::rename(&from, &to).map_err(|source| map_fs_error(&from, source))?;
        Ok(true)
    }

    fn delete_item(&self, path: &str) -> Result<bool> {
        let real = self.resolve(path)?;
        let meta = fs::symlink_metadata(&real).map_err(|source| map_fs_error(&real, source))?;
        if meta.is_dir() {
            fs::remove_dir_all(&real).map_err(|source| DdsError::io(&real, source))?;
        } else {
            fs::remove_file(&real).map_err(|source| DdsError::io(&real, source))?;
        }
        Ok(true)
    }

    fn zip_folder(&self, path: &str) -> Result<String> {
        let real = self.resolve(path)?;
        if !real.is_dir() {
            return Err(DdsError::NotFound {
                path: path.to_string(),
            });
        }
        let archive_real = real.with_extension("zip");
        write_zip(&real, &archive_real)?;
        let trimmed = vpath::normalize(path);
        let trimmed = trimmed.trim_end_matches('/');
        Ok(format!("{trimmed}.zip"))
    }

    fn download_item(&self, path: &str) -> Result<Vec<u8>> {
        let real = self.resolve(path)?;
        fs::read(&real).map_err(|source| map_fs_error(&real, source))
    }
}

fn map_fs_error(path: &Path, source: std::io::Error) -> DdsError {
    if source.kind() == std::io::ErrorKind::NotFound {
        DdsError::NotFound {
            path: path.display().to_string(),
        }
    } else {
        DdsError::io(&path, source)
    }
}

fn snapshot_mount(mount: &MountPoint) -> Result<DriveSnapshot> {
    let stat = nix::sys::statvfs::statvfs(&mount.path).map_err(|error| {
        DdsError::transport("statvfs", format!("{}: {error}", mount.path.display()))
    })?;
    let fragment = stat.fragment_size();
    let total = stat.blocks().saturating_mul(fragment);
    let free = stat.blocks_available().saturating_mul(fragment);
    let used = total.saturating_sub(free);
    Ok(DriveSnapshot {
        id: mount.id.clone(),
        label: format!("{} ({})", mount.id, mount.fs_type),
        total_size: total,
        used_space: used,
        free_space: free,
        usage_percentage: DriveSnapshot::usage_from_bytes(total, used),
        kind: drive_kind(&mount.device, &mount.fs_type),
    })
}

fn read_mounts() -> Result<Vec<MountPoint>> {
    let raw = fs::read_to_string("/proc/self/mounts")
        .map_err(|source| DdsError::io("/proc/self/mounts", source))?;
    Ok(parse_proc_mounts(&raw))
}

/// Parse `/proc/self/mounts`, keeping only persistent filesystems. Mount
/// ids are derived from the mount path and deduplicated with a numeric
/// suffix when two mounts share a final segment.
fn parse_proc_mounts(raw: &str) -> Vec<MountPoint> {
    let mut mounts: Vec<MountPoint> = Vec::new();
    for line in raw.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        let fs_type = fields[2];
        if is_pseudo_fs(fs_type) {
            continue;
        }
        let path = PathBuf::from(unescape_mount_field(fields[1]));
        let base_id = mount_id(&path);
        let mut id = base_id.clone();
        let mut suffix = 2;
        while mounts.iter().any(|mount| mount.id == id) {
            id = format!("{base_id}{suffix}");
            suffix += 1;
        }
        mounts.push(MountPoint {
            id,
            path,
            device: fields[0].to_string(),
            fs_type: fs_type.to_string(),
        });
    }
    mounts
}

/// Derive a drive id from a mount path: `/` is `root`, otherwise the last
/// path segment.
fn mount_id(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "root".to_string(), |name| name.to_string_lossy().into_owned())
}

/// Whether a filesystem type is a kernel artifact or RAM-backed and should
/// not be offered as a move destination.
fn is_pseudo_fs(fs_type: &str) -> bool {
    matches!(
        fs_type.to_ascii_lowercase().as_str(),
        "proc"
            | "sysfs"
            | "devpts"
            | "devtmpfs"
            | "tmpfs"
            | "ramfs"
            | "cgroup"
            | "cgroup2"
            | "securityfs"
            | "debugfs"
            | "tracefs"
            | "pstore"
            | "bpf"
            | "autofs"
            | "mqueue"
            | "hugetlbfs"
            | "configfs"
            | "fusectl"
            | "binfmt_misc"
            | "overlay"
            | "squashfs"
            | "efivarfs"
            | "rpc_pipefs"
            | "nsfs"
    )
}

fn drive_kind(device: &str, fs_type: &str) -> DriveKind {
    match fs_type {
        "nfs" | "nfs4" | "cifs" | "smb3" | "sshfs" | "fuse.sshfs" => DriveKind::Network,
        _ if device.starts_with("/dev/sd") && device.contains("usb") => DriveKind::Removable,
        _ => DriveKind::Local,
    }
}

/// Undo the octal escaping `/proc/self/mounts` applies to whitespace in
/// mount paths (`\040` for space and friends).
fn unescape_mount_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let digits: String = chars.clone().take(3).collect();
        if digits.len() == 3 && digits.chars().all(|d| d.is_digit(8)) {
            if let Ok(code) = u8::from_str_radix(&digits, 8) {
                out.push(code as char);
                for _ in 0..3 {
                    chars.next();
                }
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Write a deflate-compressed archive of `dir` at `archive`, storing
/// entries relative to the folder itself.
fn write_zip(dir: &Path, archive: &Path) -> Result<()> {
    let file =
        fs::File::create(archive).map_err(|source| DdsError::io(archive, source))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let reader = fs::read_dir(&current).map_err(|source| DdsError::io(&current, source))?;
        for dirent in reader {
            let dirent = dirent.map_err(|source| DdsError::io(&current, source))?;
            let path = dirent.path();
            let relative = path
                .strip_prefix(dir)
                .map_err(|_| DdsError::NotFound {
                    path: path.display().to_string(),
                })?
                .to_string_lossy()
                .replace('\\', "/");
            let meta = dirent
                .metadata()
                .map_err(|source| DdsError::io(&path, source))?;
            if meta.is_dir() {
                writer
                    .add_directory(format!("{relative}/"), options)
                    .map_err(|err| DdsError::Store {
                        key: archive.display().to_string(),
                        details: err.to_string(),
                    })?;
                stack.push(path);
            } else {
                writer
                    .start_file(relative, options)
                    .map_err(|err| DdsError::Store {
                        key: archive.display().to_string(),
                        details: err.to_string(),
                    })?;
                let bytes = fs::read(&path).map_err(|source| DdsError::io(&path, source))?;
                writer
                    .write_all(&bytes)
                    .map_err(|source| DdsError::io(archive, source))?;
            }
        }
    }
    writer
        .finish()
        .map_err(|err| DdsError::Store {
            key: archive.display().to_string(),
            details: err.to_string(),
        })?
        .sync_all()
        .map_err(|source| DdsError::io(archive, source))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MOUNTS: &str = "\
proc /proc proc rw,nosuid 0 0
sysfs /sys sysfs rw,nosuid 0 0
tmpfs /run tmpfs rw,nosuid 0 0
/dev/sda2 / ext4 rw,relatime 0 0
/dev/sdb1 /mnt/data ext4 rw,relatime 0 0
/dev/sdc1 /mnt/backup\\040disk xfs rw,relatime 0 0
server:/export /mnt/nfs nfs4 rw,relatime 0 0
";

    #[test]
    fn pseudo_filesystems_are_filtered() {
        let mounts = parse_proc_mounts(SAMPLE_MOUNTS);
        let ids: Vec<&str> = mounts.iter().map(|mount| mount.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "data", "backup disk", "nfs"]);
    }

    #[test]
    fn escaped_mount_paths_are_unescaped() {
        let mounts = parse_proc_mounts(SAMPLE_MOUNTS);
        let backup = mounts.iter().find(|mount| mount.id == "backup disk").unwrap();
        assert_eq!(backup.path, PathBuf::from("/mnt/backup disk"));
    }

    #[test]
    fn duplicate_final_segments_get_numeric_suffixes() {
        let raw = "/dev/sda1 /mnt/data ext4 rw 0 0\n/dev/sdb1 /srv/data ext4 rw 0 0\n";
        let mounts = parse_proc_mounts(raw);
        assert_eq!(mounts[0].id, "data");
        assert_eq!(mounts[1].id, "data2");
    }

    #[test]
    fn network_filesystems_are_classified() {
        assert_eq!(drive_kind("server:/export", "nfs4"), DriveKind::Network);
        assert_eq!(drive_kind("/dev/sda2", "ext4"), DriveKind::Local);
    }

    #[test]
    fn unescape_handles_plain_and_escaped_fields() {
        assert_eq!(unescape_mount_field("/mnt/data"), "/mnt/data");
        assert_eq!(unescape_mount_field("/mnt/my\\040drive"), "/mnt/my drive");
        assert_eq!(unescape_mount_field("tab\\011sep"), "tab\tsep");
    }

    fn temp_backend() -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::with_mounts(vec![MountPoint {
            id: "scratch".to_string(),
            path: dir.path().to_path_buf(),
            device: "/dev/test".to_string(),
            fs_type: "ext4".to_string(),
        }]);
        (dir, backend)
    }

    #[test]
    fn list_directory_separates_files_and_folders() {
        let (dir, backend) = temp_backend();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let entries = backend.list_directory("scratch/").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "docs");
        assert_eq!(entries[0].kind, EntryKind::Folder);
        assert_eq!(entries[1].name, "notes.txt");
        assert_eq!(entries[1].size, 5);
    }

    #[test]
    fn move_and_delete_round_trip() {
        let (dir, backend) = temp_backend();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        assert!(backend
            .move_item("scratch/notes.txt", "scratch/docs/notes.txt")
            .unwrap());
        assert!(dir.path().join("docs/notes.txt").exists());

        assert!(backend.delete_item("scratch/docs").unwrap());
        assert!(!dir.path().join("docs").exists());
    }

    #[test]
    fn download_returns_file_bytes() {
        let (dir, backend) = temp_backend();
        fs::write(dir.path().join("blob.bin"), b"abc123").unwrap();
        let bytes = backend.download_item("scratch/blob.bin").unwrap();
        assert_eq!(bytes, b"abc123");
    }

    #[test]
    fn zip_folder_writes_an_archive_next_to_the_folder() {
        let (dir, backend) = temp_backend();
        fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
        fs::write(dir.path().join("docs/a.txt"), b"aaa").unwrap();
        fs::write(dir.path().join("docs/sub/b.txt"), b"bbb").unwrap();

        let virtual_archive = backend.zip_folder("scratch/docs/").unwrap();
        assert_eq!(virtual_archive, "scratch/docs.zip");
        assert!(dir.path().join("docs.zip").exists());

        let file = fs::File::open(dir.path().join("docs.zip")).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"a.txt".to_string()));
        assert!(names.contains(&"sub/b.txt".to_string()));
    }

    #[test]
    fn unknown_drive_is_not_found() {
        let (_dir, backend) = temp_backend();
        let err = backend.list_directory("ghost/").unwrap_err();
        assert_eq!(err.code(), "DDS-3002");
    }

    #[test]
    fn path_traversal_is_rejected() {
        let (_dir, backend) = temp_backend();
        let err = backend.list_directory("scratch/../etc/").unwrap_err();
        assert_eq!(err.code(), "DDS-3002");
    }

    #[test]
    fn missing_path_maps_to_not_found() {
        let (_dir, backend) = temp_backend();
        let err = backend.download_item("scratch/absent.bin").unwrap_err();
        assert_eq!(err.code(), "DDS-3002");
    }
}
