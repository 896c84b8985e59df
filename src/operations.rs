//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so that resources can be unit-tested
//! without touching the real filesystem.  Production code uses
//! [`SystemFileSystemOps`]; tests use `MockFileSystemOps`.
//!
//! Everything here runs as root against paths inside a user's home, so the
//! mutating operations never follow a symlink at the final path component.

use anyhow::{Context as _, Result};
use nix::fcntl::{AtFlags, OFlag};
use nix::unistd::{Gid, Uid};
use std::fs::OpenOptions;
use std::io::Write as _;
use std::os::unix::fs::{OpenOptionsExt as _, PermissionsExt as _};
use std::path::Path;

/// Abstraction over the filesystem probes and mutations used by resources.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if anything, including a dangling symlink, is at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Returns `true` if `path` itself is a symlink.
    fn is_symlink(&self, path: &Path) -> bool;

    /// Read the raw bytes of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Read the whole file at `path` as UTF-8 (lossy).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.read(path)?).into_owned())
    }

    /// Create or truncate `path` and write `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or `path` is a symlink.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Append `contents` to `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written, or if
    /// `path` is a symlink.
    fn append(&self, path: &Path, contents: &str) -> Result<()>;

    /// Copy the file at `from` to `to`, which must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails or anything is already at `to`.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Rename `from` to `to`. A symlink at `from` is moved, not followed.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Create `path` and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Return the permission bits of `path` (`mode & 0o7777`).
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    fn mode(&self, path: &Path) -> Result<u32>;

    /// Set the permission bits of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the permissions cannot be changed or `path` is a
    /// symlink.
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;

    /// Change the owner of `path` to `uid:gid`. A symlink at `path` is
    /// re-owned itself; its target is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if ownership cannot be changed.
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileSystemOps;

/// Open flags that make `open(2)` fail with `ELOOP` on a symlinked path.
fn no_follow() -> i32 {
    OFlag::O_NOFOLLOW.bits()
}

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.is_symlink()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(no_follow())
            .open(path)
            .with_context(|| format!("opening {} for writing", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("writing {}", path.display()))
    }

    fn append(&self, path: &Path, contents: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .custom_flags(no_follow())
            .open(path)
            .with_context(|| format!("opening {} for append", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("appending to {}", path.display()))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let context = || format!("copying {} to {}", from.display(), to.display());
        let mut source = std::fs::File::open(from).with_context(context)?;
        let mode = source.metadata().with_context(context)?.permissions().mode() & 0o777;
        let mut dest = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode)
            .custom_flags(no_follow())
            .open(to)
            .with_context(context)?;
        std::io::copy(&mut source, &mut dest)
            .map(|_| ())
            .with_context(context)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to)
            .with_context(|| format!("renaming {} to {}", from.display(), to.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))
    }

    fn mode(&self, path: &Path) -> Result<u32> {
        let meta =
            std::fs::metadata(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(meta.permissions().mode() & 0o7777)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        // fchmod on a no-follow descriptor; Linux has no lchmod.
        let file = OpenOptions::new()
            .read(true)
            .custom_flags((OFlag::O_NOFOLLOW | OFlag::O_NONBLOCK).bits())
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        file.set_permissions(std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("setting mode {mode:o} on {}", path.display()))
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        nix::unistd::fchownat(
            None,
            path,
            Some(Uid::from_raw(uid)),
            Some(Gid::from_raw(gid)),
            AtFlags::AT_SYMLINK_NOFOLLOW,
        )
        .with_context(|| format!("changing owner of {} to {uid}:{gid}", path.display()))
    }
}

/// In-memory [`FileSystemOps`] for unit tests.
///
/// Pre-configure files, directories and symlinks with the builder-style
/// methods, then inspect contents, modes, owners, and the list of mutations
/// afterwards. Like the real implementation, writes through a symlink fail.
///
/// # Example
///
/// ```ignore
/// let fs = MockFileSystemOps::new()
///     .with_dir("/home/dev/.ssh")
///     .with_file("/home/dev/.ssh/config", "Host github.com\n");
/// ```
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    entries: std::sync::Mutex<std::collections::BTreeMap<std::path::PathBuf, MockEntry>>,
    mutations: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
#[derive(Debug, Clone)]
enum MockKind {
    File(Vec<u8>),
    Dir,
    Symlink(std::path::PathBuf),
}

#[cfg(test)]
#[derive(Debug, Clone)]
struct MockEntry {
    kind: MockKind,
    mode: u32,
    owner: Option<(u32, u32)>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular file with `contents` (mode 644).
    #[must_use]
    pub fn with_file(self, path: impl Into<std::path::PathBuf>, contents: &str) -> Self {
        self.with_bytes(path, contents.as_bytes())
    }

    /// Add a regular file holding raw `bytes` (mode 644).
    #[must_use]
    pub fn with_bytes(self, path: impl Into<std::path::PathBuf>, bytes: &[u8]) -> Self {
        self.insert(path.into(), MockKind::File(bytes.to_vec()), 0o644);
        self
    }

    /// Add a directory (mode 755).
    #[must_use]
    pub fn with_dir(self, path: impl Into<std::path::PathBuf>) -> Self {
        self.insert(path.into(), MockKind::Dir, 0o755);
        self
    }

    /// Add a symlink pointing at `target`, which need not exist.
    #[must_use]
    pub fn with_symlink(
        self,
        path: impl Into<std::path::PathBuf>,
        target: impl Into<std::path::PathBuf>,
    ) -> Self {
        self.insert(path.into(), MockKind::Symlink(target.into()), 0o777);
        self
    }

    /// Contents of the file at `path`, if it is a file.
    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.bytes(path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Permission bits of `path`, if it exists.
    #[must_use]
    pub fn mode_of(&self, path: &Path) -> Option<u32> {
        self.lock().get(path).map(|e| e.mode)
    }

    /// Owner set via [`FileSystemOps::chown`], if any.
    #[must_use]
    pub fn owner_of(&self, path: &Path) -> Option<(u32, u32)> {
        self.lock().get(path).and_then(|e| e.owner)
    }

    /// Every path currently present.
    #[must_use]
    pub fn paths(&self) -> Vec<std::path::PathBuf> {
        self.lock().keys().cloned().collect()
    }

    /// Human-readable log of every mutating call, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().expect("mock mutations poisoned").clone()
    }

    fn bytes(&self, path: &Path) -> Option<Vec<u8>> {
        match self.lock().get(path).map(|e| &e.kind) {
            Some(MockKind::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, std::collections::BTreeMap<std::path::PathBuf, MockEntry>>
    {
        self.entries.lock().expect("mock entries poisoned")
    }

    fn insert(&self, path: std::path::PathBuf, kind: MockKind, mode: u32) {
        let mut entries = self.lock();
        for ancestor in path.ancestors().skip(1) {
            if ancestor.parent().is_none() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry {
                    kind: MockKind::Dir,
                    mode: 0o755,
                    owner: None,
                });
        }
        entries.insert(
            path,
            MockEntry {
                kind,
                mode,
                owner: None,
            },
        );
    }

    fn record(&self, op: String) {
        self.mutations
            .lock()
            .expect("mock mutations poisoned")
            .push(op);
    }

    /// Fail like `O_NOFOLLOW` does when `path` is a symlink.
    fn refuse_symlink(&self, path: &Path) -> Result<()> {
        if self.is_symlink(path) {
            anyhow::bail!("mock: too many levels of symbolic links: {}", path.display());
        }
        Ok(())
    }

    fn missing(path: &Path) -> anyhow::Error {
        anyhow::anyhow!("mock: no such file or directory: {}", path.display())
    }
}

#[cfg(test)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock()
            .get(path)
            .is_some_and(|e| matches!(e.kind, MockKind::Dir))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lock()
            .get(path)
            .is_some_and(|e| matches!(e.kind, MockKind::File(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.lock()
            .get(path)
            .is_some_and(|e| matches!(e.kind, MockKind::Symlink(_)))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.bytes(path).ok_or_else(|| Self::missing(path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.record(format!("write {}", path.display()));
        self.refuse_symlink(path)?;
        let mode = self.mode_of(path).unwrap_or(0o644);
        self.insert(
            path.to_path_buf(),
            MockKind::File(contents.as_bytes().to_vec()),
            mode,
        );
        Ok(())
    }

    fn append(&self, path: &Path, contents: &str) -> Result<()> {
        self.record(format!("append {}", path.display()));
        self.refuse_symlink(path)?;
        let mut bytes = self.bytes(path).unwrap_or_default();
        bytes.extend_from_slice(contents.as_bytes());
        let mode = self.mode_of(path).unwrap_or(0o644);
        self.insert(path.to_path_buf(), MockKind::File(bytes), mode);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.record(format!("copy {} {}", from.display(), to.display()));
        if self.exists(to) {
            anyhow::bail!("mock: file exists: {}", to.display());
        }
        let bytes = self.bytes(from).ok_or_else(|| Self::missing(from))?;
        let mode = self.mode_of(from).unwrap_or(0o644);
        self.insert(to.to_path_buf(), MockKind::File(bytes), mode);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.record(format!("rename {} {}", from.display(), to.display()));
        let entry = self.lock().remove(from).ok_or_else(|| Self::missing(from))?;
        self.lock().insert(to.to_path_buf(), entry);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        if !self.exists(path) {
            self.record(format!("mkdir {}", path.display()));
            self.insert(path.to_path_buf(), MockKind::Dir, 0o755);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.record(format!("remove {}", path.display()));
        self.lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Self::missing(path))
    }

    fn mode(&self, path: &Path) -> Result<u32> {
        self.mode_of(path).ok_or_else(|| Self::missing(path))
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        self.record(format!("chmod {mode:o} {}", path.display()));
        self.refuse_symlink(path)?;
        let mut entries = self.lock();
        let entry = entries.get_mut(path).ok_or_else(|| Self::missing(path))?;
        entry.mode = mode;
        Ok(())
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        self.record(format!("chown {uid}:{gid} {}", path.display()));
        let mut entries = self.lock();
        let entry = entries.get_mut(path).ok_or_else(|| Self::missing(path))?;
        entry.owner = Some((uid, gid));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::os::unix::fs::{PermissionsExt as _, symlink};
    use std::path::PathBuf;

    #[test]
    fn system_append_creates_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        SystemFileSystemOps.append(&path, "a\n").unwrap();
        SystemFileSystemOps.append(&path, "b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn system_set_mode_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key");
        std::fs::write(&path, "secret").unwrap();
        SystemFileSystemOps.set_mode(&path, 0o600).unwrap();
        assert_eq!(SystemFileSystemOps.mode(&path).unwrap(), 0o600);
    }

    #[test]
    fn system_set_mode_works_on_directories() {
        let dir = tempfile::tempdir().unwrap();
        let ssh = dir.path().join(".ssh");
        std::fs::create_dir(&ssh).unwrap();
        SystemFileSystemOps.set_mode(&ssh, 0o700).unwrap();
        assert_eq!(SystemFileSystemOps.mode(&ssh).unwrap(), 0o700);
    }

    #[test]
    fn system_chown_to_self_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owned");
        std::fs::write(&path, "").unwrap();
        let uid = nix::unistd::getuid().as_raw();
        let gid = nix::unistd::getgid().as_raw();
        SystemFileSystemOps.chown(&path, uid, gid).unwrap();
    }

    #[test]
    fn system_chown_of_dangling_link_does_not_need_target() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        symlink(dir.path().join("nowhere"), &link).unwrap();
        let uid = nix::unistd::getuid().as_raw();
        let gid = nix::unistd::getgid().as_raw();
        SystemFileSystemOps.chown(&link, uid, gid).unwrap();
        assert!(!dir.path().join("nowhere").exists());
    }

    #[test]
    fn system_exists_sees_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join(".vimrc");
        symlink(dir.path().join("nowhere"), &link).unwrap();
        assert!(SystemFileSystemOps.exists(&link));
        assert!(SystemFileSystemOps.is_symlink(&link));
        assert!(!SystemFileSystemOps.is_file(&link));
    }

    #[test]
    fn system_writes_refuse_symlinked_paths() {
        let dir = tempfile::tempdir().unwrap();
        let victim = dir.path().join("victim");
        std::fs::write(&victim, "precious\n").unwrap();
        std::fs::set_permissions(&victim, std::fs::Permissions::from_mode(0o640)).unwrap();
        let link = dir.path().join("config");
        symlink(&victim, &link).unwrap();

        let fs = SystemFileSystemOps;
        assert!(fs.append(&link, "Host x\n").is_err());
        assert!(fs.write(&link, "Host x\n").is_err());
        assert!(fs.set_mode(&link, 0o600).is_err());
        assert!(fs.copy(&victim, &link).is_err());

        assert_eq!(std::fs::read_to_string(&victim).unwrap(), "precious\n");
        assert_eq!(fs.mode(&victim).unwrap(), 0o640);
    }

    #[test]
    fn system_copy_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("staged");
        let to = dir.path().join("dest");
        std::fs::write(&from, "new").unwrap();
        std::fs::write(&to, "old").unwrap();

        assert!(SystemFileSystemOps.copy(&from, &to).is_err());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "old");

        std::fs::remove_file(&to).unwrap();
        SystemFileSystemOps.copy(&from, &to).unwrap();
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "new");
    }

    #[test]
    fn system_read_keeps_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1");
        std::fs::write(&path, [b'a', 0xFF, b'\n']).unwrap();
        assert_eq!(
            SystemFileSystemOps.read(&path).unwrap(),
            vec![b'a', 0xFF, b'\n']
        );
        assert_eq!(
            SystemFileSystemOps.read_to_string(&path).unwrap(),
            "a\u{FFFD}\n"
        );
    }

    #[test]
    fn mock_with_file_creates_parent_dirs() {
        let fs = MockFileSystemOps::new().with_file("/home/dev/.zshrc", "x");
        assert!(fs.is_dir(Path::new("/home/dev")));
        assert!(fs.is_dir(Path::new("/home")));
        assert!(fs.is_file(Path::new("/home/dev/.zshrc")));
        assert!(fs.mutations().is_empty(), "builders are not mutations");
    }

    #[test]
    fn mock_rename_moves_contents() {
        let fs = MockFileSystemOps::new().with_file("/a", "one");
        fs.rename(Path::new("/a"), Path::new("/b")).unwrap();
        assert!(!fs.exists(Path::new("/a")));
        assert_eq!(fs.contents(Path::new("/b")), Some("one".to_string()));
        assert_eq!(fs.mutations(), vec!["rename /a /b".to_string()]);
    }

    #[test]
    fn mock_symlink_blocks_writes_like_the_real_thing() {
        let fs = MockFileSystemOps::new().with_symlink("/home/dev/.ssh/config", "/etc/shadow");
        let link = Path::new("/home/dev/.ssh/config");
        assert!(fs.exists(link));
        assert!(fs.is_symlink(link));
        assert!(!fs.is_file(link));
        assert!(fs.append(link, "x").is_err());
        assert!(fs.set_mode(link, 0o600).is_err());
        assert!(!fs.exists(Path::new("/etc/shadow")));
    }

    #[test]
    fn mock_create_dir_all_is_quiet_when_present() {
        let fs = MockFileSystemOps::new().with_dir("/home/dev/.ssh");
        fs.create_dir_all(Path::new("/home/dev/.ssh")).unwrap();
        assert!(fs.mutations().is_empty());
        assert_eq!(
            fs.paths(),
            vec![
                PathBuf::from("/home"),
                PathBuf::from("/home/dev"),
                PathBuf::from("/home/dev/.ssh")
            ]
        );
    }
}
