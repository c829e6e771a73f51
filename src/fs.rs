use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Abstraction over file system operations for testing
pub trait FileSystem: Send + Sync {
    /// Read file contents as a string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replace the file contents all-or-nothing, creating parent directories
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy a file, creating the destination's parent directories
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;
}

/// Real file system implementation using std::fs
#[derive(Debug, Default, Clone)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to sync temp file for {}", path.display()))?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::copy(from, to)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
        Ok(())
    }
}

/// Timestamped copies of files taken right before they are overwritten:
/// `<dir>/<path relative to the project>.<stamp>.bak`.
#[derive(Debug, Clone)]
pub struct Backups {
    project_root: PathBuf,
    dir: PathBuf,
    stamp: String,
    enabled: bool,
}

impl Backups {
    pub fn new(
        project_root: impl Into<PathBuf>,
        dir: impl Into<PathBuf>,
        stamp: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            dir: dir.into(),
            stamp: stamp.into(),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::new("", "", "", false)
    }

    /// One stamp per run, so every backup of a run sorts together.
    pub fn timestamp() -> String {
        chrono::Local::now().format("%Y%m%dT%H%M%S").to_string()
    }

    pub fn backup_path(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
        let relative: PathBuf = relative
            .components()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .collect();
        let name = format!("{}.{}.bak", relative.display(), self.stamp);
        self.dir.join(name)
    }

    /// Copy `path` aside if it exists. Returns where the copy went.
    pub fn snapshot<F: FileSystem>(&self, fs: &F, path: &Path) -> Result<Option<PathBuf>> {
        if !self.enabled || !fs.exists(path) {
            return Ok(None);
        }
        let target = self.backup_path(path);
        fs.copy(path, &target)?;
        Ok(Some(target))
    }
}

/// Exclusive advisory lock held for the duration of a mutating run.
/// Released when dropped.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;
        let path = output_dir.join("i18n-lift.lock");
        let file = File::create(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;
        file.try_lock_exclusive().with_context(|| {
            format!(
                "Another i18n-lift run holds {} (wait for it to finish)",
                path.display()
            )
        })?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
