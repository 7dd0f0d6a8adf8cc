use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Size-rotated log file.
///
/// When a write would bring the file to `max_bytes` or more, the file is
/// shifted to `{path}.1`, older backups move up by one and
/// `{path}.{backup_count}` is dropped. With `backup_count == 0` the file is
/// truncated instead. An empty file never rotates.
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    file: File,
    current_size: u64,
    max_bytes: u64,
    backup_count: u32,
}

impl RotatingFileWriter {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backup_count: u32) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let current_size = file.metadata()?.len();

        Ok(Self {
            path,
            file,
            current_size,
            max_bytes,
            backup_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one formatted record, rotating first if needed.
    pub fn write_record(&mut self, record: &[u8]) -> io::Result<()> {
        let len = record.len() as u64;

        if self.max_bytes > 0
            && self.current_size > 0
            && self.current_size + len >= self.max_bytes
        {
            self.rotate()?;
        }

        self.file.write_all(record)?;
        self.file.flush()?;
        self.current_size += len;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        if self.backup_count == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.current_size = 0;
            return Ok(());
        }

        for index in (1..self.backup_count).rev() {
            let source = self.backup_path(index);
            if source.exists() {
                let target = self.backup_path(index + 1);
                if target.exists() {
                    std::fs::remove_file(&target)?;
                }
                std::fs::rename(&source, &target)?;
            }
        }

        let first = self.backup_path(1);
        if first.exists() {
            std::fs::remove_file(&first)?;
        }
        std::fs::rename(&self.path, &first)?;

        self.file = open_append(&self.path)?;
        self.current_size = 0;
        Ok(())
    }

    fn backup_path(&self, index: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
