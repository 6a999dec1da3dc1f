//! Output capture files
//!
//! Each captured process gets a `<token>.stdout.log` / `<token>.stderr.log`
//! pair. The child writes them; readers open them independently and only see
//! bytes that were already appended, so reads need no locking.

use std::fs::File;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use uuid::Uuid;

use super::OutputStream;

/// The stdout/stderr capture pair of one process
#[derive(Debug)]
pub struct OutputCapture {
    stdout_path: PathBuf,
    stderr_path: PathBuf,
    /// Our copies of the handles; `None` once closed
    handles: Mutex<Option<(File, File)>>,
}

impl OutputCapture {
    /// Create a fresh capture pair inside `dir`, creating `dir` if needed.
    ///
    /// If the second file cannot be created the first handle is dropped
    /// (closed) before returning. The file itself is left on disk.
    pub fn create(dir: &Path) -> io::Result<Self> {
        swissknife_utils::ensure_dir(dir)?;

        let token = Uuid::new_v4().simple().to_string();
        let stdout_path = dir.join(format!("{}.stdout.log", token));
        let stderr_path = dir.join(format!("{}.stderr.log", token));

        let stdout = File::create(&stdout_path)?;
        let stderr = File::create(&stderr_path)?;

        Ok(Self {
            stdout_path,
            stderr_path,
            handles: Mutex::new(Some((stdout, stderr))),
        })
    }

    /// Duplicated handles to hand to the child as stdout/stderr
    pub fn stdio(&self) -> io::Result<(Stdio, Stdio)> {
        let handles = self.handles.lock();
        match handles.as_ref() {
            Some((out, err)) => Ok((Stdio::from(out.try_clone()?), Stdio::from(err.try_clone()?))),
            None => Err(io::Error::new(io::ErrorKind::Other, "capture already closed")),
        }
    }

    pub fn path(&self, stream: OutputStream) -> &Path {
        match stream {
            OutputStream::Stdout => &self.stdout_path,
            OutputStream::Stderr => &self.stderr_path,
        }
    }

    /// Close our handles. Safe to call any number of times.
    pub fn close(&self) {
        self.handles.lock().take();
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.handles.lock().is_some()
    }
}

/// Bytes read from a capture file together with its size at read time
#[derive(Debug)]
pub struct TailRead {
    pub size: u64,
    pub data: Vec<u8>,
}

/// Read up to `max_bytes` from `path`.
///
/// With `tail` set and a file larger than `max_bytes`, the most recent
/// `max_bytes` are returned; otherwise reading starts at offset zero.
pub async fn read_tail(path: &Path, max_bytes: usize, tail: bool) -> io::Result<TailRead> {
    let mut file = tokio::fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    let limit = max_bytes as u64;

    if tail && size > limit {
        file.seek(SeekFrom::Start(size - limit)).await?;
    }

    let mut data = Vec::with_capacity(max_bytes.min(size as usize));
    file.take(limit).read_to_end(&mut data).await?;

    Ok(TailRead { size, data })
}

/// Decode as UTF-8, falling back to a byte-per-char Latin-1 mapping
pub fn decode_lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}
