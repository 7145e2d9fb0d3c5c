use crate::error::EngineError;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Compression implied by a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    /// Recognized but not implemented; opening such a file fails fast.
    Unsupported(&'static str),
}

impl Compression {
    pub fn from_path(path: &Path) -> Compression {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            return Compression::Unsupported("tar+gzip");
        }
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_string(),
            None => return Compression::None,
        };
        match ext.as_str() {
            "gz" | "gzip" => Compression::Gzip,
            "bz2" | "bzip2" => Compression::Unsupported("bzip2"),
            "xz" | "lzma" => Compression::Unsupported("xz"),
            "zst" | "zstd" => Compression::Unsupported("zstd"),
            "lz4" => Compression::Unsupported("lz4"),
            "z" => Compression::Unsupported("compress"),
            "zip" => Compression::Unsupported("zip"),
            "7z" => Compression::Unsupported("7z"),
            _ => Compression::None,
        }
    }
}

/// Forward-only sequence of text lines read from a file (or any reader).
///
/// Lines split on `\n`, `\r\n` or a lone `\r`; terminators are not included.
/// Invalid UTF-8 is replaced rather than rejected. Memory is bounded by the
/// longest line plus reader buffers. To start over, open a new source.
pub struct LineSource {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
    skip_lf: bool,
    first: bool,
    done: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl LineSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let compression = Compression::from_path(path);
        if let Compression::Unsupported(kind) = compression {
            return Err(EngineError::UnsupportedCompression {
                path: path.to_path_buf(),
                kind: kind.to_string(),
            });
        }
        let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
        let reader: Box<dyn BufRead + Send> = match compression {
            Compression::Gzip => Box::new(BufReader::with_capacity(1 << 16, GzDecoder::new(file))),
            _ => Box::new(BufReader::with_capacity(1 << 20, file)),
        };
        tracing::debug!(path = %path.display(), ?compression, "opened line source");
        Ok(Self::with_reader(path.to_path_buf(), reader))
    }

    /// Wrap an already-open reader; `label` is used in error messages.
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R, label: impl Into<PathBuf>) -> Self {
        Self::with_reader(label.into(), Box::new(reader))
    }

    fn with_reader(path: PathBuf, reader: Box<dyn BufRead + Send>) -> Self {
        LineSource {
            path,
            reader,
            buf: Vec::new(),
            skip_lf: false,
            first: true,
            done: false,
            cancel: None,
        }
    }

    /// Stop at the next line boundary once `flag` is raised, yielding `Cancelled`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        loop {
            let available = match self.reader.fill_buf() {
                Ok(b) => b,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(if self.buf.is_empty() { None } else { Some(self.take_line()) });
            }
            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    self.reader.consume(1);
                    continue;
                }
            }
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(i) => {
                    let ending = available[i];
                    self.buf.extend_from_slice(&available[..i]);
                    self.reader.consume(i + 1);
                    self.skip_lf = ending == b'\r';
                    return Ok(Some(self.take_line()));
                }
                None => {
                    let n = available.len();
                    self.buf.extend_from_slice(available);
                    self.reader.consume(n);
                }
            }
        }
    }

    fn take_line(&mut self) -> String {
        let mut line = String::from_utf8_lossy(&self.buf).into_owned();
        if self.first {
            self.first = false;
            if let Some(rest) = line.strip_prefix('\u{feff}') {
                line = rest.to_string();
            }
        }
        line
    }
}

impl Iterator for LineSource {
    type Item = Result<String, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::SeqCst) {
                self.done = true;
                return Some(Err(EngineError::Cancelled));
            }
        }
        match self.read_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(EngineError::io(self.path.clone(), e)))
            }
        }
    }
}
