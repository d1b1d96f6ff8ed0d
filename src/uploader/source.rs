use bytes::Bytes;
use std::io;
use std::ops::Range;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Byte source for one upload: the orchestrator only ever asks for
/// non-overlapping ranges, one part at a time.
#[allow(async_fn_in_trait)]
pub trait FileSource: Send + Sync {
    fn file_name(&self) -> &str;
    fn content_type(&self) -> &str;
    fn size(&self) -> u64;
    async fn read_range(&self, range: Range<u64>) -> io::Result<Bytes>;
}

/// File on disk. Ranges are read with an independent handle per call, so a
/// shared reference needs no interior locking.
pub struct DiskFile {
    path: PathBuf,
    file_name: String,
    content_type: String,
    size: u64,
}

impl DiskFile {
    pub async fn open(path: impl Into<PathBuf>, content_type: impl Into<String>) -> io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();

        Ok(Self {
            path,
            file_name,
            content_type: content_type.into(),
            size: metadata.len(),
        })
    }

    /// Like [`DiskFile::open`], guessing the content type from the file
    /// extension.
    pub async fn open_guessing(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self::open(path, content_type).await
    }
}

impl FileSource for DiskFile {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&self, range: Range<u64>) -> io::Result<Bytes> {
        let mut file = File::open(&self.path).await?;
        file.seek(io::SeekFrom::Start(range.start)).await?;

        let len = (range.end - range.start) as usize;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await?;

        Ok(Bytes::from(buf))
    }
}

/// In-memory source, used by tests and small generated payloads.
pub struct MemoryFile {
    file_name: String,
    content_type: String,
    data: Bytes,
}

impl MemoryFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

impl FileSource for MemoryFile {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_range(&self, range: Range<u64>) -> io::Result<Bytes> {
        if range.end > self.data.len() as u64 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "range past end of buffer",
            ));
        }
        Ok(self.data.slice(range.start as usize..range.end as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_file_reads_exact_ranges() {
        let file = MemoryFile::new("a.bin", "video/mp4", vec![0u8, 1, 2, 3, 4, 5]);
        assert_eq!(file.size(), 6);

        let mid = file.read_range(2..5).await.unwrap();
        assert_eq!(&mid[..], &[2, 3, 4]);

        assert!(file.read_range(4..7).await.is_err());
    }
}
