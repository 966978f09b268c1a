//! Streaming content digests.
//!
//! The device catalog records an MD5 digest per file; computing it streams
//! the file in bounded chunks so no single file's size determines memory use.
//! Digests are computed on the transfer worker, never on the thread that
//! initiated the batch.

use std::io;
use std::path::Path;

use tokio::io::AsyncReadExt;

/// Chunk size for streaming digest computation.
const DIGEST_CHUNK_SIZE: usize = 8192;

/// Computes the MD5 digest of a file as a lower-case hex string.
pub async fn file_md5(path: &Path) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; DIGEST_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        context.consume(&buf[..read]);
    }

    Ok(format!("{:x}", context.compute()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_known_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let digest = file_md5(file.path()).await.unwrap();
        assert_eq!(digest, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[tokio::test]
    async fn test_empty_file_digest() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let digest = file_md5(file.path()).await.unwrap();
        assert_eq!(digest, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[tokio::test]
    async fn test_file_larger_than_chunk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let payload = vec![0xabu8; DIGEST_CHUNK_SIZE * 3 + 17];
        file.write_all(&payload).unwrap();
        file.flush().unwrap();

        let streamed = file_md5(file.path()).await.unwrap();
        let whole = format!("{:x}", md5::compute(&payload));
        assert_eq!(streamed, whole);
    }

    #[tokio::test]
    async fn test_missing_file_errors() {
        let result = file_md5(Path::new("/nonexistent/file.epub")).await;
        assert!(result.is_err());
    }
}
