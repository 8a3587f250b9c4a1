//! Bounded-range content hashing: spec.md §4.4.
//!
//! Uses `xxh3` (a 64-bit member of the xxhash family) rather than a
//! cryptographic digest — the teacher hashes whole files with SHA-256, but
//! the staged algorithm only needs a fast, well-distributed digest, and the
//! streaming-update shape below is grounded on
//! `other_examples/250b3d77_desbma-bdf__src-main.rs`'s `compute_xxh`.

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use xxhash_rust::xxh3::Xxh3;

/// Digest width / range-read contract is part of the on-disk JSON format —
/// don't change this without bumping the schema version in `serializer.rs`.
pub const CHUNK: u64 = 131_072;

const STREAM_BUFFER: usize = 65_536;

/// Hashes `min(size, CHUNK)` bytes starting at `offset`.
async fn hash_range(path: &Path, offset: u64, len: u64) -> std::io::Result<u64> {
    let mut file = File::open(path).await?;
    if offset > 0 {
        file.seek(SeekFrom::Start(offset)).await?;
    }
    let mut hasher = Xxh3::new();
    let mut remaining = len;
    let mut buf = vec![0u8; STREAM_BUFFER.min(len.max(1) as usize)];
    while remaining > 0 {
        let want = (buf.len() as u64).min(remaining) as usize;
        let read = file.read(&mut buf[..want]).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        remaining -= read as u64;
    }
    Ok(hasher.digest())
}

/// First `min(size, CHUNK)` bytes from offset 0.
pub async fn hash_front(path: &Path, size: u64) -> std::io::Result<u64> {
    hash_range(path, 0, size.min(CHUNK)).await
}

/// `min(size, CHUNK)` bytes from offset `max(0, size/2 - CHUNK/2)`.
pub async fn hash_middle(path: &Path, size: u64) -> std::io::Result<u64> {
    let len = size.min(CHUNK);
    let offset = if size > CHUNK {
        (size / 2).saturating_sub(CHUNK / 2)
    } else {
        0
    };
    hash_range(path, offset, len).await
}

/// Last `min(size, CHUNK)` bytes.
pub async fn hash_end(path: &Path, size: u64) -> std::io::Result<u64> {
    let len = size.min(CHUNK);
    let offset = size.saturating_sub(len);
    hash_range(path, offset, len).await
}

/// All bytes, streamed in blocks.
pub async fn hash_full(path: &Path) -> std::io::Result<u64> {
    let mut file = File::open(path).await?;
    let mut hasher = Xxh3::new();
    let mut buf = vec![0u8; STREAM_BUFFER];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher.digest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn write_file(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = tokio::fs::File::create(&path).await.unwrap();
        f.write_all(data).await.unwrap();
        f.flush().await.unwrap();
        path
    }

    #[tokio::test]
    async fn small_file_front_equals_end_equals_full() {
        let dir = tempfile::tempdir().unwrap();
        let data = b"hello world";
        let path = write_file(&dir, "a.txt", data).await;
        let size = data.len() as u64;
        let front = hash_front(&path, size).await.unwrap();
        let end = hash_end(&path, size).await.unwrap();
        let full = hash_full(&path).await.unwrap();
        assert_eq!(front, end);
        assert_eq!(front, full);
    }

    #[tokio::test]
    async fn identical_content_hashes_identically() {
        let dir = tempfile::tempdir().unwrap();
        let data = vec![0xABu8; 300_000];
        let a = write_file(&dir, "a.bin", &data).await;
        let b = write_file(&dir, "b.bin", &data).await;
        let size = data.len() as u64;
        assert_eq!(
            hash_front(&a, size).await.unwrap(),
            hash_front(&b, size).await.unwrap()
        );
        assert_eq!(
            hash_middle(&a, size).await.unwrap(),
            hash_middle(&b, size).await.unwrap()
        );
        assert_eq!(
            hash_end(&a, size).await.unwrap(),
            hash_end(&b, size).await.unwrap()
        );
    }

    #[tokio::test]
    async fn end_hash_catches_a_difference_in_the_final_byte() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = vec![0u8; 300_000];
        let a = write_file(&dir, "a.bin", &data).await;
        *data.last_mut().unwrap() = 0xFF;
        let b = write_file(&dir, "b.bin", &data).await;
        let size = data.len() as u64;
        assert_eq!(
            hash_front(&a, size).await.unwrap(),
            hash_front(&b, size).await.unwrap()
        );
        assert_ne!(
            hash_end(&a, size).await.unwrap(),
            hash_end(&b, size).await.unwrap()
        );
    }
}
