//! Hash addressing: content hashes, storage filenames and shard directories.
//!
//! A storage filename is the 64-char lowercase hex SHA-256 of the blob followed
//! by the original extension. When the original name has no extension the
//! whole base name stands in for it, so `.jpg` becomes `{hash}.jpg` and
//! `README` becomes `{hash}README`.

use std::path::{Path, PathBuf};

use boardy_core::constants::{CONTENT_HASH_LEN, THUMBNAIL_EXTENSION, THUMBNAIL_PREFIX};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::traits::{StorageError, StorageResult};

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 of `data` as lowercase hex.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// SHA-256 of a file's bytes, read in fixed-size chunks.
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Extension of `original_name` including the dot, or the base name itself
/// when there is none. Leading dots do not start an extension.
pub fn split_extension(original_name: &str) -> &str {
    let base = Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(original_name);
    let stem_start = base.len() - base.trim_start_matches('.').len();
    match base[stem_start..].rfind('.') {
        Some(idx) => &base[stem_start + idx..],
        None => base,
    }
}

/// `{hash}{ext}` for a blob whose source was called `original_name`.
pub fn storage_filename(hash: &str, original_name: &str) -> String {
    format!("{}{}", hash, split_extension(original_name))
}

/// Reject anything that is not `{64 lowercase hex}{suffix}` or that could
/// escape the shard directory. The hash prefix keeps the name from ever
/// being `.` or `..`, so only separators need refusing.
pub fn validate_storage_filename(filename: &str) -> StorageResult<()> {
    let hash = filename.get(..CONTENT_HASH_LEN).ok_or_else(|| {
        StorageError::InvalidKey(format!("{} is shorter than a content hash", filename))
    })?;

    if !hash
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(StorageError::InvalidKey(format!(
            "{} does not start with a lowercase hex content hash",
            filename
        )));
    }

    if filename.contains('/') || filename.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage filename contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Two-level shard directory `{hash[0:2]}/{hash[2:4]}` for a storage filename.
pub fn shard_dir(filename: &str) -> StorageResult<PathBuf> {
    validate_storage_filename(filename)?;
    Ok(Path::new(&filename[0..2]).join(&filename[2..4]))
}

/// `sample_{hash}.jpg`, whatever the source container was.
pub fn thumbnail_filename(filename: &str) -> StorageResult<String> {
    validate_storage_filename(filename)?;
    Ok(format!(
        "{}{}{}",
        THUMBNAIL_PREFIX,
        &filename[..CONTENT_HASH_LEN],
        THUMBNAIL_EXTENSION
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_content_hash_known_vector() {
        assert_eq!(content_hash(b""), EMPTY_SHA256);
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_hash_file_matches_in_memory_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(hash_file(&path).await.unwrap(), content_hash(&data));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("sample.png"), ".png");
        assert_eq!(split_extension("/tmp/dir.d/clip.MP4"), ".MP4");
        assert_eq!(split_extension("archive.tar.gz"), ".gz");
        assert_eq!(split_extension(".jpg"), ".jpg");
        assert_eq!(split_extension("README"), "README");
    }

    #[test]
    fn test_storage_filename_edge_cases() {
        assert_eq!(
            storage_filename(EMPTY_SHA256, "photo.jpeg"),
            format!("{}.jpeg", EMPTY_SHA256)
        );
        assert_eq!(
            storage_filename(EMPTY_SHA256, ".jpg"),
            format!("{}.jpg", EMPTY_SHA256)
        );
    }

    #[test]
    fn test_shard_dir_uses_first_four_hex_chars() {
        let filename = format!("{}.png", EMPTY_SHA256);
        assert_eq!(shard_dir(&filename).unwrap(), Path::new("e3").join("b0"));
    }

    #[test]
    fn test_thumbnail_filename_is_always_jpeg() {
        let filename = format!("{}.webm", EMPTY_SHA256);
        assert_eq!(
            thumbnail_filename(&filename).unwrap(),
            format!("sample_{}.jpg", EMPTY_SHA256)
        );
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(validate_storage_filename("short.png").is_err());
        assert!(validate_storage_filename(&EMPTY_SHA256.to_uppercase()).is_err());
        assert!(validate_storage_filename(&format!("{}/../x", EMPTY_SHA256)).is_err());
        assert!(validate_storage_filename(&format!("{}\\x.png", EMPTY_SHA256)).is_err());
        assert!(validate_storage_filename(EMPTY_SHA256).is_ok());
    }

    #[test]
    fn test_dotted_base_name_is_its_own_suffix() {
        assert_eq!(split_extension("..jpg"), "..jpg");
        let filename = storage_filename(EMPTY_SHA256, "..jpg");
        assert_eq!(filename, format!("{}..jpg", EMPTY_SHA256));
        assert!(validate_storage_filename(&filename).is_ok());
        assert_eq!(shard_dir(&filename).unwrap(), Path::new("e3").join("b0"));
    }
}
