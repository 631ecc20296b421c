//! Best-effort archive-bit marking of the output directory.
//!
//! Some consoles only treat a folder of parts as a single file when the
//! folder carries the FAT "archive" attribute. Setting it is advisory: most
//! platforms offer no way to do it, so every failure is returned as a
//! message and never aborts a split.

use std::path::Path;
#[cfg(windows)]
use std::process::Command;

/// FILE_ATTRIBUTE_ARCHIVE
#[cfg_attr(not(unix), allow(dead_code))]
const ARCHIVE_ATTRIBUTE: u32 = 0x20;

/// Extended attribute exposed by ntfs-3g / FAT drivers, a big-endian u32.
#[cfg(unix)]
const NTFS_ATTRIB_XATTR: &str = "system.ntfs_attrib_be";

/// Marks a directory as needing backup.
///
/// Any `Fn(&Path) -> Result<(), String>` closure is a marker, so tests and
/// callers can inject the step as a single callable.
pub trait ArchiveMarker: Send + Sync {
    fn mark(&self, dir: &Path) -> Result<(), String>;
}

impl<F> ArchiveMarker for F
where
    F: Fn(&Path) -> Result<(), String> + Send + Sync,
{
    fn mark(&self, dir: &Path) -> Result<(), String> {
        self(dir)
    }
}

/// Marker that succeeds without touching the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoArchiveMarker;

impl ArchiveMarker for NoArchiveMarker {
    fn mark(&self, _dir: &Path) -> Result<(), String> {
        Ok(())
    }
}

/// Marker using the platform's attribute tools.
///
/// Windows runs `attrib +a`; on Unix the NTFS/FAT attribute word is read
/// from its extended attribute, the archive flag is OR-ed in and the word is
/// written back.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformArchiveMarker;

impl ArchiveMarker for PlatformArchiveMarker {
    fn mark(&self, dir: &Path) -> Result<(), String> {
        let dir = dir
            .canonicalize()
            .map_err(|e| format!("cannot resolve {}: {}", dir.display(), e))?;
        set_archive_bit(&dir)
    }
}

#[cfg(windows)]
fn set_archive_bit(dir: &Path) -> Result<(), String> {
    let output = Command::new("attrib")
        .arg("+a")
        .arg(dir)
        .output()
        .map_err(|e| format!("failed to run attrib: {}", e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("attrib exited with {}: {}", output.status, stderr.trim()));
    }
    Ok(())
}

#[cfg(unix)]
fn set_archive_bit(dir: &Path) -> Result<(), String> {
    let current = xattr::get(dir, NTFS_ATTRIB_XATTR)
        .map_err(|e| format!("cannot read {} on {}: {}", NTFS_ATTRIB_XATTR, dir.display(), e))?
        .ok_or_else(|| format!("no {} attribute on {}", NTFS_ATTRIB_XATTR, dir.display()))?;
    let attrs = decode_attrib(&current).ok_or_else(|| {
        format!(
            "{} on {} is {} bytes, expected 4",
            NTFS_ATTRIB_XATTR,
            dir.display(),
            current.len()
        )
    })?;
    xattr::set(dir, NTFS_ATTRIB_XATTR, &encode_attrib(attrs | ARCHIVE_ATTRIBUTE))
        .map_err(|e| format!("cannot write {} on {}: {}", NTFS_ATTRIB_XATTR, dir.display(), e))
}

#[cfg(not(any(unix, windows)))]
fn set_archive_bit(_dir: &Path) -> Result<(), String> {
    Err("archive bit is not supported on this platform".to_string())
}

/// Decode the attribute word stored as a big-endian u32.
#[cfg_attr(not(unix), allow(dead_code))]
fn decode_attrib(value: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = value.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

#[cfg_attr(not(unix), allow(dead_code))]
fn encode_attrib(attrs: u32) -> [u8; 4] {
    attrs.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attrib_word_is_big_endian() {
        assert_eq!(decode_attrib(&[0x00, 0x00, 0x00, 0x10]), Some(0x10));
        assert_eq!(decode_attrib(&[0x00, 0x10]), None);
        assert_eq!(decode_attrib(&[]), None);

        let marked = encode_attrib(0x10 | ARCHIVE_ATTRIBUTE);
        assert_eq!(marked, [0x00, 0x00, 0x00, 0x30]);
        assert_eq!(decode_attrib(&marked), Some(0x30));
        assert_eq!(encode_attrib(0x20 | ARCHIVE_ATTRIBUTE), [0x00, 0x00, 0x00, 0x20]);
    }

    #[cfg(unix)]
    #[test]
    fn test_platform_marker_reports_missing_attribute_not_missing_tool() {
        // A plain temp directory carries no NTFS attribute word
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let err = PlatformArchiveMarker
            .mark(temp_dir.path())
            .expect_err("temp dirs have no ntfs attribute");
        assert!(err.contains(NTFS_ATTRIB_XATTR), "unexpected message: {}", err);
        assert!(!err.contains("failed to run"));
    }

    #[test]
    fn test_closure_is_a_marker() {
        let marker = |dir: &Path| -> Result<(), String> { Err(format!("refused {}", dir.display())) };
        assert_eq!(marker.mark(Path::new("out")), Err("refused out".to_string()));
        assert_eq!(NoArchiveMarker.mark(Path::new("out")), Ok(()));
    }

    #[test]
    fn test_platform_marker_reports_missing_dir() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("missing");
        let result = PlatformArchiveMarker.mark(&missing);
        assert!(result.is_err());
    }
}
