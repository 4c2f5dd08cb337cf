//! FileSize / SizeTarget
//!
//! `FileSize` 是测量值（某次试编码的字节数），`SizeTarget` 是搜索的上限：
//! 构造即校验（> 0），之后不可变。两者只通过 `fits` / `overshoot` 比较。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CompressError;

// ============================================================================
// FileSize
// ============================================================================

/// Measured byte count of a source or candidate.
///
/// ```
/// use shared_utils::types::file_size::{FileSize, SizeTarget};
///
/// let target = SizeTarget::from_megabytes(0.5).unwrap();
/// assert!(FileSize::new(524_288).fits(target));
/// assert_eq!(FileSize::new(600_000).overshoot(target), 75_712);
/// assert_eq!(FileSize::new(1536).display(), "1.50 KB");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSize(u64);

impl FileSize {
    pub const KB: u64 = 1024;
    pub const MB: u64 = 1024 * Self::KB;

    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// 等于目标也算满足
    #[inline]
    pub fn fits(&self, target: SizeTarget) -> bool {
        self.0 <= target.bytes()
    }

    /// Bytes above the target, 0 when it fits.
    #[inline]
    pub fn overshoot(&self, target: SizeTarget) -> u64 {
        self.0.saturating_sub(target.bytes())
    }

    /// Relative change against `original` in percent; negative means smaller.
    /// `None` for an empty original.
    pub fn size_change_percent(&self, original: FileSize) -> Option<f64> {
        (original.0 > 0).then(|| (self.0 as f64 / original.0 as f64 - 1.0) * 100.0)
    }

    /// `"812 B"`, `"1.50 KB"`, `"3.20 MB"`.
    pub fn display(&self) -> String {
        match self.0 {
            b if b >= Self::MB => format!("{:.2} MB", b as f64 / Self::MB as f64),
            b if b >= Self::KB => format!("{:.2} KB", b as f64 / Self::KB as f64),
            b => format!("{} B", b),
        }
    }
}

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<u64> for FileSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

// ============================================================================
// SizeTarget
// ============================================================================

/// Upper bound (bytes) a search tries to stay at or under. Always > 0.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SizeTarget(u64);

impl SizeTarget {
    pub fn from_bytes(bytes: u64) -> Result<Self, CompressError> {
        if bytes == 0 {
            return Err(CompressError::InvalidTarget(
                "target size must be greater than 0 bytes".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    /// MB → bytes, floor(mb × 1024 × 1024).
    pub fn from_megabytes(mb: f64) -> Result<Self, CompressError> {
        if !mb.is_finite() || mb <= 0.0 {
            return Err(CompressError::InvalidTarget(format!(
                "target size must be greater than 0 MB (got {})",
                mb
            )));
        }
        let bytes = (mb * FileSize::MB as f64).floor();
        if bytes < 1.0 {
            return Err(CompressError::InvalidTarget(format!(
                "target size {} MB rounds down to 0 bytes",
                mb
            )));
        }
        if bytes >= u64::MAX as f64 {
            return Err(CompressError::InvalidTarget(format!(
                "target size {} MB is out of range",
                mb
            )));
        }
        Ok(Self(bytes as u64))
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_file_size(&self) -> FileSize {
        FileSize(self.0)
    }
}

impl FromStr for SizeTarget {
    type Err = CompressError;

    /// Parses a decimal megabyte value, e.g. `"0.5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CompressError::InvalidTarget(
                "target size is missing".to_string(),
            ));
        }
        let mb: f64 = trimmed.parse().map_err(|_| {
            CompressError::InvalidTarget(format!("target size '{}' is not a number", trimmed))
        })?;
        Self::from_megabytes(mb)
    }
}

impl fmt::Debug for SizeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SizeTarget({} = {})", self.0, self.as_file_size().display())
    }
}

impl fmt::Display for SizeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_file_size().display())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_units() {
        assert_eq!(FileSize::new(812).display(), "812 B");
        assert_eq!(FileSize::new(1536).display(), "1.50 KB");
        assert_eq!(FileSize::new(5 * FileSize::MB).display(), "5.00 MB");
        assert_eq!(format!("{:?}", FileSize::new(42)), "42B");
    }

    #[test]
    fn test_overshoot() {
        let target = SizeTarget::from_bytes(1000).unwrap();
        assert_eq!(FileSize::new(1000).overshoot(target), 0);
        assert_eq!(FileSize::new(999).overshoot(target), 0);
        assert_eq!(FileSize::new(1250).overshoot(target), 250);
    }

    #[test]
    fn test_size_change_percent() {
        let original = FileSize::new(1000);
        assert_eq!(FileSize::new(250).size_change_percent(original), Some(-75.0));
        assert_eq!(FileSize::new(1000).size_change_percent(original), Some(0.0));
        assert!(FileSize::new(10).size_change_percent(FileSize::new(0)).is_none());
    }

    #[test]
    fn test_target_from_megabytes() {
        assert_eq!(SizeTarget::from_megabytes(0.5).unwrap().bytes(), 524_288);
        assert_eq!(SizeTarget::from_megabytes(1.0).unwrap().bytes(), 1_048_576);
    }

    #[test]
    fn test_target_rejects_non_positive() {
        assert!(SizeTarget::from_megabytes(0.0).is_err());
        assert!(SizeTarget::from_megabytes(-1.0).is_err());
        assert!(SizeTarget::from_megabytes(f64::NAN).is_err());
        assert!(SizeTarget::from_megabytes(f64::INFINITY).is_err());
        assert!(SizeTarget::from_bytes(0).is_err());
        // 不足 1 字节
        assert!(SizeTarget::from_megabytes(1e-9).is_err());
    }

    #[test]
    fn test_target_from_str() {
        assert_eq!("2".parse::<SizeTarget>().unwrap().bytes(), 2 * 1024 * 1024);
        assert_eq!(" 0.25 ".parse::<SizeTarget>().unwrap().bytes(), 262_144);
        assert!("".parse::<SizeTarget>().is_err());
        assert!("abc".parse::<SizeTarget>().is_err());
        assert!("-3".parse::<SizeTarget>().is_err());
    }

    #[test]
    fn test_fits_is_inclusive() {
        let target = SizeTarget::from_bytes(1000).unwrap();
        assert!(FileSize::new(1000).fits(target));
        assert!(FileSize::new(999).fits(target));
        assert!(!FileSize::new(1001).fits(target));
    }

    #[test]
    fn test_invalid_target_kind() {
        let err = SizeTarget::from_bytes(0).unwrap_err();
        assert_eq!(err.kind(), "invalid_target");
    }
}
