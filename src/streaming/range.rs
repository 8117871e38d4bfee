//! Strict HTTP Range header parsing.
//!
//! Only the single-range form `bytes=<start>-<end>` (with `<end>`
//! optional) is accepted. Anything else -- suffix ranges, multi-range
//! requests, non-numeric bounds, or bounds that do not fit the entity --
//! is a terminal 416, never silently clamped.

use reelgate_common::{Error, Result};

/// A validated byte interval within an entity of known size.
///
/// Invariant: `0 <= start <= end < total_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset, inclusive.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
    /// Size of the full entity the range was validated against.
    pub total_size: u64,
}

impl ByteRange {
    /// Parse a `Range` header value against a known entity size.
    ///
    /// # Errors
    ///
    /// [`Error::RangeNotSatisfiable`] for every malformed or unsatisfiable
    /// form; the caller responds 416.
    pub fn parse(value: &str, total_size: u64) -> Result<ByteRange> {
        let spec = value
            .strip_prefix("bytes=")
            .ok_or_else(|| Error::range(format!("unsupported range unit: {value}")))?;

        if spec.contains(',') {
            return Err(Error::range("multi-range requests are not supported"));
        }

        let (start_str, end_str) = spec
            .split_once('-')
            .ok_or_else(|| Error::range(format!("malformed range: {value}")))?;

        let start_str = start_str.trim();
        let end_str = end_str.trim();

        if start_str.is_empty() {
            // Suffix form (bytes=-N): outside the supported grammar.
            return Err(Error::range("suffix ranges are not supported"));
        }

        let start: u64 = start_str
            .parse()
            .map_err(|_| Error::range(format!("non-numeric range start: {start_str}")))?;

        let end: u64 = if end_str.is_empty() {
            total_size
                .checked_sub(1)
                .ok_or_else(|| Error::range("empty entity has no satisfiable range"))?
        } else {
            end_str
                .parse()
                .map_err(|_| Error::range(format!("non-numeric range end: {end_str}")))?
        };

        if start > end {
            return Err(Error::range(format!(
                "range start {start} exceeds end {end}"
            )));
        }

        if end >= total_size {
            return Err(Error::range(format!(
                "range end {end} exceeds entity size {total_size}"
            )));
        }

        Ok(ByteRange {
            start,
            end,
            total_size,
        })
    }

    /// Number of bytes the range covers.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// The `Content-Range` header value for a 206 response.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}
