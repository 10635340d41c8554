//! ByteRange handling for the document writer and reader.
//!
//! A PDF signature covers every byte of the file except the hex-encoded
//! `/Contents` value. The ByteRange array `[offset1, length1, offset2, length2]`
//! names the two covered spans:
//!
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset of the `<` opening the `/Contents` value
//! - `offset2` = byte offset just past the closing `>`
//! - `length2` = remaining bytes to end of file
//!
//! The `/Contents` value holds exactly the bytes frozen by
//! [`SignatureHandler::init_signature`](super::SignatureHandler::init_signature),
//! hex-encoded, so the placeholder is `reserved * 2 + 2` characters long.

use std::io::Write;

use super::digest::DigestAccumulator;
use crate::error::{Error, Result};

/// Calculator for PDF signature byte ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRangeCalculator {
    /// Size of the placeholder for the signature value (hex digits + 2 for angle brackets)
    placeholder_size: usize,
}

impl ByteRangeCalculator {
    /// Create a calculator for a `/Contents` value of `reserved` raw bytes.
    pub fn for_contents(reserved: usize) -> Self {
        Self {
            placeholder_size: reserved * 2 + 2,
        }
    }

    /// Get the placeholder size in characters (including the angle brackets).
    pub fn placeholder_size(&self) -> usize {
        self.placeholder_size
    }

    /// Number of raw `/Contents` bytes the placeholder holds.
    pub fn reserved(&self) -> usize {
        (self.placeholder_size - 2) / 2
    }

    /// Generate a `<000...0>` placeholder for the `/Contents` value.
    pub fn generate_placeholder(&self) -> String {
        format!("<{}>", "0".repeat(self.placeholder_size - 2))
    }

    /// Calculate the ByteRange array given the offset of the `<` opening `/Contents`.
    pub fn calculate_byte_range(&self, file_size: usize, contents_offset: usize) -> [i64; 4] {
        let before_sig = contents_offset as i64;
        let after_sig_start = (contents_offset + self.placeholder_size) as i64;
        let after_sig_len = file_size as i64 - after_sig_start;

        [0, before_sig, after_sig_start, after_sig_len]
    }

    /// Format a ByteRange array as a PDF array string.
    pub fn format_byte_range(byte_range: &[i64; 4]) -> String {
        format!("[{} {} {} {}]", byte_range[0], byte_range[1], byte_range[2], byte_range[3])
    }

    /// Check that a ByteRange covers the whole file except one gap.
    pub fn validate_byte_range(byte_range: &[i64; 4], file_size: usize) -> Result<()> {
        let [offset1, length1, offset2, length2] = *byte_range;

        if byte_range.iter().any(|v| *v < 0) {
            return Err(Error::InvalidByteRange(format!(
                "negative value in {}",
                Self::format_byte_range(byte_range)
            )));
        }
        if offset1 != 0 {
            return Err(Error::InvalidByteRange(format!("must start at 0, got {}", offset1)));
        }
        let end = offset2.checked_add(length2).ok_or_else(|| {
            Error::InvalidByteRange(format!(
                "end of {} overflows",
                Self::format_byte_range(byte_range)
            ))
        })?;
        if i64::try_from(file_size).ok() != Some(end) {
            return Err(Error::InvalidByteRange(format!(
                "must end at file size {}, got {}",
                file_size, end
            )));
        }
        if length1 > offset2 {
            return Err(Error::InvalidByteRange(format!(
                "first range ({}) overlaps second range start ({})",
                length1, offset2
            )));
        }
        Ok(())
    }

    /// Feed the bytes covered by `byte_range` into a digest accumulator.
    pub fn feed_signed_bytes(
        pdf_data: &[u8],
        byte_range: &[i64; 4],
        digest: &mut DigestAccumulator,
    ) -> Result<()> {
        Self::validate_byte_range(byte_range, pdf_data.len())?;
        let [_, length1, offset2, _] = byte_range.map(|v| v as usize);

        digest.write_all(&pdf_data[..length1])?;
        digest.write_all(&pdf_data[offset2..])?;
        Ok(())
    }

    /// Decode the hex `/Contents` value sitting in the gap of `byte_range`.
    pub fn extract_contents(pdf_data: &[u8], byte_range: &[i64; 4]) -> Result<Vec<u8>> {
        Self::validate_byte_range(byte_range, pdf_data.len())?;
        let [_, length1, offset2, _] = byte_range.map(|v| v as usize);

        let gap = &pdf_data[length1..offset2];
        let hex_value = gap
            .strip_prefix(b"<")
            .and_then(|g| g.strip_suffix(b">"))
            .ok_or_else(|| {
                Error::InvalidByteRange("gap is not a hex string <...>".to_string())
            })?;
        hex::decode(hex_value)
            .map_err(|e| Error::InvalidByteRange(format!("Contents is not valid hex: {}", e)))
    }

    /// Find the offset of the `<` that opens the `/Contents` value.
    ///
    /// Searches at most 4 KiB past `sig_dict_offset`.
    pub fn find_contents_offset(pdf_data: &[u8], sig_dict_offset: usize) -> Option<usize> {
        let search_end = sig_dict_offset.saturating_add(4096).min(pdf_data.len());
        let window = pdf_data.get(sig_dict_offset..search_end)?;
        let pattern = b"/Contents";

        window
            .windows(pattern.len())
            .enumerate()
            .filter(|(_, w)| *w == pattern)
            .find_map(|(pos, _)| {
                window[pos + pattern.len()..]
                    .iter()
                    .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
                    .map(|skip| pos + pattern.len() + skip)
                    .filter(|&i| window[i] == b'<')
                    .map(|i| sig_dict_offset + i)
            })
    }

    /// Write the finalised `/Contents` bytes over the placeholder.
    ///
    /// `contents` must have exactly the reserved length; it is already
    /// zero-padded by the signer.
    pub fn insert_contents(
        &self,
        pdf_data: &mut [u8],
        contents_offset: usize,
        contents: &[u8],
    ) -> Result<()> {
        if contents.len() != self.reserved() {
            return Err(Error::ContentsSizeChanged {
                expected: self.reserved(),
                found: contents.len(),
            });
        }
        if contents_offset + self.placeholder_size > pdf_data.len() {
            return Err(Error::InvalidByteRange(
                "Contents insertion would exceed file bounds".to_string(),
            ));
        }

        let value = format!("<{}>", hex::encode_upper(contents));
        pdf_data[contents_offset..contents_offset + self.placeholder_size]
            .copy_from_slice(value.as_bytes());
        Ok(())
    }
}
