//! Version Detector.
//!
//! Peeks up to 1024 bytes of the input stream, classifies `(MediaType,
//! Version)`, then hands back a [`PrefixedReader`] that re-prepends the
//! scanned bytes so downstream stages see a logically identical stream
//! without double-reading from the source.

use crate::config::{MediaType, Version};
use crate::error::{EpcisError, EpcisResult};
use std::io::{self, Read};

const PREFIX_CAP: usize = 1024;

/// The captured prefix plus the version it revealed.
pub struct DetectedPrefix {
    buf: [u8; PREFIX_CAP],
    len: usize,
    pub media_type: MediaType,
    pub version: Version,
}

/// Reads up to [`PREFIX_CAP`] bytes from `input`, scans them as UTF-8 text
/// for a `schemaVersion` marker, and classifies the document.
pub fn detect_version(input: &mut impl Read) -> EpcisResult<DetectedPrefix> {
    let mut buf = [0u8; PREFIX_CAP];
    let mut filled = 0;

    // Fill the buffer as much as the stream allows; short reads are normal
    // for network sources, so loop until EOF or the buffer is full.
    while filled < PREFIX_CAP {
        match input.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }

    let text = std::str::from_utf8(&buf[..filled]).unwrap_or("");

    let marker_pos = text
        .find("schemaVersion")
        .ok_or(EpcisError::SchemaVersionMissing)?;

    // XML carries `schemaVersion="..."`, JSON-LD carries `"schemaVersion":"..."`.
    // Try the XML attribute form first, then fall back to the JSON form.
    let (media_type, version_str) = classify_xml(text, marker_pos)
        .or_else(|| classify_json(text, marker_pos))
        .ok_or(EpcisError::SchemaVersionMissing)?;

    let version = Version::parse(&version_str)
        .ok_or_else(|| EpcisError::UnsupportedVersion(version_str.clone()))?;

    log::debug!(
        "version detector classified input as {:?} {}",
        media_type,
        version.as_str()
    );

    Ok(DetectedPrefix {
        buf,
        len: filled,
        media_type,
        version,
    })
}

/// `schemaVersion="1.2"` or `schemaVersion='2.0'` (XML attribute form).
fn classify_xml(text: &str, marker_pos: usize) -> Option<(MediaType, String)> {
    let rest = &text[marker_pos + "schemaVersion".len()..];
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let value_start = 1;
    let end = rest[value_start..].find(quote)?;
    Some((MediaType::Xml, rest[value_start..value_start + end].to_string()))
}

/// `"schemaVersion":"1.2"` (JSON-LD form, whitespace-normalised).
fn classify_json(text: &str, marker_pos: usize) -> Option<(MediaType, String)> {
    let rest = &text[marker_pos + "schemaVersion".len()..];
    // Skip the closing quote of the `"schemaVersion"` key itself, if present.
    let rest = rest.strip_prefix('"').unwrap_or(rest);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(':')?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some((MediaType::JsonLd, rest[..end].to_string()))
}

/// A [`Read`] adapter that yields the detector's buffered prefix first,
/// then delegates to the wrapped reader — the "pre-scan re-prepend"
/// contract.
pub struct PrefixedReader<R: Read> {
    prefix: DetectedPrefix,
    pos: usize,
    inner: R,
}

impl<R: Read> PrefixedReader<R> {
    pub fn new(prefix: DetectedPrefix, inner: R) -> Self {
        Self {
            prefix,
            pos: 0,
            inner,
        }
    }
}

impl<R: Read> Read for PrefixedReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.prefix.len {
            let remaining = &self.prefix.buf[self.pos..self.prefix.len];
            let n = remaining.len().min(out.len());
            out[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        } else {
            self.inner.read(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn detects_xml_2_0_with_double_quotes() {
        let xml = br#"<?xml version="1.0"?><epcis:EPCISDocument schemaVersion="2.0" xmlns:epcis="urn:epcglobal:epcis:xsd:1">"#;
        let mut cursor = Cursor::new(xml.to_vec());
        let detected = detect_version(&mut cursor).unwrap();
        assert_eq!(detected.media_type, MediaType::Xml);
        assert_eq!(detected.version, Version::V2_0);
    }

    #[test]
    fn detects_xml_1_2_with_single_quotes() {
        let xml = b"<epcis:EPCISDocument schemaVersion='1.2'>";
        let mut cursor = Cursor::new(xml.to_vec());
        let detected = detect_version(&mut cursor).unwrap();
        assert_eq!(detected.version, Version::V1_2);
    }

    #[test]
    fn detects_json_ld_2_0() {
        let json = br#"{ "@context": "x", "type": "EPCISDocument", "schemaVersion" : "2.0" }"#;
        let mut cursor = Cursor::new(json.to_vec());
        let detected = detect_version(&mut cursor).unwrap();
        assert_eq!(detected.media_type, MediaType::JsonLd);
        assert_eq!(detected.version, Version::V2_0);
    }

    #[test]
    fn missing_marker_is_an_error() {
        let mut cursor = Cursor::new(b"<epcis:EPCISDocument>".to_vec());
        assert!(matches!(
            detect_version(&mut cursor),
            Err(EpcisError::SchemaVersionMissing)
        ));
    }

    #[test]
    fn empty_stream_is_missing_marker() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(matches!(
            detect_version(&mut cursor),
            Err(EpcisError::SchemaVersionMissing)
        ));
    }

    #[test]
    fn unsupported_version_value_is_rejected() {
        let mut cursor = Cursor::new(br#"schemaVersion="9.9""#.to_vec());
        assert!(matches!(
            detect_version(&mut cursor),
            Err(EpcisError::UnsupportedVersion(v)) if v == "9.9"
        ));
    }

    #[test]
    fn prefixed_reader_reconstitutes_full_stream() {
        let bytes = br#"<epcis:EPCISDocument schemaVersion="2.0">body follows</epcis:EPCISDocument>"#;
        let mut cursor = Cursor::new(bytes.to_vec());
        let detected = detect_version(&mut cursor).unwrap();
        let mut reader = PrefixedReader::new(detected, cursor);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, bytes);
    }
}
