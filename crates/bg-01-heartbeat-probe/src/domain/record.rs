//! TLS record-layer framing.
//!
//! Every message the probe sends or inspects is wrapped in a record:
//!
//! ```text
//! +--------------+---------+---------+----------------+------------------+
//! | content type | major   | minor   | length (u16be) | body (length B)  |
//! +--------------+---------+---------+----------------+------------------+
//! ```

use super::errors::CodecError;

/// Size of the record header in bytes.
pub const RECORD_HEADER_LEN: usize = 5;

/// Largest body a TLS record may carry (2^14 plaintext + 2048 expansion).
pub const MAX_RECORD_BODY_LEN: usize = 16_384 + 2_048;

/// Record content types the probe cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 0x14,
    Alert = 0x15,
    Handshake = 0x16,
    ApplicationData = 0x17,
    Heartbeat = 0x18,
}

impl TryFrom<u8> for ContentType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x14 => Ok(Self::ChangeCipherSpec),
            0x15 => Ok(Self::Alert),
            0x16 => Ok(Self::Handshake),
            0x17 => Ok(Self::ApplicationData),
            0x18 => Ok(Self::Heartbeat),
            other => Err(CodecError::UnknownContentType(other)),
        }
    }
}

/// Parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: ContentType,
    pub version: [u8; 2],
    /// Declared body length.
    pub length: u16,
}

impl RecordHeader {
    /// Parse a header from the front of `bytes`.
    ///
    /// Returns `Ok(None)` when fewer than [`RECORD_HEADER_LEN`] bytes are
    /// available yet.
    pub fn parse(bytes: &[u8]) -> Result<Option<Self>, CodecError> {
        if bytes.len() < RECORD_HEADER_LEN {
            return Ok(None);
        }

        let content_type = ContentType::try_from(bytes[0])?;

        // SSLv3 and every TLS version up to 1.2 use major 3 on the wire
        if bytes[1] != 0x03 {
            return Err(CodecError::BadRecordVersion {
                major: bytes[1],
                minor: bytes[2],
            });
        }

        let length = u16::from_be_bytes([bytes[3], bytes[4]]);
        if usize::from(length) > MAX_RECORD_BODY_LEN {
            return Err(CodecError::RecordTooLarge {
                length: length.into(),
                max: MAX_RECORD_BODY_LEN,
            });
        }

        Ok(Some(Self {
            content_type,
            version: [bytes[1], bytes[2]],
            length,
        }))
    }

    /// Encode the header.
    pub fn encode(&self) -> [u8; RECORD_HEADER_LEN] {
        let [hi, lo] = self.length.to_be_bytes();
        [
            self.content_type as u8,
            self.version[0],
            self.version[1],
            hi,
            lo,
        ]
    }
}

/// One record located inside a receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub header: RecordHeader,
    /// Body bytes received so far; shorter than `header.length` when the
    /// record is still arriving.
    pub body: &'a [u8],
}

impl Record<'_> {
    /// Whether every declared body byte has been received.
    pub fn is_complete(&self) -> bool {
        self.body.len() == usize::from(self.header.length)
    }
}

/// Iterator over the records in a receive buffer.
///
/// Stops after the first incomplete record; yields a single error and then
/// stops if a header fails to parse.
pub struct Records<'a> {
    remaining: &'a [u8],
    done: bool,
}

impl<'a> Records<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            remaining: buf,
            done: false,
        }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let header = match RecordHeader::parse(self.remaining) {
            Ok(Some(header)) => header,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let available = self.remaining.len() - RECORD_HEADER_LEN;
        let body_len = usize::from(header.length).min(available);
        let body = &self.remaining[RECORD_HEADER_LEN..RECORD_HEADER_LEN + body_len];

        if body_len < usize::from(header.length) {
            self.done = true;
        } else {
            self.remaining = &self.remaining[RECORD_HEADER_LEN + body_len..];
        }

        Some(Ok(Record { header, body }))
    }
}
