//! Domain layer: wire codec, value objects, configuration.

pub mod codec;
pub mod config;
pub mod errors;
pub mod record;
pub mod value_objects;

pub use codec::{
    build_client_hello, build_malformed_heartbeat_request, classify_closed_response,
    classify_heartbeat_response, contains_server_hello_done, scan_response, HeartbeatRequest,
    ResponseScan, CLIENT_HELLO_BODY, DECLARED_PAYLOAD_LEN, HEARTBEAT_OVERHEAD, SENT_PAYLOAD_LEN,
};
pub use config::ProbeConfig;
pub use errors::{CodecError, ProbeError};
pub use record::{ContentType, Record, RecordHeader, Records};
pub use value_objects::{Classification, ProbeTarget, TlsVersion};
