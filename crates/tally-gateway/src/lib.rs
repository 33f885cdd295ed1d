//! HTTP ingest surface for execution check-ins.
//!
//! A catch-all route extracts three custom headers, records the event in the
//! store, acknowledges immediately and schedules the Discord mirror without
//! awaiting it.

pub mod ingest_request;
pub mod server;

pub use ingest_request::{
    parse_info_fields, IngestRequest, ValidationError, HARDWARE_ID_HEADER, INFO_HEADER,
    SESSION_ID_HEADER,
};
pub use server::{build_ingest_router, run_ingest_server, GatewayState};
