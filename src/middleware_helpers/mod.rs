pub mod http_trace;
pub mod request_id;

pub use http_trace::{configure_http_tracing, RequestSpanMaker};
pub use request_id::{current_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};
