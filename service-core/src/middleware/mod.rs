pub mod security_headers;
pub mod tracing;

pub use self::security_headers::{EmbedFramePolicy, security_headers_middleware};
pub use self::tracing::{REQUEST_ID_HEADER, request_id_middleware};
