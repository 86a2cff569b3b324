pub mod error;
pub mod request;
pub mod result;
pub mod transport;

pub use error::ScanError;
pub use request::OutboundRequest;
pub use result::FetchResult;
pub use transport::{HttpTransport, Transport};
