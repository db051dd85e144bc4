pub mod error;

pub use error::{check_event_stream, ErrorSource, ProviderError};
