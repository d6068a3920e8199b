pub mod config;
pub mod error;
pub mod metric_consts;
pub mod normalize;
pub mod protocol;

pub use error::{DecodeError, ErrorKind, EventProcessingError};
pub use normalize::{EventNormalizer, NormalizeConfig, NormalizedEvent};
pub use protocol::Event;

/// Decodes one raw payload (JSON, optionally gzipped) with the default limits.
pub fn decode_event(bytes: &[u8]) -> Result<NormalizedEvent, DecodeError> {
    EventNormalizer::default().decode(bytes)
}
