pub const EVENTS_DECODED: &str = "event_normalizer_events_decoded";
pub const EVENT_DECODE_FAILED: &str = "event_normalizer_event_decode_failed";
pub const PROCESSING_ERRORS: &str = "event_normalizer_processing_errors";
pub const RECORDS_DROPPED: &str = "event_normalizer_records_dropped";
pub const KNOWN_ERRORS_SKIPPED: &str = "event_normalizer_known_errors_skipped";
pub const GZIP_PAYLOADS: &str = "event_normalizer_gzip_payloads";
pub const BATCH_SIZE: &str = "event_normalizer_batch_size";
