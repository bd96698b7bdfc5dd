use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("pungde.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("pungde.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("pungde.client.request_duration_seconds");
pub(crate) static SESSIONS_CREATED: Counter = Counter::new("pungde.client.sessions_created");

pub(crate) static STREAM_BYTES: Counter = Counter::new("pungde.stream.bytes");
pub(crate) static STREAM_LINES: Counter = Counter::new("pungde.stream.lines");
pub(crate) static STREAM_TEXT_UNITS: Counter = Counter::new("pungde.stream.text_units");
pub(crate) static STREAM_MALFORMED: Counter = Counter::new("pungde.stream.malformed_lines");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("pungde.stream.errors");
pub(crate) static STREAM_CANCELLED: Counter = Counter::new("pungde.stream.cancelled");
pub(crate) static STREAM_TTFB: Moments = Moments::new("pungde.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("pungde.stream.duration_seconds");

pub(crate) static EXPORT_DOCUMENTS: Counter = Counter::new("pungde.export.documents");
pub(crate) static EXPORT_ASSET_FETCHES: Counter = Counter::new("pungde.export.asset_fetches");
pub(crate) static EXPORT_ASSET_ERRORS: Counter = Counter::new("pungde.export.asset_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&SESSIONS_CREATED);

    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_LINES);
    collector.register_counter(&STREAM_TEXT_UNITS);
    collector.register_counter(&STREAM_MALFORMED);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_CANCELLED);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&EXPORT_DOCUMENTS);
    collector.register_counter(&EXPORT_ASSET_FETCHES);
    collector.register_counter(&EXPORT_ASSET_ERRORS);
}
