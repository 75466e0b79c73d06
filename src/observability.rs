use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("parley.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("parley.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("parley.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("parley.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("parley.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("parley.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("parley.stream.duration_seconds");

pub(crate) static SESSION_RESETS: Counter = Counter::new("parley.session.resets");

pub(crate) static CHAT_SENDS: Counter = Counter::new("parley.chat.sends");
pub(crate) static CHAT_SENDS_REJECTED: Counter = Counter::new("parley.chat.sends_rejected");
pub(crate) static CHAT_SEND_FAILURES: Counter = Counter::new("parley.chat.send_failures");
pub(crate) static CHAT_CONNECT_FAILURES: Counter = Counter::new("parley.chat.connect_failures");

pub(crate) static STORE_WRITE_FAILURES: Counter = Counter::new("parley.store.write_failures");
pub(crate) static STORE_READ_FAILURES: Counter = Counter::new("parley.store.read_failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_RESETS);

    collector.register_counter(&CHAT_SENDS);
    collector.register_counter(&CHAT_SENDS_REJECTED);
    collector.register_counter(&CHAT_SEND_FAILURES);
    collector.register_counter(&CHAT_CONNECT_FAILURES);

    collector.register_counter(&STORE_WRITE_FAILURES);
    collector.register_counter(&STORE_READ_FAILURES);
}
