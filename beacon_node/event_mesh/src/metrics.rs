pub use pharos_metrics::*;

lazy_static! {
    pub static ref EVENTS_PUBLISHED_TOTAL: Result<IntCounterVec> = try_create_int_counter_vec(
        "event_mesh_events_published_total",
        "Count of events published to the bus, by kind",
        &["kind"]
    );
    pub static ref EVENTS_DROPPED_TOTAL: Result<IntCounterVec> = try_create_int_counter_vec(
        "event_mesh_events_dropped_total",
        "Count of events dropped by full actor inboxes, by kind",
        &["kind"]
    );
}
