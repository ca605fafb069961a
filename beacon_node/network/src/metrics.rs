pub use pharos_metrics::*;

/// Label values for `PEER_CHAIN_VALIDATION_ATTEMPTS`.
pub const VALIDATION_STARTED: &str = "started";
pub const VALIDATION_VALID: &str = "valid";
pub const VALIDATION_INVALID: &str = "invalid";
pub const VALIDATION_ERROR: &str = "error";

lazy_static! {
    /*
     * Peer chain validation
     */
    pub static ref PEER_CHAIN_VALIDATION_ATTEMPTS: Result<IntCounterVec> = try_create_int_counter_vec(
        "peer_chain_validation_attempts",
        "Count of peer chain validations by outcome",
        &["status"]
    );
    pub static ref PEER_CHAIN_VALIDATION_SECONDS: Result<Histogram> = try_create_histogram(
        "peer_chain_validation_seconds",
        "Full runtime of a peer chain validation, including remote lookups"
    );

    /*
     * Status exchange
     */
    pub static ref STATUS_MESSAGES_RX: Result<IntCounter> = try_create_int_counter(
        "network_status_messages_rx_total",
        "Count of status messages received from peers"
    );
    pub static ref STATUS_MESSAGES_TX: Result<IntCounter> = try_create_int_counter(
        "network_status_messages_tx_total",
        "Count of status messages sent to peers"
    );
}
