pub use pharos_metrics::*;

lazy_static! {
    /*
     * Transactions
     */
    pub static ref TRANSACTION_COMMITS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "store_transaction_commits_total",
        "Count of committed store transactions"
    );
    pub static ref TRANSACTION_COMMIT_SECONDS: Result<Histogram> = try_create_histogram(
        "store_transaction_commit_seconds",
        "Time spent inside the store write section applying a commit"
    );

    /*
     * Hot tree
     */
    pub static ref HOT_BLOCKS_TOTAL: Result<IntGauge> = try_create_int_gauge(
        "store_hot_blocks_total",
        "Count of blocks participating in fork choice"
    );
    pub static ref PRUNED_BLOCKS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "store_pruned_blocks_total",
        "Count of hot blocks dropped by finalization pruning"
    );
}
