pub use pharos_metrics::*;

lazy_static! {
    /*
     * Block import
     */
    pub static ref BLOCK_IMPORTS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "fork_choice_block_imports_total",
        "Count of blocks successfully imported"
    );
    pub static ref BLOCK_IMPORT_ERRORS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "fork_choice_block_import_errors_total",
        "Count of block imports rejected or failed"
    );
    pub static ref BLOCK_IMPORT_SECONDS: Result<Histogram> = try_create_histogram(
        "fork_choice_block_import_seconds",
        "Full runtime of a block import, including the state transition"
    );

    /*
     * Head selection
     */
    pub static ref HEAD_UPDATES_TOTAL: Result<IntCounter> = try_create_int_counter(
        "fork_choice_head_updates_total",
        "Count of times the canonical head moved to a different block"
    );
    pub static ref REORGS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "fork_choice_reorgs_total",
        "Count of lateral head moves (reorganizations)"
    );
    pub static ref HEAD_SELECTION_SECONDS: Result<Histogram> = try_create_histogram(
        "fork_choice_head_selection_seconds",
        "Runtime of the LMD-GHOST tree walk"
    );
}
