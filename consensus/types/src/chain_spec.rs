use crate::ForkVersion;
use serde_derive::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime chain parameters.
///
/// Compile-time presets live on `EthSpec`; everything an operator might tune
/// without recompiling lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub milliseconds_per_slot: u64,
    pub genesis_fork_version: ForkVersion,
    /// Per-call bound on peer RPC requests issued during chain validation.
    pub status_rpc_timeout: Duration,
}

impl ChainSpec {
    pub fn mainnet() -> Self {
        Self {
            milliseconds_per_slot: 12_000,
            genesis_fork_version: [0, 0, 0, 0],
            status_rpc_timeout: Duration::from_secs(10),
        }
    }

    pub fn minimal() -> Self {
        Self {
            milliseconds_per_slot: 6_000,
            genesis_fork_version: [0, 0, 0, 1],
            ..Self::mainnet()
        }
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::from_millis(self.milliseconds_per_slot)
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_by_fork_version() {
        assert_ne!(
            ChainSpec::mainnet().genesis_fork_version,
            ChainSpec::minimal().genesis_fork_version
        );
    }
}
