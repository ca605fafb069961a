use crate::{ChainSpec, Epoch};
use serde_derive::{Deserialize, Serialize};
use std::fmt::Debug;
use typenum::{Unsigned, U32, U64, U8, U8192};

pub trait EthSpec: 'static + Default + Sync + Send + Clone + Debug + PartialEq + Eq {
    /// Note: `SlotsPerEpoch` is not necessarily required to be a compile-time
    /// constant. We include it here just for the convenience of not passing
    /// `slots_per_epoch` around all the time.
    type SlotsPerEpoch: Unsigned + Clone + Sync + Send + Debug + PartialEq;
    type SlotsPerHistoricalRoot: Unsigned + Clone + Sync + Send + Debug + PartialEq;

    fn default_spec() -> ChainSpec;

    fn genesis_epoch() -> Epoch {
        Epoch::new(0)
    }

    /// Returns the `SLOTS_PER_EPOCH` constant for this specification.
    fn slots_per_epoch() -> u64 {
        Self::SlotsPerEpoch::to_u64()
    }

    /// Returns the `SLOTS_PER_HISTORICAL_ROOT` constant for this
    /// specification.
    fn slots_per_historical_root() -> usize {
        Self::SlotsPerHistoricalRoot::to_usize()
    }
}

/// Ethereum Foundation mainnet specification.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct MainnetEthSpec;

impl EthSpec for MainnetEthSpec {
    type SlotsPerEpoch = U32;
    type SlotsPerHistoricalRoot = U8192;

    fn default_spec() -> ChainSpec {
        ChainSpec::mainnet()
    }
}

/// Ethereum Foundation minimal specification, used in testing.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct MinimalEthSpec;

impl EthSpec for MinimalEthSpec {
    type SlotsPerEpoch = U8;
    type SlotsPerHistoricalRoot = U64;

    fn default_spec() -> ChainSpec {
        ChainSpec::minimal()
    }
}
