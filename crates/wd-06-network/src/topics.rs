//! Network bus topics.

use shared_bus::Topic;
use shared_types::{ChainMetadata, ChainRef};

/// The active chain switched. The provider bridge forwards this to every
/// web session as `chainChanged`.
pub const CHAIN_CHANGED: Topic<ChainRef> = Topic::state("chain:changed", |a, b| a == b);

/// The known-chains list changed.
pub const NETWORKS_CHANGED: Topic<Vec<ChainMetadata>> =
    Topic::state("networks:changed", |a, b| a == b);

/// An endpoint recovered after failures.
pub const RPC_RECOVERED: Topic<ChainRef> = Topic::event("network:rpc-recovered");
