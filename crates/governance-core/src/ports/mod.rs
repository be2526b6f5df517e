//! Outbound ports this core consumes: the persistent agreement store and the
//! blockchain adapter. One trait, one in-memory test double, one production
//! adapter per port, the way `qc-02-block-storage::ports::outbound` pairs
//! `KeyValueStore` with `InMemoryKVStore` and a production adapter.

pub mod blockchain;
pub mod sled_store;
pub mod store;

pub use blockchain::{BlockchainAdapter, JsonRpcBlockchainAdapter, NullBlockchainAdapter};
pub use sled_store::SledAgreementStore;
pub use store::{AgreementStore, InMemoryAgreementStore, ScanFilter};
