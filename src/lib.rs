// Core election and liveness modules
pub mod bus;
pub mod command;
pub mod config;
pub mod election;
pub mod identity;
pub mod registry;
pub mod wire;

// Public exports
pub use bus::{BusError, BusEvent, MemoryBus, MessageBus};
pub use config::{BrokerConfig, Config};
pub use election::{ElectionConfig, ElectionError, Node, NodeRole};
pub use identity::NodeId;
