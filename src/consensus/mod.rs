pub mod aggregator;
pub mod codec;
pub mod executor;
pub mod message;
pub mod metrics;
pub mod peers;
pub mod processor;
pub mod qc;
pub mod replica;
pub mod safety;
pub mod store;

pub use aggregator::*;
pub use codec::*;
pub use executor::*;
pub use message::*;
pub use metrics::*;
pub use peers::*;
pub use processor::*;
pub use qc::*;
pub use replica::*;
pub use safety::*;
pub use store::*;
