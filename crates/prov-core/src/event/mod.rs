pub mod store;
pub mod types;

pub use store::{InMemoryInstanceStore, InstanceStore};
pub use types::{InstanceEvent, InstanceEventKind};
