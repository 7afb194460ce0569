pub mod events;
pub mod memory;

pub use events::{EventStore, PgEventRepository};
pub use memory::MemoryEventStore;

#[cfg(test)]
pub use events::MockEventStore;
