// ABOUTME: Persistence contracts for distributed execution
// ABOUTME: Distributed lock, task persister trait, and the in-memory reference backend

pub mod error;
pub mod lock;
pub mod memory;
pub mod persister;

pub use error::{PersistError, Result};
pub use lock::{DistributedLock, LeaseTable};
pub use memory::MemoryPersister;
pub use persister::TaskPersister;
