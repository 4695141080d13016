//! Registry (C3): transactional persistence of episodes, clips, assets,
//! and the processing log, backed by an embedded SQLite database in WAL
//! mode with a retrying single writer.

pub mod connection;
pub mod error;
pub mod registry;
pub mod retry;
mod rows;

pub use connection::{connect, connect_in_memory};
pub use error::{RegistryError, RegistryResult};
pub use registry::Registry;
pub use retry::RetryPolicy;
