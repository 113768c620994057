mod builder;
mod core;
mod locks;

pub use builder::OrchestratorBuilder;
pub use self::core::*;
pub use locks::ServerLocks;
