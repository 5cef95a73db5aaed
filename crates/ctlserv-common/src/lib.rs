#![deny(clippy::all)]

mod paths;

pub use paths::RENDEZVOUS_PREFIX;
pub use paths::default_lock_path;
pub use paths::default_runtime_dir;
pub use paths::env_or;
pub use paths::rendezvous_path;
