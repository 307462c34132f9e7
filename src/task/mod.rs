pub mod types;
pub mod models;
pub mod manager;
pub mod writer;

pub use types::*;
pub use models::*;
pub use manager::{WriterHandle, WriterSupervisor};
pub use writer::{display_name, ResultWriter};
