pub mod pool;
pub mod queries;

pub use pool::{connect_optional, create_pool};
pub use queries::*;
