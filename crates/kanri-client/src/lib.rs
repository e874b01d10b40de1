//! Infrastructure layer: concrete `TaskRepository` implementations and the
//! retry policy that wraps them.

pub mod memory;
pub mod rest;
pub mod retry;

pub use memory::InMemoryTaskRepository;
pub use rest::RestTaskRepository;
pub use retry::RetryPolicy;
