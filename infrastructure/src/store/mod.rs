//! Plan/Action Store adapters.
//!
//! - [`InMemoryActionStore`]: process-local, for tests and one-shot runs
//! - [`JsonFileActionStore`]: a JSON document on disk, shared by successive
//!   CLI invocations

mod json_file;
mod memory;
mod state;

pub use json_file::JsonFileActionStore;
pub use memory::InMemoryActionStore;
