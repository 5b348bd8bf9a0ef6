pub mod analyze;
pub mod collect;
pub mod demo;
pub mod history;
pub mod serve;

// Re-export command functions for convenience
pub use analyze::{analyze, run};
pub use collect::collect;
pub use demo::demo;
pub use history::{cleanup, history, status};
pub use serve::serve;
