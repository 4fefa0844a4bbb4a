//! Message handling - Parsing, dispatching and loading indicators

pub mod dispatcher;
pub mod loading;
pub mod parser;
#[cfg(test)]
pub mod testing;

pub use dispatcher::{Dispatcher, Notices};
pub use loading::LoadingTracker;
pub use parser::CommandParser;
