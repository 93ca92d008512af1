pub mod config;
pub mod error;
pub mod providers;


pub use config::*;
pub use error::*;
pub use providers::{ChatProvider, OpenAiCompatibleProvider};
