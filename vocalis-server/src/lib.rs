pub mod error;
pub mod settings;
pub mod relay;
pub mod http;

pub use error::RelayError;
pub use http::create_router;
pub use relay::{ChatRequest, Relay, RelayResponse};
pub use settings::{Overrides, Settings};
