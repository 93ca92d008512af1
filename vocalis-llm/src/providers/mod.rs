pub mod trait_impl;
pub mod openai;

pub use trait_impl::ChatProvider;
pub use openai::OpenAiCompatibleProvider;
