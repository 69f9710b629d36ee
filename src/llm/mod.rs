pub mod analysis;
pub mod assistant;
pub mod client;
pub mod extractor;
pub mod openai;
pub mod prompts;
pub mod provider;
pub mod types;
pub mod utils;

pub use analysis::*;
pub use assistant::*;
pub use client::*;
pub use extractor::*;
pub use openai::*;
pub use provider::*;
pub use types::*;
