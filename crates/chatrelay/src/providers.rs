pub mod anthropic;
pub mod base;
pub mod block;
pub mod configs;
pub mod delta;
pub mod factory;
pub mod mock;
pub mod openai;
pub mod sse;
pub mod utils;
