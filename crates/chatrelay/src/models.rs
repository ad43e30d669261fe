//! These models represent the objects passed around by the relay
//!
//! There are several different related formats we need to interact with:
//! - chat requests and messages, sent from the browser to the relay
//! - event frames, streamed from the relay back to the browser
//! - openai-compatible messages/tools and their streamed deltas
//! - anthropic messages/tools and their block events
//!
//! Provider wire formats live next to their clients in `providers`. The types
//! here are the internal shapes every layer converts to and from.
pub mod event;
pub mod message;
pub mod model;
pub mod tool;
