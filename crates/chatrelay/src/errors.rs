use std::time::Duration;

use thiserror::Error;

use crate::providers::base::ProviderId;

/// Failure to turn raw model text into a tool's parameter object.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("empty parameters")]
    Empty,

    #[error("invalid JSON parameters: {0}")]
    Syntax(String),

    #[error("invalid parameters for {}: {message}", fields.join(", "))]
    Schema {
        fields: Vec<String>,
        message: String,
    },
}

/// Errors raised while resolving or running a single tool call.
///
/// These never reach the client as error frames. The processor renders
/// them inline in place of the tool marker.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool \"{0}\" not found")]
    NotFound(String),

    #[error(transparent)]
    InvalidParameters(#[from] ParameterError),

    #[error("{0}")]
    Execution(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("Tool execution incomplete")]
    Incomplete,

    #[error("Unable to process tool response")]
    Unrenderable,
}

pub type ToolResult<T> = Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Invalid parameter schema for {name}: {message}")]
    InvalidSchema { name: String, message: String },
}

/// Errors from the upstream model provider, surfaced as error frames.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Malformed provider response: {0}")]
    Decode(String),

    #[error("Provider reported an error: {0}")]
    Protocol(String),

    #[error("Provider stream stalled for {0:?}")]
    Timeout(Duration),

    #[error("Provider {0} is configured with a client for another wire format")]
    WrongFamily(ProviderId),
}

/// Errors that end a chat request. Each one becomes a single error frame.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Unknown model: {0}")]
    InvalidModel(String),

    #[error("Provider {0} is not configured")]
    ProviderUnavailable(ProviderId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] tera::Error),

    #[error("Client disconnected")]
    ClientDisconnected,
}

pub type ChatResult<T> = Result<T, ChatError>;
