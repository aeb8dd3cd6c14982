use async_openai::error::OpenAIError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Openai error: {0}")]
    OpenaiError(#[from] OpenAIError),

    #[error("Http error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("No response from llm: {0}")]
    LLMResponseError(String),

    #[error("Tool {0} does not exist")]
    ToolDoesNotExist(String),

    #[error("Missing arg: {0}")]
    MissingArg(String),

    #[error("Search request failed with status {status}: {body}")]
    SearchError { status: u16, body: String },

    #[error("Agent stopped after {0} iterations without a final answer")]
    MaxIterations(usize),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid crew: {0}")]
    InvalidCrew(String),
}

/// Coarse failure category, used by callers that want to tell the user what
/// went wrong without matching on every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    Network,
    Model,
    Tool,
    Configuration,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Authentication => "authentication failure",
            ErrorKind::Network => "network failure",
            ErrorKind::Model => "model failure",
            ErrorKind::Tool => "tool failure",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Other => "unexpected error",
        };
        f.write_str(label)
    }
}

fn is_auth_status(status: u16) -> bool {
    status == 401 || status == 403
}

fn looks_like_auth(text: &str) -> bool {
    let text = text.to_lowercase();
    ["authentic", "unauthorized", "api key", "api_key", "credential"]
        .iter()
        .any(|needle| text.contains(needle))
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::OpenaiError(OpenAIError::ApiError(api)) => {
                let r#type = api.r#type.as_deref().unwrap_or_default();
                let code = api.code.as_deref().unwrap_or_default();
                if looks_like_auth(&api.message) || looks_like_auth(r#type) || looks_like_auth(code)
                {
                    ErrorKind::Authentication
                } else {
                    ErrorKind::Model
                }
            }
            Error::OpenaiError(OpenAIError::Reqwest(_)) => ErrorKind::Network,
            Error::OpenaiError(OpenAIError::JSONDeserialize(_)) => ErrorKind::Model,
            Error::OpenaiError(OpenAIError::InvalidArgument(_)) => ErrorKind::Configuration,
            Error::OpenaiError(_) => ErrorKind::Other,
            Error::HttpError(err) => match err.status() {
                Some(status) if is_auth_status(status.as_u16()) => ErrorKind::Authentication,
                _ => ErrorKind::Network,
            },
            Error::SearchError { status, .. } if is_auth_status(*status) => {
                ErrorKind::Authentication
            }
            Error::SearchError { .. } | Error::ToolDoesNotExist(_) => ErrorKind::Tool,
            Error::LLMResponseError(_) | Error::MaxIterations(_) => ErrorKind::Model,
            Error::MissingArg(_) | Error::Unsupported(_) | Error::InvalidCrew(_) => {
                ErrorKind::Configuration
            }
            Error::JsonError(_) => ErrorKind::Other,
        }
    }
}
