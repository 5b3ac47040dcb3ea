//! Answering service contract: a message plus profile context in, a reply
//! out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::message::ContextMessage;
use crate::error::TransportError;
use crate::profile::ProfileContext;

/// One outbound chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub message: String,
    pub profile: ProfileContext,
    /// Context view of the transcript preceding `message`.
    pub history: Vec<ContextMessage>,
}

/// Token usage reported by the upstream provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: u32,
    #[serde(default, alias = "completion_tokens")]
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// What the answering service reported.
///
/// `Failure` is an ordinary outcome (missing credentials, upstream rate
/// limit, malformed upstream payload), not a transport problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskResponse {
    Answer {
        message: String,
        usage: Option<TokenUsage>,
    },
    Failure {
        error: String,
        details: Option<String>,
    },
}

/// Wire shape: `{success, message?, usage?, error?, details?}`.
#[derive(Debug, Deserialize)]
struct WireResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    usage: Option<TokenUsage>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl AskResponse {
    /// Decode the backend's JSON body.
    pub fn from_json(body: &str) -> Result<Self, TransportError> {
        let wire: WireResponse = serde_json::from_str(body)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        if wire.success {
            let message = wire.message.ok_or_else(|| {
                TransportError::MalformedResponse("success response without message".to_string())
            })?;
            Ok(Self::Answer {
                message,
                usage: wire.usage,
            })
        } else {
            Ok(Self::Failure {
                error: wire.error.unwrap_or_else(|| "Unknown error".to_string()),
                details: wire.details,
            })
        }
    }
}

/// External collaborator that produces replies.
#[async_trait]
pub trait AnsweringService: Send + Sync {
    async fn ask(&self, request: AskRequest) -> Result<AskResponse, TransportError>;
}
