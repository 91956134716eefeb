/// External delegate — persistence side effects for routed traffic.
///
/// The relay never stores messages itself; chat frames and reaction updates
/// are mirrored to the account/profile service. Calls are best-effort from
/// the router's perspective: failures are logged and never abort routing.
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum DelegateError {
    #[error("account service request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Delegate: Send + Sync {
    /// Persist one routed chat message.
    async fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        body: &str,
        correlation_id: Option<&str>,
    ) -> Result<(), DelegateError>;

    /// Store the latest reaction count for a message. The protocol carries
    /// absolute counts, not deltas.
    async fn update_reaction_count(
        &self,
        message_id: &str,
        reaction_count: &str,
    ) -> Result<(), DelegateError>;
}

#[derive(Serialize)]
struct NewMessage<'a> {
    sender: &'a str,
    receiver: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_id: Option<&'a str>,
}

#[derive(Serialize)]
struct ReactionUpdate<'a> {
    reaction_nb: &'a str,
}

/// HTTP client against the account service.
pub struct HttpDelegate {
    client: Client,
    base_url: String,
}

impl HttpDelegate {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl Delegate for HttpDelegate {
    async fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        body: &str,
        correlation_id: Option<&str>,
    ) -> Result<(), DelegateError> {
        let url = format!("{}/messages", self.base_url);
        self.client
            .post(url)
            .json(&NewMessage {
                sender,
                receiver,
                message: body,
                response_id: correlation_id,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn update_reaction_count(
        &self,
        message_id: &str,
        reaction_count: &str,
    ) -> Result<(), DelegateError> {
        let url = format!("{}/messages/{message_id}/reactions", self.base_url);
        self.client
            .put(url)
            .json(&ReactionUpdate {
                reaction_nb: reaction_count,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Delegate for standalone relay mode — accepts everything, stores nothing.
pub struct NoopDelegate;

#[async_trait]
impl Delegate for NoopDelegate {
    async fn send_message(
        &self,
        _sender: &str,
        _receiver: &str,
        _body: &str,
        _correlation_id: Option<&str>,
    ) -> Result<(), DelegateError> {
        Ok(())
    }

    async fn update_reaction_count(
        &self,
        _message_id: &str,
        _reaction_count: &str,
    ) -> Result<(), DelegateError> {
        Ok(())
    }
}
