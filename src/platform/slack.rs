use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::blame::message::{plain_section, BlameMessage, Block};
use crate::bot::{TriggerHandler, TriggerOutcome};
use crate::config::SlackConfig;
use crate::platform::{ChatClient, IncomingMessage, OutgoingMessage, PostedMessage, UserInfo};

const RECONNECT_DELAY_SECS: u64 = 5;
const MAX_RECONNECT_DELAY_SECS: u64 = 30;
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Page size for `conversations.members`
const MEMBERS_PAGE_LIMIT: &str = "200";

/// Slack Web API client
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    app_token: String,
}

/// Message body shared by `chat.postMessage` and `chat.update`
#[derive(Debug, Serialize, PartialEq)]
struct MessagePayload<'a> {
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<Vec<Block>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mrkdwn: Option<bool>,
}

impl<'a> MessagePayload<'a> {
    fn new(channel: &'a str, content: &'a BlameMessage) -> Self {
        let (blocks, mrkdwn) = match content {
            BlameMessage::Plain(text) => (Some(vec![plain_section(text)]), None),
            BlameMessage::Markdown(_) => (None, Some(true)),
            BlameMessage::Layout { blocks, .. } => (Some(blocks.clone()), None),
        };
        Self {
            channel,
            ts: None,
            thread_ts: None,
            text: content.text(),
            blocks,
            mrkdwn,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: UserInfo,
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    url: String,
}

/// Fail on `"ok": false`, otherwise decode the body.
fn parse_api_response<T: DeserializeOwned>(method: &str, body: Value) -> Result<T> {
    if body["ok"].as_bool() != Some(true) {
        let err = body["error"].as_str().unwrap_or("unknown");
        bail!("Slack {} failed: {}", method, err);
    }
    serde_json::from_value(body).with_context(|| format!("Failed to parse {} response", method))
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            app_token: config.app_token.clone(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// Form-encoded read method
    async fn call_form<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let body: Value = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.bot_token)
            .form(params)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?
            .json()
            .await
            .with_context(|| format!("Failed to read {} response", method))?;
        parse_api_response(method, body)
    }

    async fn send_json(&self, method: &str, payload: &MessagePayload<'_>) -> Result<Value> {
        self.http
            .post(self.url(method))
            .bearer_auth(&self.bot_token)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?
            .json()
            .await
            .with_context(|| format!("Failed to read {} response", method))
    }

    /// Call `apps.connections.open` to get a Socket Mode websocket URL.
    async fn open_socket_url(&self) -> Result<String> {
        let body: Value = self
            .http
            .post(self.url("apps.connections.open"))
            .bearer_auth(&self.app_token)
            .send()
            .await
            .context("Failed to send apps.connections.open request")?
            .json()
            .await
            .context("Failed to read apps.connections.open response")?;
        let opened: ConnectionsOpenResponse = parse_api_response("apps.connections.open", body)?;
        Ok(opened.url)
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn list_members(&self, channel: &str) -> Result<Vec<String>> {
        let mut members = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut params = vec![("channel", channel), ("limit", MEMBERS_PAGE_LIMIT)];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.as_str()));
            }
            let page: MembersResponse = self.call_form("conversations.members", &params).await?;
            members.extend(page.members);

            cursor = page
                .response_metadata
                .map(|meta| meta.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                return Ok(members);
            }
        }
    }

    async fn user_info(&self, user: &str) -> Result<UserInfo> {
        let response: UserInfoResponse = self.call_form("users.info", &[("user", user)]).await?;
        Ok(response.user)
    }

    async fn post_message(&self, message: &OutgoingMessage) -> Result<PostedMessage> {
        let mut payload = MessagePayload::new(&message.channel, &message.content);
        payload.thread_ts = message.thread_ts.as_deref();

        let body = self.send_json("chat.postMessage", &payload).await?;
        serde_json::from_value(body).context("Failed to parse chat.postMessage response")
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        content: &BlameMessage,
    ) -> Result<()> {
        let mut payload = MessagePayload::new(channel, content);
        payload.ts = Some(ts);

        let body = self.send_json("chat.update", &payload).await?;
        parse_api_response::<Value>("chat.update", body).map(|_| ())
    }
}

/// Socket Mode envelope received over the websocket.
#[derive(Debug, Deserialize)]
struct SocketEnvelope {
    envelope_id: String,
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Serialize)]
struct SocketAck<'a> {
    envelope_id: &'a str,
}

/// What a single websocket text frame asks of the loop.
#[derive(Debug)]
enum SocketFrame {
    Hello,
    Disconnect(String),
    Envelope(SocketEnvelope),
    Unknown,
}

fn parse_socket_frame(text: &str) -> SocketFrame {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return SocketFrame::Unknown;
    };
    match value["type"].as_str() {
        Some("hello") => SocketFrame::Hello,
        Some("disconnect") => {
            SocketFrame::Disconnect(value["reason"].as_str().unwrap_or("unknown").to_string())
        }
        _ => match serde_json::from_value(value) {
            Ok(envelope) => SocketFrame::Envelope(envelope),
            Err(e) => {
                debug!(error = %e, "failed to parse Socket Mode envelope");
                SocketFrame::Unknown
            }
        },
    }
}

/// Pull a `message` event out of an `events_api` envelope.
fn message_event(envelope: &SocketEnvelope) -> Option<IncomingMessage> {
    if envelope.envelope_type != "events_api" {
        return None;
    }
    let event = &envelope.payload["event"];
    if event["type"].as_str() != Some("message") {
        return None;
    }
    match serde_json::from_value(event.clone()) {
        Ok(msg) => Some(msg),
        Err(e) => {
            debug!(error = %e, "ignoring undecodable message event");
            None
        }
    }
}

fn reconnect_delay(attempts: u32) -> Duration {
    Duration::from_secs((RECONNECT_DELAY_SECS * attempts as u64).min(MAX_RECONNECT_DELAY_SECS))
}

/// Run the handler for one message on its own task so a failure only
/// affects that message.
fn dispatch(handler: &Arc<TriggerHandler>, msg: IncomingMessage) {
    let handler = Arc::clone(handler);
    tokio::spawn(async move {
        match handler.handle_message(&msg).await {
            Ok(TriggerOutcome::NotTriggered) => {}
            Ok(outcome) => debug!(ts = %msg.id, ?outcome, "trigger handled"),
            Err(e) => error!(ts = %msg.id, "Error handling message: {:#}", e),
        }
    });
}

/// How a Socket Mode session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Slack sent a `disconnect` frame and expects a fresh connection
    Refresh,
    /// The socket closed or errored
    Dropped,
}

/// Pump frames from one websocket session until it ends, acknowledging
/// envelopes and dispatching message events.
async fn read_session<R, W>(
    mut read: R,
    mut write: W,
    handler: &Arc<TriggerHandler>,
) -> Result<SessionEnd>
where
    R: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
    W: Sink<WsMessage> + Unpin,
    W::Error: std::fmt::Display,
{
    while let Some(frame) = read.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Ping(data)) => {
                if let Err(e) = write.send(WsMessage::Pong(data)).await {
                    warn!("Failed to answer ping: {}", e);
                }
                continue;
            }
            Ok(WsMessage::Close(_)) => {
                info!("Slack closed the websocket");
                return Ok(SessionEnd::Dropped);
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("Slack websocket error: {}", e);
                return Ok(SessionEnd::Dropped);
            }
        };

        match parse_socket_frame(text.as_str()) {
            SocketFrame::Hello => info!("Socket Mode hello received"),
            SocketFrame::Disconnect(reason) => {
                info!(reason = %reason, "Slack requested disconnect");
                return Ok(SessionEnd::Refresh);
            }
            SocketFrame::Envelope(envelope) => {
                let ack = serde_json::to_string(&SocketAck {
                    envelope_id: &envelope.envelope_id,
                })?;
                if let Err(e) = write.send(WsMessage::Text(ack.into())).await {
                    warn!("Failed to acknowledge envelope: {}", e);
                }
                if let Some(msg) = message_event(&envelope) {
                    dispatch(handler, msg);
                }
            }
            SocketFrame::Unknown => {}
        }
    }
    Ok(SessionEnd::Dropped)
}

/// Connect over Socket Mode and feed message events to `handler`,
/// reconnecting when the connection drops.
pub async fn run(client: Arc<SlackClient>, handler: Arc<TriggerHandler>) -> Result<()> {
    let mut attempts: u32 = 0;

    loop {
        if attempts >= MAX_RECONNECT_ATTEMPTS {
            bail!(
                "Exceeded max Socket Mode reconnect attempts ({})",
                MAX_RECONNECT_ATTEMPTS
            );
        }
        if attempts > 0 {
            let delay = reconnect_delay(attempts);
            info!(attempt = attempts, delay_secs = delay.as_secs(), "Reconnecting to Slack...");
            tokio::time::sleep(delay).await;
        }

        let url = match client.open_socket_url().await {
            Ok(url) => url,
            Err(e) => {
                error!("Failed to open Socket Mode connection: {:#}", e);
                attempts += 1;
                continue;
            }
        };

        let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("Connected to Slack Socket Mode");
                attempts = 0;
                stream
            }
            Err(e) => {
                error!("Socket Mode websocket connect failed: {}", e);
                attempts += 1;
                continue;
            }
        };

        let (write, read) = stream.split();
        // A requested refresh reconnects right away; anything else backs off.
        if read_session(read, write, &handler).await? == SessionEnd::Dropped {
            attempts += 1;
        }
    }
}
