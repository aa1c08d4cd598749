//! Hosted backend client — PostgREST-style row access over HTTP plus a
//! phoenix-framed realtime subscription over WebSocket.
//!
//! The subscription is listen-only: we join one topic filtered to UPDATE
//! events and forward each row image. There is no reconnect; a dropped
//! socket degrades the widget to local-only operation.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use async_trait::async_trait;
use twinstage_core::config::BackendConfig;
use twinstage_core::{Result, TwinstageError};

use crate::backend::{RowUpdates, SessionBackend};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Phoenix channel frame used by the realtime socket.
#[derive(Debug, Serialize, Deserialize)]
struct PhoenixFrame {
    topic: String,
    event: String,
    payload: Value,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

pub struct RestBackend {
    http: reqwest::Client,
    config: BackendConfig,
}

impl RestBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.url.trim_end_matches('/'))
    }

    fn ws_url(&self) -> String {
        let base = self.config.url.trim_end_matches('/');
        let base = base
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!(
            "{base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.config.anon_key
        )
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    /// PostgREST filter expression for an expected guard value. NULL
    /// (and the legacy literal string "null") need `is.null` — `eq.`
    /// never matches SQL NULL.
    fn guard_filter(column: &str, expected: &Value) -> String {
        match expected {
            Value::Null => format!("{column}=is.null"),
            Value::String(s) => format!("{column}=eq.{s}"),
            other => format!("{column}=eq.{other}"),
        }
    }
}

#[async_trait]
impl SessionBackend for RestBackend {
    async fn fetch_singleton(&self, table: &str) -> Result<Value> {
        let url = format!("{}?select=*&limit=1", self.rest_url(table));
        let resp = self.auth(self.http.get(&url)).send().await?;
        if !resp.status().is_success() {
            return Err(TwinstageError::Backend(format!(
                "fetch {table}: HTTP {}",
                resp.status()
            )));
        }
        let rows: Vec<Value> = resp.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| TwinstageError::Backend(format!("table {table} has no session row")))
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<()> {
        let url = format!("{}?id=eq.{id}", self.rest_url(table));
        let resp = self
            .auth(self.http.patch(&url))
            .header("Prefer", "return=minimal")
            .json(&patch)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TwinstageError::Backend(format!(
                "update {table}: HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn update_guarded(
        &self,
        table: &str,
        id: &str,
        patch: Value,
        guard_column: &str,
        expected: &Value,
    ) -> Result<bool> {
        let url = format!(
            "{}?id=eq.{id}&{}",
            self.rest_url(table),
            Self::guard_filter(guard_column, expected)
        );
        let resp = self
            .auth(self.http.patch(&url))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TwinstageError::Backend(format!(
                "guarded update {table}: HTTP {}",
                resp.status()
            )));
        }
        let matched: Vec<Value> = resp.json().await?;
        Ok(!matched.is_empty())
    }

    async fn subscribe(&self, table: &str) -> Result<RowUpdates> {
        let (ws, _) = connect_async(self.ws_url())
            .await
            .map_err(|e| TwinstageError::Subscription(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let topic = format!("realtime:public:{table}");
        let join = PhoenixFrame {
            topic: topic.clone(),
            event: "phx_join".into(),
            payload: json!({
                "config": {
                    "postgres_changes": [
                        { "event": "UPDATE", "schema": "public", "table": table }
                    ]
                }
            }),
            reference: Some("1".into()),
        };
        sink.send(Message::Text(serde_json::to_string(&join)?.into()))
            .await
            .map_err(|e| TwinstageError::Subscription(e.to_string()))?;
        debug!(%topic, "Realtime subscription joined");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            heartbeat.tick().await;
            let mut hb_ref: u64 = 2;
            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        let frame = PhoenixFrame {
                            topic: "phoenix".into(),
                            event: "heartbeat".into(),
                            payload: json!({}),
                            reference: Some(hb_ref.to_string()),
                        };
                        hb_ref += 1;
                        let text = match serde_json::to_string(&frame) {
                            Ok(t) => t,
                            Err(_) => continue,
                        };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            warn!(%topic, "Heartbeat failed, realtime subscription lost");
                            break;
                        }
                    }
                    msg = stream.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<PhoenixFrame>(&text) {
                                Ok(frame) if frame.event == "postgres_changes" => {
                                    if let Some(record) = frame.payload.pointer("/data/record") {
                                        if tx.send(record.clone()).is_err() {
                                            break;
                                        }
                                    }
                                }
                                Ok(_) => {} // join replies, heartbeat acks
                                Err(e) => debug!(%e, "Unparseable realtime frame"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            warn!(%topic, "Realtime subscription closed");
                            break;
                        }
                        Some(Ok(_)) => {} // ping/pong handled by tungstenite
                        Some(Err(e)) => {
                            warn!(%e, %topic, "Realtime socket error");
                            break;
                        }
                    }
                }
            }
        });

        Ok(RowUpdates::new(rx))
    }
}
