use crate::models::{ChangeEvent, Contribution, Incentive, NewContribution, NewIncentive};
use crate::store::{ContributionStore, StoreError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const PING_INTERVAL: Duration = Duration::from_secs(30);

pub struct RemoteStore {
    base_url: String,
    feed_url: String,
    client: Client,
    events: broadcast::Sender<ChangeEvent>,
}

impl RemoteStore {
    pub fn connect(service_url: &str, service_key: &str) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {service_key}"))
                .expect("invalid service key"),
        );
        headers.insert(
            "apikey",
            header::HeaderValue::from_str(service_key).expect("invalid service key"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        let base_url = service_url.trim_end_matches('/').to_string();
        let feed_url = change_feed_url(&base_url, service_key);
        let (events, _) = broadcast::channel(256);

        Self {
            base_url,
            feed_url,
            client,
            events,
        }
    }

    /// Runs for the life of the process, sleeping between reconnect attempts.
    pub fn spawn_feed(&self) -> tokio::task::JoinHandle<()> {
        let url = self.feed_url.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            loop {
                info!("connecting to change feed");
                match listen(&url, &events).await {
                    Ok(()) => info!("change feed closed by server"),
                    Err(err) => error!("change feed error: {err}"),
                }
                sleep(RECONNECT_DELAY).await;
            }
        })
    }
}

#[async_trait]
impl ContributionStore for RemoteStore {
    async fn fetch_incentives(&self) -> Result<Vec<Incentive>, StoreError> {
        let url = format!("{}/v1/incentives?order=created_at.asc", self.base_url);
        let response = self.client.get(&url).send().await?;
        handle_response(response).await
    }

    async fn fetch_contributions(&self) -> Result<Vec<Contribution>, StoreError> {
        let url = format!("{}/v1/contributions", self.base_url);
        let response = self.client.get(&url).send().await?;
        handle_response(response).await
    }

    async fn insert_contribution(&self, new: NewContribution) -> Result<Contribution, StoreError> {
        let url = format!("{}/v1/contributions", self.base_url);
        let response = self.client.post(&url).json(&new).send().await?;
        handle_response(response).await
    }

    async fn insert_incentive(&self, new: NewIncentive) -> Result<Incentive, StoreError> {
        let url = format!("{}/v1/incentives", self.base_url);
        let response = self.client.post(&url).json(&new).send().await?;
        handle_response(response).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StoreError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(response.url().path().to_string()));
    }

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(StoreError::Server { status, message });
    }

    Ok(response.json().await?)
}

async fn listen(url: &str, events: &broadcast::Sender<ChangeEvent>) -> Result<(), String> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|err| format!("connect failed: {err}"))?;

    info!("change feed connected");
    let (mut write, mut read) = ws_stream.split();
    let mut ping = tokio::time::interval(PING_INTERVAL);

    loop {
        tokio::select! {
            _ = ping.tick() => {
                if let Err(err) = write.send(Message::Ping(vec![])).await {
                    return Err(format!("ping failed: {err}"));
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match parse_change_event(&text) {
                        Some(event) => {
                            if events.send(event).is_err() {
                                debug!("change feed event dropped, no subscribers");
                            }
                        }
                        None => debug!("unrecognized change feed frame: {text}"),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = write.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(format!("websocket error: {err}")),
                    None => return Err("stream ended".to_string()),
                }
            }
        }
    }
}

fn parse_change_event(text: &str) -> Option<ChangeEvent> {
    serde_json::from_str(text).ok()
}

fn change_feed_url(base_url: &str, service_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}/v1/changes?apikey={service_key}")
}
