//! Realtime market-data feed (C5): a persistent websocket connection with
//! a manual reconnect/backoff loop, normalizing frames into `RealtimeTick`
//! and forwarding them on an mpsc channel to the ticker-state cache (C4).

use crate::domain::ports::MarketDataFeed;
use crate::domain::ticker_state::RealtimeTick;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{error, info};

use super::frame_parser::parse_tick_frame;

const PING_INTERVAL_SECS: u64 = 20;
const MAX_RECONNECT_DELAY_SECS: u64 = 30;
const CHANNEL_CAPACITY: usize = 1024;

pub struct BrokerWebSocketFeed {
    ws_url: String,
    approval_key: String,
}

impl BrokerWebSocketFeed {
    pub fn new(ws_url: String, approval_key: String) -> Self {
        Self { ws_url, approval_key }
    }

    async fn run_connection(
        ws_url: &str,
        approval_key: &str,
        symbols: &[String],
        tx: &mpsc::Sender<RealtimeTick>,
    ) -> Result<()> {
        let (ws_stream, _) = connect_async(ws_url).await.context("failed to connect to market data feed")?;
        info!(ws_url, "market data feed connected");

        let (mut write, mut read) = ws_stream.split();

        for symbol in symbols {
            let subscribe_msg = serde_json::json!({
                "header": {
                    "approval_key": approval_key,
                    "custtype": "P",
                    "tr_type": "1",
                    "content-type": "utf-8",
                },
                "body": {
                    "input": {
                        "tr_id": "H0STCNT0",
                        "tr_key": symbol,
                    }
                }
            });
            write.send(Message::Text(subscribe_msg.to_string().into())).await?;
        }
        info!(count = symbols.len(), "subscribed to market data symbols");

        let mut ping_interval = time::interval(Duration::from_secs(PING_INTERVAL_SECS));

        loop {
            tokio::select! {
                Some(msg) = read.next() => {
                    match msg? {
                        Message::Text(text) => {
                            if text.starts_with('0') || text.starts_with('1') {
                                // Realtime data frame: "0|TR_ID|count|pipe-delimited-fields".
                                if let Some(body) = text.splitn(4, '|').nth(3)
                                    && let Some(tick) = parse_tick_frame(body)
                                {
                                    if tx.send(tick).await.is_err() {
                                        return Ok(());
                                    }
                                }
                            }
                        }
                        Message::Ping(_) => {
                            write.send(Message::Pong(vec![].into())).await?;
                        }
                        Message::Close(_) => return Ok(()),
                        _ => {}
                    }
                }
                _ = ping_interval.tick() => {
                    write.send(Message::Ping(vec![].into())).await?;
                }
            }
        }
    }
}

#[async_trait]
impl MarketDataFeed for BrokerWebSocketFeed {
    async fn subscribe(&self, symbols: Vec<String>) -> Result<mpsc::Receiver<RealtimeTick>> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let ws_url = self.ws_url.clone();
        let approval_key = self.approval_key.clone();

        tokio::spawn(async move {
            let mut reconnect_attempts: u32 = 0;
            loop {
                match Self::run_connection(&ws_url, &approval_key, &symbols, &tx).await {
                    Ok(_) => {
                        info!("market data feed closed cleanly");
                        reconnect_attempts = 0;
                    }
                    Err(e) => {
                        error!(error = %e, "market data feed error, reconnecting");
                    }
                }
                if tx.is_closed() {
                    return;
                }
                let delay = std::cmp::min(2u64.pow(reconnect_attempts), MAX_RECONNECT_DELAY_SECS);
                time::sleep(Duration::from_secs(delay)).await;
                reconnect_attempts = reconnect_attempts.saturating_add(1);
            }
        });

        Ok(rx)
    }
}
