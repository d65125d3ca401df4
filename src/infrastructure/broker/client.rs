//! REST adapter for the broker (C1): OAuth token issuance with disk
//! caching, rate-limited order placement, account/position queries, and
//! historical bars for the warm-up path. One instance is shared across
//! both markets; routing metadata on `Instrument` selects the venue.

use super::rate_limiter::{RateLimiter, backoff_delay, is_rate_limit_error};
use super::requests::{
    CandleResponse, CashBalanceResponse, DomesticRankingResponse, OrderRequestBody,
    OrderResponseBody, OverseasBalanceResponse, OverseasCandleResponse, OverseasCashResponse,
    OverseasOrderRequestBody, OverseasRankingResponse, PositionsResponse, TokenRequest,
    TokenResponse,
};
use super::token_cache::{CachedToken, TokenCache};
use crate::domain::market::Market;
use crate::domain::ports::{BrokerClient, Candle, OrderConfirmation, OrderRequest, OrderSide};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::infrastructure::core::http_client_factory::HttpClientFactory;

pub struct KisBrokerClient {
    client: ClientWithMiddleware,
    base_url: String,
    app_key: String,
    app_secret: String,
    account_no: String,
    rate_limiter: RateLimiter,
    token_cache: TokenCache,
    token: Arc<RwLock<Option<CachedToken>>>,
    max_retries: u32,
}

impl KisBrokerClient {
    pub fn new(
        base_url: String,
        app_key: String,
        app_secret: String,
        account_no: String,
        min_request_interval_ms: u64,
        max_retries: u32,
        token_cache_path: String,
    ) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            base_url,
            app_key,
            app_secret,
            account_no,
            rate_limiter: RateLimiter::new(min_request_interval_ms),
            token_cache: TokenCache::new(token_cache_path),
            token: Arc::new(RwLock::new(None)),
            max_retries,
        }
    }

    fn account_parts(&self) -> (String, String) {
        let mut parts = self.account_no.splitn(2, '-');
        let prefix = parts.next().unwrap_or_default().to_string();
        let suffix = parts.next().unwrap_or("01").to_string();
        (prefix, suffix)
    }

    /// Only NASDAQ is wired up; the broker supports NYSE/AMEX too but the
    /// universe never routes instruments there. Trading endpoints (order,
    /// balance, buying-power) want the 4-letter code; quote-style endpoints
    /// (ranking, daily price) want the 3-letter one.
    fn overseas_exchange_code(&self) -> &'static str {
        "NASD"
    }

    fn overseas_quote_exchange_code(&self) -> &'static str {
        "NAS"
    }

    async fn ensure_token(&self) -> Result<String> {
        {
            let guard = self.token.read().await;
            if let Some(cached) = guard.as_ref()
                && cached.is_valid(Utc::now())
            {
                return Ok(cached.token.clone());
            }
        }

        if let Some(cached) = self.token_cache.load().await {
            *self.token.write().await = Some(cached.clone());
            return Ok(cached.token);
        }

        self.issue_token().await
    }

    async fn issue_token(&self) -> Result<String> {
        let url = format!("{}/oauth2/tokenP", self.base_url);
        let body = TokenRequest {
            grant_type: "client_credentials",
            appkey: &self.app_key,
            appsecret: &self.app_secret,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("failed to send token request")?
            .json::<TokenResponse>()
            .await
            .context("failed to decode token response")?;

        let expires_at = Utc::now() + chrono::Duration::seconds(response.expires_in);
        let cached = CachedToken {
            token: response.access_token.clone(),
            expires_at,
        };
        *self.token.write().await = Some(cached.clone());
        if let Err(e) = self.token_cache.save(&cached).await {
            warn!(error = %e, "failed to persist broker token cache");
        }

        info!("issued new broker access token");
        Ok(response.access_token)
    }

    /// Send a request with the shared rate limiter and EGW00201 / HTTP
    /// 429/500 retry loop. `build` is re-invoked on every attempt since
    /// `reqwest_middleware::RequestBuilder` isn't `Clone`.
    async fn send_with_retry<F>(&self, build: F) -> Result<String>
    where
        F: Fn() -> reqwest_middleware::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            self.rate_limiter.acquire().await;
            let response = build().send().await.context("broker request failed")?;
            let status = response.status();
            let body = response.text().await.context("failed to read broker response body")?;

            if status.is_success() && !is_rate_limit_error(&body) {
                return Ok(body);
            }

            let retryable = status.as_u16() == 429 || status.as_u16() == 500 || is_rate_limit_error(&body);
            attempt += 1;
            if !retryable || attempt > self.max_retries {
                bail!("broker request failed (status {status}): {body}");
            }
            warn!(attempt, status = %status, "broker request throttled, backing off");
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    async fn place_domestic_order(&self, order: OrderRequest) -> Result<OrderConfirmation> {
        let token = self.ensure_token().await?;
        let (prefix, suffix) = self.account_parts();

        let order_division = match order.limit_price {
            Some(_) => "00",
            None => "01",
        };
        let price = order.limit_price.unwrap_or(Decimal::ZERO).to_string();

        let body = OrderRequestBody {
            account_prefix: prefix,
            account_suffix: suffix,
            symbol: order.symbol.clone(),
            order_division: order_division.to_string(),
            quantity: order.quantity.to_string(),
            price,
        };

        let tr_id = match order.side {
            OrderSide::Buy => "TTTC0802U",
            OrderSide::Sell => "TTTC0801U",
        };

        let url = format!("{}/uapi/domestic-stock/v1/trading/order-cash", self.base_url);
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();
        let token_header = token.clone();

        let raw = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("authorization", format!("Bearer {token_header}"))
                    .header("appkey", &app_key)
                    .header("appsecret", &app_secret)
                    .header("tr_id", tr_id)
                    .json(&body)
            })
            .await?;

        let parsed: OrderResponseBody =
            serde_json::from_str(&raw).context("failed to decode order response")?;

        if parsed.rt_cd != "0" {
            bail!("broker rejected order ({}): {}", parsed.msg_cd, parsed.msg1);
        }

        let output = parsed.output.context("broker order response missing output")?;
        Ok(OrderConfirmation {
            broker_order_id: output.order_no,
            filled_quantity: order.quantity,
            fill_price: order.limit_price.unwrap_or(Decimal::ZERO),
            filled_at: Utc::now(),
        })
    }

    /// Overseas orders are always limit orders (`ORD_DVSN` "00"); the
    /// caller already validated `limit_price` is positive before this is
    /// reached.
    async fn place_overseas_order(&self, order: OrderRequest) -> Result<OrderConfirmation> {
        let token = self.ensure_token().await?;
        let (prefix, suffix) = self.account_parts();
        let limit_price = order.limit_price.unwrap_or(Decimal::ZERO);

        let body = OverseasOrderRequestBody {
            account_prefix: prefix,
            account_suffix: suffix,
            exchange_code: self.overseas_exchange_code().to_string(),
            symbol: order.symbol.clone(),
            quantity: order.quantity.to_string(),
            price: limit_price.to_string(),
            order_server_division: "0".to_string(),
            order_division: "00".to_string(),
        };

        let tr_id = match order.side {
            OrderSide::Buy => "TTTT1002U",
            OrderSide::Sell => "TTTT1006U",
        };

        let url = format!("{}/uapi/overseas-stock/v1/trading/order", self.base_url);
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();
        let token_header = token.clone();

        let raw = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("authorization", format!("Bearer {token_header}"))
                    .header("appkey", &app_key)
                    .header("appsecret", &app_secret)
                    .header("tr_id", tr_id)
                    .json(&body)
            })
            .await?;

        let parsed: OrderResponseBody =
            serde_json::from_str(&raw).context("failed to decode overseas order response")?;

        if parsed.rt_cd != "0" {
            bail!("broker rejected overseas order ({}): {}", parsed.msg_cd, parsed.msg1);
        }

        let output = parsed.output.context("broker overseas order response missing output")?;
        Ok(OrderConfirmation {
            broker_order_id: output.order_no,
            filled_quantity: order.quantity,
            fill_price: limit_price,
            filled_at: Utc::now(),
        })
    }

    async fn domestic_cash_balance(&self) -> Result<Decimal> {
        let token = self.ensure_token().await?;
        let (prefix, suffix) = self.account_parts();
        let url = format!("{}/uapi/domestic-stock/v1/trading/inquire-balance", self.base_url);
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();

        let raw = self
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .header("authorization", format!("Bearer {token}"))
                    .header("appkey", &app_key)
                    .header("appsecret", &app_secret)
                    .header("tr_id", "TTTC8434R")
                    .query(&[("CANO", prefix.as_str()), ("ACNT_PRDT_CD", suffix.as_str())])
            })
            .await?;

        let parsed: CashBalanceResponse =
            serde_json::from_str(&raw).context("failed to decode cash balance response")?;
        let amount = parsed
            .output2
            .first()
            .map(|o| Decimal::from_str(&o.dnca_tot_amt).unwrap_or_default())
            .unwrap_or_default();
        Ok(amount)
    }

    async fn domestic_positions(&self) -> Result<Vec<(String, i64, Decimal)>> {
        let token = self.ensure_token().await?;
        let (prefix, suffix) = self.account_parts();
        let url = format!("{}/uapi/domestic-stock/v1/trading/inquire-balance", self.base_url);
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();

        let raw = self
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .header("authorization", format!("Bearer {token}"))
                    .header("appkey", &app_key)
                    .header("appsecret", &app_secret)
                    .header("tr_id", "TTTC8434R")
                    .query(&[("CANO", prefix.as_str()), ("ACNT_PRDT_CD", suffix.as_str())])
            })
            .await?;

        let parsed: PositionsResponse =
            serde_json::from_str(&raw).context("failed to decode positions response")?;

        Ok(parsed
            .output1
            .into_iter()
            .filter_map(|p| {
                let qty = p.hldg_qty.parse::<i64>().ok()?;
                if qty == 0 {
                    return None;
                }
                let avg = Decimal::from_str(&p.pchs_avg_pric).unwrap_or_default();
                Some((p.pdno, qty, avg))
            })
            .collect())
    }

    /// Overseas balance endpoint, queried against the single exchange this
    /// adapter routes to (`overseas_exchange_code`); KIS keys overseas
    /// holdings by exchange rather than returning everything at once.
    async fn overseas_positions(&self) -> Result<Vec<(String, i64, Decimal)>> {
        let token = self.ensure_token().await?;
        let (prefix, suffix) = self.account_parts();
        let url = format!("{}/uapi/overseas-stock/v1/trading/inquire-balance", self.base_url);
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();
        let excd = self.overseas_exchange_code();

        let raw = self
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .header("authorization", format!("Bearer {token}"))
                    .header("appkey", &app_key)
                    .header("appsecret", &app_secret)
                    .header("tr_id", "TTTS3012R")
                    .query(&[
                        ("CANO", prefix.as_str()),
                        ("ACNT_PRDT_CD", suffix.as_str()),
                        ("OVRS_EXCG_CD", excd),
                        ("TR_CRCY_CD", "USD"),
                        ("CTX_AREA_FK200", ""),
                        ("CTX_AREA_NK200", ""),
                    ])
            })
            .await?;

        let parsed: OverseasBalanceResponse =
            serde_json::from_str(&raw).context("failed to decode overseas positions response")?;

        Ok(parsed
            .output1
            .into_iter()
            .filter_map(|p| {
                let qty = p.ovrs_cblc_qty.parse::<i64>().ok()?;
                if qty == 0 {
                    return None;
                }
                let avg = Decimal::from_str(&p.pchs_avg_pric).unwrap_or_default();
                Some((p.ovrs_pdno, qty, avg))
            })
            .collect())
    }

    /// Overseas buying-power endpoint requires an `ITEM_CD` anchor symbol;
    /// without an existing overseas holding to anchor on, there's no
    /// well-defined buying-power figure to ask for, so this returns zero
    /// rather than guessing.
    async fn overseas_cash_balance(&self) -> Result<Decimal> {
        let positions = self.overseas_positions().await?;
        let Some((item_cd, _, _)) = positions.first() else {
            warn!("no overseas holdings to anchor ITEM_CD; reporting zero overseas cash");
            return Ok(Decimal::ZERO);
        };

        let token = self.ensure_token().await?;
        let (prefix, suffix) = self.account_parts();
        let url = format!("{}/uapi/overseas-stock/v1/trading/inquire-psamount", self.base_url);
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();
        let excd = self.overseas_exchange_code();

        let raw = self
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .header("authorization", format!("Bearer {token}"))
                    .header("appkey", &app_key)
                    .header("appsecret", &app_secret)
                    .header("tr_id", "TTTS3007R")
                    .query(&[
                        ("CANO", prefix.as_str()),
                        ("ACNT_PRDT_CD", suffix.as_str()),
                        ("OVRS_EXCG_CD", excd),
                        ("OVRS_CRCY_CD", "USD"),
                        ("OVRS_ORD_UNPR", "0"),
                        ("ITEM_CD", item_cd.as_str()),
                    ])
            })
            .await?;

        let parsed: OverseasCashResponse =
            serde_json::from_str(&raw).context("failed to decode overseas cash response")?;
        Ok(Decimal::from_str(&parsed.output.ord_psbl_frcr_amt).unwrap_or_default())
    }

    async fn domestic_historical_bars(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Candle>> {
        let token = self.ensure_token().await?;
        let url = format!("{}/uapi/domestic-stock/v1/quotations/inquire-daily-itemchartprice", self.base_url);
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();
        let start_str = start.format("%Y%m%d").to_string();
        let end_str = end.format("%Y%m%d").to_string();

        let raw = self
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .header("authorization", format!("Bearer {token}"))
                    .header("appkey", &app_key)
                    .header("appsecret", &app_secret)
                    .header("tr_id", "FHKST03010100")
                    .query(&[
                        ("FID_INPUT_ISCD", symbol),
                        ("FID_INPUT_DATE_1", start_str.as_str()),
                        ("FID_INPUT_DATE_2", end_str.as_str()),
                        ("FID_PERIOD_DIV_CODE", "D"),
                    ])
            })
            .await?;

        let parsed: CandleResponse = serde_json::from_str(&raw).context("failed to decode candle response")?;

        parsed
            .output2
            .into_iter()
            .map(|c| {
                let timestamp = chrono::NaiveDate::parse_from_str(&c.stck_bsop_date, "%Y%m%d")
                    .context("invalid candle date")?
                    .and_hms_opt(0, 0, 0)
                    .context("invalid candle time")?
                    .and_utc();
                Ok(Candle {
                    timestamp,
                    open: Decimal::from_str(&c.stck_oprc).unwrap_or_default(),
                    high: Decimal::from_str(&c.stck_hgpr).unwrap_or_default(),
                    low: Decimal::from_str(&c.stck_lwpr).unwrap_or_default(),
                    close: Decimal::from_str(&c.stck_clpr).unwrap_or_default(),
                    volume: c.acml_vol.parse::<i64>().unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn overseas_historical_bars(&self, symbol: &str, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<Vec<Candle>> {
        let token = self.ensure_token().await?;
        let url = format!("{}/uapi/overseas-price/v1/quotations/dailyprice", self.base_url);
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();
        let excd = self.overseas_quote_exchange_code();

        let raw = self
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .header("authorization", format!("Bearer {token}"))
                    .header("appkey", &app_key)
                    .header("appsecret", &app_secret)
                    .header("tr_id", "HHDFS76240000")
                    .query(&[("AUTH", ""), ("EXCD", excd), ("SYMB", symbol), ("GUBN", "0"), ("BYMD", ""), ("MODP", "0")])
            })
            .await?;

        let parsed: OverseasCandleResponse = serde_json::from_str(&raw).context("failed to decode overseas candle response")?;

        parsed
            .output2
            .into_iter()
            .map(|c| {
                let timestamp = chrono::NaiveDate::parse_from_str(&c.xymd, "%Y%m%d")
                    .context("invalid overseas candle date")?
                    .and_hms_opt(0, 0, 0)
                    .context("invalid overseas candle time")?
                    .and_utc();
                Ok(Candle {
                    timestamp,
                    open: Decimal::from_str(&c.open).unwrap_or_default(),
                    high: Decimal::from_str(&c.high).unwrap_or_default(),
                    low: Decimal::from_str(&c.low).unwrap_or_default(),
                    close: Decimal::from_str(&c.clos).unwrap_or_default(),
                    volume: c.tvol.parse::<i64>().unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl BrokerClient for KisBrokerClient {
    async fn place_order(&self, order: OrderRequest) -> Result<OrderConfirmation> {
        if order.market == Market::Us && order.limit_price.is_none_or(|p| p <= Decimal::ZERO) {
            bail!("overseas orders must carry a positive limit price; {} has none", order.symbol);
        }

        match order.market {
            Market::Kr => self.place_domestic_order(order).await,
            Market::Us => self.place_overseas_order(order).await,
        }
    }

    async fn cash_balance(&self, market: Market) -> Result<Decimal> {
        match market {
            Market::Kr => self.domestic_cash_balance().await,
            Market::Us => self.overseas_cash_balance().await,
        }
    }

    async fn positions(&self, market: Market) -> Result<Vec<(String, i64, Decimal)>> {
        match market {
            Market::Kr => self.domestic_positions().await,
            Market::Us => self.overseas_positions().await,
        }
    }

    async fn market_cap_ranking(&self, market: Market, limit: usize) -> Result<Vec<String>> {
        let token = self.ensure_token().await?;
        let app_key = self.app_key.clone();
        let app_secret = self.app_secret.clone();

        match market {
            Market::Kr => {
                let url = format!("{}/uapi/domestic-stock/v1/ranking/market-cap", self.base_url);
                let raw = self
                    .send_with_retry(|| {
                        self.client
                            .get(&url)
                            .header("authorization", format!("Bearer {token}"))
                            .header("appkey", &app_key)
                            .header("appsecret", &app_secret)
                            .header("tr_id", "FHPST01700000")
                            .query(&[
                                ("fid_cond_mrkt_div_code", "J"),
                                ("fid_cond_scr_div_code", "20170"),
                                ("fid_div_cls_code", "0"),
                                ("fid_rank_sort_cls_code", "0"),
                                ("fid_input_cnt_1", "0"),
                                ("fid_prc_cls_code", "0"),
                                ("fid_input_iscd_1", "0000"),
                            ])
                    })
                    .await?;
                let parsed: DomesticRankingResponse =
                    serde_json::from_str(&raw).context("failed to decode market-cap ranking response")?;
                Ok(parsed.output.into_iter().take(limit).map(|o| o.mksc_shrn_iscd).collect())
            }
            Market::Us => {
                let url = format!("{}/uapi/overseas-stock/v1/ranking/market-cap", self.base_url);
                let excd = self.overseas_quote_exchange_code();
                let raw = self
                    .send_with_retry(|| {
                        self.client
                            .get(&url)
                            .header("authorization", format!("Bearer {token}"))
                            .header("appkey", &app_key)
                            .header("appsecret", &app_secret)
                            .header("tr_id", "HHDFS76350100")
                            .query(&[("KEYB", ""), ("AUTH", ""), ("EXCD", excd), ("VOL_RANG", "0")])
                    })
                    .await?;
                let parsed: OverseasRankingResponse =
                    serde_json::from_str(&raw).context("failed to decode overseas market-cap ranking response")?;
                Ok(parsed.output2.into_iter().take(limit).map(|o| o.symb).collect())
            }
        }
    }

    async fn historical_bars(
        &self,
        symbol: &str,
        market: Market,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        match market {
            Market::Kr => self.domestic_historical_bars(symbol, start, end).await,
            Market::Us => self.overseas_historical_bars(symbol, start, end).await,
        }
    }
}
