//! Wire DTOs for the broker REST API. Kept separate from the domain types
//! in `domain::ports` so a field rename on the wire never leaks into
//! application code.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'a str,
    pub appkey: &'a str,
    pub appsecret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct BrokerErrorBody {
    #[serde(default)]
    pub msg_cd: String,
    #[serde(default)]
    pub msg1: String,
}

#[derive(Debug, Serialize)]
pub struct OrderRequestBody {
    #[serde(rename = "CANO")]
    pub account_prefix: String,
    #[serde(rename = "ACNT_PRDT_CD")]
    pub account_suffix: String,
    #[serde(rename = "PDNO")]
    pub symbol: String,
    #[serde(rename = "ORD_DVSN")]
    pub order_division: String,
    #[serde(rename = "ORD_QTY")]
    pub quantity: String,
    #[serde(rename = "ORD_UNPR")]
    pub price: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponseBody {
    pub rt_cd: String,
    #[serde(default)]
    pub msg_cd: String,
    #[serde(default)]
    pub msg1: String,
    pub output: Option<OrderResponseOutput>,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponseOutput {
    #[serde(rename = "ODNO")]
    pub order_no: String,
    #[serde(rename = "ORD_TMD")]
    pub order_time: String,
}

#[derive(Debug, Deserialize)]
pub struct CashBalanceResponse {
    pub output2: Vec<CashBalanceOutput>,
}

#[derive(Debug, Deserialize)]
pub struct CashBalanceOutput {
    pub dnca_tot_amt: String,
}

#[derive(Debug, Deserialize)]
pub struct PositionsResponse {
    pub output1: Vec<PositionOutput>,
}

#[derive(Debug, Deserialize)]
pub struct PositionOutput {
    pub pdno: String,
    pub hldg_qty: String,
    pub pchs_avg_pric: String,
}

#[derive(Debug, Deserialize)]
pub struct CandleResponse {
    pub output2: Vec<CandleOutput>,
}

#[derive(Debug, Deserialize)]
pub struct CandleOutput {
    pub stck_bsop_date: String,
    pub stck_oprc: String,
    pub stck_hgpr: String,
    pub stck_lwpr: String,
    pub stck_clpr: String,
    pub acml_vol: String,
}

#[derive(Debug, Serialize)]
pub struct OverseasOrderRequestBody {
    #[serde(rename = "CANO")]
    pub account_prefix: String,
    #[serde(rename = "ACNT_PRDT_CD")]
    pub account_suffix: String,
    #[serde(rename = "OVRS_EXCG_CD")]
    pub exchange_code: String,
    #[serde(rename = "PDNO")]
    pub symbol: String,
    #[serde(rename = "ORD_QTY")]
    pub quantity: String,
    #[serde(rename = "OVRS_ORD_UNPR")]
    pub price: String,
    #[serde(rename = "ORD_SVR_DVSN_CD")]
    pub order_server_division: String,
    /// Overseas orders are always limit orders ("00"); there is no
    /// market-order division code on this endpoint.
    #[serde(rename = "ORD_DVSN")]
    pub order_division: String,
}

#[derive(Debug, Deserialize)]
pub struct OverseasBalanceResponse {
    pub output1: Vec<OverseasPositionOutput>,
}

#[derive(Debug, Deserialize)]
pub struct OverseasPositionOutput {
    pub ovrs_pdno: String,
    pub ovrs_cblc_qty: String,
    pub pchs_avg_pric: String,
}

#[derive(Debug, Deserialize)]
pub struct OverseasCashResponse {
    pub output: OverseasCashOutput,
}

#[derive(Debug, Deserialize)]
pub struct OverseasCashOutput {
    pub ord_psbl_frcr_amt: String,
}

#[derive(Debug, Deserialize)]
pub struct DomesticRankingResponse {
    pub output: Vec<DomesticRankingOutput>,
}

#[derive(Debug, Deserialize)]
pub struct DomesticRankingOutput {
    pub mksc_shrn_iscd: String,
}

#[derive(Debug, Deserialize)]
pub struct OverseasRankingResponse {
    pub output2: Vec<OverseasRankingOutput>,
}

#[derive(Debug, Deserialize)]
pub struct OverseasRankingOutput {
    pub symb: String,
}

#[derive(Debug, Deserialize)]
pub struct OverseasCandleResponse {
    pub output2: Vec<OverseasCandleOutput>,
}

#[derive(Debug, Deserialize)]
pub struct OverseasCandleOutput {
    pub xymd: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub clos: String,
    pub tvol: String,
}
