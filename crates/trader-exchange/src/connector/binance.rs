//! Binance 거래소 커넥터.
//!
//! Binance Spot 공개 REST API의 `/api/v3/klines` 엔드포인트를 사용해
//! 캔들 데이터를 페이지 단위로 조회합니다. 인증이 필요 없는 엔드포인트만
//! 사용하므로 API 키는 받지 않습니다.

use crate::traits::{ExchangeResult, KlineRequest, MarketDataSource};
use crate::ExchangeError;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};
use trader_core::{Kline, Timeframe};

/// Binance가 허용하는 최대 페이지 크기.
pub const MAX_KLINE_LIMIT: u32 = 1000;

// ============================================================================
// 설정
// ============================================================================

/// Binance 클라이언트 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl BinanceConfig {
    /// 기본 URL을 지정해 생성.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// 환경 변수에서 생성 (`BINANCE_BASE_URL`, `BINANCE_TIMEOUT_SECS`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("BINANCE_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: std::env::var("BINANCE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct BinanceKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    u64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i32,
    msg: String,
}

// ============================================================================
// Binance 클라이언트
// ============================================================================

/// Binance 캔들 조회 클라이언트.
pub struct BinanceClient {
    config: BinanceConfig,
    client: Client,
}

impl BinanceClient {
    /// 새 Binance 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: BinanceConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// 설정 반환.
    pub fn config(&self) -> &BinanceConfig {
        &self.config
    }

    /// 요청을 쿼리 파라미터로 변환.
    ///
    /// 시간 경계가 없으면 파라미터 자체를 생략합니다.
    fn build_params(request: &KlineRequest) -> Result<Vec<(&'static str, String)>, ExchangeError> {
        if request.limit == 0 || request.limit > MAX_KLINE_LIMIT {
            return Err(ExchangeError::InvalidRequest(format!(
                "limit must be in 1..={}, got {}",
                MAX_KLINE_LIMIT, request.limit
            )));
        }

        let mut params = vec![
            ("symbol", Self::from_symbol(&request.symbol)),
            ("interval", request.timeframe.to_binance_interval().to_string()),
        ];
        if let Some(start) = request.start_time {
            params.push(("startTime", start.to_string()));
        }
        if let Some(end) = request.end_time {
            params.push(("endTime", end.to_string()));
        }
        params.push(("limit", request.limit.to_string()));
        Ok(params)
    }

    /// 공개 API 요청 (인증 불필요).
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);

        debug!(url = %url, ?params, "GET");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(ExchangeError::from)?;

        self.handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::NetworkError(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            })
        } else if let Ok(error) = serde_json::from_str::<BinanceError>(&body) {
            Err(Self::map_error_code(status.as_u16(), error.code, &error.msg))
        } else if status.as_u16() == 429 || status.as_u16() == 418 {
            Err(ExchangeError::RateLimited(format!("HTTP {}", status)))
        } else {
            Err(ExchangeError::ApiError {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// Binance 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(http_status: u16, code: i32, msg: &str) -> ExchangeError {
        match code {
            -1003 => ExchangeError::RateLimited(msg.to_string()),
            -1121 => ExchangeError::SymbolNotFound(msg.to_string()),
            -1130..=-1100 => ExchangeError::InvalidRequest(msg.to_string()),
            _ if http_status == 429 || http_status == 418 => {
                ExchangeError::RateLimited(msg.to_string())
            }
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// 내부 심볼을 Binance 심볼 형식으로 변환.
    fn from_symbol(ticker: &str) -> String {
        // "BTC/USDT" -> "BTCUSDT"
        ticker.replace('/', "").to_uppercase()
    }

    /// 문자열에서 Decimal 파싱.
    fn parse_decimal(field: &str, s: &str) -> ExchangeResult<Decimal> {
        s.parse()
            .map_err(|e| ExchangeError::ParseError(format!("{} '{}': {}", field, s, e)))
    }

    /// 원시 응답 행을 Kline으로 변환.
    fn to_kline(timeframe: Timeframe, k: BinanceKline) -> ExchangeResult<Kline> {
        let kline = Kline {
            timeframe,
            open_time: k.0,
            open: Self::parse_decimal("open", &k.1)?,
            high: Self::parse_decimal("high", &k.2)?,
            low: Self::parse_decimal("low", &k.3)?,
            close: Self::parse_decimal("close", &k.4)?,
            volume: Self::parse_decimal("volume", &k.5)?,
            close_time: k.6,
            quote_volume: Self::parse_decimal("quoteVolume", &k.7)?,
            trade_count: k.8,
            taker_buy_base_volume: Self::parse_decimal("takerBuyBaseVolume", &k.9)?,
            taker_buy_quote_volume: Self::parse_decimal("takerBuyQuoteVolume", &k.10)?,
        };
        kline
            .validate()
            .map_err(|e| ExchangeError::ParseError(e.to_string()))?;
        Ok(kline)
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    fn name(&self) -> &str {
        "Binance"
    }

    async fn fetch_klines(&self, request: &KlineRequest) -> ExchangeResult<Vec<Kline>> {
        let params = Self::build_params(request)?;
        let resp: Vec<BinanceKline> = self.public_get("/api/v3/klines", &params).await?;

        debug!(request = %request, received = resp.len(), "klines 조회");

        resp.into_iter()
            .map(|k| Self::to_kline(request.timeframe, k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_conversion() {
        assert_eq!(BinanceClient::from_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(BinanceClient::from_symbol("ethusdt"), "ETHUSDT");
    }

    #[test]
    fn test_build_params_omits_missing_bounds() {
        let req = KlineRequest::new("BTCUSDT", Timeframe::D1).with_end(42);
        let params = BinanceClient::build_params(&req).unwrap();
        let keys: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["symbol", "interval", "endTime", "limit"]);
        assert_eq!(params[1].1, "1d");
    }

    #[test]
    fn test_build_params_rejects_bad_limit() {
        let req = KlineRequest::new("BTCUSDT", Timeframe::D1).with_limit(0);
        assert!(matches!(
            BinanceClient::build_params(&req),
            Err(ExchangeError::InvalidRequest(_))
        ));
        let req = req.with_limit(MAX_KLINE_LIMIT + 1);
        assert!(BinanceClient::build_params(&req).is_err());
    }

    #[test]
    fn test_map_error_code() {
        assert!(matches!(
            BinanceClient::map_error_code(400, -1121, "Invalid symbol."),
            ExchangeError::SymbolNotFound(_)
        ));
        assert!(matches!(
            BinanceClient::map_error_code(429, -1003, "Too many requests"),
            ExchangeError::RateLimited(_)
        ));
        assert!(matches!(
            BinanceClient::map_error_code(400, -1120, "Invalid interval."),
            ExchangeError::InvalidRequest(_)
        ));
    }
}
