//! 시장 데이터 타입 및 구조체.
//!
//! 이 모듈은 캔들 동기화에 필요한 타입을 정의합니다:
//! - `Kline` - OHLCV 캔들스틱 데이터 (밀리초 타임스탬프 기반)
//! - `PageBounds` - 한 번의 조회로 받은 캔들 페이지의 시간 경계

use crate::error::{TraderError, TraderResult};
use crate::types::{Timeframe, TimestampMs};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV 캔들스틱 데이터.
///
/// 식별 키는 `(timeframe, open_time)`이며, 저장소에서는 이를
/// `{interval}{open_time}` 형식의 문자열 ID로 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kline {
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 캔들 시작 시간 (밀리초)
    pub open_time: TimestampMs,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량 (기준 자산 단위)
    pub volume: Decimal,
    /// 캔들 종료 시간 (밀리초)
    pub close_time: TimestampMs,
    /// 거래대금 (호가 자산 단위)
    pub quote_volume: Decimal,
    /// 체결 건수
    pub trade_count: u64,
    /// 주문자(taker) 매수 거래량 (기준 자산)
    pub taker_buy_base_volume: Decimal,
    /// 주문자(taker) 매수 거래대금 (호가 자산)
    pub taker_buy_quote_volume: Decimal,
}

impl Kline {
    /// 새 캔들을 생성합니다.
    ///
    /// 종료 시간은 Binance 규칙대로 `open_time + 기간 - 1`로 채워지고,
    /// 나머지 거래량 필드는 0으로 초기화됩니다.
    pub fn new(
        timeframe: Timeframe,
        open_time: TimestampMs,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timeframe,
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time: open_time + timeframe.as_millis() - 1,
            quote_volume: Decimal::ZERO,
            trade_count: 0,
            taker_buy_base_volume: Decimal::ZERO,
            taker_buy_quote_volume: Decimal::ZERO,
        }
    }

    /// 저장소 문서 ID (`{interval}{open_time}`).
    pub fn id(&self) -> String {
        format!("{}{}", self.timeframe, self.open_time)
    }

    /// 문서 ID를 `(timeframe, open_time)`으로 되돌립니다.
    pub fn parse_id(id: &str) -> Option<(Timeframe, TimestampMs)> {
        Timeframe::ALL.iter().find_map(|&timeframe| {
            let digits = id.strip_prefix(timeframe.to_binance_interval())?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok().map(|open_time| (timeframe, open_time))
        })
    }

    /// 캔들 값의 무결성을 검사합니다.
    ///
    /// - `open_time < close_time`
    /// - `low <= open, close <= high`
    /// - 거래량 관련 필드는 음수가 아님
    pub fn validate(&self) -> TraderResult<()> {
        if self.open_time >= self.close_time {
            return Err(TraderError::InvalidKline(format!(
                "open_time {} >= close_time {}",
                self.open_time, self.close_time
            )));
        }

        if self.low > self.high
            || self.open < self.low
            || self.open > self.high
            || self.close < self.low
            || self.close > self.high
        {
            return Err(TraderError::InvalidKline(format!(
                "가격 범위 위반 at {}: o={} h={} l={} c={}",
                self.open_time, self.open, self.high, self.low, self.close
            )));
        }

        let magnitudes = [
            self.volume,
            self.quote_volume,
            self.taker_buy_base_volume,
            self.taker_buy_quote_volume,
        ];
        if magnitudes.iter().any(|v| v.is_sign_negative() && !v.is_zero()) {
            return Err(TraderError::InvalidKline(format!(
                "음수 거래량 at {}",
                self.open_time
            )));
        }

        Ok(())
    }
}

/// 캔들 페이지의 시간 경계.
///
/// 데이터 소스의 정렬 방향은 보장되지 않으므로 첫 번째와 마지막 원소를
/// 비교해 방향을 판별합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    /// 페이지에서 가장 이른 open_time
    pub min_open_time: TimestampMs,
    /// 페이지에서 가장 늦은 close_time
    pub max_close_time: TimestampMs,
    /// 오름차순 여부
    pub ascending: bool,
}

impl PageBounds {
    /// 페이지의 경계를 계산합니다. 빈 페이지면 `None`.
    pub fn of(page: &[Kline]) -> Option<Self> {
        let first = page.first()?;
        let last = page.last()?;

        if first.open_time <= last.open_time {
            Some(Self {
                min_open_time: first.open_time,
                max_close_time: last.close_time,
                ascending: true,
            })
        } else {
            Some(Self {
                min_open_time: last.open_time,
                max_close_time: first.close_time,
                ascending: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const DAY: i64 = 86_400_000;
    const T0: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00Z

    fn kline(open_time: i64) -> Kline {
        Kline::new(
            Timeframe::D1,
            open_time,
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105),
            dec!(12.5),
        )
    }

    #[test]
    fn test_kline_new_fills_close_time() {
        let k = kline(T0);
        assert_eq!(k.close_time, T0 + DAY - 1);
        assert_eq!(k.trade_count, 0);
        assert!(k.validate().is_ok());
    }

    #[test]
    fn test_kline_id_round_trip() {
        let k = kline(T0);
        assert_eq!(k.id(), "1d1704067200000");
        assert_eq!(Kline::parse_id(&k.id()), Some((Timeframe::D1, T0)));
        assert_eq!(Kline::parse_id("1d0"), Some((Timeframe::D1, 0)));
        assert_eq!(Kline::parse_id("4h123"), None);
        assert_eq!(Kline::parse_id("1d"), None);
    }

    #[test]
    fn test_kline_validate_rejects_bad_prices() {
        let mut k = kline(T0);
        k.low = dec!(106);
        assert!(matches!(k.validate(), Err(TraderError::InvalidKline(_))));

        let mut k = kline(T0);
        k.close_time = k.open_time;
        assert!(k.validate().is_err());

        let mut k = kline(T0);
        k.volume = dec!(-1);
        assert!(k.validate().is_err());
    }

    #[test]
    fn test_page_bounds_detects_order() {
        let asc: Vec<Kline> = (0..3).map(|i| kline(T0 + i * DAY)).collect();
        let bounds = PageBounds::of(&asc).unwrap();
        assert!(bounds.ascending);
        assert_eq!(bounds.min_open_time, T0);
        assert_eq!(bounds.max_close_time, T0 + 3 * DAY - 1);

        let desc: Vec<Kline> = asc.iter().rev().cloned().collect();
        assert_eq!(
            PageBounds::of(&desc),
            Some(PageBounds {
                ascending: false,
                ..bounds
            })
        );

        assert_eq!(PageBounds::of(&[]), None);
    }

    #[test]
    fn test_kline_serde_camel_case() {
        let json = serde_json::to_value(kline(T0)).unwrap();
        assert_eq!(json["openTime"], T0);
        assert_eq!(json["timeframe"], "1d");
    }

    proptest::proptest! {
        #[test]
        fn prop_page_bounds_independent_of_order(start_day in 0i64..10_000, len in 1usize..50, descending: bool) {
            let mut page: Vec<Kline> = (0..len as i64)
                .map(|i| kline(T0 + (start_day + i) * DAY))
                .collect();
            if descending {
                page.reverse();
            }

            let bounds = PageBounds::of(&page).unwrap();
            let min = page.iter().map(|k| k.open_time).min().unwrap();
            let max = page.iter().map(|k| k.close_time).max().unwrap();
            proptest::prop_assert_eq!(bounds.min_open_time, min);
            proptest::prop_assert_eq!(bounds.max_close_time, max);
            proptest::prop_assert_eq!(bounds.ascending, !descending || len == 1);
        }
    }
}
