//! 캔들스틱 데이터를 위한 타임프레임 정의.
//!
//! 동기화 엔진은 일봉만 다루므로 현재 정의된 값은 `D1` 하나입니다.
//! 문자열 표현은 Binance 간격 문자열(`"1d"`)을 그대로 사용하며,
//! 저장소의 문서 ID 접두사로도 쓰입니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TraderError;

/// 캔들스틱 타임프레임.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// 일봉
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// 지원하는 모든 타임프레임.
    pub const ALL: [Timeframe; 1] = [Timeframe::D1];

    /// 이 타임프레임의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::D1 => Duration::from_secs(24 * 60 * 60),
        }
    }

    /// 이 타임프레임의 밀리초 단위 길이를 반환합니다.
    pub fn as_millis(&self) -> i64 {
        self.duration().as_millis() as i64
    }

    /// 바이낸스 간격 문자열로 변환합니다.
    pub fn to_binance_interval(&self) -> &'static str {
        match self {
            Timeframe::D1 => "1d",
        }
    }

    /// 바이낸스 간격 문자열에서 파싱합니다.
    pub fn from_binance_interval(s: &str) -> Option<Self> {
        match s {
            "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::D1
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_binance_interval())
    }
}

impl FromStr for Timeframe {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_binance_interval(s)
            .ok_or_else(|| TraderError::InvalidInput(format!("Unsupported timeframe: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::D1.duration().as_secs(), 86400);
        assert_eq!(Timeframe::D1.as_millis(), 86_400_000);
    }

    #[test]
    fn test_timeframe_binance() {
        assert_eq!(Timeframe::D1.to_binance_interval(), "1d");
        assert_eq!(Timeframe::from_binance_interval("1d"), Some(Timeframe::D1));
        assert_eq!(Timeframe::from_binance_interval("4h"), None);
    }

    #[test]
    fn test_timeframe_from_str() {
        assert_eq!("1d".parse::<Timeframe>().unwrap(), Timeframe::D1);
        assert!("1w".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_timeframe_serde() {
        let json = serde_json::to_string(&Timeframe::D1).unwrap();
        assert_eq!(json, "\"1d\"");
        let parsed: Timeframe = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Timeframe::D1);
    }
}
