//! 동기화 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::modules::SyncReport;

/// 여러 심볼에 대한 동기화 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// 총 시도 횟수
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 새 데이터 없음 (이미 최신)
    pub unchanged: usize,
    /// 새로 저장된 총 캔들 수
    pub inserted: usize,
    /// 이미 저장돼 있던 캔들 수
    pub duplicates: usize,
    /// 소스 요청 횟수
    pub pages: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공한 실행 결과를 집계
    pub fn record_success(&mut self, report: &SyncReport) {
        self.total += 1;
        self.success += 1;
        self.inserted += report.inserted();
        self.duplicates += report.duplicates();
        self.pages += report.pages();
        if report.inserted() == 0 {
            self.unchanged += 1;
        }
    }

    /// 실패한 실행을 집계
    pub fn record_error(&mut self) {
        self.total += 1;
        self.errors += 1;
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            unchanged = self.unchanged,
            inserted = self.inserted,
            duplicates = self.duplicates,
            pages = self.pages,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "동기화 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut stats = SyncStats::new();
        assert_eq!(stats.success_rate(), 0.0);
        stats.record_error();
        stats.total += 1;
        stats.success += 1;
        assert!((stats.success_rate() - 50.0).abs() < f64::EPSILON);
    }
}
