use std::fmt::Write as _;

use chrono::Local;
use serde::Serialize;

use crate::config::OutputFormat;
use crate::count_engine::CountSummary;
use crate::engine_types::PrimeResult;

/// 1 回の区間計数のレポート
#[derive(Debug, Clone, Serialize)]
pub struct CountReport {
    /// 呼び出し時の区間（切り詰め前）
    pub start: i64,
    pub length: i64,
    pub count: u64,
    pub segments: u64,
    pub small_primes_limit: u64,
    pub max_segment_length: u64,
    pub parallel: bool,
    pub execution_time_ms: u64,
    pub generated_at: String,
    pub tool_version: String,
}

impl CountReport {
    pub fn new(
        start: i64,
        length: i64,
        summary: &CountSummary,
        parallel: bool,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            start,
            length,
            count: summary.count,
            segments: summary.segments,
            small_primes_limit: summary.small_primes_limit,
            max_segment_length: summary.max_segment_length,
            parallel,
            execution_time_ms,
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Prime Count Report ===");
        let _ = writeln!(
            out,
            "Interval: [{}, {}+{})",
            self.start, self.start, self.length
        );
        let _ = writeln!(out, "Count: {}", self.count);
        let _ = writeln!(out, "Segments: {}", self.segments);
        let _ = writeln!(out, "Small primes limit: {}", self.small_primes_limit);
        let _ = writeln!(out, "Max segment length: {}", self.max_segment_length);
        let _ = writeln!(out, "Parallel: {}", self.parallel);
        let _ = writeln!(out, "Execution Time: {} ms", self.execution_time_ms);
        let _ = writeln!(out, "Generated: {}", self.generated_at);
        let _ = write!(out, "Tool Version: {}", self.tool_version);
        out
    }

    pub fn to_json(&self) -> PrimeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render(&self, format: OutputFormat) -> PrimeResult<String> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Json => self.to_json(),
        }
    }
}
