use std::time::Instant;

use rayon::prelude::*;

use crate::config::{Config, SmallPrimesBound};
use crate::engine_types::{compute_eta, CountError, CountResult, Progress, SieveKind};
use crate::memory;
use crate::sieve::Sieve;
use crate::sieve_math::{find_small_primes, small_primes_limit_for, SMALL_PRIMES_LIMIT};

/// `[start, start + length)` に含まれる素数の個数を数える。
///
/// - `length <= 0` の空区間、および上端が 2 以下の区間は 0。
/// - `start < 2` の場合は区間を `[2, start + length)` に切り詰める（負数・0・1 は素数ではない）。
/// - 小素数テーブルは `[0, SMALL_PRIMES_LIMIT)` を 1 回だけ構築し、区間は `MAX_SEGMENT_LENGTH`
///   以下のセグメントに分けて逐次篩う。
///
/// 篩の確保に失敗した場合は部分的な個数を返さず `ResourceExhaustion` を返します。
pub fn count_primes_in_interval(start: i64, length: i64) -> CountResult<u64> {
    PrimeCounter::default().count(start, length)
}

/// `[segment_start, segment_start + segment_length)` の素数の個数を数える。
///
/// - `segment_start >= 2`、`segment_length > 0` が前提。
/// - `small_primes` は `base = 0` で、`√(segment_end - 1)` 以下の素数をすべて含んでいなければならない。
/// - セグメント内に小素数 p 自身が入っている場合、p は合成数にしない。
pub fn count_segment(
    segment_start: u64,
    segment_length: u64,
    small_primes: &Sieve,
) -> CountResult<u64> {
    assert!(segment_start >= 2, "segments start at 2 or above");
    assert!(segment_length > 0, "segment length must be positive");
    assert_eq!(small_primes.base(), 0, "small-primes table must start at 0");

    let segment_end = segment_start + segment_length;
    let table_end = small_primes.end() as u128;
    assert!(
        table_end * table_end >= segment_end as u128,
        "small-primes table [0, {}) cannot sieve up to {}",
        small_primes.end(),
        segment_end
    );

    let mut segment = Sieve::new(segment_start, segment_length, SieveKind::Segment)?;

    for p in small_primes.primes() {
        // p² >= segment_end なら、最小素因数が p の合成数はこのセグメントに存在しない
        if p.saturating_mul(p) >= segment_end {
            break;
        }

        // セグメント内で最初の p の倍数のオフセット
        let rem = segment_start % p;
        let mut offset = if rem == 0 { 0 } else { p - rem };
        if segment_start + offset == p {
            offset += p;
        }

        if offset < segment_length {
            segment.mark_multiples(segment_start + offset, p);
        }
    }

    Ok(segment.count_primes())
}

/// 2 未満を切り詰めた後の篩い対象区間 `[start, end)`（`2 <= start < end <= i64::MAX`）。
///
/// 空区間なら `None`。
pub fn normalize_interval(start: i64, length: i64) -> CountResult<Option<(u64, u64)>> {
    if length <= 0 {
        return Ok(None);
    }
    let end = start
        .checked_add(length)
        .ok_or(CountError::IntervalOverflow { start, length })?;
    if end <= 2 {
        return Ok(None);
    }
    let start = start.max(2);
    Ok(Some((start as u64, end as u64)))
}

/// 1 回の計数の結果と、実際に使ったパラメータ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSummary {
    pub count: u64,
    /// 篩ったセグメント数（空区間なら 0）。
    pub segments: u64,
    /// 構築した小素数テーブルの上端（空区間でテーブルを作らなかった場合は 0）。
    pub small_primes_limit: u64,
    /// 実際に使ったセグメント長の上限。
    pub max_segment_length: u64,
}

/// 設定付きの分割篩カウンタ。
///
/// `PrimeCounter::default()` は `SMALL_PRIMES_LIMIT` の固定テーブル・`MAX_SEGMENT_LENGTH`・逐次実行で、
/// `count_primes_in_interval` と同じ振る舞いになります。
#[derive(Debug, Clone)]
pub struct PrimeCounter {
    max_segment_length: u64,
    small_primes: SmallPrimesBound,
    parallel: bool,
    memory_usage_percent: Option<f64>,
}

impl Default for PrimeCounter {
    fn default() -> Self {
        let cfg = Config::default();
        Self {
            max_segment_length: cfg.max_segment_length,
            small_primes: cfg.small_primes,
            parallel: cfg.parallel,
            memory_usage_percent: cfg.memory_usage_percent,
        }
    }
}

impl PrimeCounter {
    pub fn new(cfg: &Config) -> CountResult<Self> {
        cfg.validate()?;
        Ok(Self {
            max_segment_length: cfg.max_segment_length,
            small_primes: cfg.small_primes,
            parallel: cfg.parallel,
            memory_usage_percent: cfg.memory_usage_percent,
        })
    }

    pub fn count(&self, start: i64, length: i64) -> CountResult<u64> {
        self.count_with_progress(start, length, |_| {})
            .map(|summary| summary.count)
    }

    /// 区間の素数を数え、各セグメント（並列時は各セグメントグループ）の完了ごとに `progress_cb` を呼ぶ。
    pub fn count_with_progress(
        &self,
        start: i64,
        length: i64,
        mut progress_cb: impl FnMut(Progress),
    ) -> CountResult<CountSummary> {
        let Some((start, end)) = normalize_interval(start, length)? else {
            return Ok(CountSummary {
                count: 0,
                segments: 0,
                small_primes_limit: 0,
                max_segment_length: self.max_segment_length,
            });
        };

        let start_time = Instant::now();
        let total = end - start;

        let small_primes_limit = match self.small_primes {
            SmallPrimesBound::Full => SMALL_PRIMES_LIMIT,
            SmallPrimesBound::Adaptive => small_primes_limit_for(end),
        };

        let concurrent_segments = if self.parallel {
            rayon::current_num_threads().max(1) as u64
        } else {
            1
        };
        let segment_length = match self.memory_usage_percent {
            Some(percent) => memory::fit_segment_length(
                self.max_segment_length,
                small_primes_limit,
                concurrent_segments,
                percent,
                memory::get_total_memory(),
            ),
            None => self.max_segment_length,
        };

        let mem_info = memory::get_memory_info(small_primes_limit, segment_length, concurrent_segments);
        log::info!(
            "Counting primes in [{}, {}): segment length {}, {} segment(s), parallel: {}",
            start,
            end,
            segment_length,
            total.div_ceil(segment_length),
            self.parallel
        );
        log::info!("{}", mem_info.format());

        let small_primes = find_small_primes(small_primes_limit)?;

        let mut report = |processed: u64| {
            let elapsed = start_time.elapsed().as_secs_f64();
            progress_cb(Progress {
                processed,
                total,
                eta_secs: compute_eta(processed, total, elapsed),
            });
        };

        let (count, segments) = if self.parallel {
            count_segments_parallel(start, end, segment_length, &small_primes, &mut report)?
        } else {
            count_segments_sequential(start, end, segment_length, &small_primes, &mut report)?
        };

        // 小素数テーブルはここで解放される
        drop(small_primes);

        log::info!(
            "Counted {} primes in {} segment(s) ({:.3}s)",
            count,
            segments,
            start_time.elapsed().as_secs_f64()
        );

        Ok(CountSummary {
            count,
            segments,
            small_primes_limit,
            max_segment_length: segment_length,
        })
    }
}

fn count_segments_sequential(
    mut start: u64,
    end: u64,
    segment_length: u64,
    small_primes: &Sieve,
    report: &mut impl FnMut(u64),
) -> CountResult<(u64, u64)> {
    let total = end - start;
    let mut length = total;
    let mut num_primes = 0u64;
    let mut segments = 0u64;

    while length > segment_length {
        num_primes += count_segment(start, segment_length, small_primes)?;
        segments += 1;
        start += segment_length;
        length -= segment_length;

        log::debug!("Segment {} done, running total {}", segments, num_primes);
        report(total - length);
    }

    // 最後のセグメント（長さは (0, segment_length]）
    num_primes += count_segment(start, length, small_primes)?;
    segments += 1;
    report(total);

    Ok((num_primes, segments))
}

fn count_segments_parallel(
    start: u64,
    end: u64,
    segment_length: u64,
    small_primes: &Sieve,
    report: &mut impl FnMut(u64),
) -> CountResult<(u64, u64)> {
    // 同時に生きるセグメント篩はスレッド数まで
    let group_size = rayon::current_num_threads().max(1);
    let total_segments = (end - start).div_ceil(segment_length);
    let total_groups = total_segments.div_ceil(group_size as u64);

    let mut seg_start = start;
    let mut num_primes = 0u64;
    let mut segments = 0u64;
    let mut group_index = 0u64;

    while seg_start < end {
        group_index += 1;

        let mut group_bounds: Vec<(u64, u64)> = Vec::with_capacity(group_size);
        for _ in 0..group_size {
            if seg_start >= end {
                break;
            }
            let len = (end - seg_start).min(segment_length);
            group_bounds.push((seg_start, len));
            seg_start += len;
        }

        let counts: Vec<u64> = group_bounds
            .par_iter()
            .map(|&(low, len)| count_segment(low, len, small_primes))
            .collect::<CountResult<Vec<u64>>>()?;

        num_primes += counts.iter().sum::<u64>();
        segments += group_bounds.len() as u64;

        log::debug!(
            "Group {}/{} ({} segments) done, running total {}",
            group_index,
            total_groups,
            group_bounds.len(),
            num_primes
        );
        report(seg_start - start);
    }

    Ok((num_primes, segments))
}
