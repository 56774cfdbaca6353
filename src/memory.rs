use sysinfo::System;

/// メモリ制限でセグメント長を縮めるときの下限。
pub const MIN_SEGMENT_LENGTH: u64 = 1 << 16;

/// システムの物理メモリ総量を取得（バイト単位）
pub fn get_total_memory() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory()
}

/// 篩 1 本のメモリ使用量を推定（バイト単位）
/// 1 整数 1 ビットで、ワード境界までの切り上げ分を含む
pub fn estimate_sieve_memory(extent: u64) -> u64 {
    extent.div_ceil(64) * 8
}

/// 小素数テーブル + 同時に生きるセグメント篩の合計メモリを推定（バイト単位）
pub fn estimate_peak_memory(
    small_primes_limit: u64,
    segment_length: u64,
    concurrent_segments: u64,
) -> u64 {
    estimate_sieve_memory(small_primes_limit)
        .saturating_add(estimate_sieve_memory(segment_length).saturating_mul(concurrent_segments))
}

/// メモリ制限に基づいてセグメント長を決める
/// requested: 設定上のセグメント長の上限
/// memory_usage_percent: 物理メモリの何%まで使用するか (1.0 ~ 100.0)
/// concurrent_segments: 同時に確保されるセグメント篩の本数（並列時はスレッド数）
/// returns: requested 以下、MIN_SEGMENT_LENGTH 以上のセグメント長
pub fn fit_segment_length(
    requested: u64,
    small_primes_limit: u64,
    concurrent_segments: u64,
    memory_usage_percent: f64,
    total_memory: u64,
) -> u64 {
    let percent = memory_usage_percent.clamp(1.0, 100.0);
    let allowed = (total_memory as f64 * percent / 100.0) as u64;

    // 小素数テーブルは常に 1 本生きている
    let for_segments = allowed.saturating_sub(estimate_sieve_memory(small_primes_limit));
    let per_segment = for_segments / concurrent_segments.max(1);

    // バイト → ビット（1 ビット 1 整数）
    let fitted = per_segment.saturating_mul(8);

    let min_size = MIN_SEGMENT_LENGTH.min(requested);
    let segment_length = fitted.clamp(min_size, requested);
    if segment_length < requested {
        log::info!(
            "Segment length reduced from {} to {} to stay within {:.0}% of physical memory",
            requested,
            segment_length,
            percent
        );
    }
    segment_length
}

/// メモリ使用量の情報を表示用に取得
pub fn get_memory_info(
    small_primes_limit: u64,
    segment_length: u64,
    concurrent_segments: u64,
) -> MemoryInfo {
    MemoryInfo {
        total_memory: get_total_memory(),
        small_primes_memory: estimate_sieve_memory(small_primes_limit),
        segment_memory: estimate_sieve_memory(segment_length),
        estimated_peak: estimate_peak_memory(small_primes_limit, segment_length, concurrent_segments),
    }
}

#[derive(Debug, Clone)]
pub struct MemoryInfo {
    pub total_memory: u64,
    pub small_primes_memory: u64,
    pub segment_memory: u64,
    pub estimated_peak: u64,
}

impl MemoryInfo {
    pub fn usage_percent(&self) -> f64 {
        if self.total_memory == 0 {
            return 0.0;
        }
        self.estimated_peak as f64 / self.total_memory as f64 * 100.0
    }

    pub fn format(&self) -> String {
        const MIB: f64 = 1024.0 * 1024.0;
        format!(
            "Memory: system {:.1}GB, small primes {:.1}MB, segment {:.1}MB, estimated peak {:.1}MB ({:.1}%)",
            self.total_memory as f64 / (MIB * 1024.0),
            self.small_primes_memory as f64 / MIB,
            self.segment_memory as f64 / MIB,
            self.estimated_peak as f64 / MIB,
            self.usage_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1 << 30;

    #[test]
    fn sieve_memory_is_one_bit_per_value() {
        assert_eq!(estimate_sieve_memory(1), 8);
        assert_eq!(estimate_sieve_memory(64), 8);
        assert_eq!(estimate_sieve_memory(65), 16);
        assert_eq!(estimate_sieve_memory(1 << 30), 128 * 1024 * 1024);
    }

    #[test]
    fn peak_counts_every_concurrent_segment() {
        let one = estimate_peak_memory(1 << 20, 1 << 20, 1);
        let four = estimate_peak_memory(1 << 20, 1 << 20, 4);
        assert_eq!(four - one, 3 * estimate_sieve_memory(1 << 20));
    }

    #[test]
    fn ample_memory_keeps_requested_length() {
        assert_eq!(fit_segment_length(1 << 30, 1 << 20, 1, 50.0, 64 * GIB), 1 << 30);
    }

    #[test]
    fn tight_memory_shrinks_segments() {
        // 1GiB の 10% ≒ 102MiB を 8 スレッドで分ける
        let len = fit_segment_length(1 << 30, 1 << 20, 8, 10.0, GIB);
        assert!(len < 1 << 30);
        assert!(len >= MIN_SEGMENT_LENGTH);
        assert!(estimate_peak_memory(1 << 20, len, 8) <= GIB / 10 + 8 * 8);
    }

    #[test]
    fn never_goes_below_minimum() {
        assert_eq!(fit_segment_length(1 << 30, 1 << 34, 4, 1.0, GIB), MIN_SEGMENT_LENGTH);
        // requested が最小値より小さければそのまま
        assert_eq!(fit_segment_length(100, 1 << 34, 4, 1.0, GIB), 100);
    }

    #[test]
    fn memory_info_formats_usage() {
        let info = MemoryInfo {
            total_memory: 16 * GIB,
            small_primes_memory: 64 << 20,
            segment_memory: 128 << 20,
            estimated_peak: 192 << 20,
        };
        let line = info.format();
        assert!(line.contains("system 16.0GB"), "{line}");
        assert!(line.contains("estimated peak 192.0MB"), "{line}");
        assert!((info.usage_percent() - 1.171875).abs() < 1e-9);
    }
}
