use crate::engine_types::{CountResult, SieveKind};
use crate::sieve::Sieve;

/// 小素数テーブルの上端 `U = ceil(1.42 · 2^31)`。
///
/// `U > 2^31 · √2 = √(2^63)` なので、2^63 未満の任意の合成数はこの値未満の素因数を持つ。
pub const SMALL_PRIMES_LIMIT: u64 = 3_049_426_781;

/// 1 セグメントの最大長。セグメント篩 1 本あたり 2^30 ビット（128 MiB）。
pub const MAX_SEGMENT_LENGTH: u64 = 1 << 30;

/// `n` 以下の最大の整数平方根を 2 分探索で求める。
pub fn integer_sqrt(n: u64) -> u64 {
    let mut low = 0u64;
    let mut high = n;
    while low <= high {
        let mid = low + (high - low) / 2;
        match mid.checked_mul(mid) {
            Some(val) if val == n => return mid,
            Some(val) if val < n => low = mid + 1,
            _ => high = mid - 1,
        }
    }
    high
}

/// `[start, end)` を篩うのに十分な最小の小素数テーブル上端。
///
/// 返す値 `L` は `L² >= end` を満たし、`√(end - 1)` 以下の素数をすべて含む。
pub fn small_primes_limit_for(end: u64) -> u64 {
    (integer_sqrt(end.saturating_sub(1)) + 1).max(2)
}

/// 古典的なエラトステネスの篩で `[0, limit)` の小素数テーブルを作る。
///
/// - 0 と 1 は慣例どおり合成数としてマークする。
/// - 結果のテーブルは `v < limit` について `is_prime(v)` が v の素数性と一致する。
/// - 確保に失敗した場合は `ResourceExhaustion` を返す（代替手段はない）。
pub fn find_small_primes(limit: u64) -> CountResult<Sieve> {
    assert!(limit >= 2, "small-primes table must cover 0 and 1");

    log::info!(
        "Building small-primes table [0, {}) ({:.1} MiB)",
        limit,
        limit.div_ceil(8) as f64 / (1024.0 * 1024.0)
    );

    let mut sieve = Sieve::new(0, limit, SieveKind::SmallPrimes)?;
    sieve.mark_composite(0);
    sieve.mark_composite(1);

    // i·j (j < i) は i より小さい素因数で既に消えているので i² から始めればよい
    let root = integer_sqrt(limit - 1);
    for i in 2..=root {
        if sieve.is_prime(i) {
            sieve.mark_multiples(i * i, i);
        }
    }

    log::debug!("Small-primes table ready: {} primes", sieve.count_primes());
    Ok(sieve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_primes_limit_is_ceil_of_1_42_times_2_pow_31() {
        // ceil(142 · 2^31 / 100)
        let expected = (142u64 * (1 << 31)).div_ceil(100);
        assert_eq!(SMALL_PRIMES_LIMIT, expected);
    }

    #[test]
    fn small_primes_limit_exceeds_sqrt_of_2_pow_63() {
        let sq = SMALL_PRIMES_LIMIT as u128 * SMALL_PRIMES_LIMIT as u128;
        assert!(sq > 1u128 << 63);
        assert!(integer_sqrt(i64::MAX as u64) < SMALL_PRIMES_LIMIT);
    }

    #[test]
    fn integer_sqrt_floors() {
        let cases: &[(u64, u64)] = &[
            (0, 0),
            (1, 1),
            (2, 1),
            (3, 1),
            (4, 2),
            (99, 9),
            (100, 10),
            (101, 10),
            (i64::MAX as u64, 3_037_000_499),
            (u64::MAX, u32::MAX as u64),
        ];
        for &(n, root) in cases {
            assert_eq!(integer_sqrt(n), root, "isqrt({n})");
        }
    }

    #[test]
    fn adaptive_limit_covers_the_interval() {
        assert_eq!(small_primes_limit_for(0), 2);
        assert_eq!(small_primes_limit_for(3), 2);
        assert_eq!(small_primes_limit_for(10), 4);
        assert_eq!(small_primes_limit_for(101), 11);
        for end in [2u64, 5, 26, 1_000_003, i64::MAX as u64] {
            let l = small_primes_limit_for(end) as u128;
            assert!(l * l >= end as u128, "end={end}");
        }
    }

    #[test]
    fn small_primes_below_100() {
        let sieve = find_small_primes(100).unwrap();
        let primes: Vec<u64> = sieve.primes().collect();
        assert_eq!(
            primes,
            vec![
                2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73,
                79, 83, 89, 97
            ]
        );
        assert!(!sieve.is_prime(0));
        assert!(!sieve.is_prime(1));
    }

    #[test]
    fn small_primes_count_matches_pi() {
        assert_eq!(find_small_primes(2).unwrap().count_primes(), 0);
        assert_eq!(find_small_primes(3).unwrap().count_primes(), 1);
        assert_eq!(find_small_primes(10_000).unwrap().count_primes(), 1_229);
        assert_eq!(find_small_primes(1_000_000).unwrap().count_primes(), 78_498);
    }

    #[test]
    fn square_of_prime_at_limit_boundary() {
        // 49 = 7² は limit - 1 のとき消えなければならない
        let sieve = find_small_primes(50).unwrap();
        assert!(!sieve.is_prime(49));
        assert!(sieve.is_prime(47));
    }
}
