#![allow(dead_code)]

use sosu_count::config::{Config, SmallPrimesBound};
use sosu_count::PrimeCounter;

/// 試し割りによる素数判定（テスト専用の参照実装）。
pub fn trial_division_is_prime(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3i64;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// `[start, start + length)` を試し割りで数える。
pub fn trial_division_count(start: i64, length: i64) -> u64 {
    if length <= 0 {
        return 0;
    }
    (start..start + length)
        .filter(|&n| trial_division_is_prime(n))
        .count() as u64
}

/// 区間全体を 1 本の配列で篩う素朴な実装（`[0, end)` を全部持つ）。
pub fn naive_sieve_count(start: i64, length: i64) -> u64 {
    if length <= 0 {
        return 0;
    }
    let end = (start + length).max(0) as usize;
    if end < 3 {
        return 0;
    }
    let mut is_prime = vec![true; end];
    is_prime[0] = false;
    is_prime[1] = false;
    let mut p = 2usize;
    while p * p < end {
        if is_prime[p] {
            let mut multiple = p * p;
            while multiple < end {
                is_prime[multiple] = false;
                multiple += p;
            }
        }
        p += 1;
    }
    let from = start.max(0) as usize;
    is_prime[from..].iter().filter(|&&b| b).count() as u64
}

/// 区間の上端に合わせた小さな小素数テーブルを使うカウンタ。
pub fn adaptive_counter(max_segment_length: u64, parallel: bool) -> PrimeCounter {
    PrimeCounter::new(&Config {
        max_segment_length,
        small_primes: SmallPrimesBound::Adaptive,
        parallel,
        ..Config::default()
    })
    .expect("valid config")
}
