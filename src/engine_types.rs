use std::error::Error;
use std::fmt;

// 計数エンジン（篩・セグメント処理）と外側の層（設定・CLI）で共有するエラー型と進捗情報の定義。
//
// - コア（`sieve` / `sieve_math` / `count_engine`）は `CountResult` を返し、失敗の種類を呼び出し側が判別できるようにします。
// - 設定ファイルの読み書きや CLI のように I/O を伴う層は、従来どおり Box 化した `PrimeResult` を使います。

/// 設定・CLI 層の結果型。
///
/// エラーは `Send + Sync` な Box でラップされ、`CountError` もそのまま `?` で流し込めます。
pub type PrimeResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 計数コアの結果型。
pub type CountResult<T> = Result<T, CountError>;

/// どの篩の確保に失敗したかを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SieveKind {
    /// `[0, U)` を覆う小素数テーブル。
    SmallPrimes,
    /// 対象区間の 1 セグメント。
    Segment,
}

impl fmt::Display for SieveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SieveKind::SmallPrimes => f.write_str("small-primes table"),
            SieveKind::Segment => f.write_str("segment sieve"),
        }
    }
}

/// 計数コアが返すエラー。
///
/// いずれも「この呼び出しにとって致命的」で、部分的な個数は返しません。
/// リトライ（例えばセグメント長を縮めて再実行する）かどうかは呼び出し側の方針に任せます。
#[derive(Debug, Clone, PartialEq)]
pub enum CountError {
    /// 篩のストレージを確保できなかった。
    ResourceExhaustion { what: SieveKind, extent: u64 },
    /// `start + length` が i64 の範囲を超える。
    IntervalOverflow { start: i64, length: i64 },
    /// 設定値が不正。
    InvalidConfig(String),
}

impl fmt::Display for CountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountError::ResourceExhaustion { what, extent } => write!(
                f,
                "failed to allocate {what} of length {extent}; \
                 this can happen if there is insufficient physical memory on the system"
            ),
            CountError::IntervalOverflow { start, length } => write!(
                f,
                "interval end overflows i64 (start={start}, length={length})"
            ),
            CountError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl Error for CountError {}

/// 区間計数の進捗情報。
///
/// - `processed` は単調に増加し、`processed <= total` を維持します。
/// - `total` は 2 未満を切り詰めた後の区間長です。
/// - `eta_secs` は残り時間の概算で、`None` は「まだ計算できない」ことを意味します。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// 篩い終えた整数の個数。
    pub processed: u64,
    /// 篩う予定の整数の個数。
    pub total: u64,
    /// 推定残り時間（秒）。
    pub eta_secs: Option<u64>,
}

/// 現在の進捗と経過時間から ETA（残り時間の秒数）を推定する。
///
/// 進捗 0% の間は `None` を返します。
pub fn compute_eta(processed: u64, total: u64, elapsed_secs: f64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    let done = processed.min(total) as f64 / total as f64;
    if done > 0.0 {
        let total_time = elapsed_secs / done;
        Some(((total_time - elapsed_secs).max(0.0)).round() as u64)
    } else {
        None
    }
}
