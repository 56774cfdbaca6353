//! 整数区間 `[base, base + extent)` の素数性を 1 ビット 1 整数で保持する篩。
//!
//! - 小素数テーブル（`base = 0`）と各セグメントの両方で使います。
//! - セルは絶対値 `value` で指定し、内部では `value - base` をビット位置にします。
//! - 生成直後は全セルが「素数候補」(true)。合成数マークは単調で、true に戻すことはありません。
//! - サイズは生成時に固定され、ストレージは drop で解放されます。

use bitvec::prelude::*;

use crate::engine_types::{CountError, CountResult, SieveKind};

type Cells = BitVec<usize, Lsb0>;

#[derive(Debug, Clone)]
pub struct Sieve {
    base: u64,
    cells: Cells,
}

impl Sieve {
    /// `[base, base + extent)` を表す篩を確保し、全セルを素数候補で初期化する。
    ///
    /// 確保できない場合は `CountError::ResourceExhaustion` を返します（プロセスは落としません）。
    /// `extent` は正でなければなりません。
    pub fn new(base: u64, extent: u64, kind: SieveKind) -> CountResult<Self> {
        assert!(extent > 0, "sieve extent must be positive");
        assert!(
            base.checked_add(extent).is_some(),
            "sieve range [{base}, {base} + {extent}) overflows u64"
        );

        let exhausted = || CountError::ResourceExhaustion { what: kind, extent };

        let len = usize::try_from(extent).map_err(|_| exhausted())?;
        if len > BitSlice::<usize, Lsb0>::MAX_BITS {
            return Err(exhausted());
        }
        let word_count = len.div_ceil(usize::BITS as usize);

        let mut words: Vec<usize> = Vec::new();
        words
            .try_reserve_exact(word_count)
            .map_err(|_| exhausted())?;
        // 全ビット 1 = 全セル「素数候補」
        words.resize(word_count, usize::MAX);

        let mut cells = Cells::from_vec(words);
        cells.truncate(len);

        Ok(Self { base, cells })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn extent(&self) -> u64 {
        self.cells.len() as u64
    }

    /// 表す区間の上端（排他的）。
    pub fn end(&self) -> u64 {
        self.base + self.extent()
    }

    pub fn contains(&self, value: u64) -> bool {
        self.base <= value && value < self.end()
    }

    /// `value` を合成数としてマークする。既にマーク済みなら何もしない。
    ///
    /// # Panics
    /// `value` が `[base, base + extent)` の外にある場合。
    pub fn mark_composite(&mut self, value: u64) {
        let idx = self.index_of(value);
        self.cells.set(idx, false);
    }

    /// `value` のセルが素数候補のままかどうか。
    ///
    /// # Panics
    /// `value` が `[base, base + extent)` の外にある場合。
    pub fn is_prime(&self, value: u64) -> bool {
        self.cells[self.index_of(value)]
    }

    /// `first, first + step, first + 2·step, ...` のうち区間内にあるものをすべて合成数にする。
    ///
    /// `first` が区間の上端以上なら何もしません。
    pub fn mark_multiples(&mut self, first: u64, step: u64) {
        assert!(step > 0, "step must be positive");
        if first >= self.end() {
            return;
        }
        let start = self.index_of(first);
        let step = step as usize;
        let len = self.cells.len();

        let mut idx = start;
        while idx < len {
            self.cells.set(idx, false);
            idx = match idx.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
    }

    /// 素数候補のまま残っているセルの個数。
    pub fn count_primes(&self) -> u64 {
        self.cells.count_ones() as u64
    }

    /// 素数候補のまま残っている値を昇順に列挙する。
    pub fn primes(&self) -> impl Iterator<Item = u64> + '_ {
        let base = self.base;
        self.cells.iter_ones().map(move |idx| base + idx as u64)
    }

    fn index_of(&self, value: u64) -> usize {
        assert!(
            self.contains(value),
            "value {value} is outside sieve range [{}, {})",
            self.base,
            self.end()
        );
        (value - self.base) as usize
    }
}
