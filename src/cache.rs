//! Canonical instance caches
//!
//! Small integers, the integral rationals they reduce to, and short symbols are
//! shared process-wide so that repeated construction hands back the same
//! allocation. Identity is only ever used as a fast path in front of structural
//! equality; nothing here is required for correctness.
//!
//! Each table sits behind its own `RwLock`. Lookups take the read lock; a miss
//! allocates outside any lock and then inserts under the write lock, re-checking
//! the slot so the first stored instance stays canonical.

use std::sync::{Arc, PoisonError, RwLock};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Smallest value held in the integer and rational tables
pub const CACHE_MIN: i64 = -256;

/// Largest value held in the integer and rational tables
pub const CACHE_MAX: i64 = 255;

/// Symbols at most this many characters long are interned
pub const SYMBOL_MAX_LEN: usize = 3;

const SLOTS: usize = (CACHE_MAX - CACHE_MIN + 1) as usize;

static INTEGERS: Lazy<RwLock<Vec<Option<Arc<i64>>>>> =
    Lazy::new(|| RwLock::new(vec![None; SLOTS]));

static RATIONALS: Lazy<RwLock<Vec<Option<Arc<BigRational>>>>> = Lazy::new(|| {
    let mut table = vec![None; SLOTS];
    // 0 and 1 live in their ordinary slots from the start.
    for v in [0i64, 1] {
        if let Some(i) = slot(v) {
            table[i] = Some(Arc::new(BigRational::from_integer(BigInt::from(v))));
        }
    }
    RwLock::new(table)
});

static SYMBOLS: Lazy<RwLock<FxHashMap<String, Arc<str>>>> =
    Lazy::new(|| RwLock::new(FxHashMap::default()));

/// Slot index for `v`, or `None` when it falls outside the cached range
pub fn slot(v: i64) -> Option<usize> {
    if (CACHE_MIN..=CACHE_MAX).contains(&v) {
        Some((v - CACHE_MIN) as usize)
    } else {
        None
    }
}

/// Canonical shared integer
pub(crate) fn integer(v: i64) -> Arc<i64> {
    let Some(i) = slot(v) else {
        return Arc::new(v);
    };

    if let Some(p) = &INTEGERS.read().unwrap_or_else(PoisonError::into_inner)[i] {
        return Arc::clone(p);
    }

    let fresh = Arc::new(v);
    let mut table = INTEGERS.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(table[i].get_or_insert(fresh))
}

/// Canonical shared rational; only integral values in range are cached
pub(crate) fn rational(r: BigRational) -> Arc<BigRational> {
    let index = if r.is_integer() {
        r.numer().to_i64().and_then(slot)
    } else {
        None
    };
    let Some(i) = index else {
        return Arc::new(r);
    };

    if let Some(p) = &RATIONALS.read().unwrap_or_else(PoisonError::into_inner)[i] {
        return Arc::clone(p);
    }

    let fresh = Arc::new(r);
    let mut table = RATIONALS.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(table[i].get_or_insert(fresh))
}

/// Symbol text, interned when short
pub(crate) fn symbol(text: &str) -> Arc<str> {
    if let Some(p) = SYMBOLS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(text)
    {
        return Arc::clone(p);
    }

    if text.chars().count() > SYMBOL_MAX_LEN {
        return Arc::from(text);
    }

    intern(text)
}

fn intern(text: &str) -> Arc<str> {
    let mut table = SYMBOLS.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(
        table
            .entry(text.to_string())
            .or_insert_with(|| Arc::from(text)),
    )
}

/// Intern the given symbols regardless of their length.
///
/// Used to pre-seed names the evaluator looks up constantly.
pub fn cache_symbols(symbols: &[&str]) {
    for s in symbols {
        intern(s);
    }
    log::debug!("pre-interned {} symbols", symbols.len());
}

/// Number of interned symbols
pub fn symbol_count() -> usize {
    SYMBOLS.read().unwrap_or_else(PoisonError::into_inner).len()
}
