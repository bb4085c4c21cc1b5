//! Generalized bisection for transition windows.
//!
//! Ordinary binary search assumes a single monotonic transition. Here an
//! interior sample may belong to a third class entirely (noise, an
//! unresolved reading, a short-lived detour), so when the midpoint
//! matches neither end the search fans out into both halves.
//!
//! The search is driven by an explicit work-list rather than recursion,
//! and is capped at a fixed number of examined windows. Results come out
//! in left-to-right order.

use hornet_api::{Boundary, HornetError, HornetResult};
use std::collections::HashMap;
use std::marker::PhantomData;

/// A continuous axis to search along.
pub trait SearchAxis {
    /// A position on the axis.
    type Index: Copy + Eq + std::hash::Hash + std::fmt::Debug;

    /// The equivalence-class key of a position.
    type Key;

    /// Look up the key at `idx`. Called at most once per index per search.
    fn key_at(&mut self, idx: Self::Index) -> HornetResult<Self::Key>;

    /// Do two keys belong to the same class?
    ///
    /// Need not be transitive. Only ever called pairwise.
    fn same_class(&self, a: &Self::Key, b: &Self::Key) -> bool;

    /// Distance between two positions.
    fn metric(&self, lo: Self::Index, hi: Self::Index) -> u64;

    /// A position between `lo` and `hi`, already snapped to whatever grid
    /// the axis lives on.
    fn mid(&self, lo: Self::Index, hi: Self::Index) -> Self::Index;
}

/// A [SearchAxis] assembled from closures, comparing keys with `==`.
///
/// `I` is the index type, `V` the looked-up value and `Key` its
/// comparable projection.
pub struct FnAxis<I, V, Key, A, K, M, D> {
    /// Index to value.
    pub array_fn: A,

    /// Value to comparable key.
    pub key_fn: K,

    /// Distance between two indices.
    pub idx_metric_fn: M,

    /// Snapped midpoint of two indices.
    pub idx_mid_fn: D,

    _marker: PhantomData<fn(I) -> (V, Key)>,
}

impl<I, V, Key, A, K, M, D> FnAxis<I, V, Key, A, K, M, D>
where
    A: FnMut(I) -> HornetResult<V>,
    K: Fn(&V) -> Key,
    M: Fn(I, I) -> u64,
    D: Fn(I, I) -> I,
{
    /// Assemble an axis from its lookup, key, metric and midpoint
    /// functions.
    pub fn new(
        array_fn: A,
        key_fn: K,
        idx_metric_fn: M,
        idx_mid_fn: D,
    ) -> Self {
        Self {
            array_fn,
            key_fn,
            idx_metric_fn,
            idx_mid_fn,
            _marker: PhantomData,
        }
    }
}

impl<I, V, Key, A, K, M, D> SearchAxis for FnAxis<I, V, Key, A, K, M, D>
where
    I: Copy + Eq + std::hash::Hash + std::fmt::Debug,
    Key: PartialEq,
    A: FnMut(I) -> HornetResult<V>,
    K: Fn(&V) -> Key,
    M: Fn(I, I) -> u64,
    D: Fn(I, I) -> I,
{
    type Index = I;
    type Key = Key;

    fn key_at(&mut self, idx: I) -> HornetResult<Key> {
        let v = (self.array_fn)(idx)?;
        Ok((self.key_fn)(&v))
    }

    fn same_class(&self, a: &Key, b: &Key) -> bool {
        a == b
    }

    fn metric(&self, lo: I, hi: I) -> u64 {
        (self.idx_metric_fn)(lo, hi)
    }

    fn mid(&self, lo: I, hi: I) -> I {
        (self.idx_mid_fn)(lo, hi)
    }
}

struct KeyCache<X: SearchAxis> {
    keys: HashMap<X::Index, X::Key>,
}

impl<X: SearchAxis> KeyCache<X> {
    fn ensure(&mut self, axis: &mut X, idx: X::Index) -> HornetResult<()> {
        if !self.keys.contains_key(&idx) {
            let key = axis.key_at(idx)?;
            self.keys.insert(idx, key);
        }
        Ok(())
    }

    fn same(&self, axis: &X, a: X::Index, b: X::Index) -> bool {
        match (self.keys.get(&a), self.keys.get(&b)) {
            (Some(a), Some(b)) => axis.same_class(a, b),
            _ => false,
        }
    }
}

/// Locate every transition between `start` and `end`, narrowed to within
/// `delta`.
///
/// Returns `[Boundary::NotFound]` when `start` and `end` share a class.
/// A fan-out half whose ends turn out to match contributes a
/// [Boundary::NotFound] of its own. A window the axis cannot split any
/// further (its midpoint does not shrink both halves) is reported as
/// found even if wider than `delta`.
///
/// Errors if more than `max_steps` windows would be examined, or if the
/// axis fails a lookup.
pub fn boundary_search<X: SearchAxis>(
    axis: &mut X,
    start: X::Index,
    end: X::Index,
    delta: u64,
    max_steps: usize,
) -> HornetResult<Vec<Boundary<X::Index>>> {
    let mut cache = KeyCache::<X> {
        keys: HashMap::new(),
    };
    let mut out = Vec::new();
    let mut work = vec![(start, end)];
    let mut steps = 0usize;

    while let Some((lo, hi)) = work.pop() {
        steps += 1;
        if steps > max_steps {
            return Err(HornetError::other(format!(
                "boundary search between {start:?} and {end:?} exceeded \
                 {max_steps} steps"
            )));
        }

        cache.ensure(axis, lo)?;
        cache.ensure(axis, hi)?;

        if cache.same(axis, lo, hi) {
            out.push(Boundary::NotFound);
            continue;
        }

        let width = axis.metric(lo, hi);
        if width <= delta {
            out.push(Boundary::Found { lo, hi });
            continue;
        }

        let mid = axis.mid(lo, hi);
        if axis.metric(lo, mid) >= width || axis.metric(mid, hi) >= width {
            out.push(Boundary::Found { lo, hi });
            continue;
        }

        cache.ensure(axis, mid)?;

        if cache.same(axis, lo, mid) {
            work.push((mid, hi));
        } else if cache.same(axis, mid, hi) {
            work.push((lo, mid));
        } else {
            // popped in reverse, so the left half is reported first
            work.push((mid, hi));
            work.push((lo, mid));
        }
    }

    Ok(out)
}
