//! Label algebras
//!
//! A label algebra replaces the scalar edge weight of classic shortest-path
//! search. `accumulate` computes the label reached by traversing a
//! transaction, `improves` is a strict "better than" predicate and
//! `worst_label` marks a node as unreached. The engine never inspects a
//! label beyond these three operations.
//!
//! Algebras are consulted afresh for every relaxation round, so an
//! implementation may read external state (e.g. live market rates) that the
//! caller mutates between hops.

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::graph::Transaction;

pub trait LabelAlgebra<N, D> {
    type Label: Clone;

    /// Label meaning "unreached"
    fn worst_label(&self) -> Self::Label;

    /// Label obtained by traversing `arc` starting from `label`
    fn accumulate(&self, arc: Transaction<'_, N, D>, label: &Self::Label) -> Self::Label;

    /// Whether `candidate` is strictly better than `current`
    fn improves(&self, candidate: &Self::Label, current: &Self::Label) -> bool;
}

/// Label algebra whose `accumulate` has to await, e.g. a quote fetched from
/// a live price source. The engine awaits one call at a time.
#[async_trait(?Send)]
pub trait AsyncLabelAlgebra<N, D> {
    type Label: Clone;

    fn worst_label(&self) -> Self::Label;

    async fn accumulate(&self, arc: Transaction<'_, N, D>, label: &Self::Label) -> Self::Label;

    fn improves(&self, candidate: &Self::Label, current: &Self::Label) -> bool;
}

/// Algebra assembled from a worst label and two closures
pub struct FnAlgebra<L, A, I> {
    worst: L,
    accumulate: A,
    improves: I,
}

impl<L, A, I> FnAlgebra<L, A, I> {
    pub fn new(worst: L, accumulate: A, improves: I) -> Self {
        Self {
            worst,
            accumulate,
            improves,
        }
    }
}

impl<N, D, L, A, I> LabelAlgebra<N, D> for FnAlgebra<L, A, I>
where
    L: Clone,
    A: Fn(Transaction<'_, N, D>, &L) -> L,
    I: Fn(&L, &L) -> bool,
{
    type Label = L;

    fn worst_label(&self) -> L {
        self.worst.clone()
    }

    fn accumulate(&self, arc: Transaction<'_, N, D>, label: &L) -> L {
        (self.accumulate)(arc, label)
    }

    fn improves(&self, candidate: &L, current: &L) -> bool {
        (self.improves)(candidate, current)
    }
}

/// Maximise the product of per-transaction rates (token amounts through a
/// chain of swaps). Unreached is `-inf`.
pub struct MaxProduct<N, D, R> {
    rate: R,
    _arc: PhantomData<fn(&N, &D)>,
}

impl<N, D, R> MaxProduct<N, D, R>
where
    R: Fn(Transaction<'_, N, D>) -> f64,
{
    pub fn new(rate: R) -> Self {
        Self {
            rate,
            _arc: PhantomData,
        }
    }
}

impl<N, D, R> LabelAlgebra<N, D> for MaxProduct<N, D, R>
where
    R: Fn(Transaction<'_, N, D>) -> f64,
{
    type Label = f64;

    fn worst_label(&self) -> f64 {
        f64::NEG_INFINITY
    }

    fn accumulate(&self, arc: Transaction<'_, N, D>, label: &f64) -> f64 {
        label * (self.rate)(arc)
    }

    fn improves(&self, candidate: &f64, current: &f64) -> bool {
        candidate > current
    }
}

/// Classic additive shortest path: minimise the summed cost. Unreached is
/// `+inf`.
pub struct MinSum<N, D, C> {
    cost: C,
    _arc: PhantomData<fn(&N, &D)>,
}

impl<N, D, C> MinSum<N, D, C>
where
    C: Fn(Transaction<'_, N, D>) -> f64,
{
    pub fn new(cost: C) -> Self {
        Self {
            cost,
            _arc: PhantomData,
        }
    }
}

impl<N, D, C> LabelAlgebra<N, D> for MinSum<N, D, C>
where
    C: Fn(Transaction<'_, N, D>) -> f64,
{
    type Label = f64;

    fn worst_label(&self) -> f64 {
        f64::INFINITY
    }

    fn accumulate(&self, arc: Transaction<'_, N, D>, label: &f64) -> f64 {
        label + (self.cost)(arc)
    }

    fn improves(&self, candidate: &f64, current: &f64) -> bool {
        candidate < current
    }
}
