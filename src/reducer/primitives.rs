//! Leaf reducers

use super::Reducer;
use crate::traits::Sketch;
use core::marker::PhantomData;

/// Counts every input
#[derive(Debug)]
pub struct Count<I> {
    _input: PhantomData<fn(&I)>,
}

impl<I> Count<I> {
    pub fn new() -> Self {
        Self {
            _input: PhantomData,
        }
    }
}

impl<I> Default for Count<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Clone for Count<I> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<I> Reducer for Count<I> {
    type Input = I;
    type State = u64;
    type Output = u64;

    fn init(&self) -> u64 {
        0
    }

    fn step(&self, state: &mut u64, _input: &I) {
        *state += 1;
    }

    fn complete(&self, state: u64) -> u64 {
        state
    }
}

/// Counts inputs matching a predicate
#[derive(Clone)]
pub struct CountIf<I, F> {
    predicate: F,
    _input: PhantomData<fn(&I)>,
}

impl<I, F> CountIf<I, F>
where
    F: Fn(&I) -> bool,
{
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _input: PhantomData,
        }
    }
}

impl<I, F> Reducer for CountIf<I, F>
where
    F: Fn(&I) -> bool,
{
    type Input = I;
    type State = u64;
    type Output = u64;

    fn init(&self) -> u64 {
        0
    }

    fn step(&self, state: &mut u64, input: &I) {
        if (self.predicate)(input) {
            *state += 1;
        }
    }

    fn complete(&self, state: u64) -> u64 {
        state
    }
}

/// Any [`Sketch`] as a reducer
///
/// Every instance starts from a clone of the (empty) prototype and the
/// completed output is the sketch itself.
///
/// ```
/// use flowprint::cardinality::HyperLogLog;
/// use flowprint::reducer::{transduce, Sketching};
/// use flowprint::traits::CardinalitySketch;
///
/// let distinct = Sketching::new(HyperLogLog::new(12));
/// let hll = transduce(&distinct, [1u64, 2, 2, 3]);
/// assert_eq!(hll.estimate(), 3.0);
/// ```
#[derive(Clone, Debug)]
pub struct Sketching<S> {
    prototype: S,
}

impl<S: Sketch> Sketching<S> {
    pub fn new(prototype: S) -> Self {
        Self { prototype }
    }
}

impl<S> Reducer for Sketching<S>
where
    S: Sketch,
    S::Item: Sized,
{
    type Input = S::Item;
    type State = S;
    type Output = S;

    fn init(&self) -> S {
        self.prototype.clone()
    }

    fn step(&self, state: &mut S, input: &S::Item) {
        state.update(input);
    }

    fn complete(&self, state: S) -> S {
        state
    }
}
