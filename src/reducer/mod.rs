//! Streaming reducers
//!
//! Every statistic in a fingerprint is a [`Reducer`]: a value with an
//! `init`, a `step` and a `complete` operation. Reducers compose, so a
//! whole fingerprint is one reducer that advances every sketch once per
//! input in a single pass.
//!
//! # Combinators
//!
//! - [`Fuse`]: run a named set of reducers side by side; tuples of
//!   reducers sharing an input type fuse the same way, statically typed
//! - [`PreStep`]: transform each input before stepping
//! - [`PostComplete`]: transform the completed output
//! - [`Rollup`]: partition inputs by key, one sub-reducer per key
//! - [`SkipMissing`]: only step on `Some` inputs
//!
//! Heterogeneous reducers are erased behind [`BoxReducer`].
//!
//! # Purity
//!
//! `step` may only touch the state it is handed, and `init` (as well as
//! any factory given to [`Rollup`]) must be free of side effects: it is
//! called once per instance, lazily, possibly many times. Reducers that
//! break this produce wrong per-key results; nothing checks it at runtime.
//!
//! # Example
//!
//! ```
//! use flowprint::reducer::{transduce, Count, CountIf, Fuse, ReducerExt};
//!
//! let fused = Fuse::new()
//!     .with("all", Count::new().boxed())
//!     .with("even", CountIf::new(|x: &i64| x % 2 == 0).boxed());
//!
//! let out = transduce(&fused, [1i64, 2, 3, 4, 6]);
//! assert_eq!(out["all"], 5);
//! assert_eq!(out["even"], 3);
//! ```

mod combinators;
mod primitives;

pub use combinators::{Fuse, PostComplete, PreStep, Rollup, SkipMissing};
pub use primitives::{Count, CountIf, Sketching};

use core::borrow::Borrow;
use std::sync::Arc;

/// A single-pass streaming aggregation
pub trait Reducer {
    /// Item consumed by `step`
    type Input;
    /// Accumulated state
    type State;
    /// Result of `complete`
    type Output;

    /// Fresh state
    fn init(&self) -> Self::State;

    /// Fold one input into the state
    fn step(&self, state: &mut Self::State, input: &Self::Input);

    /// Turn the final state into the output
    fn complete(&self, state: Self::State) -> Self::Output;
}

/// Drive `reducer` over `inputs` and complete it
pub fn transduce<R, I>(reducer: &R, inputs: I) -> R::Output
where
    R: Reducer,
    I: IntoIterator,
    I::Item: Borrow<R::Input>,
{
    let mut state = reducer.init();
    for input in inputs {
        reducer.step(&mut state, input.borrow());
    }
    reducer.complete(state)
}

/// Combinator methods available on every reducer
pub trait ReducerExt: Reducer + Sized {
    /// Transform each input with `f` before stepping
    fn pre_step<I, F>(self, f: F) -> PreStep<Self, F, I>
    where
        F: Fn(&I) -> Self::Input,
    {
        PreStep::new(self, f)
    }

    /// Transform the output with `f` after completing
    fn post_complete<O, F>(self, f: F) -> PostComplete<Self, F>
    where
        F: Fn(Self::Output) -> O,
    {
        PostComplete::new(self, f)
    }

    /// Accept `Option` inputs, ignoring `None`
    fn skip_missing(self) -> SkipMissing<Self> {
        SkipMissing::new(self)
    }

    /// Erase the concrete type
    fn boxed(self) -> BoxReducer<Self::Input, Self::Output>
    where
        Self: Send + Sync + 'static,
        Self::State: Send + 'static,
        Self::Input: 'static,
        Self::Output: 'static,
    {
        BoxReducer::new(self)
    }
}

impl<R: Reducer> ReducerExt for R {}

/// State of a type-erased reducer: the reducer's own state bound to it
pub trait Accumulator<I, O>: Send {
    fn step(&mut self, input: &I);
    fn complete(self: Box<Self>) -> O;
}

struct Bound<R: Reducer> {
    reducer: Arc<R>,
    state: R::State,
}

impl<R> Accumulator<R::Input, R::Output> for Bound<R>
where
    R: Reducer + Send + Sync,
    R::State: Send,
{
    fn step(&mut self, input: &R::Input) {
        self.reducer.step(&mut self.state, input);
    }

    fn complete(self: Box<Self>) -> R::Output {
        let Bound { reducer, state } = *self;
        reducer.complete(state)
    }
}

type Factory<I, O> = dyn Fn() -> Box<dyn Accumulator<I, O>> + Send + Sync;

/// A reducer with its concrete type erased
///
/// Cloning is cheap; clones share the underlying reducer.
pub struct BoxReducer<I, O> {
    factory: Arc<Factory<I, O>>,
}

impl<I: 'static, O: 'static> BoxReducer<I, O> {
    pub fn new<R>(reducer: R) -> Self
    where
        R: Reducer<Input = I, Output = O> + Send + Sync + 'static,
        R::State: Send + 'static,
    {
        let reducer = Arc::new(reducer);
        let factory = move || {
            Box::new(Bound {
                state: reducer.init(),
                reducer: Arc::clone(&reducer),
            }) as Box<dyn Accumulator<I, O>>
        };
        Self {
            factory: Arc::new(factory),
        }
    }
}

impl<I, O> Clone for BoxReducer<I, O> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<I, O> core::fmt::Debug for BoxReducer<I, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("BoxReducer")
    }
}

impl<I, O> Reducer for BoxReducer<I, O> {
    type Input = I;
    type State = Box<dyn Accumulator<I, O>>;
    type Output = O;

    fn init(&self) -> Self::State {
        (self.factory)()
    }

    fn step(&self, state: &mut Self::State, input: &I) {
        state.step(input);
    }

    fn complete(&self, state: Self::State) -> O {
        state.complete()
    }
}
