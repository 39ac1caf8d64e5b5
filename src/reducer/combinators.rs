//! Reducer combinators
//!
//! Each combinator is itself a [`Reducer`], so they nest arbitrarily: a
//! fused reducer can hold a rollup whose per-key reducer is another fuse.

use super::Reducer;
use core::marker::PhantomData;
use std::collections::BTreeMap;

/// Named reducers advanced together over the same input
///
/// The state is one sub-state per name and the output maps each name to
/// its reducer's output. If a name is added twice the later reducer wins
/// in the output.
#[derive(Clone, Debug)]
pub struct Fuse<R> {
    parts: Vec<(String, R)>,
}

impl<R> Default for Fuse<R> {
    fn default() -> Self {
        Self { parts: Vec::new() }
    }
}

impl<R: Reducer> Fuse<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named reducer
    pub fn with(mut self, name: impl Into<String>, reducer: R) -> Self {
        self.parts.push((name.into(), reducer));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, reducer: R) {
        self.parts.push((name.into(), reducer));
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl<R: Reducer, N: Into<String>> FromIterator<(N, R)> for Fuse<R> {
    fn from_iter<T: IntoIterator<Item = (N, R)>>(iter: T) -> Self {
        Self {
            parts: iter.into_iter().map(|(n, r)| (n.into(), r)).collect(),
        }
    }
}

impl<R: Reducer> Reducer for Fuse<R> {
    type Input = R::Input;
    type State = Vec<R::State>;
    type Output = BTreeMap<String, R::Output>;

    fn init(&self) -> Self::State {
        self.parts.iter().map(|(_, r)| r.init()).collect()
    }

    fn step(&self, state: &mut Self::State, input: &R::Input) {
        for ((_, reducer), sub) in self.parts.iter().zip(state.iter_mut()) {
            reducer.step(sub, input);
        }
    }

    fn complete(&self, state: Self::State) -> Self::Output {
        self.parts
            .iter()
            .zip(state)
            .map(|((name, reducer), sub)| (name.clone(), reducer.complete(sub)))
            .collect()
    }
}

// Tuples of reducers over one input fuse positionally
macro_rules! tuple_fuse {
    ($($name:ident . $idx:tt),+) => {
        impl<In, $($name),+> Reducer for ($($name,)+)
        where
            $($name: Reducer<Input = In>),+
        {
            type Input = In;
            type State = ($($name::State,)+);
            type Output = ($($name::Output,)+);

            fn init(&self) -> Self::State {
                ($(self.$idx.init(),)+)
            }

            fn step(&self, state: &mut Self::State, input: &In) {
                $(self.$idx.step(&mut state.$idx, input);)+
            }

            fn complete(&self, state: Self::State) -> Self::Output {
                ($(self.$idx.complete(state.$idx),)+)
            }
        }
    };
}

tuple_fuse!(A.0, B.1);
tuple_fuse!(A.0, B.1, C.2);
tuple_fuse!(A.0, B.1, C.2, D.3);
tuple_fuse!(A.0, B.1, C.2, D.3, E.4);
tuple_fuse!(A.0, B.1, C.2, D.3, E.4, F.5);
tuple_fuse!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);

/// Transforms each input before handing it to the inner reducer
#[derive(Clone)]
pub struct PreStep<R, F, I> {
    inner: R,
    f: F,
    _input: PhantomData<fn(&I)>,
}

impl<R, F, I> PreStep<R, F, I>
where
    R: Reducer,
    F: Fn(&I) -> R::Input,
{
    pub fn new(inner: R, f: F) -> Self {
        Self {
            inner,
            f,
            _input: PhantomData,
        }
    }
}

impl<R, F, I> Reducer for PreStep<R, F, I>
where
    R: Reducer,
    F: Fn(&I) -> R::Input,
{
    type Input = I;
    type State = R::State;
    type Output = R::Output;

    fn init(&self) -> R::State {
        self.inner.init()
    }

    fn step(&self, state: &mut R::State, input: &I) {
        let mapped = (self.f)(input);
        self.inner.step(state, &mapped);
    }

    fn complete(&self, state: R::State) -> R::Output {
        self.inner.complete(state)
    }
}

/// Transforms the output of the inner reducer
#[derive(Clone)]
pub struct PostComplete<R, F> {
    inner: R,
    f: F,
}

impl<R, F> PostComplete<R, F> {
    pub fn new(inner: R, f: F) -> Self {
        Self { inner, f }
    }
}

impl<R, F, O> Reducer for PostComplete<R, F>
where
    R: Reducer,
    F: Fn(R::Output) -> O,
{
    type Input = R::Input;
    type State = R::State;
    type Output = O;

    fn init(&self) -> R::State {
        self.inner.init()
    }

    fn step(&self, state: &mut R::State, input: &R::Input) {
        self.inner.step(state, input);
    }

    fn complete(&self, state: R::State) -> O {
        (self.f)(self.inner.complete(state))
    }
}

/// Only steps the inner reducer on `Some` inputs
#[derive(Clone, Debug)]
pub struct SkipMissing<R> {
    inner: R,
}

impl<R> SkipMissing<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Reducer> Reducer for SkipMissing<R> {
    type Input = Option<R::Input>;
    type State = R::State;
    type Output = R::Output;

    fn init(&self) -> R::State {
        self.inner.init()
    }

    fn step(&self, state: &mut R::State, input: &Option<R::Input>) {
        if let Some(input) = input {
            self.inner.step(state, input);
        }
    }

    fn complete(&self, state: R::State) -> R::Output {
        self.inner.complete(state)
    }
}

/// Groups inputs by key with one independent sub-reducer per key
///
/// `factory` is called the first time a key is seen, so it must build a
/// fresh reducer without side effects. The output maps every key seen to
/// the completed output of its sub-reducer.
///
/// ```
/// use flowprint::reducer::{transduce, Count, Rollup};
///
/// let by_parity = Rollup::new(|x: &i32| x % 2 == 0, Count::<i32>::new);
/// let groups = transduce(&by_parity, [1, 2, 3, 5]);
/// assert_eq!(groups[&true], 1);
/// assert_eq!(groups[&false], 3);
/// ```
#[derive(Clone)]
pub struct Rollup<F, G, I, K> {
    key: F,
    factory: G,
    _marker: PhantomData<fn(&I) -> K>,
}

impl<F, G, I, K> Rollup<F, G, I, K>
where
    F: Fn(&I) -> K,
{
    pub fn new(key: F, factory: G) -> Self {
        Self {
            key,
            factory,
            _marker: PhantomData,
        }
    }
}

impl<F, G, I, K, R> Reducer for Rollup<F, G, I, K>
where
    F: Fn(&I) -> K,
    K: Ord,
    G: Fn() -> R,
    R: Reducer<Input = I>,
{
    type Input = I;
    type State = BTreeMap<K, (R, R::State)>;
    type Output = BTreeMap<K, R::Output>;

    fn init(&self) -> Self::State {
        BTreeMap::new()
    }

    fn step(&self, state: &mut Self::State, input: &I) {
        let (reducer, sub) = state.entry((self.key)(input)).or_insert_with(|| {
            let reducer = (self.factory)();
            let sub = reducer.init();
            (reducer, sub)
        });
        reducer.step(sub, input);
    }

    fn complete(&self, state: Self::State) -> Self::Output {
        state
            .into_iter()
            .map(|(key, (reducer, sub))| (key, reducer.complete(sub)))
            .collect()
    }
}
