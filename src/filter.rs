//! Data filtering, averaging and smoothing.

pub mod ema;

use std::marker::PhantomData;

pub use ema::{Ema, EmaState};

/// A filter for values of type `V`.
///
/// The filter itself only holds its parameters; the accumulated history lives
/// in a separate [`Filter::State`] value owned by the caller. One filter
/// configuration can therefore drive any number of independent value streams.
pub trait Filter<V> {
    /// Accumulated filter state. The [`Default`] value represents an empty
    /// history.
    type State: Default;

    /// Adds a new value to `state`, returning the filtered value.
    fn filter(&self, state: &mut Self::State, value: V) -> V;
}

/// Convenience wrapper pairing a [`Filter`] with a single instance of its
/// state.
pub struct SimpleFilter<F: Filter<V>, V> {
    filter: F,
    state: F::State,
    _p: PhantomData<fn(V) -> V>,
}

impl<F: Filter<V>, V> SimpleFilter<F, V> {
    /// Creates a new [`SimpleFilter`] with an empty history.
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            state: Default::default(),
            _p: PhantomData,
        }
    }

    /// Adds a new value to the filter, returning the filtered value.
    pub fn filter(&mut self, value: V) -> V {
        self.filter.filter(&mut self.state, value)
    }
}
