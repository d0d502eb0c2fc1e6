//! Simulated ingredient purchasing.
//!
//! A shortage is bought in draws of bounded size. Every draw is at least
//! `min_draw`, and the number of draws is capped; if the cap is reached the
//! remaining shortfall is bought in one final draw. The plan therefore
//! always covers the requested quantity.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Source of individual draw sizes.
pub trait QuantitySource: Send + Sync {
    /// Returns a quantity within `range`.
    fn draw(&self, range: RangeInclusive<u32>) -> u32;
}

/// Uniformly random draw sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomQuantities;

impl QuantitySource for RandomQuantities {
    fn draw(&self, range: RangeInclusive<u32>) -> u32 {
        rand::rng().random_range(range)
    }
}

/// Replays a fixed sequence of draw sizes, cycling when exhausted.
/// Values outside the requested range are clamped into it.
#[derive(Debug, Default)]
pub struct FixedQuantities {
    values: Vec<u32>,
    next: AtomicUsize,
}

impl FixedQuantities {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            next: AtomicUsize::new(0),
        }
    }
}

impl QuantitySource for FixedQuantities {
    fn draw(&self, range: RangeInclusive<u32>) -> u32 {
        if self.values.is_empty() {
            return *range.start();
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values[index].clamp(*range.start(), *range.end())
    }
}

/// Bounds for the purchase loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchasePolicy {
    pub min_draw: u32,
    pub max_draw: u32,
    pub max_draws: u32,
}

impl Default for PurchasePolicy {
    fn default() -> Self {
        Self {
            min_draw: 1,
            max_draw: 10,
            max_draws: 32,
        }
    }
}

impl PurchasePolicy {
    pub fn new(max_draw: u32, max_draws: u32) -> Self {
        Self {
            max_draw,
            max_draws,
            ..Self::default()
        }
    }

    fn draw_range(&self) -> RangeInclusive<u32> {
        let min = self.min_draw.max(1);
        min..=self.max_draw.max(min)
    }

    /// Plans the draws for `required` units. The sum of the plan is at
    /// least `required`; the plan is empty only when `required` is zero.
    pub fn plan(&self, required: u32, source: &dyn QuantitySource) -> Vec<u32> {
        let range = self.draw_range();
        let mut draws = Vec::new();
        let mut total: u32 = 0;

        while total < required {
            let quantity = if draws.len() as u32 + 1 >= self.max_draws.max(1) {
                required - total
            } else {
                source.draw(range.clone())
            };
            total = total.saturating_add(quantity);
            draws.push(quantity);
        }

        draws
    }
}
