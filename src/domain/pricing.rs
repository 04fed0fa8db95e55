use crate::error::PayrollError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// A whole-unit monetary value.
///
/// Session prices are integers and the salary rule only ever multiplies and
/// sums them, so no fractional representation is needed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Self = Self(0);

    pub fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Price of `count` participants at `unit` each. Cannot overflow: both
    /// factors are 32-bit.
    pub fn per_head(count: u32, unit: u32) -> Self {
        Self(u64::from(count) * u64::from(unit))
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two-threshold price rule of a class offering.
///
/// `quantity_from` is kept for display and administration only; the salary
/// rule splits purely on `quantity_to`. Tiers read back from storage are
/// plain data; [`PricingTier::validate`] is applied on the admin write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTier {
    /// Inclusive upper headcount bound for `price_to`.
    pub quantity_to: u32,
    pub price_to: u32,
    /// Inclusive lower headcount bound for `price_from`.
    pub quantity_from: u32,
    pub price_from: u32,
}

impl PricingTier {
    pub fn new(quantity_to: u32, price_to: u32, quantity_from: u32, price_from: u32) -> Self {
        Self {
            quantity_to,
            price_to,
            quantity_from,
            price_from,
        }
    }

    /// Checks `quantity_to <= quantity_from` and `price_to <= price_from`.
    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.quantity_to > self.quantity_from {
            return Err(PayrollError::validation(format!(
                "quantity_to ({}) must not exceed quantity_from ({})",
                self.quantity_to, self.quantity_from
            )));
        }
        if self.price_to > self.price_from {
            return Err(PayrollError::validation(format!(
                "price_to ({}) must not exceed price_from ({})",
                self.price_to, self.price_from
            )));
        }
        Ok(())
    }

    /// Amount owed for one session with `attend_count` participants.
    pub fn price(&self, attend_count: u32) -> Money {
        if attend_count <= self.quantity_to {
            Money::per_head(attend_count, self.price_to)
        } else {
            Money::per_head(attend_count, self.price_from)
        }
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "up to {}: {}, from {}: {}",
            self.quantity_to, self.price_to, self.quantity_from, self.price_from
        )
    }
}

/// Amount owed for one session. An offering without a tier earns nothing.
pub fn price_for_session(attend_count: u32, tier: Option<&PricingTier>) -> Money {
    tier.map_or(Money::ZERO, |tier| tier.price(attend_count))
}
