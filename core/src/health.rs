//! Hit points and coin balances, the two counters every match mutates.

use crate::CoinError;

/// Hit points of a single entity.
///
/// `current` never leaves `0..=max`. Once health reaches zero the entity is
/// dead for the rest of its activation and further damage is ignored, so the
/// [`DamageOutcome::Killed`] notification is produced exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    /// Creates full health with the provided maximum, clamped to at least one.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        let max = if max == 0 { 1 } else { max };
        Self { current: max, max }
    }

    /// Applies damage and reports how the hit resolved.
    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }

        self.current = self.current.saturating_sub(amount);
        if self.current == 0 {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded {
                remaining: self.current,
            }
        }
    }

    /// Refills health for a fresh activation.
    pub fn restore(&mut self) {
        self.current = self.max;
    }

    /// Reports whether health has been depleted.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Hit points remaining.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Hit points at full health.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Remaining health as a fraction in `[0, 1]`.
    #[must_use]
    pub fn percent(&self) -> f32 {
        self.current as f32 / self.max as f32
    }
}

/// Result of applying damage to [`Health`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The entity was already dead; nothing changed.
    Ignored,
    /// The entity survived the hit.
    Wounded {
        /// Hit points left after the hit.
        remaining: u32,
    },
    /// The hit depleted the entity's health.
    Killed,
}

/// Coin balance of a match. Spending is check-and-decrement: a spend that
/// cannot be covered leaves the balance untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoinPurse {
    coins: u32,
}

impl CoinPurse {
    /// Creates a purse holding the provided starting balance.
    #[must_use]
    pub const fn new(coins: u32) -> Self {
        Self { coins }
    }

    /// Current balance.
    #[must_use]
    pub const fn balance(&self) -> u32 {
        self.coins
    }

    /// Reports whether the balance covers the provided amount.
    #[must_use]
    pub const fn can_afford(&self, amount: u32) -> bool {
        self.coins >= amount
    }

    /// Deducts `amount`, returning the new balance.
    pub fn spend(&mut self, amount: u32) -> Result<u32, CoinError> {
        if !self.can_afford(amount) {
            return Err(CoinError::Insufficient {
                required: amount,
                available: self.coins,
            });
        }
        self.coins -= amount;
        Ok(self.coins)
    }

    /// Credits `amount`, returning the new balance.
    pub fn deposit(&mut self, amount: u32) -> u32 {
        self.coins = self.coins.saturating_add(amount);
        self.coins
    }
}
