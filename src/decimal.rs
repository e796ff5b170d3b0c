use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;

/// Money type for principals and income amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d)
    }

    /// create from integer amount (rubles, dollars, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round to a whole amount with an explicit midpoint strategy
    pub fn round_whole(&self, strategy: RoundingStrategy) -> Self {
        Money(self.0.round_dp_with_strategy(0, strategy))
    }

    /// true when the fractional part is exactly one half
    pub fn is_midpoint(&self) -> bool {
        self.0.fract().abs() == Decimal::new(5, 1)
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// check if negative
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// sum of two amounts, `None` past the decimal range
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// apply a periodic ratio (0.05 of 100 is 5), `None` past the decimal range
    pub fn apply_ratio(&self, ratio: Rate) -> Option<Money> {
        self.0.checked_mul(ratio.as_decimal()).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

/// rate type for income ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    /// create from decimal (e.g., 0.05 for 5%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    /// get as decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// get as percentage, `None` when the ratio is too large to scale
    pub fn as_percentage(&self) -> Option<Decimal> {
        self.0.checked_mul(Decimal::ONE_HUNDRED).map(|p| p.normalize())
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_percentage() {
            Some(percentage) => write!(f, "{}%", percentage),
            None => write!(f, "{}", self.0.normalize()),
        }
    }
}
