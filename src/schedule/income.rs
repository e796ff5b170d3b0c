use crate::config::IncomeRounding;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// periodic income before and after rounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeAmount {
    pub unrounded: Money,
    pub rounded: Money,
}

impl IncomeAmount {
    /// exact half before rounding, where the midpoint rule decides the result
    pub fn was_tie(&self) -> bool {
        self.unrounded.is_midpoint()
    }
}

pub fn income_amount(
    principal: Money,
    ratio: Rate,
    rounding: IncomeRounding,
) -> Result<IncomeAmount> {
    let unrounded = principal
        .apply_ratio(ratio)
        .ok_or_else(|| LedgerError::overflow(format!("income of {} at {}", principal, ratio)))?;

    Ok(IncomeAmount {
        unrounded,
        rounded: unrounded.round_whole(rounding.strategy()),
    })
}

/// whole-number income for one period
pub fn rounded_income(principal: Money, ratio: Rate, rounding: IncomeRounding) -> Result<Money> {
    Ok(income_amount(principal, ratio, rounding)?.rounded)
}
