//! read models for presenting the ledger

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{Investment, InvestmentId, Payment, PaymentId};

/// what the ledger listing should include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewOptions {
    /// include closed investments
    pub show_closed: bool,
    /// hide settled payment rows
    pub skip_settled: bool,
}

/// serializable ledger listing
#[derive(Debug, Serialize)]
pub struct LedgerView {
    pub today: NaiveDate,
    pub rows: Vec<InvestmentRow>,
    /// rows before this index were created earlier in the month than today
    pub today_marker: usize,
    pub totals: TotalsView,
}

#[derive(Debug, Serialize)]
pub struct InvestmentRow {
    /// 1-based position in the listing
    pub index: usize,
    pub investment_id: InvestmentId,
    pub created_date: NaiveDate,
    pub closed_date: Option<NaiveDate>,
    pub money: Money,
    pub income_percentage: Decimal,
    pub is_active: bool,
    pub payments: Vec<PaymentRow>,
}

#[derive(Debug, Serialize)]
pub struct PaymentRow {
    pub payment_id: PaymentId,
    pub payment_date: NaiveDate,
    pub money: Money,
    pub is_payed: bool,
    /// unsettled and already due
    pub is_debt: bool,
}

#[derive(Debug, Serialize)]
pub struct TotalsView {
    /// principal of active investments
    pub total_invested: Money,
    pub total_debt: Money,
}

impl LedgerView {
    pub fn build(
        mut entries: Vec<(Investment, Vec<Payment>)>,
        options: ViewOptions,
        default_ratio: Rate,
        today: NaiveDate,
    ) -> Result<Self> {
        entries.sort_by_key(|(investment, _)| investment.created_date.day());

        let mut total_invested = Money::ZERO;
        let mut total_debt = Money::ZERO;
        let mut rows = Vec::with_capacity(entries.len());

        for (position, (investment, payments)) in entries.into_iter().enumerate() {
            if investment.is_active {
                total_invested = add_to_total(total_invested, investment.money, "invested total")?;
            }

            let mut payment_rows = Vec::with_capacity(payments.len());
            for payment in payments {
                if options.skip_settled && payment.is_payed {
                    continue;
                }

                let is_debt = payment.is_pending() && payment.payment_date < today;
                if is_debt {
                    total_debt = add_to_total(total_debt, payment.money, "debt total")?;
                }

                payment_rows.push(PaymentRow {
                    payment_id: payment.id,
                    payment_date: payment.payment_date,
                    money: payment.money,
                    is_payed: payment.is_payed,
                    is_debt,
                });
            }

            rows.push(InvestmentRow {
                index: position + 1,
                investment_id: investment.id,
                created_date: investment.created_date,
                closed_date: investment.closed_date,
                money: investment.money,
                income_percentage: income_percentage(&investment, default_ratio)?,
                is_active: investment.is_active,
                payments: payment_rows,
            });
        }

        let today_marker = rows
            .iter()
            .position(|row| today.day() < row.created_date.day())
            .unwrap_or(rows.len());

        Ok(Self {
            today,
            rows,
            today_marker,
            totals: TotalsView {
                total_invested,
                total_debt,
            },
        })
    }

    pub fn debts(&self) -> impl Iterator<Item = &PaymentRow> {
        self.rows
            .iter()
            .flat_map(|row| row.payments.iter())
            .filter(|payment| payment.is_debt)
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn add_to_total(total: Money, amount: Money, what: &str) -> Result<Money> {
    total
        .checked_add(amount)
        .ok_or_else(|| LedgerError::overflow(format!("{} past {}", what, total)))
}

fn income_percentage(investment: &Investment, default_ratio: Rate) -> Result<Decimal> {
    let ratio = investment.effective_ratio(default_ratio);
    ratio.as_percentage().ok_or_else(|| {
        LedgerError::overflow(format!(
            "percentage of ratio {} on investment {}",
            ratio, investment.id
        ))
    })
}

/// one point of the invested-amount chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    /// invested total after this change
    pub total: Money,
}

/// running total of invested money: up on creation, down on close
pub fn chart_series(investments: &[Investment]) -> Result<Vec<ChartPoint>> {
    let mut changes: Vec<(NaiveDate, Money)> = Vec::with_capacity(investments.len() * 2);
    for investment in investments {
        changes.push((investment.created_date, investment.money));
        if let (false, Some(closed_date)) = (investment.is_active, investment.closed_date) {
            changes.push((closed_date, -investment.money));
        }
    }
    changes.sort_by_key(|(date, _)| *date);

    let mut total = Money::ZERO;
    changes
        .into_iter()
        .map(|(date, change)| -> Result<ChartPoint> {
            total = add_to_total(total, change, "chart total")?;
            Ok(ChartPoint { date, total })
        })
        .collect()
}
