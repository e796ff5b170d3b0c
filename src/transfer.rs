//! bulk import and export in the `{invests, payments}` document shape

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{parse_iso_date, Investment, InvestmentId, Payment, PaymentId};

/// full contents of a ledger
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerExport {
    pub invests: Vec<Investment>,
    pub payments: Vec<Payment>,
}

impl LedgerExport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| LedgerError::Serialization {
            message: e.to_string(),
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Serialization {
            message: e.to_string(),
        })
    }
}

/// loosely typed records as they arrive from an export
#[derive(Debug, Deserialize)]
struct ImportDocument {
    invests: Vec<ImportedInvestment>,
    payments: Vec<ImportedPayment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedInvestment {
    #[serde(default)]
    id: Option<InvestmentId>,
    money: Money,
    #[serde(default)]
    income_ratio: Option<Rate>,
    created_date: String,
    #[serde(default)]
    closed_date: Option<String>,
    #[serde(with = "crate::types::flag")]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportedPayment {
    #[serde(default)]
    id: Option<PaymentId>,
    invest_id: InvestmentId,
    money: Money,
    payment_date: String,
    #[serde(with = "crate::types::flag")]
    is_payed: bool,
}

/// parse and validate an import document without touching any store
pub fn parse_import(text: &str) -> Result<LedgerExport> {
    let document: ImportDocument =
        serde_json::from_str(text).map_err(|e| LedgerError::malformed(e.to_string()))?;

    let invests = assign_ids(document.invests, |i| i.id, "investment")?
        .into_iter()
        .map(|(id, record)| convert_investment(id, record))
        .collect::<Result<Vec<_>>>()?;

    let payments = assign_ids(document.payments, |p| p.id, "payment")?
        .into_iter()
        .map(|(id, record)| convert_payment(id, record))
        .collect::<Result<Vec<_>>>()?;

    validate(&invests, &payments)?;

    Ok(LedgerExport { invests, payments })
}

// records without an id are numbered after the largest given one; every id
// stays below i64::MAX so the stores can still hand out the next one
fn assign_ids<T>(
    records: Vec<T>,
    id_of: impl Fn(&T) -> Option<i64>,
    kind: &str,
) -> Result<Vec<(i64, T)>> {
    if let Some(id) = records.iter().filter_map(&id_of).find(|id| !(1..i64::MAX).contains(id)) {
        return Err(LedgerError::malformed(format!("{} id {} is out of range", kind, id)));
    }

    let mut next = records.iter().filter_map(&id_of).max().unwrap_or(0);
    records
        .into_iter()
        .map(|record| -> Result<(i64, T)> {
            let id = match id_of(&record) {
                Some(id) => id,
                None => {
                    next = next.checked_add(1).filter(|id| *id < i64::MAX).ok_or_else(|| {
                        LedgerError::malformed(format!("no {} ids left to assign", kind))
                    })?;
                    next
                }
            };
            Ok((id, record))
        })
        .collect()
}

fn convert_investment(id: InvestmentId, record: ImportedInvestment) -> Result<Investment> {
    if !record.money.is_positive() {
        return Err(LedgerError::malformed(format!(
            "investment {} has non-positive money {}",
            id, record.money
        )));
    }
    if let Some(ratio) = record.income_ratio {
        if ratio.is_negative() {
            return Err(LedgerError::malformed(format!(
                "investment {} has negative income ratio {}",
                id, ratio
            )));
        }
    }

    let created_date = import_date(&record.created_date, "createdDate", id)?;

    // only closed investments carry a meaningful closed date
    let closed_date = if record.is_active {
        None
    } else {
        match record.closed_date.as_deref() {
            Some(text) => Some(import_date(text, "closedDate", id)?),
            None => {
                return Err(LedgerError::malformed(format!(
                    "closed investment {} has no closedDate",
                    id
                )))
            }
        }
    };

    Ok(Investment {
        id,
        money: record.money,
        income_ratio: record.income_ratio,
        created_date,
        closed_date,
        is_active: record.is_active,
    })
}

fn convert_payment(id: PaymentId, record: ImportedPayment) -> Result<Payment> {
    if record.money.is_negative() {
        return Err(LedgerError::malformed(format!(
            "payment {} has negative money {}",
            id, record.money
        )));
    }

    Ok(Payment {
        id,
        invest_id: record.invest_id,
        money: record.money,
        payment_date: import_date(&record.payment_date, "paymentDate", id)?,
        is_payed: record.is_payed,
    })
}

fn import_date(text: &str, field: &str, id: i64) -> Result<NaiveDate> {
    parse_iso_date(text).ok_or_else(|| {
        LedgerError::malformed(format!("record {} has unreadable {} {:?}", id, field, text))
    })
}

fn validate(invests: &[Investment], payments: &[Payment]) -> Result<()> {
    let mut investment_ids = HashSet::new();
    for investment in invests {
        if !investment_ids.insert(investment.id) {
            return Err(LedgerError::malformed(format!(
                "duplicate investment id {}",
                investment.id
            )));
        }
    }

    let mut payment_ids = HashSet::new();
    let mut last_by_investment: HashMap<InvestmentId, &Payment> = HashMap::new();
    let mut pending: HashMap<InvestmentId, usize> = HashMap::new();

    for payment in payments {
        if !payment_ids.insert(payment.id) {
            return Err(LedgerError::malformed(format!("duplicate payment id {}", payment.id)));
        }
        if !investment_ids.contains(&payment.invest_id) {
            return Err(LedgerError::malformed(format!(
                "payment {} refers to unknown investment {}",
                payment.id, payment.invest_id
            )));
        }
        if payment.is_pending() {
            *pending.entry(payment.invest_id).or_default() += 1;
        }

        // stores return payments in id order, so the highest id is the latest
        let last = last_by_investment.entry(payment.invest_id).or_insert(payment);
        if payment.id > last.id {
            *last = payment;
        }
    }

    if let Some((invest_id, count)) = pending.iter().find(|(_, count)| **count > 1) {
        return Err(LedgerError::malformed(format!(
            "investment {} has {} pending payments",
            invest_id, count
        )));
    }

    // the one pending payment must be the latest, or the schedule would resume behind it
    for (invest_id, last) in &last_by_investment {
        if pending.contains_key(invest_id) && last.is_payed {
            return Err(LedgerError::malformed(format!(
                "investment {} has a pending payment that is not its latest",
                invest_id
            )));
        }
    }

    Ok(())
}
