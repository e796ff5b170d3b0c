use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::errors::{LedgerError, Result};
use crate::store::{InvestmentStore, LedgerStore, PaymentStore};
use crate::types::{
    Investment, InvestmentFilter, InvestmentId, NewInvestment, NewPayment, Payment, PaymentFilter,
    PaymentId,
};

/// in-memory store with auto-increment ids
#[derive(Debug)]
pub struct MemoryStore {
    investments: BTreeMap<InvestmentId, Investment>,
    payments: BTreeMap<PaymentId, Payment>,
    // indices
    active: BTreeSet<InvestmentId>,
    payments_by_investment: HashMap<InvestmentId, BTreeSet<PaymentId>>,
    next_investment_id: InvestmentId,
    next_payment_id: PaymentId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            investments: BTreeMap::new(),
            payments: BTreeMap::new(),
            active: BTreeSet::new(),
            payments_by_investment: HashMap::new(),
            next_investment_id: 1,
            next_payment_id: 1,
        }
    }

    fn index_investment(&mut self, investment: &Investment) {
        if investment.is_active {
            self.active.insert(investment.id);
        } else {
            self.active.remove(&investment.id);
        }
    }

    fn index_payment(&mut self, payment: &Payment) {
        self.payments_by_investment
            .entry(payment.invest_id)
            .or_default()
            .insert(payment.id);
    }

    fn unindex_payment(&mut self, payment: &Payment) {
        if let Some(ids) = self.payments_by_investment.get_mut(&payment.invest_id) {
            ids.remove(&payment.id);
        }
    }
}

impl InvestmentStore for MemoryStore {
    fn get_investment(&self, id: InvestmentId) -> Result<Investment> {
        self.investments
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::investment_not_found(id))
    }

    fn list_investments(&self, filter: InvestmentFilter) -> Result<Vec<Investment>> {
        if filter.only_active {
            return Ok(self
                .active
                .iter()
                .filter_map(|id| self.investments.get(id))
                .cloned()
                .collect());
        }
        Ok(self.investments.values().cloned().collect())
    }

    fn add_investment(&mut self, investment: NewInvestment) -> Result<InvestmentId> {
        let id = self.next_investment_id;
        self.next_investment_id = id_after(id)?;

        let investment = investment.into_investment(id);
        self.index_investment(&investment);
        self.investments.insert(id, investment);
        Ok(id)
    }

    fn put_investment(&mut self, investment: &Investment) -> Result<()> {
        if !self.investments.contains_key(&investment.id) {
            return Err(LedgerError::investment_not_found(investment.id));
        }
        self.index_investment(investment);
        self.investments.insert(investment.id, investment.clone());
        Ok(())
    }
}

impl PaymentStore for MemoryStore {
    fn get_payment(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::payment_not_found(id))
    }

    fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<Payment>> {
        match filter.invest_id {
            Some(invest_id) => Ok(self
                .payments_by_investment
                .get(&invest_id)
                .map(|ids| ids.iter().filter_map(|id| self.payments.get(id)).cloned().collect())
                .unwrap_or_default()),
            None => Ok(self.payments.values().cloned().collect()),
        }
    }

    fn add_payment(&mut self, payment: NewPayment) -> Result<PaymentId> {
        let id = self.next_payment_id;
        self.next_payment_id = id_after(id)?;

        let payment = payment.into_payment(id);
        self.index_payment(&payment);
        self.payments.insert(id, payment);
        Ok(id)
    }

    fn put_payment(&mut self, payment: &Payment) -> Result<()> {
        let previous = self
            .payments
            .get(&payment.id)
            .cloned()
            .ok_or_else(|| LedgerError::payment_not_found(payment.id))?;

        self.unindex_payment(&previous);
        self.index_payment(payment);
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }
}

fn id_after(id: i64) -> Result<i64> {
    id.checked_add(1).ok_or_else(|| LedgerError::StoreFailure {
        message: format!("no record ids left after {}", id),
    })
}

impl LedgerStore for MemoryStore {
    fn replace_all(&mut self, investments: &[Investment], payments: &[Payment]) -> Result<()> {
        let mut store = MemoryStore::new();

        for investment in investments {
            store.index_investment(investment);
            store.investments.insert(investment.id, investment.clone());
        }
        for payment in payments {
            store.index_payment(payment);
            store.payments.insert(payment.id, payment.clone());
        }

        store.next_investment_id = match store.investments.keys().max() {
            Some(id) => id_after(*id)?,
            None => 1,
        };
        store.next_payment_id = match store.payments.keys().max() {
            Some(id) => id_after(*id)?,
            None => 1,
        };

        *self = store;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_investment(money: i64) -> NewInvestment {
        NewInvestment {
            money: Money::from_major(money),
            income_ratio: None,
            created_date: date(2024, 1, 1),
        }
    }

    fn new_payment(invest_id: InvestmentId, month: u32) -> NewPayment {
        NewPayment {
            invest_id,
            money: Money::from_major(50),
            payment_date: date(2024, month, 1),
            is_payed: false,
        }
    }

    #[test]
    fn test_ids_are_assigned_from_one() {
        let mut store = MemoryStore::new();
        assert_eq!(store.add_investment(new_investment(100)).unwrap(), 1);
        assert_eq!(store.add_investment(new_investment(200)).unwrap(), 2);
        assert_eq!(store.add_payment(new_payment(1, 2)).unwrap(), 1);
    }

    #[test]
    fn test_active_filter_follows_updates() {
        let mut store = MemoryStore::new();
        let first = store.add_investment(new_investment(100)).unwrap();
        store.add_investment(new_investment(200)).unwrap();

        let mut investment = store.get_investment(first).unwrap();
        investment.close(date(2024, 3, 1));
        store.put_investment(&investment).unwrap();

        let active = store.list_investments(InvestmentFilter::active()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].money, Money::from_major(200));
        assert_eq!(store.list_investments(InvestmentFilter::all()).unwrap().len(), 2);
    }

    #[test]
    fn test_payments_listed_in_insertion_order_per_investment() {
        let mut store = MemoryStore::new();
        store.add_payment(new_payment(1, 2)).unwrap();
        store.add_payment(new_payment(2, 2)).unwrap();
        store.add_payment(new_payment(1, 3)).unwrap();

        let history = store.list_payments(PaymentFilter::for_investment(1)).unwrap();
        let ids: Vec<_> = history.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(store.list_payments(PaymentFilter::for_investment(9)).unwrap().is_empty());
        assert_eq!(store.list_payments(PaymentFilter::all()).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_records() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.get_payment(4),
            Err(LedgerError::RecordNotFound { id: 4, .. })
        ));

        let ghost = new_investment(10).into_investment(42);
        assert!(store.put_investment(&ghost).is_err());
    }

    #[test]
    fn test_replace_all_keeps_ids_and_advances_counters() {
        let mut store = MemoryStore::new();
        store.add_investment(new_investment(100)).unwrap();

        let investments = vec![new_investment(500).into_investment(7)];
        let payments = vec![new_payment(7, 2).into_payment(12)];
        store.replace_all(&investments, &payments).unwrap();

        assert!(store.get_investment(1).is_err());
        assert_eq!(store.get_investment(7).unwrap().money, Money::from_major(500));
        assert_eq!(store.add_investment(new_investment(1)).unwrap(), 8);
        assert_eq!(store.add_payment(new_payment(7, 3)).unwrap(), 13);
        assert_eq!(store.list_payments(PaymentFilter::for_investment(7)).unwrap().len(), 2);
    }

    #[test]
    fn test_id_space_exhaustion_is_an_error() {
        let mut store = MemoryStore::new();
        store.add_investment(new_investment(100)).unwrap();

        let last = vec![new_investment(500).into_investment(i64::MAX)];
        assert!(matches!(
            store.replace_all(&last, &[]),
            Err(LedgerError::StoreFailure { .. })
        ));
        // the failed replacement left the old contents in place
        assert_eq!(store.get_investment(1).unwrap().money, Money::from_major(100));

        let almost = vec![new_investment(500).into_investment(i64::MAX - 1)];
        store.replace_all(&almost, &[]).unwrap();
        assert!(store.add_investment(new_investment(1)).is_err());
    }
}
