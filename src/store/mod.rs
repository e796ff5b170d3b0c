pub mod memory;
pub mod sqlite;

use crate::errors::Result;
use crate::types::{
    Investment, InvestmentFilter, InvestmentId, NewInvestment, NewPayment, Payment, PaymentFilter,
    PaymentId,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// persistence of investment records
pub trait InvestmentStore {
    /// `RecordNotFound` when the id is unknown
    fn get_investment(&self, id: InvestmentId) -> Result<Investment>;

    /// in id order
    fn list_investments(&self, filter: InvestmentFilter) -> Result<Vec<Investment>>;

    fn add_investment(&mut self, investment: NewInvestment) -> Result<InvestmentId>;

    /// update an existing record by id
    fn put_investment(&mut self, investment: &Investment) -> Result<()>;
}

/// persistence of payment records
pub trait PaymentStore {
    fn get_payment(&self, id: PaymentId) -> Result<Payment>;

    /// chronological (insertion) order, which the schedule engine relies on
    fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<Payment>>;

    fn add_payment(&mut self, payment: NewPayment) -> Result<PaymentId>;

    fn put_payment(&mut self, payment: &Payment) -> Result<()>;
}

/// both stores behind one handle
pub trait LedgerStore: InvestmentStore + PaymentStore {
    /// clear both stores and insert the given records with their ids
    fn replace_all(&mut self, investments: &[Investment], payments: &[Payment]) -> Result<()>;
}
