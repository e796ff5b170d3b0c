use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MonthOverflow;
use crate::decimal::{Money, Rate};
use crate::types::{InvestmentId, PaymentId};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // investment events
    InvestmentAdded {
        investment_id: InvestmentId,
        money: Money,
        income_ratio: Option<Rate>,
        created_date: NaiveDate,
    },
    InvestmentClosed {
        investment_id: InvestmentId,
        closed_date: NaiveDate,
    },

    // payment events
    PaymentScheduled {
        pass_id: Uuid,
        investment_id: InvestmentId,
        payment_id: PaymentId,
        money: Money,
        payment_date: NaiveDate,
    },
    PaymentSettled {
        investment_id: InvestmentId,
        payment_id: PaymentId,
        money: Money,
    },
    PaymentForceSettled {
        investment_id: InvestmentId,
        payment_id: PaymentId,
        money: Money,
    },

    // arithmetic edge cases
    PaymentDateOverflow {
        pass_id: Uuid,
        investment_id: InvestmentId,
        anchor_date: NaiveDate,
        payment_date: NaiveDate,
        mode: MonthOverflow,
    },
    IncomeRoundingTie {
        pass_id: Uuid,
        investment_id: InvestmentId,
        unrounded: Money,
        rounded: Money,
    },

    // synchronization events
    SynchronizationFailed {
        pass_id: Uuid,
        investment_id: InvestmentId,
        reason: String,
    },
    SynchronizationCompleted {
        pass_id: Uuid,
        scheduled: usize,
        failed: usize,
    },

    // bulk transfer
    DataImported {
        investments: usize,
        payments: usize,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
