pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod schedule;
pub mod store;
pub mod transfer;
pub mod types;
pub mod views;

// re-export key types
pub use config::{IncomeRounding, MonthOverflow, ScheduleConfig};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, RecordKind, Result};
pub use events::{Event, EventStore};
pub use ledger::Ledger;
pub use schedule::{
    add_one_calendar_month, has_pending_payment, is_eligible_for_next_payment, rounded_income,
    ScheduleEngine, ScheduledPayment, SchedulePlan, SyncFailure, SyncReport,
};
pub use store::{InvestmentStore, LedgerStore, MemoryStore, PaymentStore, SqliteStore};
pub use transfer::{parse_import, LedgerExport};
pub use types::{
    Investment, InvestmentFilter, InvestmentId, NewInvestment, NewPayment, Payment, PaymentFilter,
    PaymentId,
};
pub use views::{chart_series, ChartPoint, LedgerView, ViewOptions};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
