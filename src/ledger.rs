use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::config::ScheduleConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::schedule::{ScheduleEngine, SyncReport};
use crate::store::LedgerStore;
use crate::transfer::{self, LedgerExport};
use crate::types::{
    Investment, InvestmentFilter, InvestmentId, NewInvestment, Payment, PaymentFilter, PaymentId,
};
use crate::views::{chart_series, ChartPoint, LedgerView, ViewOptions};

/// investments and their payments behind one store, kept in sync after every change
pub struct Ledger<S: LedgerStore> {
    store: S,
    engine: ScheduleEngine,
    events: EventStore,
}

impl<S: LedgerStore> Ledger<S> {
    /// open the ledger and run the activation pass
    pub fn open(store: S, config: ScheduleConfig) -> Result<Self> {
        config.validate()?;

        let mut ledger = Self {
            store,
            engine: ScheduleEngine::new(config),
            events: EventStore::new(),
        };
        ledger.synchronize()?;

        Ok(ledger)
    }

    /// run one synchronization pass
    pub fn synchronize(&mut self) -> Result<SyncReport> {
        self.engine.synchronize(&mut self.store, &mut self.events)
    }

    /// add an active investment
    pub fn add_investment(
        &mut self,
        money: Money,
        income_ratio: Option<Rate>,
        created_date: NaiveDate,
    ) -> Result<InvestmentId> {
        if !money.is_positive() {
            return Err(LedgerError::InvalidAmount { amount: money });
        }
        if let Some(ratio) = income_ratio {
            if ratio.is_negative() {
                return Err(LedgerError::InvalidIncomeRatio { ratio });
            }
        }
        // an unpriceable record would fail every later pass
        self.engine.income_for(money, income_ratio)?;

        let investment_id = self.store.add_investment(NewInvestment {
            money,
            income_ratio,
            created_date,
        })?;

        self.events.emit(Event::InvestmentAdded {
            investment_id,
            money,
            income_ratio,
            created_date,
        });
        info!(investment_id, %money, %created_date, "investment added");

        self.synchronize()?;
        Ok(investment_id)
    }

    /// close an investment, settling whatever it still has pending first
    pub fn close_investment(
        &mut self,
        investment_id: InvestmentId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Investment> {
        let mut investment = self.store.get_investment(investment_id)?;
        if investment.is_closed() {
            return Err(LedgerError::InvestmentClosed { id: investment_id });
        }

        let history = self.store.list_payments(PaymentFilter::for_investment(investment_id))?;
        for mut payment in history.into_iter().filter(Payment::is_pending) {
            payment.settle();
            self.store.put_payment(&payment)?;

            self.events.emit(Event::PaymentForceSettled {
                investment_id,
                payment_id: payment.id,
                money: payment.money,
            });
            info!(investment_id, payment_id = payment.id, "pending payment settled on close");
        }

        let closed_date = time_provider.now().date_naive();
        investment.close(closed_date);
        self.store.put_investment(&investment)?;

        self.events.emit(Event::InvestmentClosed {
            investment_id,
            closed_date,
        });
        info!(investment_id, %closed_date, "investment closed");

        self.synchronize()?;
        Ok(investment)
    }

    /// settle a payment and schedule the next one
    pub fn close_payment(&mut self, payment_id: PaymentId) -> Result<Payment> {
        let mut payment = self.store.get_payment(payment_id)?;

        if payment.is_payed {
            debug!(payment_id, "payment already settled");
            return Ok(payment);
        }

        payment.settle();
        self.store.put_payment(&payment)?;

        self.events.emit(Event::PaymentSettled {
            investment_id: payment.invest_id,
            payment_id,
            money: payment.money,
        });
        info!(
            payment_id,
            investment_id = payment.invest_id,
            money = %payment.money,
            "payment settled"
        );

        self.synchronize()?;
        Ok(payment)
    }

    pub fn investment(&self, investment_id: InvestmentId) -> Result<Investment> {
        self.store.get_investment(investment_id)
    }

    pub fn investments(&self, filter: InvestmentFilter) -> Result<Vec<Investment>> {
        self.store.list_investments(filter)
    }

    pub fn payment(&self, payment_id: PaymentId) -> Result<Payment> {
        self.store.get_payment(payment_id)
    }

    pub fn payments(&self, filter: PaymentFilter) -> Result<Vec<Payment>> {
        self.store.list_payments(filter)
    }

    /// snapshot of both stores
    pub fn export(&self) -> Result<LedgerExport> {
        Ok(LedgerExport {
            invests: self.store.list_investments(InvestmentFilter::all())?,
            payments: self.store.list_payments(PaymentFilter::all())?,
        })
    }

    pub fn export_json(&self) -> Result<String> {
        self.export()?.to_json()
    }

    /// replace all data with an exported document
    ///
    /// nothing is cleared unless the whole document parses and validates
    pub fn import_json(&mut self, text: &str) -> Result<SyncReport> {
        let data = transfer::parse_import(text)?;
        for investment in &data.invests {
            self.engine
                .income_for(investment.money, investment.income_ratio)
                .map_err(|e| {
                    LedgerError::malformed(format!("investment {}: {}", investment.id, e))
                })?;
        }

        self.store.replace_all(&data.invests, &data.payments)?;

        self.events.emit(Event::DataImported {
            investments: data.invests.len(),
            payments: data.payments.len(),
        });
        info!(investments = data.invests.len(), payments = data.payments.len(), "data imported");

        self.synchronize()
    }

    /// presentation rows as of today
    pub fn view(
        &self,
        options: ViewOptions,
        time_provider: &SafeTimeProvider,
    ) -> Result<LedgerView> {
        let filter = if options.show_closed {
            InvestmentFilter::all()
        } else {
            InvestmentFilter::active()
        };
        let investments = self.store.list_investments(filter)?;

        let mut histories = Vec::with_capacity(investments.len());
        for investment in &investments {
            histories.push(self.store.list_payments(PaymentFilter::for_investment(investment.id))?);
        }

        LedgerView::build(
            investments.into_iter().zip(histories).collect(),
            options,
            self.engine.config().default_income_ratio,
            time_provider.now().date_naive(),
        )
    }

    /// cumulative invested amount over time
    pub fn chart(&self) -> Result<Vec<ChartPoint>> {
        chart_series(&self.store.list_investments(InvestmentFilter::all())?)
    }

    pub fn config(&self) -> &ScheduleConfig {
        self.engine.config()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::open(MemoryStore::new(), ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn test_add_investment_schedules_first_payment() {
        let mut ledger = ledger();
        let id = ledger
            .add_investment(Money::from_major(100_000), None, date(2024, 3, 10))
            .unwrap();

        let payments = ledger.payments(PaymentFilter::for_investment(id)).unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payment_date, date(2024, 4, 10));
        assert_eq!(payments[0].money, Money::from_major(5_000));
        assert!(payments[0].is_pending());
    }

    #[test]
    fn test_invalid_investments_rejected() {
        let mut ledger = ledger();

        let zero = ledger.add_investment(Money::ZERO, None, date(2024, 1, 1));
        assert!(matches!(zero, Err(LedgerError::InvalidAmount { .. })));

        let negative_ratio = ledger.add_investment(
            Money::from_major(10),
            Some(Rate::from_decimal(dec!(-0.01))),
            date(2024, 1, 1),
        );
        assert!(matches!(negative_ratio, Err(LedgerError::InvalidIncomeRatio { .. })));

        let unpriceable = ledger.add_investment(
            Money::from_decimal(rust_decimal::Decimal::MAX),
            Some(Rate::from_percentage(200)),
            date(2024, 1, 1),
        );
        assert!(matches!(unpriceable, Err(LedgerError::ArithmeticOverflow { .. })));

        assert!(ledger.investments(InvestmentFilter::all()).unwrap().is_empty());
        assert!(ledger.synchronize().unwrap().is_clean());
    }

    #[test]
    fn test_import_rejects_unpriceable_investment() {
        let mut ledger = ledger();
        ledger.add_investment(Money::from_major(1_000), None, date(2024, 1, 1)).unwrap();
        let before = ledger.export().unwrap();

        let text = r#"{"invests":[{"id":1,"money":"79228162514264337593543950335",
            "incomeRatio":"2","createdDate":"2024-01-01","isActive":1}],"payments":[]}"#;
        let result = ledger.import_json(text);
        assert!(matches!(result, Err(LedgerError::MalformedImport { .. })));
        assert_eq!(ledger.export().unwrap(), before);
    }

    #[test]
    fn test_close_payment_schedules_next_month() {
        let mut ledger = ledger();
        let id = ledger
            .add_investment(
                Money::from_major(2_000),
                Some(Rate::from_percentage(3)),
                date(2024, 1, 20),
            )
            .unwrap();

        let first = ledger.payments(PaymentFilter::for_investment(id)).unwrap()[0].clone();
        let settled = ledger.close_payment(first.id).unwrap();
        assert!(settled.is_payed);

        let payments = ledger.payments(PaymentFilter::for_investment(id)).unwrap();
        assert_eq!(payments.len(), 2);
        assert!(payments[0].is_payed);
        assert_eq!(payments[1].payment_date, date(2024, 3, 20));
        assert_eq!(payments[1].money, Money::from_major(60));
        assert!(payments[1].is_pending());
    }

    #[test]
    fn test_close_payment_twice_is_a_no_op() {
        let mut ledger = ledger();
        ledger.add_investment(Money::from_major(2_000), None, date(2024, 1, 20)).unwrap();

        ledger.close_payment(1).unwrap();
        ledger.close_payment(1).unwrap();

        // the second call must not settle payment 2 or schedule a third one
        let payments = ledger.payments(PaymentFilter::all()).unwrap();
        assert_eq!(payments.len(), 2);
        assert!(payments[1].is_pending());
    }

    #[test]
    fn test_close_unknown_payment() {
        let mut ledger = ledger();
        let result = ledger.close_payment(77);
        assert!(matches!(result, Err(LedgerError::RecordNotFound { id: 77, .. })));
    }

    #[test]
    fn test_close_investment_settles_pending_and_stops_schedule() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap()
        ));
        let mut ledger = ledger();
        let id = ledger.add_investment(Money::from_major(1_000), None, date(2024, 1, 1)).unwrap();

        let closed = ledger.close_investment(id, &time).unwrap();
        assert!(closed.is_closed());
        assert_eq!(closed.closed_date, Some(date(2024, 2, 10)));

        let payments = ledger.payments(PaymentFilter::for_investment(id)).unwrap();
        assert_eq!(payments.len(), 1);
        assert!(payments[0].is_payed);

        // closed investments get nothing further
        let report = ledger.synchronize().unwrap();
        assert!(report.scheduled.is_empty());

        let again = ledger.close_investment(id, &time);
        assert!(matches!(again, Err(LedgerError::InvestmentClosed { .. })));
    }

    #[test]
    fn test_open_runs_activation_pass() {
        let mut store = MemoryStore::new();
        crate::store::InvestmentStore::add_investment(
            &mut store,
            NewInvestment {
                money: Money::from_major(500),
                income_ratio: None,
                created_date: date(2024, 1, 1),
            },
        )
        .unwrap();

        let ledger = Ledger::open(store, ScheduleConfig::default()).unwrap();
        assert_eq!(ledger.payments(PaymentFilter::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected_on_open() {
        let config = ScheduleConfig::with_default_ratio(Rate::from_decimal(dec!(-1)));
        assert!(Ledger::open(MemoryStore::new(), config).is_err());
    }

    #[test]
    fn test_events_follow_actions() {
        let mut ledger = ledger();
        let id = ledger.add_investment(Money::from_major(1_000), None, date(2024, 1, 1)).unwrap();
        ledger.close_payment(1).unwrap();

        let events = ledger.take_events();
        assert!(matches!(
            events[1],
            Event::InvestmentAdded { investment_id, .. } if investment_id == id
        ));
        assert!(events.iter().any(|e| matches!(e, Event::PaymentSettled { payment_id: 1, .. })));
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::PaymentScheduled { .. })).count(),
            2
        );
        assert!(ledger.events().is_empty());
    }
}
