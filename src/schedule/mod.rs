pub mod calendar;
pub mod income;

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ScheduleConfig;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::store::LedgerStore;
use crate::types::{
    Investment, InvestmentFilter, InvestmentId, NewPayment, Payment, PaymentFilter, PaymentId,
};

pub use calendar::{add_one_calendar_month, days_in_month, MonthAdjustment, MonthStep};
pub use income::{income_amount, rounded_income, IncomeAmount};

/// true iff the most recent payment is still unsettled
pub fn has_pending_payment(history: &[Payment]) -> bool {
    history.last().map_or(false, Payment::is_pending)
}

/// active and not already waiting on a pending payment
pub fn is_eligible_for_next_payment(investment: &Investment, history: &[Payment]) -> bool {
    investment.is_active && !has_pending_payment(history)
}

/// next payment decided for one investment
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledPayment {
    pub request: NewPayment,
    /// previous payment date, or the creation date for the first payment
    pub anchor_date: NaiveDate,
    pub adjustment: Option<MonthAdjustment>,
    pub income: IncomeAmount,
}

/// investment left unsynchronized during a pass
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub investment_id: InvestmentId,
    pub reason: String,
}

/// in-memory planning result
#[derive(Debug, Clone, Default)]
pub struct SchedulePlan {
    pub requests: Vec<NewPayment>,
    pub failures: Vec<SyncFailure>,
}

/// outcome of one synchronization pass against a store
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub pass_id: Uuid,
    pub scheduled: Vec<PaymentId>,
    /// investments whose last payment is still pending
    pub unchanged: Vec<InvestmentId>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    fn new(pass_id: Uuid) -> Self {
        Self {
            pass_id,
            scheduled: Vec::new(),
            unchanged: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// decides which payment, if any, each investment needs next
#[derive(Debug, Clone, Default)]
pub struct ScheduleEngine {
    config: ScheduleConfig,
}

impl ScheduleEngine {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// next payment for one investment given its chronological history
    pub fn next_payment(
        &self,
        investment: &Investment,
        history: &[Payment],
    ) -> Result<Option<ScheduledPayment>> {
        if !is_eligible_for_next_payment(investment, history) {
            return Ok(None);
        }

        let anchor_date = history
            .last()
            .map_or(investment.created_date, |last| last.payment_date);
        let step = add_one_calendar_month(anchor_date, self.config.month_overflow)?;

        let income = self.income_for(investment.money, investment.income_ratio)?;

        Ok(Some(ScheduledPayment {
            request: NewPayment {
                invest_id: investment.id,
                money: income.rounded,
                payment_date: step.date,
                is_payed: false,
            },
            anchor_date,
            adjustment: step.adjustment,
            income,
        }))
    }

    /// periodic income under this engine's default ratio and rounding
    pub fn income_for(&self, money: Money, income_ratio: Option<Rate>) -> Result<IncomeAmount> {
        income_amount(
            money,
            income_ratio.unwrap_or(self.config.default_income_ratio),
            self.config.rounding,
        )
    }

    /// creation requests for every investment, without touching a store
    ///
    /// an investment missing from `histories` has no payments yet
    pub fn plan(
        &self,
        investments: &[Investment],
        histories: &HashMap<InvestmentId, Vec<Payment>>,
    ) -> SchedulePlan {
        let mut plan = SchedulePlan::default();

        for investment in investments {
            let history = histories.get(&investment.id).map_or(&[][..], Vec::as_slice);
            match self.next_payment(investment, history) {
                Ok(Some(scheduled)) => plan.requests.push(scheduled.request),
                Ok(None) => {}
                Err(err) => plan.failures.push(SyncFailure {
                    investment_id: investment.id,
                    reason: err.to_string(),
                }),
            }
        }

        plan
    }

    /// one synchronization pass over all active investments in the store
    ///
    /// only a failure to list the active investments aborts the pass; any other
    /// failure is confined to the investment it happened on
    pub fn synchronize<S: LedgerStore + ?Sized>(
        &self,
        store: &mut S,
        events: &mut EventStore,
    ) -> Result<SyncReport> {
        let pass_id = Uuid::new_v4();
        let investments = store.list_investments(InvestmentFilter::active())?;
        debug!(%pass_id, active = investments.len(), "synchronization pass started");

        let mut report = SyncReport::new(pass_id);

        for investment in &investments {
            match self.synchronize_investment(pass_id, investment, store, events) {
                Ok(Some(payment_id)) => report.scheduled.push(payment_id),
                Ok(None) => report.unchanged.push(investment.id),
                Err(err) => {
                    warn!(
                        %pass_id,
                        investment_id = investment.id,
                        error = %err,
                        "investment left unsynchronized"
                    );
                    events.emit(Event::SynchronizationFailed {
                        pass_id,
                        investment_id: investment.id,
                        reason: err.to_string(),
                    });
                    report.failures.push(SyncFailure {
                        investment_id: investment.id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        events.emit(Event::SynchronizationCompleted {
            pass_id,
            scheduled: report.scheduled.len(),
            failed: report.failures.len(),
        });
        info!(
            %pass_id,
            scheduled = report.scheduled.len(),
            unchanged = report.unchanged.len(),
            failed = report.failures.len(),
            "synchronization pass finished"
        );

        Ok(report)
    }

    // read history, decide, write
    fn synchronize_investment<S: LedgerStore + ?Sized>(
        &self,
        pass_id: Uuid,
        investment: &Investment,
        store: &mut S,
        events: &mut EventStore,
    ) -> Result<Option<PaymentId>> {
        let history = store.list_payments(PaymentFilter::for_investment(investment.id))?;

        let scheduled = match self.next_payment(investment, &history)? {
            Some(scheduled) => scheduled,
            None => {
                debug!(%pass_id, investment_id = investment.id, "pending payment kept");
                return Ok(None);
            }
        };

        self.flag_edge_cases(pass_id, investment.id, &scheduled, events);

        let money = scheduled.request.money;
        let payment_date = scheduled.request.payment_date;
        let payment_id = store.add_payment(scheduled.request)?;

        events.emit(Event::PaymentScheduled {
            pass_id,
            investment_id: investment.id,
            payment_id,
            money,
            payment_date,
        });
        debug!(
            %pass_id,
            investment_id = investment.id,
            payment_id,
            %money,
            %payment_date,
            "payment scheduled"
        );

        Ok(Some(payment_id))
    }

    fn flag_edge_cases(
        &self,
        pass_id: Uuid,
        investment_id: InvestmentId,
        scheduled: &ScheduledPayment,
        events: &mut EventStore,
    ) {
        if let Some(adjustment) = scheduled.adjustment {
            warn!(
                %pass_id,
                investment_id,
                anchor_date = %scheduled.anchor_date,
                payment_date = %scheduled.request.payment_date,
                mode = ?adjustment.mode,
                "day {} does not exist in {:04}-{:02}",
                adjustment.requested_day,
                adjustment.target_year,
                adjustment.target_month
            );
            events.emit(Event::PaymentDateOverflow {
                pass_id,
                investment_id,
                anchor_date: scheduled.anchor_date,
                payment_date: scheduled.request.payment_date,
                mode: adjustment.mode,
            });
        }

        if scheduled.income.was_tie() {
            warn!(
                %pass_id,
                investment_id,
                unrounded = %scheduled.income.unrounded,
                rounded = %scheduled.income.rounded,
                rounding = ?self.config.rounding,
                "income amount rounded from an exact half"
            );
            events.emit(Event::IncomeRoundingTie {
                pass_id,
                investment_id,
                unrounded: scheduled.income.unrounded,
                rounded: scheduled.income.rounded,
            });
        }
    }
}
