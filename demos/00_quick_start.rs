/// quick start - add an investment, settle income, close it
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use income_ledger::logging::init_logging;
use income_ledger::{
    Ledger, MemoryStore, Money, PaymentFilter, Rate, SafeTimeProvider, ScheduleConfig, TimeSource,
    ViewOptions,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info")?;

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let mut ledger = Ledger::open(MemoryStore::new(), ScheduleConfig::default())?;

    let created = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let deposit = ledger.add_investment(
        Money::from_major(1_000_000),
        Some(Rate::from_percentage(5)),
        created,
    )?;
    println!("investment {} added on {}", deposit, created);

    // three months of income
    for _ in 0..3 {
        controller.advance(Duration::days(31));
        let pending = ledger
            .payments(PaymentFilter::for_investment(deposit))?
            .into_iter()
            .find(|p| p.is_pending())
            .ok_or("no pending payment")?;
        let settled = ledger.close_payment(pending.id)?;
        println!(
            "{}: received {} due {}",
            time.now().format("%Y-%m-%d"),
            settled.money,
            settled.payment_date
        );
    }

    let view = ledger.view(ViewOptions::default(), &time)?;
    println!("\n{}", view.to_json_pretty()?);

    ledger.close_investment(deposit, &time)?;
    println!("\ninvestment closed on {}", time.now().format("%Y-%m-%d"));

    for point in ledger.chart()? {
        println!("  {}  {}", point.date, point.total);
    }

    Ok(())
}
