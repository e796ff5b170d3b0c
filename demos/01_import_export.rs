/// import/export - move a ledger between stores as json
use chrono::NaiveDate;
use income_ledger::logging::init_logging;
use income_ledger::{Ledger, MemoryStore, Money, PaymentFilter, ScheduleConfig, SqliteStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("debug")?;

    let mut ledger = Ledger::open(MemoryStore::new(), ScheduleConfig::default())?;
    for (money, day) in [(250_000, 5), (120_000, 31)] {
        let created = NaiveDate::from_ymd_opt(2024, 1, day).ok_or("bad date")?;
        ledger.add_investment(Money::from_major(money), None, created)?;
    }

    let exported = ledger.export()?.to_json_pretty()?;
    println!("exported:\n{}\n", exported);

    let path = std::env::temp_dir().join("income-ledger-demo.sqlite");
    let mut persisted = Ledger::open(SqliteStore::open(&path)?, ScheduleConfig::clamped())?;
    let report = persisted.import_json(&exported)?;
    println!(
        "imported into {} (pass {}, {} new payments)",
        path.display(),
        report.pass_id,
        report.scheduled.len()
    );

    for payment in persisted.payments(PaymentFilter::all())? {
        println!(
            "  payment {} for investment {}: {} due {}",
            payment.id, payment.invest_id, payment.money, payment.payment_date
        );
    }

    Ok(())
}
