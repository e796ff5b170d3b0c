use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::debug;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::store::{InvestmentStore, LedgerStore, PaymentStore};
use crate::types::{
    Investment, InvestmentFilter, InvestmentId, NewInvestment, NewPayment, Payment, PaymentFilter,
    PaymentId,
};

const SCHEMA: &str = "PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS invests (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      money TEXT NOT NULL,
      income_ratio TEXT,
      created_date TEXT NOT NULL,
      closed_date TEXT,
      is_active INTEGER NOT NULL DEFAULT 1
    );
    CREATE INDEX IF NOT EXISTS invests_is_active_idx ON invests(is_active);
    CREATE TABLE IF NOT EXISTS payments (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      invest_id INTEGER NOT NULL,
      money TEXT NOT NULL,
      payment_date TEXT NOT NULL,
      is_payed INTEGER NOT NULL DEFAULT 0,
      FOREIGN KEY(invest_id) REFERENCES invests(id)
    );
    CREATE INDEX IF NOT EXISTS payments_invest_id_idx ON payments(invest_id);";

const INVESTMENT_COLUMNS: &str = "id, money, income_ratio, created_date, closed_date, is_active";
const PAYMENT_COLUMNS: &str = "id, invest_id, money, payment_date, is_payed";

/// sqlite-backed store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| LedgerError::StoreUnavailable {
            message: format!("{}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| LedgerError::StoreUnavailable {
            message: e.to_string(),
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| LedgerError::StoreUnavailable {
                message: format!("schema setup failed: {}", e),
            })?;
        Ok(Self { conn })
    }

    fn query_investments(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Investment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, InvestmentRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(InvestmentRow::into_investment).collect()
    }

    fn query_payments(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Payment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, PaymentRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }
}

impl InvestmentStore for SqliteStore {
    fn get_investment(&self, id: InvestmentId) -> Result<Investment> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM invests WHERE id = ?1", INVESTMENT_COLUMNS),
                [id],
                InvestmentRow::read,
            )
            .optional()?;
        row.ok_or_else(|| LedgerError::investment_not_found(id))?
            .into_investment()
    }

    fn list_investments(&self, filter: InvestmentFilter) -> Result<Vec<Investment>> {
        if filter.only_active {
            self.query_investments(
                &format!(
                    "SELECT {} FROM invests WHERE is_active = 1 ORDER BY id",
                    INVESTMENT_COLUMNS
                ),
                &[],
            )
        } else {
            self.query_investments(
                &format!("SELECT {} FROM invests ORDER BY id", INVESTMENT_COLUMNS),
                &[],
            )
        }
    }

    fn add_investment(&mut self, investment: NewInvestment) -> Result<InvestmentId> {
        self.conn.execute(
            "INSERT INTO invests (money, income_ratio, created_date, closed_date, is_active)
             VALUES (?1, ?2, ?3, NULL, 1)",
            params![
                investment.money.as_decimal().to_string(),
                investment.income_ratio.map(|r| r.as_decimal().to_string()),
                format_date(investment.created_date),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn put_investment(&mut self, investment: &Investment) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE invests SET money = ?2, income_ratio = ?3, created_date = ?4, closed_date = ?5, is_active = ?6
             WHERE id = ?1",
            params![
                investment.id,
                investment.money.as_decimal().to_string(),
                investment.income_ratio.map(|r| r.as_decimal().to_string()),
                format_date(investment.created_date),
                investment.closed_date.map(format_date),
                investment.is_active,
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::investment_not_found(investment.id));
        }
        Ok(())
    }
}

impl PaymentStore for SqliteStore {
    fn get_payment(&self, id: PaymentId) -> Result<Payment> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS),
                [id],
                PaymentRow::read,
            )
            .optional()?;
        row.ok_or_else(|| LedgerError::payment_not_found(id))?
            .into_payment()
    }

    fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<Payment>> {
        match filter.invest_id {
            Some(invest_id) => self.query_payments(
                &format!(
                    "SELECT {} FROM payments WHERE invest_id = ?1 ORDER BY id",
                    PAYMENT_COLUMNS
                ),
                &[&invest_id],
            ),
            None => self.query_payments(
                &format!("SELECT {} FROM payments ORDER BY id", PAYMENT_COLUMNS),
                &[],
            ),
        }
    }

    fn add_payment(&mut self, payment: NewPayment) -> Result<PaymentId> {
        self.conn.execute(
            "INSERT INTO payments (invest_id, money, payment_date, is_payed) VALUES (?1, ?2, ?3, ?4)",
            params![
                payment.invest_id,
                payment.money.as_decimal().to_string(),
                format_date(payment.payment_date),
                payment.is_payed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn put_payment(&mut self, payment: &Payment) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE payments SET invest_id = ?2, money = ?3, payment_date = ?4, is_payed = ?5 WHERE id = ?1",
            params![
                payment.id,
                payment.invest_id,
                payment.money.as_decimal().to_string(),
                format_date(payment.payment_date),
                payment.is_payed,
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::payment_not_found(payment.id));
        }
        Ok(())
    }
}

impl LedgerStore for SqliteStore {
    fn replace_all(&mut self, investments: &[Investment], payments: &[Payment]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM payments", [])?;
        tx.execute("DELETE FROM invests", [])?;

        for investment in investments {
            tx.execute(
                "INSERT INTO invests (id, money, income_ratio, created_date, closed_date, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    investment.id,
                    investment.money.as_decimal().to_string(),
                    investment.income_ratio.map(|r| r.as_decimal().to_string()),
                    format_date(investment.created_date),
                    investment.closed_date.map(format_date),
                    investment.is_active,
                ],
            )?;
        }

        for payment in payments {
            tx.execute(
                "INSERT INTO payments (id, invest_id, money, payment_date, is_payed) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    payment.id,
                    payment.invest_id,
                    payment.money.as_decimal().to_string(),
                    format_date(payment.payment_date),
                    payment.is_payed,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// raw column values, converted outside the rusqlite row callback
struct InvestmentRow {
    id: i64,
    money: String,
    income_ratio: Option<String>,
    created_date: String,
    closed_date: Option<String>,
    is_active: bool,
}

impl InvestmentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            money: row.get(1)?,
            income_ratio: row.get(2)?,
            created_date: row.get(3)?,
            closed_date: row.get(4)?,
            is_active: row.get(5)?,
        })
    }

    fn into_investment(self) -> Result<Investment> {
        Ok(Investment {
            id: self.id,
            money: Money::from_decimal(parse_decimal(&self.money)?),
            income_ratio: self
                .income_ratio
                .as_deref()
                .map(parse_decimal)
                .transpose()?
                .map(Rate::from_decimal),
            created_date: parse_date(&self.created_date)?,
            closed_date: self.closed_date.as_deref().map(parse_date).transpose()?,
            is_active: self.is_active,
        })
    }
}

struct PaymentRow {
    id: i64,
    invest_id: i64,
    money: String,
    payment_date: String,
    is_payed: bool,
}

impl PaymentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            invest_id: row.get(1)?,
            money: row.get(2)?,
            payment_date: row.get(3)?,
            is_payed: row.get(4)?,
        })
    }

    fn into_payment(self) -> Result<Payment> {
        Ok(Payment {
            id: self.id,
            invest_id: self.invest_id,
            money: Money::from_decimal(parse_decimal(&self.money)?),
            payment_date: parse_date(&self.payment_date)?,
            is_payed: self.is_payed,
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| LedgerError::StoreFailure {
        message: format!("stored date {:?} is unreadable: {}", text, e),
    })
}

fn parse_decimal(text: &str) -> Result<Decimal> {
    Decimal::from_str(text).map_err(|e| LedgerError::StoreFailure {
        message: format!("stored amount {:?} is unreadable: {}", text, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_investment_roundtrip_through_sqlite() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .add_investment(NewInvestment {
                money: Money::from_decimal(dec!(1500.75)),
                income_ratio: Some(Rate::from_decimal(dec!(0.04))),
                created_date: date(2024, 1, 31),
            })
            .unwrap();

        let mut investment = store.get_investment(id).unwrap();
        assert_eq!(investment.money, Money::from_decimal(dec!(1500.75)));
        assert_eq!(investment.income_ratio, Some(Rate::from_percentage(4)));
        assert!(investment.is_active);

        investment.close(date(2024, 5, 2));
        store.put_investment(&investment).unwrap();

        assert_eq!(store.get_investment(id).unwrap(), investment);
        assert!(store.list_investments(InvestmentFilter::active()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_ids() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.get_investment(3),
            Err(LedgerError::RecordNotFound { id: 3, .. })
        ));

        let ghost = NewPayment {
            invest_id: 1,
            money: Money::from_major(5),
            payment_date: date(2024, 2, 1),
            is_payed: false,
        }
        .into_payment(99);
        assert!(matches!(
            store.put_payment(&ghost),
            Err(LedgerError::RecordNotFound { id: 99, .. })
        ));
    }

    #[test]
    fn test_open_unreachable_path() {
        let result = SqliteStore::open("/nonexistent-dir/ledger/db.sqlite");
        assert!(matches!(result, Err(ref e) if e.is_fatal()));
    }
}
