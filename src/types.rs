use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};

/// store-assigned identifier of an investment
pub type InvestmentId = i64;

/// store-assigned identifier of a payment
pub type PaymentId = i64;

/// an investment earning a monthly income
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: InvestmentId,
    pub money: Money,
    #[serde(default)]
    pub income_ratio: Option<Rate>,
    #[serde(with = "iso_date")]
    pub created_date: NaiveDate,
    #[serde(default, with = "iso_date_option")]
    pub closed_date: Option<NaiveDate>,
    #[serde(with = "flag")]
    pub is_active: bool,
}

impl Investment {
    /// own ratio, or the configured default when absent
    pub fn effective_ratio(&self, default_ratio: Rate) -> Rate {
        self.income_ratio.unwrap_or(default_ratio)
    }

    pub fn is_closed(&self) -> bool {
        !self.is_active
    }

    /// close on the given date; closed date and active flag always change together
    pub fn close(&mut self, date: NaiveDate) {
        self.is_active = false;
        self.closed_date = Some(date);
    }
}

/// a single income payment of an investment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub invest_id: InvestmentId,
    pub money: Money,
    #[serde(with = "iso_date")]
    pub payment_date: NaiveDate,
    #[serde(with = "flag")]
    pub is_payed: bool,
}

impl Payment {
    pub fn is_pending(&self) -> bool {
        !self.is_payed
    }

    /// mark as settled, never reverts
    pub fn settle(&mut self) {
        self.is_payed = true;
    }
}

/// investment record before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvestment {
    pub money: Money,
    pub income_ratio: Option<Rate>,
    pub created_date: NaiveDate,
}

impl NewInvestment {
    pub fn into_investment(self, id: InvestmentId) -> Investment {
        Investment {
            id,
            money: self.money,
            income_ratio: self.income_ratio,
            created_date: self.created_date,
            closed_date: None,
            is_active: true,
        }
    }
}

/// payment creation request produced by the schedule engine
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub invest_id: InvestmentId,
    pub money: Money,
    pub payment_date: NaiveDate,
    pub is_payed: bool,
}

impl NewPayment {
    pub fn into_payment(self, id: PaymentId) -> Payment {
        Payment {
            id,
            invest_id: self.invest_id,
            money: self.money,
            payment_date: self.payment_date,
            is_payed: self.is_payed,
        }
    }
}

/// investment listing filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvestmentFilter {
    pub only_active: bool,
}

impl InvestmentFilter {
    pub fn all() -> Self {
        Self { only_active: false }
    }

    pub fn active() -> Self {
        Self { only_active: true }
    }
}

/// payment listing filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaymentFilter {
    pub invest_id: Option<InvestmentId>,
}

impl PaymentFilter {
    pub fn all() -> Self {
        Self { invest_id: None }
    }

    pub fn for_investment(invest_id: InvestmentId) -> Self {
        Self { invest_id: Some(invest_id) }
    }
}

/// parse a calendar date from `YYYY-MM-DD` or an RFC 3339 date-time
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }
    chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// 0/1 flags on the wire, `true`/`false` also accepted on read
pub(crate) mod flag {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        struct FlagVisitor;

        impl<'de> Visitor<'de> for FlagVisitor {
            type Value = bool;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "0, 1, true or false")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
                Ok(v)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
                match v {
                    0 => Ok(false),
                    1 => Ok(true),
                    _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
                match v {
                    0 => Ok(false),
                    1 => Ok(true),
                    _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
                }
            }
        }

        deserializer.deserialize_any(FlagVisitor)
    }
}

pub(crate) mod iso_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_iso_date(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", text)))
    }
}

pub(crate) mod iso_date_option {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.collect_str(&date.format("%Y-%m-%d")),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => super::parse_iso_date(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date: {}", text))),
            None => Ok(None),
        }
    }
}
