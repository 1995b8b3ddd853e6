use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DeliveryId, OrderError, OrderResult, UserId};

/// Delivery details an order references by id.
///
/// The engine itself only carries the `DeliveryId`; the record is created by
/// the surrounding application before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub user_id: Option<UserId>,
    pub address: String,
    pub phone: String,
    /// Delivery method name (courier, pickup point, ...), if chosen.
    pub kind: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    pub fn new(
        user_id: Option<UserId>,
        address: impl Into<String>,
        phone: impl Into<String>,
        kind: Option<String>,
    ) -> OrderResult<Self> {
        let address = address.into();
        let phone = phone.into();

        if address.trim().is_empty() {
            return Err(OrderError::validation("address cannot be empty"));
        }
        validate_phone(&phone)?;

        let now = Utc::now();
        Ok(Self {
            id: DeliveryId::new(),
            user_id,
            address,
            phone,
            kind,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Validate a delivery phone number.
///
/// Accepted shape: optional `+`, a leading 7 or 8, then ten digits grouped
/// 3-3-2-2 with optional `-` separators and optional parentheses around the
/// first group, e.g. `+7(926)123-45-67` or `89261234567`.
pub fn validate_phone(phone: &str) -> OrderResult<()> {
    fn digits(s: &str, n: usize) -> Option<&str> {
        let bytes = s.as_bytes();
        if bytes.len() < n || !bytes[..n].iter().all(u8::is_ascii_digit) {
            return None;
        }
        Some(&s[n..])
    }

    fn step(phone: &str) -> Option<()> {
        let mut rest = phone;
        if let Some(stripped) = rest.strip_prefix('+') {
            rest = stripped;
        }
        rest = rest.strip_prefix(['7', '8'])?;
        if let Some(stripped) = rest.strip_prefix(['-', '(']) {
            rest = stripped;
        }
        rest = digits(rest, 3)?;
        if let Some(stripped) = rest.strip_prefix(')') {
            rest = stripped;
        }
        if let Some(stripped) = rest.strip_prefix('-') {
            rest = stripped;
        }
        rest = digits(rest, 3)?;
        if let Some(stripped) = rest.strip_prefix('-') {
            rest = stripped;
        }
        rest = digits(rest, 2)?;
        if let Some(stripped) = rest.strip_prefix('-') {
            rest = stripped;
        }
        rest = digits(rest, 2)?;
        rest.is_empty().then_some(())
    }

    step(phone).ok_or_else(|| OrderError::validation(format!("invalid phone number: {phone}")))
}
