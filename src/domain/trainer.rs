use crate::error::PayrollError;
use serde::{Deserialize, Serialize};

pub type TrainerId = u32;

/// Longest phone number accepted, in digits, international format without `+`.
pub const MAX_PHONE_DIGITS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trainer {
    pub id: TrainerId,
    pub first_name: String,
    pub last_name: String,
    /// Normalised phone number, the trainer's login key.
    pub phone_number: String,
    /// External chat identity, bound once on first successful verification.
    pub chat_id: Option<String>,
}

impl Trainer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A trainer that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrainer {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl NewTrainer {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: &str,
    ) -> Result<Self, PayrollError> {
        let first_name = first_name.into().trim().to_string();
        let last_name = last_name.into().trim().to_string();
        if first_name.is_empty() {
            return Err(PayrollError::validation("first name must not be empty"));
        }
        Ok(Self {
            first_name,
            last_name,
            phone_number: normalize_phone(phone_number)?,
        })
    }

    pub fn into_trainer(self, id: TrainerId) -> Trainer {
        Trainer {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            chat_id: None,
        }
    }
}

/// Strips a leading `+` and checks the rest is 1..=12 digits.
///
/// Chat clients report contacts both with and without the plus sign, while
/// numbers are stored without it.
pub fn normalize_phone(raw: &str) -> Result<String, PayrollError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty()
        || digits.len() > MAX_PHONE_DIGITS
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return Err(PayrollError::validation(format!(
            "invalid phone number '{raw}'"
        )));
    }
    Ok(digits.to_string())
}
