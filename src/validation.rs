//! Input checks applied before anything is persisted.
//!
//! The balance engine trusts its input; this module is where bad ledgers are
//! turned away.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::money::{to_cents, MAX_CENTS};
use crate::schemas::{Expense, Group, SettlementRecord};

pub const MAX_TEXT_LEN: usize = 200;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("`{0}` must be between 1 and {MAX_TEXT_LEN} characters")]
    Text(&'static str),
    #[error("`{0}` is not a valid amount")]
    Amount(String),
    #[error("`{0}` is not a valid date (expected YYYY-MM-DD)")]
    Date(String),
    #[error("`{0}` is not a member of this group")]
    UnknownMember(String),
    #[error("member `{0}` appears more than once")]
    DuplicateMember(String),
    #[error("expense `{0}` has no participants")]
    NoParticipants(String),
    #[error("`{0}` cannot settle with themselves")]
    SelfSettlement(String),
}

pub fn is_non_empty(text: &str, max: usize) -> bool {
    let len = text.trim().chars().count();
    len > 0 && len <= max
}

/// Digits, optionally followed by `.` or `,` and one or two digits.
pub fn is_valid_amount(input: &str) -> bool {
    let input = input.trim();
    let (whole, fraction) = match input.find(&['.', ','][..]) {
        Some(idx) => (&input[..idx], Some(&input[idx + 1..])),
        None => (input, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    digits(whole) && fraction.map_or(true, |f| f.len() <= 2 && digits(f))
}

pub fn parse_amount(input: &str) -> Result<f64, ValidationError> {
    if !is_valid_amount(input) {
        return Err(ValidationError::Amount(input.to_owned()));
    }
    input
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| ValidationError::Amount(input.to_owned()))
}

/// An amount as typed by a user (`"12,50"`) or as sent by a program (`12.5`).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    pub fn resolve(&self) -> Result<f64, ValidationError> {
        match self {
            AmountInput::Number(amount) => Ok(*amount),
            AmountInput::Text(text) => parse_amount(text),
        }
    }
}

pub fn is_valid_iso_date(input: &str) -> bool {
    input.len() == 10 && NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok()
}

pub fn parse_iso_date(input: &str) -> Result<NaiveDate, ValidationError> {
    if !is_valid_iso_date(input) {
        return Err(ValidationError::Date(input.to_owned()));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| ValidationError::Date(input.to_owned()))
}

/// Finite, not negative, at most [`MAX_CENTS`], and no meaningful digit below
/// the cent.
fn check_money(amount: f64) -> Result<(), ValidationError> {
    let has_sub_cents = (amount * 100.0 - to_cents(amount) as f64).abs() > 1e-6;
    let too_large = to_cents(amount) > MAX_CENTS;
    if !amount.is_finite() || amount < 0.0 || has_sub_cents || too_large {
        return Err(ValidationError::Amount(amount.to_string()));
    }
    Ok(())
}

fn check_member(group: &Group, id: &str) -> Result<(), ValidationError> {
    match group.member(id) {
        Some(_) => Ok(()),
        None => Err(ValidationError::UnknownMember(id.to_owned())),
    }
}

pub fn validate_expense(group: &Group, expense: &Expense) -> Result<(), ValidationError> {
    if !is_non_empty(&expense.description, MAX_TEXT_LEN) {
        return Err(ValidationError::Text("description"));
    }
    check_money(expense.amount)?;
    check_member(group, &expense.paid_by)?;
    if expense.participants.is_empty() {
        return Err(ValidationError::NoParticipants(expense.id.clone()));
    }
    expense
        .participants
        .iter()
        .try_for_each(|id| check_member(group, id))
}

pub fn validate_settlement(group: &Group, record: &SettlementRecord) -> Result<(), ValidationError> {
    check_money(record.amount)?;
    if record.amount <= 0.0 {
        return Err(ValidationError::Amount(record.amount.to_string()));
    }
    check_member(group, &record.from)?;
    check_member(group, &record.to)?;
    if record.from == record.to {
        return Err(ValidationError::SelfSettlement(record.from.clone()));
    }
    Ok(())
}

/// Checks a whole group as submitted by a client.
pub fn validate_group(group: &Group) -> Result<(), ValidationError> {
    if !is_non_empty(&group.name, MAX_TEXT_LEN) {
        return Err(ValidationError::Text("name"));
    }
    let mut seen = HashSet::new();
    for member in &group.members {
        if !is_non_empty(&member.name, MAX_TEXT_LEN) {
            return Err(ValidationError::Text("member name"));
        }
        if !seen.insert(member.id.as_str()) {
            return Err(ValidationError::DuplicateMember(member.id.clone()));
        }
    }
    for expense in &group.expenses {
        validate_expense(group, expense)?;
    }
    for record in &group.settlements {
        validate_settlement(group, record)?;
    }
    Ok(())
}
