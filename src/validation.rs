//! Input validation for catalog, order and walk-in requests.
//!
//! Request DTOs derive [`validator::Validate`] for their static rules. Rules that
//! depend on live data (order quantity against current stock) or on the shape of
//! several fields (walk-in product/service exclusivity) are checked here and merged
//! into the same [`ValidationErrors`] so callers always get one joined message.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::{orders::CreateOrderRequest, walk_ins::CreateWalkInRequest},
    error::{AppError, AppResult},
    models::WalkInTarget,
};

/// Digits, spaces, dashes, parentheses and an optional leading `+`.
pub static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()\-]+$").expect("phone pattern compiles"));

/// Run the derived rules of `payload`, mapping failures to [`AppError::Validation`].
pub fn validate_payload<T: Validate>(payload: &T) -> AppResult<()> {
    payload
        .validate()
        .map_err(|errors| AppError::Validation(join_messages(&errors)))
}

/// One line per field failure, sorted by field name.
pub fn join_messages(errors: &ValidationErrors) -> String {
    let mut lines: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter()
                .map(move |err| match &err.message {
                    Some(message) => format!("{field}: {message}"),
                    None => format!("{field}: invalid ({})", err.code),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    lines.sort();
    lines.join("\n")
}

fn error_with_message(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn positive_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(error_with_message("price", "must be greater than 0"))
    }
}

pub fn non_negative_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(error_with_message("price", "must not be negative"))
    }
}

pub fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error_with_message("blank", "must not be empty"))
    } else {
        Ok(())
    }
}

/// Order-intent rules bound to the product's stock at request time.
#[derive(Debug, Clone, Copy)]
pub struct OrderIntentRules {
    pub max_quantity: i32,
}

impl OrderIntentRules {
    pub fn for_stock(stock_remaining: i32) -> Self {
        Self {
            max_quantity: stock_remaining,
        }
    }

    pub fn check(&self, payload: &CreateOrderRequest) -> AppResult<()> {
        let mut errors = match payload.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if payload.quantity > self.max_quantity {
            errors.add(
                "quantity",
                error_with_message(
                    "max_stock",
                    format!("only {} left in stock", self.max_quantity.max(0)),
                ),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(join_messages(&errors)))
        }
    }
}

/// A walk-in sale that passed validation; the target is already the typed union.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWalkIn {
    pub customer_name: Option<String>,
    pub quantity: i32,
    pub price_paid: Decimal,
    pub target: WalkInTarget,
}

impl CreateWalkInRequest {
    pub fn into_walk_in(self) -> AppResult<NewWalkIn> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        let target = WalkInTarget::from_columns(self.product_id, self.service_id);
        if target.is_none() {
            errors.add(
                "product_id",
                error_with_message("target", "select exactly one product or service"),
            );
        }
        match target {
            Some(target) if errors.is_empty() => Ok(NewWalkIn {
                customer_name: self
                    .customer_name
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty()),
                quantity: self.quantity,
                price_paid: self.price_paid.unwrap_or(Decimal::ZERO),
                target,
            }),
            _ => Err(AppError::Validation(join_messages(&errors))),
        }
    }
}
