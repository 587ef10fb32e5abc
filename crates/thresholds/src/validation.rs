//! Threshold update validation.
//!
//! Supplied fields are range-checked individually; the merged result must keep
//! `criticalMultiplier > warningMultiplier`. All violations are collected so
//! the settings screen can show them at once.

use std::ops::RangeInclusive;

use pulse_core::{ThresholdSettings, ThresholdUpdate};

use crate::error::{FieldError, ThresholdError};

/// Allowed range for both sigma multipliers.
pub const MULTIPLIER_RANGE: RangeInclusive<f64> = 0.5..=10.0;

/// Allowed range for the percent-change trigger.
pub const PERCENT_CHANGE_RANGE: RangeInclusive<f64> = 5.0..=100.0;

#[derive(Debug, Default)]
struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    fn error(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError { field, message: message.into() });
    }

    fn check_range(&mut self, field: &'static str, value: Option<f64>, range: &RangeInclusive<f64>) {
        let Some(v) = value else { return };
        if !v.is_finite() || !range.contains(&v) {
            self.error(
                field,
                format!("must be between {} and {}, got {}", range.start(), range.end(), v),
            );
        }
    }

    fn into_result(self) -> Result<(), ThresholdError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ThresholdError::Invalid(self.0))
        }
    }
}

/// Range-check only the fields present in `update`.
pub fn validate_update(update: &ThresholdUpdate) -> Result<(), ThresholdError> {
    let mut errors = FieldErrors::default();
    errors.check_range("warningMultiplier", update.warning_multiplier, &MULTIPLIER_RANGE);
    errors.check_range("criticalMultiplier", update.critical_multiplier, &MULTIPLIER_RANGE);
    errors.check_range(
        "percentChangeThreshold",
        update.percent_change_threshold,
        &PERCENT_CHANGE_RANGE,
    );
    errors.into_result()
}

/// Check the cross-field invariant of a resolved row.
///
/// `blame` names the field reported on violation; pass the field the caller
/// changed so the message points at the user's input.
pub fn check_multiplier_order(
    settings: &ThresholdSettings,
    blame: &'static str,
) -> Result<(), ThresholdError> {
    if settings.critical_multiplier > settings.warning_multiplier {
        return Ok(());
    }
    Err(ThresholdError::invalid(
        blame,
        format!(
            "criticalMultiplier ({}) must be greater than warningMultiplier ({})",
            settings.critical_multiplier, settings.warning_multiplier
        ),
    ))
}

/// Which field to blame when the merged multipliers are out of order.
pub fn order_blame(update: &ThresholdUpdate) -> &'static str {
    match (update.warning_multiplier, update.critical_multiplier) {
        (Some(_), None) => "warningMultiplier",
        _ => "criticalMultiplier",
    }
}

/// Validate `update` and return it merged over `current`.
pub fn validate_patch(
    current: ThresholdSettings,
    update: &ThresholdUpdate,
) -> Result<ThresholdSettings, ThresholdError> {
    validate_update(update)?;
    let merged = update.apply_to(current);
    check_multiplier_order(&merged, order_blame(update))?;
    Ok(merged)
}
