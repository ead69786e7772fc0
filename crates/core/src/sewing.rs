//! Custom sewing request wizard.
//!
//! The wizard walks through three steps before submission:
//!
//! ```text
//! SelectStyle ──(style chosen)──▶ ChooseSize ──(standard size, or any
//!      ▲                              │        non-blank measurement)
//!      └────────────── back ──────────┤
//!                                     ▼
//!                                   Review ──(submit)──▶ Submitted
//! ```
//!
//! Steps only move forward one at a time and only when the current step's
//! gate holds; there is no way to jump straight to `Review`. The draft lives
//! in memory for one wizard run and is reset after a successful submission.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::SewingStyle;
use crate::types::{OrderId, UserId};

/// Standard size chart offered for custom garments.
pub const STANDARD_SIZES: [&str; 6] = ["S", "M", "L", "XL", "XXL", "XXXL"];

/// Size preselected when the wizard starts.
pub const DEFAULT_STANDARD_SIZE: &str = "M";

/// Marker sent as the size when the customer supplies measurements.
pub const CUSTOM_SIZE_MARKER: &str = "custom";

/// Wizard position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectStyle,
    ChooseSize,
    Review,
    Submitted,
}

impl WizardStep {
    /// 1-based step number as shown in the progress bar.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::SelectStyle => 1,
            Self::ChooseSize => 2,
            Self::Review => 3,
            Self::Submitted => 4,
        }
    }

    const fn next(self) -> Option<Self> {
        match self {
            Self::SelectStyle => Some(Self::ChooseSize),
            Self::ChooseSize => Some(Self::Review),
            Self::Review | Self::Submitted => None,
        }
    }

    const fn previous(self) -> Self {
        match self {
            Self::SelectStyle | Self::ChooseSize => Self::SelectStyle,
            Self::Review => Self::ChooseSize,
            Self::Submitted => Self::Submitted,
        }
    }
}

/// Standard chart size or tailor-made measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeOption {
    #[default]
    Standard,
    Custom,
}

/// The fixed set of body measurements a customer may supply (inches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementField {
    Chest,
    Shoulder,
    ArmLength,
    Waist,
    Hip,
    Length,
    TrouserLength,
    Thigh,
}

impl MeasurementField {
    pub const ALL: [Self; 8] = [
        Self::Chest,
        Self::Shoulder,
        Self::ArmLength,
        Self::Waist,
        Self::Hip,
        Self::Length,
        Self::TrouserLength,
        Self::Thigh,
    ];

    /// Key used in the submitted measurements map.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Chest => "chest",
            Self::Shoulder => "shoulder",
            Self::ArmLength => "arm_length",
            Self::Waist => "waist",
            Self::Hip => "hip",
            Self::Length => "length",
            Self::TrouserLength => "trouser_length",
            Self::Thigh => "thigh",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Chest => "Chest (inches)",
            Self::Shoulder => "Shoulder Width (inches)",
            Self::ArmLength => "Arm Length (inches)",
            Self::Waist => "Waist (inches)",
            Self::Hip => "Hip (inches)",
            Self::Length => "Outfit Length (inches)",
            Self::TrouserLength => "Trouser Length (inches)",
            Self::Thigh => "Thigh (inches)",
        }
    }
}

/// Measurements as typed by the customer. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Measurements(BTreeMap<MeasurementField, String>);

impl Measurements {
    pub fn set(&mut self, field: MeasurementField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    #[must_use]
    pub fn get(&self, field: MeasurementField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// At least one field is non-blank after trimming.
    #[must_use]
    pub fn has_any_value(&self) -> bool {
        self.0.values().any(|v| !v.trim().is_empty())
    }

    /// Non-blank values keyed by their wire names, trimmed.
    #[must_use]
    pub fn filled(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter_map(|(field, value)| {
                let value = value.trim();
                (!value.is_empty()).then(|| (field.key().to_string(), value.to_string()))
            })
            .collect()
    }
}

/// Reasons the wizard refuses a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("please select a sewing style first")]
    NoStyleSelected,
    #[error("please enter at least one measurement")]
    MissingMeasurements,
    #[error("unknown size: {0}")]
    UnknownSize(String),
    #[error("review your request and submit it")]
    AtReview,
    #[error("finish the previous steps before submitting")]
    NotAtReview,
    #[error("this request has already been submitted")]
    AlreadySubmitted,
}

/// Order created by an earlier attempt whose detail record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct PendingOrder {
    order_id: OrderId,
    /// Account that created the order; only it may retry the detail.
    #[serde(skip_serializing)]
    owner: UserId,
}

/// In-progress custom sewing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SewingDraft {
    step: WizardStep,
    style: Option<SewingStyle>,
    size_option: SizeOption,
    selected_size: String,
    measurements: Measurements,
    special_instructions: String,
    pending_order: Option<PendingOrder>,
}

impl Default for SewingDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl SewingDraft {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: WizardStep::SelectStyle,
            style: None,
            size_option: SizeOption::Standard,
            selected_size: DEFAULT_STANDARD_SIZE.to_string(),
            measurements: Measurements::default(),
            special_instructions: String::new(),
            pending_order: None,
        }
    }

    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.step
    }

    #[must_use]
    pub const fn style(&self) -> Option<&SewingStyle> {
        self.style.as_ref()
    }

    #[must_use]
    pub const fn size_option(&self) -> SizeOption {
        self.size_option
    }

    #[must_use]
    pub fn selected_size(&self) -> &str {
        &self.selected_size
    }

    #[must_use]
    pub const fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    #[must_use]
    pub fn special_instructions(&self) -> Option<&str> {
        Some(self.special_instructions.trim()).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn pending_order(&self) -> Option<OrderId> {
        self.pending_order.map(|pending| pending.order_id)
    }

    const fn ensure_open(&self) -> Result<(), WizardError> {
        if matches!(self.step, WizardStep::Submitted) {
            return Err(WizardError::AlreadySubmitted);
        }
        Ok(())
    }

    /// Choose (or change) the garment style.
    ///
    /// # Errors
    ///
    /// Fails once the request has been submitted.
    pub fn select_style(&mut self, style: SewingStyle) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.style = Some(style);
        Ok(())
    }

    /// Switch between standard sizing and custom measurements.
    ///
    /// Values entered for the other option are kept in case the customer
    /// switches back.
    ///
    /// # Errors
    ///
    /// Fails once the request has been submitted.
    pub fn set_size_option(&mut self, option: SizeOption) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.size_option = option;
        Ok(())
    }

    /// Pick a size from [`STANDARD_SIZES`].
    ///
    /// # Errors
    ///
    /// Rejects sizes not on the chart, or a submitted request.
    pub fn select_size(&mut self, size: &str) -> Result<(), WizardError> {
        self.ensure_open()?;
        if !STANDARD_SIZES.contains(&size) {
            return Err(WizardError::UnknownSize(size.to_string()));
        }
        self.selected_size = size.to_string();
        Ok(())
    }

    /// Record one measurement value as typed.
    ///
    /// # Errors
    ///
    /// Fails once the request has been submitted.
    pub fn set_measurement(
        &mut self,
        field: MeasurementField,
        value: impl Into<String>,
    ) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.measurements.set(field, value);
        Ok(())
    }

    /// Free-text notes for the tailor.
    ///
    /// # Errors
    ///
    /// Fails once the request has been submitted.
    pub fn set_special_instructions(&mut self, text: impl Into<String>) -> Result<(), WizardError> {
        self.ensure_open()?;
        self.special_instructions = text.into();
        Ok(())
    }

    fn gate(&self, step: WizardStep) -> Result<(), WizardError> {
        match step {
            WizardStep::SelectStyle if self.style.is_none() => Err(WizardError::NoStyleSelected),
            WizardStep::ChooseSize
                if self.size_option == SizeOption::Custom && !self.measurements.has_any_value() =>
            {
                Err(WizardError::MissingMeasurements)
            }
            WizardStep::SelectStyle | WizardStep::ChooseSize | WizardStep::Review => Ok(()),
            WizardStep::Submitted => Err(WizardError::AlreadySubmitted),
        }
    }

    /// Whether the draft satisfies the forward gate of `step`.
    ///
    /// Pure: looks only at draft data, not at the current position.
    #[must_use]
    pub fn can_advance(&self, step: WizardStep) -> bool {
        self.gate(step).is_ok()
    }

    /// Move forward one step.
    ///
    /// # Errors
    ///
    /// Returns the failing gate, [`WizardError::AtReview`] at the last step
    /// (submission is a separate operation), or `AlreadySubmitted`.
    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        self.gate(self.step)?;
        let next = self.step.next().ok_or(WizardError::AtReview)?;
        self.step = next;
        Ok(next)
    }

    /// Move back one step; stays put at the first step or after submission.
    pub const fn back(&mut self) -> WizardStep {
        self.step = self.step.previous();
        self.step
    }

    /// Check that the draft may be submitted now.
    ///
    /// # Errors
    ///
    /// `NoStyleSelected` without a style, `NotAtReview` before the review
    /// step, `AlreadySubmitted` after submission.
    pub fn ready_to_submit(&self) -> Result<&SewingStyle, WizardError> {
        self.ensure_open()?;
        let style = self.style.as_ref().ok_or(WizardError::NoStyleSelected)?;
        if self.step != WizardStep::Review {
            return Err(WizardError::NotAtReview);
        }
        Ok(style)
    }

    /// Size as sent to the tailor: the chart size, or the custom marker.
    #[must_use]
    pub fn resolved_size(&self) -> String {
        match self.size_option {
            SizeOption::Standard => self.selected_size.clone(),
            SizeOption::Custom => CUSTOM_SIZE_MARKER.to_string(),
        }
    }

    /// Measurements to submit: only for custom sizing.
    #[must_use]
    pub fn submitted_measurements(&self) -> Option<BTreeMap<String, String>> {
        match self.size_option {
            SizeOption::Standard => None,
            SizeOption::Custom => Some(self.measurements.filled()),
        }
    }

    /// Remember an order that exists upstream without its detail record.
    pub const fn set_pending_order(&mut self, owner: UserId, order_id: OrderId) {
        self.pending_order = Some(PendingOrder { order_id, owner });
    }

    /// Drop a pending order created by an account other than `owner`.
    ///
    /// Returns the dropped order id. The entered data is kept.
    pub fn retain_pending_order_for(&mut self, owner: UserId) -> Option<OrderId> {
        match self.pending_order {
            Some(pending) if pending.owner != owner => {
                self.pending_order = None;
                Some(pending.order_id)
            }
            _ => None,
        }
    }

    /// Terminal transition: clear the entered data and lock the draft.
    pub fn mark_submitted(&mut self) {
        *self = Self {
            step: WizardStep::Submitted,
            ..Self::new()
        };
    }

    /// Start over with a fresh draft.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::SewingStyleId;

    fn style() -> SewingStyle {
        SewingStyle {
            id: SewingStyleId::random(),
            name: "Agbada".to_string(),
            description: None,
            images: vec![],
            base_price: None,
            category_id: None,
            category: None,
            is_active: Some(true),
        }
    }

    fn at_review_with_custom(draft: &mut SewingDraft) {
        draft.select_style(style()).unwrap();
        draft.advance().unwrap();
        draft.set_size_option(SizeOption::Custom).unwrap();
        draft.set_measurement(MeasurementField::Chest, " 42 ").unwrap();
        draft.advance().unwrap();
    }

    #[test]
    fn test_style_gate() {
        let mut draft = SewingDraft::new();
        assert!(!draft.can_advance(WizardStep::SelectStyle));
        assert_eq!(draft.advance(), Err(WizardError::NoStyleSelected));
        assert_eq!(draft.step(), WizardStep::SelectStyle);

        draft.select_style(style()).unwrap();
        assert!(draft.can_advance(WizardStep::SelectStyle));
        assert_eq!(draft.advance(), Ok(WizardStep::ChooseSize));
    }

    #[test]
    fn test_custom_size_gate_requires_non_blank_measurement() {
        let mut draft = SewingDraft::new();
        draft.select_style(style()).unwrap();
        draft.advance().unwrap();

        assert!(draft.can_advance(WizardStep::ChooseSize));
        draft.set_size_option(SizeOption::Custom).unwrap();
        assert!(!draft.can_advance(WizardStep::ChooseSize));

        for field in MeasurementField::ALL {
            draft.set_measurement(field, "   ").unwrap();
        }
        assert!(!draft.can_advance(WizardStep::ChooseSize));
        assert_eq!(draft.advance(), Err(WizardError::MissingMeasurements));

        draft.set_measurement(MeasurementField::Waist, "36").unwrap();
        assert!(draft.can_advance(WizardStep::ChooseSize));
        assert_eq!(draft.advance(), Ok(WizardStep::Review));
    }

    #[test]
    fn test_review_cannot_advance_past_submit() {
        let mut draft = SewingDraft::new();
        at_review_with_custom(&mut draft);
        assert_eq!(draft.advance(), Err(WizardError::AtReview));
        assert_eq!(draft.step(), WizardStep::Review);
    }

    #[test]
    fn test_back_keeps_data() {
        let mut draft = SewingDraft::new();
        at_review_with_custom(&mut draft);
        assert_eq!(draft.back(), WizardStep::ChooseSize);
        assert_eq!(draft.back(), WizardStep::SelectStyle);
        assert_eq!(draft.back(), WizardStep::SelectStyle);
        assert!(draft.style().is_some());
        assert_eq!(draft.measurements().get(MeasurementField::Chest), Some(" 42 "));
    }

    #[test]
    fn test_select_size_rejects_off_chart() {
        let mut draft = SewingDraft::new();
        assert_eq!(draft.selected_size(), "M");
        draft.select_size("XXL").unwrap();
        assert_eq!(
            draft.select_size("XS"),
            Err(WizardError::UnknownSize("XS".to_string()))
        );
        assert_eq!(draft.resolved_size(), "XXL");
        assert_eq!(draft.submitted_measurements(), None);
    }

    #[test]
    fn test_custom_resolution_sends_marker_and_trimmed_values() {
        let mut draft = SewingDraft::new();
        at_review_with_custom(&mut draft);
        draft.set_measurement(MeasurementField::Hip, "").unwrap();

        assert_eq!(draft.resolved_size(), CUSTOM_SIZE_MARKER);
        let sent = draft.submitted_measurements().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent.get("chest").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_ready_to_submit_requires_review() {
        let mut draft = SewingDraft::new();
        assert_eq!(draft.ready_to_submit().err(), Some(WizardError::NoStyleSelected));
        draft.select_style(style()).unwrap();
        assert_eq!(draft.ready_to_submit().err(), Some(WizardError::NotAtReview));
        draft.advance().unwrap();
        draft.advance().unwrap();
        assert!(draft.ready_to_submit().is_ok());
    }

    #[test]
    fn test_submitted_is_terminal_until_reset() {
        let mut draft = SewingDraft::new();
        at_review_with_custom(&mut draft);
        draft.mark_submitted();

        assert_eq!(draft.step(), WizardStep::Submitted);
        assert!(draft.style().is_none());
        assert_eq!(draft.select_style(style()), Err(WizardError::AlreadySubmitted));
        assert_eq!(draft.back(), WizardStep::Submitted);
        assert!(!draft.can_advance(WizardStep::Submitted));

        draft.reset();
        assert_eq!(draft.step(), WizardStep::SelectStyle);
    }

    #[test]
    fn test_pending_order_is_kept_only_for_its_owner() {
        let mut draft = SewingDraft::new();
        at_review_with_custom(&mut draft);
        let owner = UserId::random();
        let order_id = OrderId::random();
        draft.set_pending_order(owner, order_id);

        assert_eq!(draft.retain_pending_order_for(owner), None);
        assert_eq!(draft.pending_order(), Some(order_id));

        assert_eq!(draft.retain_pending_order_for(UserId::random()), Some(order_id));
        assert_eq!(draft.pending_order(), None);
        assert_eq!(draft.step(), WizardStep::Review);
        assert_eq!(draft.measurements().get(MeasurementField::Chest), Some(" 42 "));
    }

    #[test]
    fn test_step_numbers() {
        assert_eq!(WizardStep::SelectStyle.number(), 1);
        assert_eq!(WizardStep::Review.number(), 3);
    }
}
