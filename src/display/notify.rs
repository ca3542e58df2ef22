//! User-facing messages for the outcome of a recalculation or transformation.

use crate::compute::{DiscardReason, DiscardedFeature};
use crate::store::FeatureId;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub title: &'static str,
    pub text: String,
    /// Features the host may offer to select, e.g. those with incomplete data.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub feature_ids: Vec<FeatureId>,
    /// Label for the "select these features" action, when `feature_ids` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_label: Option<&'static str>,
}

impl Notification {
    fn info(text: String) -> Self {
        Self { level: Level::Info, title: "Info", text, feature_ids: Vec::new(), select_label: None }
    }
}

fn ids_with(discarded: &BTreeSet<DiscardedFeature>, reason: DiscardReason) -> Vec<FeatureId> {
    let ids: BTreeSet<FeatureId> =
        discarded.iter().filter(|d| d.reason == reason).map(|d| d.feature_id).collect();
    ids.into_iter().collect()
}

/// One info message listing new columns, then one warning per discard reason.
pub fn recalculation_messages(
    added_fields: &BTreeSet<String>,
    discarded: &BTreeSet<DiscardedFeature>,
) -> Vec<Notification> {
    let mut messages = Vec::new();
    if !added_fields.is_empty() {
        let names: Vec<&str> = added_fields.iter().map(String::as_str).collect();
        messages.push(Notification::info(format!(
            "New attributes have been added to the layer: {}",
            names.join(", ")
        )));
    }

    let missing = ids_with(discarded, DiscardReason::MissingValue);
    if !missing.is_empty() {
        messages.push(Notification {
            level: Level::Warning,
            title: "Warning",
            text: "Missing values were found in some features while calculating composite variables".into(),
            feature_ids: missing,
            select_label: Some("Select features with incomplete data"),
        });
    }

    let invalid = ids_with(discarded, DiscardReason::InvalidValue);
    if !invalid.is_empty() {
        messages.push(Notification {
            level: Level::Warning,
            title: "Warning",
            text: "Invalid values were found in some features while calculating composite variables using \
                   the chosen operators (e.g. the geometric mean fails when attempting to perform the root \
                   of a negative value)"
                .into(),
            feature_ids: invalid,
            select_label: Some("Select features with invalid data"),
        });
    }
    messages
}

/// Message for a finished `transform_attribute` call.
pub fn transformation_message(
    algorithm: &str,
    input: &str,
    result_field: &str,
    invalid_input_values: &[f64],
) -> Notification {
    let mut text = format!("Transformation {} has been applied to attribute {}.", algorithm, input);
    if result_field == input {
        text.push_str(" The original values of the attribute have been overwritten by the transformed values.");
    } else {
        text.push_str(&format!(
            " The results of the transformation have been saved into the new attribute {}.",
            result_field
        ));
    }
    if invalid_input_values.is_empty() {
        return Notification::info(text);
    }
    let values: Vec<String> = invalid_input_values.iter().map(|v| v.to_string()).collect();
    text.push_str(&format!(
        " The transformation could not be performed for the following input values: {}",
        values.join(", ")
    ));
    Notification { level: Level::Warning, ..Notification::info(text) }
}

/// Message for an error that stopped a recalculation or transformation.
pub fn error_message(error: &dyn std::error::Error) -> Notification {
    Notification {
        level: Level::Critical,
        title: "Error",
        text: error.to_string(),
        feature_ids: Vec::new(),
        select_label: None,
    }
}
