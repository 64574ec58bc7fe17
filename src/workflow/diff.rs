//! Snapshot comparison between two versions of a request's field data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::details::DetailFields;

/// Labels that title-casing the field name gets wrong.
const LABEL_OVERRIDES: &[(&str, &str)] = &[
    ("gstCertificate", "GST Certificate"),
    ("cin", "CIN"),
    ("pan", "PAN"),
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub label: String,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub has_changes: bool,
    pub changes: Vec<FieldChange>,
    pub changed_field_names: BTreeSet<String>,
}

impl ChangeSet {
    fn from_changes(changes: Vec<FieldChange>) -> Self {
        let changed_field_names = changes.iter().map(|c| c.field.clone()).collect();
        Self {
            has_changes: !changes.is_empty(),
            changes,
            changed_field_names,
        }
    }
}

/// Null and empty string are the same value.
fn normalize(value: Option<&str>) -> &str {
    value.unwrap_or_default()
}

/// Compares two snapshots of the same request type.
///
/// With no prior snapshot the new one is the baseline and nothing is
/// reported as changed.
pub fn compare<F: DetailFields>(old: Option<&F>, new: &F) -> ChangeSet {
    let Some(old) = old else {
        return ChangeSet::default();
    };

    let changes = F::FIELDS
        .iter()
        .filter_map(|&field| {
            let old_value = normalize(old.value(field));
            let new_value = normalize(new.value(field));
            if old_value == new_value || (old_value.is_empty() && new_value.is_empty()) {
                return None;
            }
            Some(FieldChange {
                field: field.to_string(),
                label: field_label(field),
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
            })
        })
        .collect();

    ChangeSet::from_changes(changes)
}

/// `nameOfPlant` -> `Name Of Plant`, unless an override exists.
pub fn field_label(field: &str) -> String {
    if let Some((_, label)) = LABEL_OVERRIDES.iter().find(|(name, _)| *name == field) {
        return label.to_string();
    }

    let mut label = String::with_capacity(field.len() + 8);
    for (i, ch) in field.chars().enumerate() {
        if i == 0 {
            label.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            label.push(' ');
            label.push(ch);
        } else {
            label.push(ch);
        }
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::details::{CompanyCodeFields, PlantCodeFields};

    fn plant(name: &str) -> PlantCodeFields {
        PlantCodeFields {
            company_code: Some("1000".into()),
            plant_code: Some("P100".into()),
            name_of_plant: Some(name.into()),
            ..Default::default()
        }
    }

    #[test]
    fn no_prior_snapshot_is_a_baseline() {
        let diff = compare(None, &plant("Alpha"));
        assert!(!diff.has_changes);
        assert!(diff.changes.is_empty());
        assert!(diff.changed_field_names.is_empty());
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let a = plant("Alpha");
        assert!(!compare(Some(&a), &a).has_changes);

        let company = CompanyCodeFields {
            company_code: Some("2000".into()),
            cin: Some("U12345".into()),
            ..Default::default()
        };
        assert!(!compare(Some(&company), &company).has_changes);
    }

    #[test]
    fn renamed_plant_reports_one_change() {
        let diff = compare(Some(&plant("Alpha")), &plant("Beta"));
        assert!(diff.has_changes);
        assert_eq!(
            diff.changes,
            vec![FieldChange {
                field: "nameOfPlant".into(),
                label: "Name Of Plant".into(),
                old_value: "Alpha".into(),
                new_value: "Beta".into(),
            }]
        );
    }

    #[test]
    fn null_and_empty_are_equivalent() {
        let mut old = plant("Alpha");
        old.address_of_plant = None;
        let mut new = plant("Alpha");
        new.address_of_plant = Some(String::new());
        assert!(!compare(Some(&old), &new).has_changes);

        new.address_of_plant = Some("Chennai".into());
        let diff = compare(Some(&old), &new);
        assert_eq!(diff.changes[0].old_value, "");
        assert_eq!(diff.changes[0].new_value, "Chennai");
    }

    #[test]
    fn changed_field_set_is_symmetric() {
        let mut a = plant("Alpha");
        a.profit_center = Some("PC01".into());
        let mut b = plant("Beta");
        b.gst_certificate = Some("33AAAAA0000A1Z5".into());

        let forward = compare(Some(&a), &b);
        let backward = compare(Some(&b), &a);
        assert_eq!(forward.changed_field_names, backward.changed_field_names);
        assert_eq!(forward.changed_field_names.len(), 3);
        assert_eq!(forward.changes[0].old_value, backward.changes[0].new_value);
    }

    #[test]
    fn labels_title_case_or_override() {
        assert_eq!(field_label("nameOfPlant"), "Name Of Plant");
        assert_eq!(field_label("costCenters"), "Cost Centers");
        assert_eq!(field_label("gstCertificate"), "GST Certificate");
        assert_eq!(field_label("pan"), "PAN");
        assert_eq!(field_label("segment"), "Segment");
    }
}
