// src/db/models/details.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::db::models::requests::{RequestType, SubmittedFields};
use crate::workflow::error::WorkflowError;

/// A complete field set for one request type.
///
/// Field names are the camelCase names clients send; database columns are
/// their snake_case form.
pub trait DetailFields: Clone + Send + Sync + Unpin + 'static {
    const REQUEST_TYPE: RequestType;
    /// Canonical field list, in display order. Bookkeeping columns are not part of it.
    const FIELDS: &'static [&'static str];
    /// Identity fields that must be present on every saved version.
    const REQUIRED: &'static [&'static str];

    fn value(&self, field: &str) -> Option<&str>;

    /// Human readable summary used as the request title.
    fn title(&self) -> String;

    fn validate(&self) -> Result<(), WorkflowError> {
        check_required(self)
    }
}

/// Fails with a validation error naming every missing identity field.
pub fn check_required<F: DetailFields>(fields: &F) -> Result<(), WorkflowError> {
    let missing: Vec<&str> = F::REQUIRED
        .iter()
        .copied()
        .filter(|name| fields.value(name).map_or(true, |v| v.trim().is_empty()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// `nameOfPlant` -> `name_of_plant`
pub fn column_name(field: &str) -> String {
    let mut column = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        if ch.is_ascii_uppercase() {
            column.push('_');
            column.push(ch.to_ascii_lowercase());
        } else {
            column.push(ch);
        }
    }
    column
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlantCodeFields {
    pub company_code: Option<String>,
    pub plant_code: Option<String>,
    pub name_of_plant: Option<String>,
    pub address_of_plant: Option<String>,
    pub purchase_organization: Option<String>,
    pub name_of_purchase_organization: Option<String>,
    pub sales_organization: Option<String>,
    pub name_of_sales_organization: Option<String>,
    pub profit_center: Option<String>,
    pub name_of_profit_center: Option<String>,
    pub cost_centers: Option<String>,
    pub name_of_cost_centers: Option<String>,
    pub project_code: Option<String>,
    pub project_code_description: Option<String>,
    pub storage_location_code: Option<String>,
    pub storage_location_description: Option<String>,
    pub gst_certificate: Option<String>,
}

impl DetailFields for PlantCodeFields {
    const REQUEST_TYPE: RequestType = RequestType::Plant;
    const FIELDS: &'static [&'static str] = &[
        "companyCode",
        "plantCode",
        "nameOfPlant",
        "addressOfPlant",
        "purchaseOrganization",
        "nameOfPurchaseOrganization",
        "salesOrganization",
        "nameOfSalesOrganization",
        "profitCenter",
        "nameOfProfitCenter",
        "costCenters",
        "nameOfCostCenters",
        "projectCode",
        "projectCodeDescription",
        "storageLocationCode",
        "storageLocationDescription",
        "gstCertificate",
    ];
    const REQUIRED: &'static [&'static str] = &["companyCode", "plantCode", "nameOfPlant"];

    fn value(&self, field: &str) -> Option<&str> {
        let value = match field {
            "companyCode" => &self.company_code,
            "plantCode" => &self.plant_code,
            "nameOfPlant" => &self.name_of_plant,
            "addressOfPlant" => &self.address_of_plant,
            "purchaseOrganization" => &self.purchase_organization,
            "nameOfPurchaseOrganization" => &self.name_of_purchase_organization,
            "salesOrganization" => &self.sales_organization,
            "nameOfSalesOrganization" => &self.name_of_sales_organization,
            "profitCenter" => &self.profit_center,
            "nameOfProfitCenter" => &self.name_of_profit_center,
            "costCenters" => &self.cost_centers,
            "nameOfCostCenters" => &self.name_of_cost_centers,
            "projectCode" => &self.project_code,
            "projectCodeDescription" => &self.project_code_description,
            "storageLocationCode" => &self.storage_location_code,
            "storageLocationDescription" => &self.storage_location_description,
            "gstCertificate" => &self.gst_certificate,
            _ => return None,
        };
        value.as_deref()
    }

    fn title(&self) -> String {
        format!(
            "{} - {}",
            self.plant_code.as_deref().unwrap_or_default(),
            self.name_of_plant.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCodeFields {
    pub company_code: Option<String>,
    pub name_of_company_code: Option<String>,
    pub shareholding_percentage: Option<String>,
    pub segment: Option<String>,
    pub name_of_segment: Option<String>,
    pub gst_certificate: Option<String>,
    pub cin: Option<String>,
    pub pan: Option<String>,
    pub business_area: Option<String>,
    pub name_of_business_area: Option<String>,
    pub currency: Option<String>,
}

impl DetailFields for CompanyCodeFields {
    const REQUEST_TYPE: RequestType = RequestType::Company;
    const FIELDS: &'static [&'static str] = &[
        "companyCode",
        "nameOfCompanyCode",
        "shareholdingPercentage",
        "segment",
        "nameOfSegment",
        "gstCertificate",
        "cin",
        "pan",
        "businessArea",
        "nameOfBusinessArea",
        "currency",
    ];
    const REQUIRED: &'static [&'static str] = &["companyCode", "nameOfCompanyCode"];

    fn value(&self, field: &str) -> Option<&str> {
        let value = match field {
            "companyCode" => &self.company_code,
            "nameOfCompanyCode" => &self.name_of_company_code,
            "shareholdingPercentage" => &self.shareholding_percentage,
            "segment" => &self.segment,
            "nameOfSegment" => &self.name_of_segment,
            "gstCertificate" => &self.gst_certificate,
            "cin" => &self.cin,
            "pan" => &self.pan,
            "businessArea" => &self.business_area,
            "nameOfBusinessArea" => &self.name_of_business_area,
            "currency" => &self.currency,
            _ => return None,
        };
        value.as_deref()
    }

    fn title(&self) -> String {
        format!(
            "{} - {}",
            self.company_code.as_deref().unwrap_or_default(),
            self.name_of_company_code.as_deref().unwrap_or_default()
        )
    }

    fn validate(&self) -> Result<(), WorkflowError> {
        check_required(self)?;

        if let Some(raw) = self.shareholding_percentage.as_deref().map(str::trim) {
            if raw.is_empty() {
                return Ok(());
            }
            let percentage: f64 = raw.trim_end_matches('%').trim().parse().map_err(|_| {
                WorkflowError::Validation(format!("shareholdingPercentage '{raw}' is not a number"))
            })?;
            if !(0.0..=100.0).contains(&percentage) {
                return Err(WorkflowError::Validation(format!(
                    "shareholdingPercentage {percentage} is outside 0-100"
                )));
            }
        }
        Ok(())
    }
}

/// A stored snapshot row for one request type.
pub trait DetailsRecord: for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Unpin + 'static {
    type Fields: DetailFields;
    const TABLE: &'static str;

    fn saved_by(&self) -> &str;
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlantCodeDetails {
    pub request_id: String,
    pub version: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: PlantCodeFields,
    pub saved_by: String,
    pub saved_at: DateTime<Utc>,
}

impl DetailsRecord for PlantCodeDetails {
    type Fields = PlantCodeFields;
    const TABLE: &'static str = "plant_code_details";

    fn saved_by(&self) -> &str {
        &self.saved_by
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCodeDetails {
    pub request_id: String,
    pub version: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: CompanyCodeFields,
    pub saved_by: String,
    pub saved_at: DateTime<Utc>,
}

impl DetailsRecord for CompanyCodeDetails {
    type Fields = CompanyCodeFields;
    const TABLE: &'static str = "company_code_details";

    fn saved_by(&self) -> &str {
        &self.saved_by
    }
}

/// A stored snapshot of either type, as returned by the API.
///
/// Output only. Every plant field is optional, so untagged input would read
/// any company snapshot as a plant one.
#[derive(Debug, Serialize, Clone, PartialEq, ToSchema)]
#[serde(untagged)]
pub enum VersionedDetails {
    Plant(PlantCodeDetails),
    Company(CompanyCodeDetails),
}

impl VersionedDetails {
    pub fn version(&self) -> i64 {
        match self {
            VersionedDetails::Plant(d) => d.version,
            VersionedDetails::Company(d) => d.version,
        }
    }
}

impl From<PlantCodeDetails> for VersionedDetails {
    fn from(value: PlantCodeDetails) -> Self {
        VersionedDetails::Plant(value)
    }
}

impl From<CompanyCodeDetails> for VersionedDetails {
    fn from(value: CompanyCodeDetails) -> Self {
        VersionedDetails::Company(value)
    }
}

/// Resubmission of a request's details as a new version.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailsSubmission {
    /// Version number the client computed for this save (latest + 1 for an edit).
    pub version: i64,
    pub details: SubmittedFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_serialize_flat_without_a_type_wrapper() {
        let snapshot = VersionedDetails::from(CompanyCodeDetails {
            request_id: "N_01012025_001".into(),
            version: 3,
            fields: CompanyCodeFields {
                company_code: Some("2000".into()),
                name_of_company_code: Some("Acme".into()),
                ..Default::default()
            },
            saved_by: "requestor@example.com".into(),
            saved_at: Utc::now(),
        });

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["nameOfCompanyCode"], "Acme");
        assert!(json.get("Company").is_none());
        assert_eq!(snapshot.version(), 3);
    }

    #[test]
    fn column_names_are_snake_case() {
        assert_eq!(column_name("nameOfPlant"), "name_of_plant");
        assert_eq!(column_name("cin"), "cin");
        assert_eq!(
            column_name("storageLocationDescription"),
            "storage_location_description"
        );
    }

    #[test]
    fn every_canonical_field_is_readable() {
        let plant = PlantCodeFields {
            company_code: Some("1000".into()),
            ..Default::default()
        };
        assert_eq!(plant.value("companyCode"), Some("1000"));
        assert_eq!(plant.value("requestId"), None);
        assert_eq!(PlantCodeFields::FIELDS.len(), 17);
        assert_eq!(CompanyCodeFields::FIELDS.len(), 11);
    }

    #[test]
    fn missing_identity_fields_fail_validation() {
        let plant = PlantCodeFields {
            company_code: Some("1000".into()),
            plant_code: Some("  ".into()),
            ..Default::default()
        };
        match plant.validate() {
            Err(WorkflowError::Validation(msg)) => {
                assert!(msg.contains("plantCode"));
                assert!(msg.contains("nameOfPlant"));
                assert!(!msg.contains("companyCode"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn shareholding_percentage_must_be_a_bounded_number() {
        let mut company = CompanyCodeFields {
            company_code: Some("2000".into()),
            name_of_company_code: Some("Acme Holdings".into()),
            shareholding_percentage: Some("51.5".into()),
            ..Default::default()
        };
        assert!(company.validate().is_ok());

        company.shareholding_percentage = Some("75%".into());
        assert!(company.validate().is_ok());

        company.shareholding_percentage = Some("abc".into());
        assert!(matches!(company.validate(), Err(WorkflowError::Validation(_))));

        company.shareholding_percentage = Some("120".into());
        assert!(matches!(company.validate(), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn title_uses_identity_fields() {
        let plant = PlantCodeFields {
            plant_code: Some("P100".into()),
            name_of_plant: Some("Alpha".into()),
            ..Default::default()
        };
        assert_eq!(plant.title(), "P100 - Alpha");
    }
}
