//! Projects a stored ML result down to what one audience may see.
//!
//! Every projection populates a single category of substantive data. Fields
//! outside that category are `None` and serialize as explicit `null`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::routing::{
    derive_charity_care_priority, derive_school_simplified_status, CarePriority, FlowType,
    SchoolStatus,
};

pub const CONTACT_CLINIC_MESSAGE: &str = "Please contact your clinic for your results.";

/// School grade band, used to pick message wording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Elementary,
    #[default]
    Middle,
    High,
}

impl AgeGroup {
    pub fn from_age(years: u32) -> Self {
        match years {
            0..=10 => AgeGroup::Elementary,
            11..=13 => AgeGroup::Middle,
            _ => AgeGroup::High,
        }
    }

    /// Age-appropriate explanation of a school status.
    pub fn message(&self, status: SchoolStatus) -> &'static str {
        match (self, status) {
            (AgeGroup::Elementary, SchoolStatus::Healthy) => {
                "Great job! Your teeth look healthy. Keep brushing twice a day!"
            }
            (AgeGroup::Elementary, SchoolStatus::NeedsAttention) => {
                "Your teeth need a little extra care. Ask a grown-up to help you visit the dentist."
            }
            (AgeGroup::Elementary, SchoolStatus::Concern) => {
                "Your teeth need a dentist's help soon. Please show this to a grown-up at home."
            }
            (AgeGroup::Middle, SchoolStatus::Healthy) => {
                "Your teeth look healthy. Keep up your brushing and flossing."
            }
            (AgeGroup::Middle, SchoolStatus::NeedsAttention) => {
                "Some areas need attention. Talk to your parent or guardian about a dental check-up."
            }
            (AgeGroup::Middle, SchoolStatus::Concern) => {
                "Your scan shows areas of concern. Please see a dentist soon with your parent or guardian."
            }
            (AgeGroup::High, SchoolStatus::Healthy) => {
                "Your scan looks healthy. Keep up your routine."
            }
            (AgeGroup::High, SchoolStatus::NeedsAttention) => {
                "Your scan shows areas that need attention. Schedule a dental check-up."
            }
            (AgeGroup::High, SchoolStatus::Concern) => {
                "Your scan shows signs that need prompt dental care. Please book a dentist visit soon."
            }
        }
    }
}

/// A stored scan as handed over by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: String,
    #[serde(default)]
    pub age_group: Option<AgeGroup>,
    /// Raw ML result as stored: JSON text or an already-parsed value. May be
    /// missing or malformed.
    #[serde(default)]
    pub raw_result: Option<Value>,
}

impl ScanRecord {
    pub fn new(id: impl Into<String>, raw_result: Option<Value>) -> Self {
        Self {
            id: id.into(),
            age_group: None,
            raw_result,
        }
    }

    pub fn with_age_group(mut self, age_group: AgeGroup) -> Self {
        self.age_group = Some(age_group);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Whitening {
    pub brightness_score: Option<f64>,
    pub shade_value: Option<String>,
    pub ideal_shade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetadata {
    pub model_version: Option<String>,
    pub processed_at: Option<String>,
    pub confidence: Option<f64>,
}

/// Which category a projection exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultView {
    Partner,
    WhiteningOnly,
    SimplifiedStatusOnly,
    PriorityScoreOnly,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredScanResult {
    pub scan_id: String,
    pub view: ResultView,
    pub pathology: Option<Value>,
    pub whitening: Option<Whitening>,
    pub simplified_status: Option<SchoolStatus>,
    pub priority_score: Option<CarePriority>,
    pub clinic_recommended: Option<bool>,
    pub metadata: Option<ScanMetadata>,
    pub message: Option<String>,
}

impl FilteredScanResult {
    fn empty(scan_id: &str, view: ResultView) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            view,
            pathology: None,
            whitening: None,
            simplified_status: None,
            priority_score: None,
            clinic_recommended: None,
            metadata: None,
            message: None,
        }
    }
}

/// Lenient view over the ML payload. Each field is read on its own so one
/// malformed field only nulls itself.
struct MlPayload {
    fields: Map<String, Value>,
}

impl MlPayload {
    fn parse(scan: &ScanRecord) -> Self {
        let fields = match &scan.raw_result {
            None | Some(Value::Null) => Map::new(),
            Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                Ok(value) => Self::object_or_empty(scan, value),
                Err(e) => {
                    warn!(scan = %scan.id, error = %e, "ML result is not valid JSON");
                    Map::new()
                }
            },
            Some(value) => Self::object_or_empty(scan, value.clone()),
        };
        Self { fields }
    }

    fn object_or_empty(scan: &ScanRecord, value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => {
                warn!(scan = %scan.id, kind = json_kind(&other), "ML result is not an object");
                Map::new()
            }
        }
    }

    fn get<T: DeserializeOwned>(&self, keys: &[&str]) -> Option<T> {
        field(&self.fields, keys)
    }

    fn overall_status(&self) -> Option<String> {
        self.get(&["overall_status", "overallStatus"])
    }

    fn pathology(&self) -> Option<Value> {
        self.get(&["pathology", "findings"])
    }

    fn whitening(&self) -> Option<Whitening> {
        let section: Map<String, Value> = self.get(&["whitening"])?;
        let whitening = Whitening {
            brightness_score: field(&section, &["brightness_score", "brightnessScore"]),
            shade_value: field(&section, &["shade_value", "shadeValue", "current_shade"]),
            ideal_shade: field(&section, &["ideal_shade", "idealShade", "target_shade"]),
        };
        let empty = whitening.brightness_score.is_none()
            && whitening.shade_value.is_none()
            && whitening.ideal_shade.is_none();
        (!empty).then_some(whitening)
    }

    fn clinic_recommended(&self) -> Option<bool> {
        self.get(&["clinic_recommended", "clinicRecommended"])
    }

    fn metadata(&self) -> Option<ScanMetadata> {
        let metadata = ScanMetadata {
            model_version: self.get(&["model_version", "modelVersion"]),
            processed_at: self.get(&["processed_at", "processedAt"]),
            confidence: self.get(&["confidence"]),
        };
        let empty = metadata.model_version.is_none()
            && metadata.processed_at.is_none()
            && metadata.confidence.is_none();
        (!empty).then_some(metadata)
    }
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, keys: &[&str]) -> Option<T> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .filter(|value| !value.is_null())
        .find_map(|value| serde_json::from_value(value.clone()).ok())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Project `scan` for a flow. `flow` is `None` for unrecognized flows.
/// Partner access overrides the flow and sees everything.
pub fn filter_scan_result(
    scan: &ScanRecord,
    flow: Option<FlowType>,
    has_partner_access: bool,
) -> FilteredScanResult {
    let payload = MlPayload::parse(scan);

    if has_partner_access {
        let status = payload.overall_status();
        return FilteredScanResult {
            pathology: payload.pathology(),
            whitening: payload.whitening(),
            simplified_status: status.as_deref().map(derive_school_simplified_status),
            priority_score: status.as_deref().map(derive_charity_care_priority),
            clinic_recommended: payload.clinic_recommended(),
            metadata: payload.metadata(),
            ..FilteredScanResult::empty(&scan.id, ResultView::Partner)
        };
    }

    match flow {
        Some(FlowType::Gym) => FilteredScanResult {
            whitening: payload.whitening(),
            ..FilteredScanResult::empty(&scan.id, ResultView::WhiteningOnly)
        },
        Some(FlowType::School) => {
            let status = payload
                .overall_status()
                .map(|s| derive_school_simplified_status(&s));
            let message = match status {
                Some(status) => scan.age_group.unwrap_or_default().message(status),
                None => CONTACT_CLINIC_MESSAGE,
            };
            FilteredScanResult {
                simplified_status: status,
                message: Some(message.to_string()),
                ..FilteredScanResult::empty(&scan.id, ResultView::SimplifiedStatusOnly)
            }
        }
        Some(FlowType::Charity) => FilteredScanResult {
            priority_score: payload
                .overall_status()
                .map(|s| derive_charity_care_priority(&s)),
            ..FilteredScanResult::empty(&scan.id, ResultView::PriorityScoreOnly)
        },
        None => FilteredScanResult {
            message: Some(CONTACT_CLINIC_MESSAGE.to_string()),
            ..FilteredScanResult::empty(&scan.id, ResultView::None)
        },
    }
}

/// Like [`filter_scan_result`] but takes the flow as stored text.
pub fn filter_scan_result_for(
    scan: &ScanRecord,
    flow_name: &str,
    has_partner_access: bool,
) -> FilteredScanResult {
    let flow = match flow_name.parse::<FlowType>() {
        Ok(flow) => Some(flow),
        Err(e) => {
            if !has_partner_access {
                warn!(scan = %scan.id, error = %e, "unrecognized flow, withholding result");
            }
            None
        }
    };
    filter_scan_result(scan, flow, has_partner_access)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> String {
        json!({
            "overall_status": "moderate gingivitis",
            "pathology": {"caries": [{"tooth": 14, "severity": "mild"}], "gingivitis": true},
            "whitening": {"brightness_score": 72.5, "shade_value": "A3", "ideal_shade": "A1"},
            "clinic_recommended": true,
            "model_version": "dental-v2",
            "processed_at": "2026-03-01T10:00:00Z",
            "confidence": 0.91
        })
        .to_string()
    }

    fn scan() -> ScanRecord {
        ScanRecord::new("scan-1", Some(full_payload().into()))
    }

    #[test]
    fn partner_sees_everything() {
        let result = filter_scan_result(&scan(), Some(FlowType::Gym), true);
        assert_eq!(result.view, ResultView::Partner);
        assert!(result.pathology.is_some());
        assert_eq!(
            result.whitening,
            Some(Whitening {
                brightness_score: Some(72.5),
                shade_value: Some("A3".into()),
                ideal_shade: Some("A1".into()),
            })
        );
        assert_eq!(result.simplified_status, Some(SchoolStatus::NeedsAttention));
        assert_eq!(result.priority_score, Some(CarePriority::Medium));
        assert_eq!(result.clinic_recommended, Some(true));
        assert_eq!(
            result.metadata.as_ref().and_then(|m| m.model_version.as_deref()),
            Some("dental-v2")
        );
        assert_eq!(result.message, None);
    }

    #[test]
    fn partner_overrides_unknown_flow() {
        let result = filter_scan_result_for(&scan(), "dentist", true);
        assert_eq!(result.view, ResultView::Partner);
        assert!(result.pathology.is_some());
    }

    #[test]
    fn gym_gets_whitening_only() {
        let result = filter_scan_result(&scan(), Some(FlowType::Gym), false);
        assert_eq!(result.view, ResultView::WhiteningOnly);
        assert!(result.whitening.is_some());
        assert!(result.pathology.is_none());
        assert!(result.simplified_status.is_none());
        assert!(result.priority_score.is_none());
        assert!(result.clinic_recommended.is_none());
        assert!(result.metadata.is_none());
        assert!(result.message.is_none());
    }

    #[test]
    fn school_gets_status_and_age_message() {
        let result = filter_scan_result(
            &scan().with_age_group(AgeGroup::Elementary),
            Some(FlowType::School),
            false,
        );
        assert_eq!(result.view, ResultView::SimplifiedStatusOnly);
        assert_eq!(result.simplified_status, Some(SchoolStatus::NeedsAttention));
        assert_eq!(
            result.message.as_deref(),
            Some(AgeGroup::Elementary.message(SchoolStatus::NeedsAttention))
        );
        assert!(result.pathology.is_none());
        assert!(result.whitening.is_none());
        assert!(result.priority_score.is_none());
    }

    #[test]
    fn school_without_age_uses_middle_wording() {
        let result = filter_scan_result(&scan(), Some(FlowType::School), false);
        assert_eq!(
            result.message.as_deref(),
            Some(AgeGroup::Middle.message(SchoolStatus::NeedsAttention))
        );
    }

    #[test]
    fn charity_gets_priority_only() {
        let result = filter_scan_result(&scan(), Some(FlowType::Charity), false);
        assert_eq!(result.view, ResultView::PriorityScoreOnly);
        assert_eq!(result.priority_score, Some(CarePriority::Medium));
        assert!(result.pathology.is_none());
        assert!(result.whitening.is_none());
        assert!(result.simplified_status.is_none());
        assert!(result.message.is_none());
    }

    #[test]
    fn unknown_flow_gets_contact_clinic() {
        let result = filter_scan_result_for(&scan(), "spa", false);
        assert_eq!(result.view, ResultView::None);
        assert_eq!(result.message.as_deref(), Some(CONTACT_CLINIC_MESSAGE));
        assert!(result.pathology.is_none());
        assert!(result.whitening.is_none());
        assert!(result.simplified_status.is_none());
        assert!(result.priority_score.is_none());
    }

    #[test]
    fn malformed_json_degrades_to_nulls() {
        let broken = ScanRecord::new("scan-2", Some("{not json".into()));
        let partner = filter_scan_result(&broken, None, true);
        assert_eq!(partner, FilteredScanResult::empty("scan-2", ResultView::Partner));

        let school = filter_scan_result(&broken, Some(FlowType::School), false);
        assert_eq!(school.simplified_status, None);
        assert_eq!(school.message.as_deref(), Some(CONTACT_CLINIC_MESSAGE));
    }

    #[test]
    fn missing_and_non_object_payloads() {
        let missing = ScanRecord::new("scan-3", None);
        assert_eq!(
            filter_scan_result(&missing, Some(FlowType::Gym), false).whitening,
            None
        );
        let array = ScanRecord::new("scan-4", Some("[1, 2]".into()));
        assert_eq!(
            filter_scan_result(&array, Some(FlowType::Charity), false).priority_score,
            None
        );
    }

    #[test]
    fn bad_field_only_nulls_itself() {
        let payload = json!({
            "overall_status": 42,
            "whitening": {"brightness_score": "bright", "shade_value": "B1"}
        })
        .to_string();
        let result = filter_scan_result(&ScanRecord::new("scan-5", Some(payload.into())), None, true);
        assert_eq!(result.simplified_status, None);
        assert_eq!(
            result.whitening,
            Some(Whitening {
                brightness_score: None,
                shade_value: Some("B1".into()),
                ideal_shade: None,
            })
        );
    }

    #[test]
    fn camel_case_payload_keys_are_accepted() {
        let payload = json!({
            "overallStatus": "healthy",
            "whitening": {"brightnessScore": 80.0, "shadeValue": "A2", "idealShade": "B1"}
        })
        .to_string();
        let scan = ScanRecord::new("scan-6", Some(payload.into()));
        let result = filter_scan_result(&scan, Some(FlowType::School), false);
        assert_eq!(result.simplified_status, Some(SchoolStatus::Healthy));
        let gym = filter_scan_result(&scan, Some(FlowType::Gym), false);
        assert_eq!(
            gym.whitening.and_then(|w| w.brightness_score),
            Some(80.0)
        );
    }

    #[test]
    fn parsed_object_payload_is_used_as_is() {
        let record: ScanRecord = serde_json::from_value(json!({
            "id": "scan-7",
            "rawResult": {"overall_status": "healthy", "whitening": {"shade_value": "A2"}}
        }))
        .unwrap();
        let school = filter_scan_result(&record, Some(FlowType::School), false);
        assert_eq!(school.simplified_status, Some(SchoolStatus::Healthy));
        let gym = filter_scan_result(&record, Some(FlowType::Gym), false);
        assert_eq!(gym.whitening.and_then(|w| w.shade_value).as_deref(), Some("A2"));
    }

    #[test]
    fn non_object_values_degrade_to_nulls() {
        for raw in [json!(7), json!([1, 2]), json!(true), Value::Null] {
            let record = ScanRecord::new("scan-8", Some(raw));
            let partner = filter_scan_result(&record, None, true);
            assert_eq!(partner, FilteredScanResult::empty("scan-8", ResultView::Partner));
        }
    }

    #[test]
    fn null_or_mistyped_key_falls_through_to_alias() {
        let payload = json!({
            "overall_status": null,
            "overallStatus": "severe decay",
            "pathology": null,
            "findings": {"caries": 2}
        });
        let result = filter_scan_result(&ScanRecord::new("scan-9", Some(payload)), None, true);
        assert_eq!(result.simplified_status, Some(SchoolStatus::Concern));
        assert_eq!(result.pathology, Some(json!({"caries": 2})));

        let mistyped = json!({"whitening": {"brightness_score": "high", "brightnessScore": 64.0}});
        let gym = filter_scan_result(&ScanRecord::new("scan-10", Some(mistyped)), Some(FlowType::Gym), false);
        assert_eq!(gym.whitening.and_then(|w| w.brightness_score), Some(64.0));
    }

    #[test]
    fn excluded_fields_serialize_as_null() {
        let result = filter_scan_result(&scan(), Some(FlowType::Gym), false);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pathology"], Value::Null);
        assert!(json.as_object().unwrap().contains_key("pathology"));
        assert!(json.as_object().unwrap().contains_key("priorityScore"));
        assert_eq!(json["whitening"]["shadeValue"], "A3");
        assert_eq!(json["view"], "whiteningOnly");
    }

    #[test]
    fn age_groups_from_years() {
        assert_eq!(AgeGroup::from_age(6), AgeGroup::Elementary);
        assert_eq!(AgeGroup::from_age(10), AgeGroup::Elementary);
        assert_eq!(AgeGroup::from_age(11), AgeGroup::Middle);
        assert_eq!(AgeGroup::from_age(13), AgeGroup::Middle);
        assert_eq!(AgeGroup::from_age(14), AgeGroup::High);
    }
}
