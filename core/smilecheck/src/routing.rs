//! Consent-aware routing: which result category a UI may show, and where
//! the full report goes.
//!
//! Minors never see pathology in any variant. The decision is an exhaustive
//! match over every (minor, consent method, consent on file) combination so
//! that adding a new method or variant fails to compile until it is routed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SmileCheckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Gym,
    School,
    Charity,
}

impl FlowType {
    pub const ALL: [FlowType; 3] = [FlowType::Gym, FlowType::School, FlowType::Charity];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Gym => "gym",
            FlowType::School => "school",
            FlowType::Charity => "charity",
        }
    }
}

impl FromStr for FlowType {
    type Err = SmileCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gym" => Ok(FlowType::Gym),
            "school" => Ok(FlowType::School),
            "charity" => Ok(FlowType::Charity),
            _ => Err(SmileCheckError::UnknownFlowType(s.to_string())),
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who signed the consent for a minor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMethod {
    School,
    #[default]
    Parent,
}

impl ConsentMethod {
    pub const ALL: [ConsentMethod; 2] = [ConsentMethod::School, ConsentMethod::Parent];
}

impl FromStr for ConsentMethod {
    type Err = SmileCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "school" => Ok(ConsentMethod::School),
            "parent" => Ok(ConsentMethod::Parent),
            _ => Err(SmileCheckError::UnknownConsentMethod(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingInput {
    pub flow_type: FlowType,
    pub is_minor: bool,
    #[serde(default)]
    pub consent_method: ConsentMethod,
    #[serde(default)]
    pub has_school_consent_on_file: bool,
}

impl RoutingInput {
    pub fn adult(flow_type: FlowType) -> Self {
        Self {
            flow_type,
            is_minor: false,
            consent_method: ConsentMethod::default(),
            has_school_consent_on_file: false,
        }
    }

    pub fn minor(flow_type: FlowType, consent_method: ConsentMethod, has_consent: bool) -> Self {
        Self {
            flow_type,
            is_minor: true,
            consent_method,
            has_school_consent_on_file: has_consent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiVariant {
    BlockNoConsent,
    MinimalParentRouting,
    ShowSimplifiedOnly,
    AdultFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportRecipient {
    Parent,
    School,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub ui_variant: UiVariant,
    pub deliver_full_report_to: ReportRecipient,
    pub allow_pathology_in_ui: bool,
}

impl RoutingDecision {
    fn new(ui_variant: UiVariant, deliver_full_report_to: ReportRecipient) -> Self {
        Self {
            ui_variant,
            deliver_full_report_to,
            allow_pathology_in_ui: ui_variant == UiVariant::AdultFull,
        }
    }
}

pub fn decide(input: &RoutingInput) -> RoutingDecision {
    let decision = match (
        input.is_minor,
        input.consent_method,
        input.has_school_consent_on_file,
    ) {
        (false, _, _) => {
            let recipient = match input.flow_type {
                FlowType::Charity => ReportRecipient::School,
                FlowType::Gym | FlowType::School => ReportRecipient::None,
            };
            RoutingDecision::new(UiVariant::AdultFull, recipient)
        }
        (true, ConsentMethod::School, false) => {
            RoutingDecision::new(UiVariant::BlockNoConsent, ReportRecipient::None)
        }
        (true, ConsentMethod::School, true) => {
            RoutingDecision::new(UiVariant::ShowSimplifiedOnly, ReportRecipient::School)
        }
        (true, ConsentMethod::Parent, _) => {
            RoutingDecision::new(UiVariant::MinimalParentRouting, ReportRecipient::Parent)
        }
    };

    if decision.ui_variant == UiVariant::BlockNoConsent {
        warn!(flow = %input.flow_type, "minor without school consent on file, results blocked");
    }
    decision
}

/// Simplified status shown to school audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchoolStatus {
    Healthy,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
    Concern,
}

impl SchoolStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SchoolStatus::Healthy => "Healthy",
            SchoolStatus::NeedsAttention => "Needs Attention",
            SchoolStatus::Concern => "Concern",
        }
    }
}

/// Care priority shown to charity audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CarePriority {
    Low,
    Medium,
    High,
}

impl CarePriority {
    pub fn label(&self) -> &'static str {
        match self {
            CarePriority::Low => "Low",
            CarePriority::Medium => "Medium",
            CarePriority::High => "High",
        }
    }
}

/// Map a raw ML `overall_status` to a school status.
///
/// Unrecognized text falls back to `NeedsAttention`.
pub fn derive_school_simplified_status(overall_status: &str) -> SchoolStatus {
    let status = overall_status.to_lowercase();
    if status.contains("severe") || status.contains("high") {
        SchoolStatus::Concern
    } else if status.contains("moderate") || status.contains("attention") {
        SchoolStatus::NeedsAttention
    } else if status.contains("healthy") || status.contains("normal") {
        SchoolStatus::Healthy
    } else {
        SchoolStatus::NeedsAttention
    }
}

/// Map a raw ML `overall_status` to a charity care priority.
///
/// Unrecognized text falls back to `Low`, unlike the school mapping. Kept
/// as-is pending product review.
pub fn derive_charity_care_priority(overall_status: &str) -> CarePriority {
    let status = overall_status.to_lowercase();
    if status.contains("high") || status.contains("severe") {
        CarePriority::High
    } else if status.contains("moderate") {
        CarePriority::Medium
    } else {
        CarePriority::Low
    }
}
