use proptest::prelude::*;
use serde_json::json;
use smilecheck::{
    decide, filter_scan_result, AgeGroup, CaptureGuardrail, ConsentMethod, FlowType,
    GuardrailSignals, ResultView, RoutingInput, ScanRecord, UiVariant,
};

fn arb_flow() -> impl Strategy<Value = FlowType> {
    prop_oneof![
        Just(FlowType::Gym),
        Just(FlowType::School),
        Just(FlowType::Charity)
    ]
}

fn arb_consent() -> impl Strategy<Value = ConsentMethod> {
    prop_oneof![Just(ConsentMethod::School), Just(ConsentMethod::Parent)]
}

fn arb_routing_input() -> impl Strategy<Value = RoutingInput> {
    (arb_flow(), any::<bool>(), arb_consent(), any::<bool>()).prop_map(
        |(flow_type, is_minor, consent_method, has_school_consent_on_file)| RoutingInput {
            flow_type,
            is_minor,
            consent_method,
            has_school_consent_on_file,
        },
    )
}

fn arb_status() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("healthy".to_string()),
        Just("Normal".to_string()),
        Just("moderate plaque".to_string()),
        Just("needs attention".to_string()),
        Just("SEVERE decay".to_string()),
        Just("high risk".to_string()),
        "[a-z ]{0,16}",
    ]
}

/// Raw ML payload text: well-formed objects, partial objects, or garbage.
fn arb_raw_result() -> impl Strategy<Value = Option<String>> {
    let object = (arb_status(), 0.0..100.0f64, any::<bool>()).prop_map(
        |(status, brightness, clinic)| {
            json!({
                "overall_status": status,
                "pathology": {"caries": brightness > 50.0},
                "whitening": {"brightness_score": brightness, "shade_value": "A2", "ideal_shade": "A1"},
                "clinic_recommended": clinic,
                "model_version": "v1"
            })
            .to_string()
        },
    );
    prop_oneof![
        object.prop_map(Some),
        "[ -~]{0,24}".prop_map(Some),
        Just(None),
    ]
}

fn arb_scan() -> impl Strategy<Value = ScanRecord> {
    (
        arb_raw_result(),
        prop::option::of(prop_oneof![
            Just(AgeGroup::Elementary),
            Just(AgeGroup::Middle),
            Just(AgeGroup::High)
        ]),
    )
        .prop_map(|(raw, age_group)| ScanRecord {
            id: "scan".into(),
            age_group,
            raw_result: raw.map(serde_json::Value::String),
        })
}

proptest! {
    /// Pathology is allowed in the UI exactly when the variant is ADULT_FULL.
    #[test]
    fn pathology_iff_adult_full(input in arb_routing_input()) {
        let decision = decide(&input);
        prop_assert_eq!(decision.allow_pathology_in_ui, decision.ui_variant == UiVariant::AdultFull);
        if input.is_minor {
            prop_assert!(!decision.allow_pathology_in_ui);
        }
    }

    /// A minor under school consent with nothing on file is always blocked.
    #[test]
    fn missing_school_consent_blocks(flow in arb_flow()) {
        let decision = decide(&RoutingInput::minor(flow, ConsentMethod::School, false));
        prop_assert_eq!(decision.ui_variant, UiVariant::BlockNoConsent);
    }

    /// Gym projections never leak anything beyond whitening.
    #[test]
    fn gym_never_leaks(scan in arb_scan()) {
        let result = filter_scan_result(&scan, Some(FlowType::Gym), false);
        prop_assert_eq!(result.view, ResultView::WhiteningOnly);
        prop_assert!(result.pathology.is_none());
        prop_assert!(result.simplified_status.is_none());
        prop_assert!(result.priority_score.is_none());
    }

    /// Non-partner projections populate at most one substantive category.
    #[test]
    fn single_category_per_flow(scan in arb_scan(), flow in prop::option::of(arb_flow())) {
        let result = filter_scan_result(&scan, flow, false);
        let populated = [
            result.pathology.is_some(),
            result.whitening.is_some(),
            result.simplified_status.is_some(),
            result.priority_score.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();
        prop_assert!(populated <= 1);
        prop_assert!(result.pathology.is_none());
    }

    /// Filtering has no hidden state.
    #[test]
    fn filter_is_idempotent(scan in arb_scan(), flow in prop::option::of(arb_flow()), partner in any::<bool>()) {
        let first = filter_scan_result(&scan, flow, partner);
        let second = filter_scan_result(&scan, flow, partner);
        prop_assert_eq!(first, second);
    }

    /// However signals flicker, no two captures are closer than a full countdown
    /// plus the rest tick.
    #[test]
    fn captures_are_spaced_by_full_countdown(ticks in prop::collection::vec(any::<bool>(), 0..64)) {
        let mut guardrail = CaptureGuardrail::default();
        let lost = GuardrailSignals { face_aligned: false, ..GuardrailSignals::ALL_OK };
        let fired: Vec<usize> = ticks
            .iter()
            .enumerate()
            .filter_map(|(i, ok)| {
                let signals = if *ok { GuardrailSignals::ALL_OK } else { lost };
                guardrail.step(signals).trigger.map(|_| i)
            })
            .collect();
        for pair in fired.windows(2) {
            prop_assert!(pair[1] - pair[0] >= 4);
        }
        for &i in &fired {
            prop_assert!(i >= 2);
            prop_assert!(ticks[i - 2..=i].iter().all(|ok| *ok));
        }
    }
}
