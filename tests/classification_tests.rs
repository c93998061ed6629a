/// Classifier tests against realistic upstream lead payloads
use gated_content_analytics::classification::{
    classify, funnel_stage, is_mql, is_pre_mql, FunnelStage,
};
use gated_content_analytics::models::Lead;
use serde_json::json;

fn decode(value: serde_json::Value) -> Lead {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_auto_linked_p0_is_mql() {
    let lead = decode(json!({
        "id": "a1",
        "email": "controller@initech.com",
        "company_name": "Initech",
        "signal_tier": "P0",
        "action_status": "done",
        "rejection_reason": "auto_linked_to_discovery",
        "icp_fit_score": 65,
        "persona_score": 35,
        "intent_score": 22
    }));

    assert!(is_mql(&lead));
    assert!(is_pre_mql(&lead));
    assert_eq!(funnel_stage(&lead), FunnelStage::Mql);
    assert_eq!(classify(&lead).stage_label, "MQL");
}

#[test]
fn test_low_icp_new_lead_is_neither() {
    let lead = decode(json!({
        "id": "a2",
        "email": "someone@initech.com",
        "company_name": "Initech",
        "signal_tier": "P1",
        "action_status": "new",
        "icp_fit_score": 10
    }));

    assert!(!is_pre_mql(&lead));
    assert!(!is_mql(&lead));
    assert_eq!(funnel_stage(&lead), FunnelStage::New);
}

#[test]
fn test_absent_payloads_never_panic() {
    let lead = decode(json!({
        "id": "a3",
        "ai_research": null,
        "context_for_outreach": null
    }));

    let c = classify(&lead);
    assert!(!c.pre_mql);
    assert!(!c.transformation_signal);
    assert!(!c.why_now_signal);
    assert_eq!(c.touchpoints, 0);
    assert!(!c.tier_known);
}

#[test]
fn test_signal_history_counts_as_engagement() {
    let lead = decode(json!({
        "id": "a4",
        "company_name": "Umbrella",
        "signal_tier": "P2",
        "action_status": "working",
        "persona_score": 20,
        "icp_fit_score": 40,
        "intent_score": 5,
        "context_for_outreach": {
            "signal_history": [
                {"type": "webflow_content_download", "content": "Close Playbook", "timestamp": "2026-01-02T10:00:00Z"},
                {"type": "webflow_webinar_reg", "content": "FP&A Live", "timestamp": "2026-01-09T10:00:00Z"}
            ]
        }
    }));

    assert!(is_pre_mql(&lead));
    assert_eq!(classify(&lead).touchpoints, 2);
    assert_eq!(funnel_stage(&lead), FunnelStage::PreMql);
}

#[test]
fn test_why_now_flag_counts_as_engagement() {
    let lead = decode(json!({
        "id": "a5",
        "company_name": "Hooli",
        "signal_tier": "P3",
        "action_status": "new",
        "persona_score": 18,
        "icp_fit_score": 30,
        "ai_research": {
            "company": {
                "why_now_signals": {"new_cfo_hire": true, "layoffs_announced": false},
                "transformation_signals": {"ai_initiative": false}
            }
        }
    }));

    let c = classify(&lead);
    assert!(c.why_now_signal);
    assert!(!c.transformation_signal);
    assert!(c.pre_mql);
}

#[test]
fn test_boundary_combinations_without_engagement() {
    // No signals, no history, intent below 20: never Pre-MQL whatever the fit
    for (tier, persona, icp) in [
        ("P0", 0.0, 100.0),
        ("P1", 50.0, 30.0),
        ("P2", 18.0, 30.0),
        ("P3", 17.0, 29.0),
    ] {
        let lead = decode(json!({
            "id": "b",
            "company_name": "Vandelay",
            "signal_tier": tier,
            "action_status": "new",
            "persona_score": persona,
            "icp_fit_score": icp,
            "intent_score": 19
        }));
        assert!(!is_pre_mql(&lead), "{tier} persona={persona} icp={icp}");
    }

    // With intent at the threshold, fit decides
    for (tier, persona, icp, expected) in [
        ("P0", 0.0, 30.0, true),
        ("P1", 0.0, 29.0, false),
        ("P2", 18.0, 30.0, true),
        ("P2", 17.0, 30.0, false),
        ("P3", 17.0, 100.0, false),
    ] {
        let lead = decode(json!({
            "id": "b",
            "company_name": "Vandelay",
            "signal_tier": tier,
            "action_status": "new",
            "persona_score": persona,
            "icp_fit_score": icp,
            "intent_score": 20
        }));
        assert_eq!(is_pre_mql(&lead), expected, "{tier} persona={persona} icp={icp}");
    }
}
