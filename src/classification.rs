/// Lead tier and qualification classifier
///
/// Single source of truth for the funnel stage of a lead. Every page and widget
/// that needs to know whether a lead is Pre-MQL or MQL calls into this module.
///
/// Rules (all evaluated on one record and its nested payloads):
/// 1. Tier is the upstream `signal_tier`, passed through verbatim
/// 2. Pre-MQL needs a known company, persona fit (`persona_score` or P0/P1),
///    ICP fit, and at least one engagement signal
/// 3. Rejected leads are never Pre-MQL; closed (`done`) leads only when the
///    close reason is an `auto_linked` hand-off
/// 4. MQL = Pre-MQL + `done` + `auto_linked`, so every MQL is a Pre-MQL
use crate::models::{ActionStatus, Lead, SignalTier};
use serde::{Deserialize, Serialize};

/// Marker in `rejection_reason` meaning the lead was accepted downstream.
pub const AUTO_LINKED_MARKER: &str = "auto_linked";

/// Thresholds used by [`is_pre_mql`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualificationRules {
    pub min_persona_score: f64,
    pub min_icp_fit_score: f64,
    pub min_intent_score: f64,
    pub min_touchpoints: usize,
}

impl Default for QualificationRules {
    fn default() -> Self {
        Self {
            min_persona_score: 18.0,
            min_icp_fit_score: 30.0,
            min_intent_score: 20.0,
            min_touchpoints: 2,
        }
    }
}

/// Funnel position of a lead, most advanced first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Mql,
    PreMql,
    Rejected,
    /// `working` or `researching`.
    Working,
    /// `done` without an auto-linked hand-off.
    Closed,
    New,
}

impl FunnelStage {
    pub fn label(&self) -> &'static str {
        match self {
            FunnelStage::Mql => "MQL",
            FunnelStage::PreMql => "Pre-MQL",
            FunnelStage::Rejected => "Rejected",
            FunnelStage::Working => "Working",
            FunnelStage::Closed => "Closed",
            FunnelStage::New => "New",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "mql" => Some(FunnelStage::Mql),
            "pre_mql" | "premql" => Some(FunnelStage::PreMql),
            "rejected" => Some(FunnelStage::Rejected),
            "working" => Some(FunnelStage::Working),
            "closed" => Some(FunnelStage::Closed),
            "new" => Some(FunnelStage::New),
            _ => None,
        }
    }
}

/// Everything the UI needs to badge a lead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadClassification {
    /// Upstream tier, verbatim.
    pub tier: String,
    pub tier_known: bool,
    pub stage: FunnelStage,
    pub stage_label: &'static str,
    pub pre_mql: bool,
    pub mql: bool,
    pub touchpoints: usize,
    pub transformation_signal: bool,
    pub why_now_signal: bool,
}

/// True if any transformation flag under `ai_research.company` is set.
pub fn has_transformation_signal(lead: &Lead) -> bool {
    lead.company()
        .and_then(|c| c.transformation_signals.as_ref())
        .map(|flags| flags.any())
        .unwrap_or(false)
}

/// True if any why-now flag under `ai_research.company` is set.
pub fn has_why_now_signal(lead: &Lead) -> bool {
    lead.company()
        .and_then(|c| c.why_now_signals.as_ref())
        .map(|flags| flags.any())
        .unwrap_or(false)
}

/// Number of tracked person-level touchpoints.
///
/// Upstream sometimes only fills `engagement_count`, so the larger of that and
/// the signal history length is used.
pub fn touchpoint_count(lead: &Lead) -> usize {
    let history = lead.signal_history().len();
    let engagement = lead
        .context_for_outreach
        .as_ref()
        .and_then(|c| c.engagement_count)
        .unwrap_or(0) as usize;
    history.max(engagement)
}

/// A company name is known when present and not a placeholder.
pub fn has_known_company(lead: &Lead) -> bool {
    match lead.company_name.as_deref().map(str::trim) {
        None | Some("") => false,
        Some(name) => !matches!(
            name.to_ascii_lowercase().as_str(),
            "unknown" | "n/a" | "na" | "-" | "none" | "null"
        ),
    }
}

fn is_auto_linked(lead: &Lead) -> bool {
    lead.rejection_reason
        .as_deref()
        .map(|r| r.contains(AUTO_LINKED_MARKER))
        .unwrap_or(false)
}

fn score(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Pre-MQL eligibility under the given thresholds.
pub fn is_pre_mql_with(lead: &Lead, rules: &QualificationRules) -> bool {
    match lead.status() {
        Some(ActionStatus::Rejected) => return false,
        Some(ActionStatus::Done) if !is_auto_linked(lead) => return false,
        _ => {}
    }

    if !has_known_company(lead) {
        return false;
    }

    let persona_fit = score(lead.persona_score) >= rules.min_persona_score
        || lead.tier().map(|t| t.is_high_quality()).unwrap_or(false);
    if !persona_fit {
        return false;
    }

    if score(lead.icp_fit_score) < rules.min_icp_fit_score {
        return false;
    }

    touchpoint_count(lead) >= rules.min_touchpoints
        || has_transformation_signal(lead)
        || has_why_now_signal(lead)
        || score(lead.intent_score) >= rules.min_intent_score
}

/// MQL under the given thresholds: Pre-MQL, closed, and auto-linked downstream.
pub fn is_mql_with(lead: &Lead, rules: &QualificationRules) -> bool {
    lead.status() == Some(ActionStatus::Done)
        && is_auto_linked(lead)
        && is_pre_mql_with(lead, rules)
}

pub fn is_pre_mql(lead: &Lead) -> bool {
    is_pre_mql_with(lead, &QualificationRules::default())
}

pub fn is_mql(lead: &Lead) -> bool {
    is_mql_with(lead, &QualificationRules::default())
}

/// Funnel stage, preferring qualification over workflow status.
pub fn funnel_stage_with(lead: &Lead, rules: &QualificationRules) -> FunnelStage {
    if is_mql_with(lead, rules) {
        return FunnelStage::Mql;
    }
    if is_pre_mql_with(lead, rules) {
        return FunnelStage::PreMql;
    }
    match lead.status() {
        Some(ActionStatus::Rejected) => FunnelStage::Rejected,
        Some(ActionStatus::Working) | Some(ActionStatus::Researching) => FunnelStage::Working,
        Some(ActionStatus::Done) => FunnelStage::Closed,
        Some(ActionStatus::New) | None => FunnelStage::New,
    }
}

pub fn funnel_stage(lead: &Lead) -> FunnelStage {
    funnel_stage_with(lead, &QualificationRules::default())
}

/// Full classification of one lead.
pub fn classify_with(lead: &Lead, rules: &QualificationRules) -> LeadClassification {
    let pre_mql = is_pre_mql_with(lead, rules);
    let mql = pre_mql && is_mql_with(lead, rules);
    let stage = funnel_stage_with(lead, rules);

    LeadClassification {
        tier: lead.signal_tier.clone(),
        tier_known: lead.signal_tier.parse::<SignalTier>().is_ok(),
        stage,
        stage_label: stage.label(),
        pre_mql,
        mql,
        touchpoints: touchpoint_count(lead),
        transformation_signal: has_transformation_signal(lead),
        why_now_signal: has_why_now_signal(lead),
    }
}

pub fn classify(lead: &Lead) -> LeadClassification {
    classify_with(lead, &QualificationRules::default())
}
