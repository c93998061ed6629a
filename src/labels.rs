//! Display lookups shared by every page: signal-type names, tier and status
//! labels, score/quality bands, rejection-reason groups and personal-email
//! detection.

use crate::models::SignalTier;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Signal types the edge function knows about, with their display labels.
pub const SIGNAL_TYPE_LABELS: [(&str, &str); 8] = [
    ("webflow_content_download", "Gated Content"),
    ("webflow_newsletter", "Newsletter"),
    ("webflow_popup", "Popup"),
    ("webflow_demo_request", "Demo Request"),
    ("webflow_contact", "Contact Form"),
    ("webflow_webinar_reg", "Webinar"),
    ("webflow_event_reg", "Event"),
    ("webflow_form", "Other Form"),
];

/// Display ceilings for the score fields.
pub const TOTAL_SCORE_CEILING: f64 = 220.0;
pub const ICP_SCORE_CEILING: f64 = 100.0;
pub const INTENT_SCORE_CEILING: f64 = 40.0;

/// Label for a signal type; unknown types are shown as-is.
pub fn signal_type_label(signal_type: &str) -> &str {
    SIGNAL_TYPE_LABELS
        .iter()
        .find(|(key, _)| *key == signal_type)
        .map(|(_, label)| *label)
        .unwrap_or(signal_type)
}

pub fn is_known_signal_type(signal_type: &str) -> bool {
    SIGNAL_TYPE_LABELS.iter().any(|(key, _)| *key == signal_type)
}

pub fn tier_label(tier: SignalTier) -> &'static str {
    match tier {
        SignalTier::P0 => "P0 - Immediate",
        SignalTier::P1 => "P1 - High",
        SignalTier::P2 => "P2 - Standard",
        SignalTier::P3 => "P3 - Nurture",
    }
}

/// Status label as shown in the leads table. Unknown statuses read as "New".
pub fn status_label(action_status: &str) -> &'static str {
    match action_status {
        "working" => "In Progress",
        "researching" => "Researching",
        "done" => "Converted",
        "rejected" => "Disqualified",
        _ => "New",
    }
}

/// Coloring band for a percentage of high-quality (or converted) leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    High,
    Medium,
    Low,
}

pub fn quality_band(pct: f64) -> QualityBand {
    if pct >= 40.0 {
        QualityBand::High
    } else if pct >= 20.0 {
        QualityBand::Medium
    } else {
        QualityBand::Low
    }
}

/// Coloring band for a score relative to its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Moderate,
    Weak,
}

pub fn score_band(score: f64, ceiling: f64) -> ScoreBand {
    if ceiling <= 0.0 {
        return ScoreBand::Weak;
    }
    let ratio = score / ceiling;
    if ratio >= 0.7 {
        ScoreBand::Strong
    } else if ratio >= 0.4 {
        ScoreBand::Moderate
    } else {
        ScoreBand::Weak
    }
}

/// Display group for a free-text rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionGroup {
    /// Accepted downstream (`auto_linked...`), not really a rejection.
    AutoLinked,
    PersonalEmail,
    Competitor,
    ExistingCustomer,
    Duplicate,
    NotIcp,
    SpamOrTest,
    Other,
}

impl RejectionGroup {
    pub fn label(&self) -> &'static str {
        match self {
            RejectionGroup::AutoLinked => "Accepted (auto-linked)",
            RejectionGroup::PersonalEmail => "Personal email",
            RejectionGroup::Competitor => "Competitor",
            RejectionGroup::ExistingCustomer => "Existing customer",
            RejectionGroup::Duplicate => "Duplicate",
            RejectionGroup::NotIcp => "Not ICP",
            RejectionGroup::SpamOrTest => "Spam / test",
            RejectionGroup::Other => "Other",
        }
    }
}

fn rejection_patterns() -> &'static [(Regex, RejectionGroup)] {
    static PATTERNS: OnceLock<Vec<(Regex, RejectionGroup)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"auto_linked", RejectionGroup::AutoLinked),
            (r"(?i)personal|gmail|free[\s_-]?email", RejectionGroup::PersonalEmail),
            (r"(?i)competitor", RejectionGroup::Competitor),
            (r"(?i)existing|customer|already[\s_-]?(in|a)", RejectionGroup::ExistingCustomer),
            (r"(?i)duplicate|dupe", RejectionGroup::Duplicate),
            (r"(?i)\bicp\b|not[\s_-]?icp|too[\s_-]?small|student|industry", RejectionGroup::NotIcp),
            (r"(?i)spam|test|fake|bot\b", RejectionGroup::SpamOrTest),
        ]
        .into_iter()
        .filter_map(|(pattern, group)| Regex::new(pattern).ok().map(|re| (re, group)))
        .collect()
    })
}

/// Groups a rejection reason for display; first matching pattern wins.
pub fn rejection_group(reason: &str) -> RejectionGroup {
    rejection_patterns()
        .iter()
        .find(|(re, _)| re.is_match(reason))
        .map(|(_, group)| *group)
        .unwrap_or(RejectionGroup::Other)
}

fn personal_email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(concat!(
                r"(?i)^(?:gmail|googlemail|yahoo|ymail|hotmail|outlook|live|msn|icloud|me|mac",
                r"|aol|protonmail)\.(?:(?:co|com|net|org)\.)?[a-z]{2,}$",
            ))
            .ok()
        })
        .as_ref()
}

/// Whether the address belongs to a consumer mailbox (no company data to show).
///
/// The provider must be the registrable domain (`gmail.com`, `yahoo.co.uk`), so
/// `acme.com` is not `me.com` and `outlook.contoso.com` is a company mailbox.
pub fn is_personal_email(email: &str) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return false;
    };
    personal_email_pattern()
        .map(|re| re.is_match(domain))
        .unwrap_or(false)
}
