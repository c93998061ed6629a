use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Decodes a field leniently: absent, null or malformed values become `T::default()`.
///
/// Used for the enrichment payloads, whose shape is not guaranteed upstream.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decodes `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============ Enumerations ============

/// Priority bucket assigned upstream. Never derived locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalTier {
    P0,
    P1,
    P2,
    P3,
}

impl SignalTier {
    pub const ALL: [SignalTier; 4] = [
        SignalTier::P0,
        SignalTier::P1,
        SignalTier::P2,
        SignalTier::P3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalTier::P0 => "P0",
            SignalTier::P1 => "P1",
            SignalTier::P2 => "P2",
            SignalTier::P3 => "P3",
        }
    }

    /// P0 and P1 count as "high quality" throughout the dashboard.
    pub fn is_high_quality(&self) -> bool {
        matches!(self, SignalTier::P0 | SignalTier::P1)
    }
}

impl FromStr for SignalTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P0" => Ok(SignalTier::P0),
            "P1" => Ok(SignalTier::P1),
            "P2" => Ok(SignalTier::P2),
            "P3" => Ok(SignalTier::P3),
            other => Err(format!("unknown signal tier '{}'", other)),
        }
    }
}

impl fmt::Display for SignalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow state of a lead, set upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    New,
    Working,
    Researching,
    Done,
    Rejected,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::New => "new",
            ActionStatus::Working => "working",
            ActionStatus::Researching => "researching",
            ActionStatus::Done => "done",
            ActionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(ActionStatus::New),
            "working" => Ok(ActionStatus::Working),
            "researching" => Ok(ActionStatus::Researching),
            "done" => Ok(ActionStatus::Done),
            "rejected" => Ok(ActionStatus::Rejected),
            other => Err(format!("unknown action status '{}'", other)),
        }
    }
}

// ============ Lead ============

/// A lead as returned by the `leads` action.
///
/// `signal_tier` and `action_status` are kept exactly as received; use
/// [`Lead::tier`] and [`Lead::status`] for typed views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detected_persona: Option<String>,

    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_domain: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub employee_count: Option<String>,

    /// ICP fit, 0-100.
    #[serde(default)]
    pub icp_fit_score: Option<f64>,
    /// "Why now" score.
    #[serde(default)]
    pub persona_score: Option<f64>,
    #[serde(default)]
    pub intent_score: Option<f64>,
    /// Sum of the sub-scores, displayed against a ceiling of 220.
    #[serde(default)]
    pub total_score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signal_tier: String,
    #[serde(default)]
    pub lead_grade: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub action_status: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,

    #[serde(default)]
    pub content_name: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub trigger_signal_type: Option<String>,
    #[serde(default)]
    pub signal_type_label: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub inbox_entered_at: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub has_research: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub in_salesforce: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub in_discovery: bool,

    #[serde(default, deserialize_with = "lenient")]
    pub ai_research: Option<AiResearch>,
    #[serde(default, deserialize_with = "lenient")]
    pub context_for_outreach: Option<ContextForOutreach>,
}

impl Lead {
    pub fn tier(&self) -> Option<SignalTier> {
        self.signal_tier.parse().ok()
    }

    pub fn status(&self) -> Option<ActionStatus> {
        self.action_status.parse().ok()
    }

    pub fn company(&self) -> Option<&CompanyResearch> {
        self.ai_research.as_ref().and_then(|r| r.company.as_ref())
    }

    pub fn signal_history(&self) -> &[SignalHistoryEntry] {
        self.context_for_outreach
            .as_ref()
            .map(|c| c.signal_history.as_slice())
            .unwrap_or(&[])
    }

    /// Timestamp used for date display and date-range filtering.
    pub fn timestamp(&self) -> Option<&str> {
        self.created_at
            .as_deref()
            .or(self.inbox_entered_at.as_deref())
    }
}

/// AI research payload attached to a lead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiResearch {
    #[serde(default, deserialize_with = "lenient")]
    pub company: Option<CompanyResearch>,
    #[serde(default, deserialize_with = "lenient")]
    pub finance_leaders_found: Vec<FinanceLeader>,
    #[serde(default, deserialize_with = "lenient")]
    pub recommended_value_driver: Option<ValueDriver>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyResearch {
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub financials: Option<Financials>,
    #[serde(default, deserialize_with = "lenient")]
    pub entity_structure: Option<EntityStructure>,
    #[serde(default, deserialize_with = "lenient")]
    pub recent_news: Vec<NewsItem>,
    /// Category name to tools, in the order the research listed them.
    #[serde(default, deserialize_with = "lenient")]
    pub tech_stack_categorized: IndexMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub transformation_signals: Option<SignalFlags>,
    #[serde(default, deserialize_with = "lenient")]
    pub why_now_signals: Option<SignalFlags>,
    #[serde(default, deserialize_with = "lenient")]
    pub data_team: Option<DataTeam>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Financials {
    pub annual_revenue: Option<String>,
    pub market_cap: Option<String>,
    pub yoy_growth: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStructure {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub entity_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub headline: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// A set of named boolean flags (transformation or why-now signals).
///
/// Flags are open-ended upstream, so every key is kept; non-boolean values are
/// ignored when asking which flags are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalFlags(pub IndexMap<String, Value>);

impl SignalFlags {
    /// Names of the flags that are exactly `true`, in upstream order.
    pub fn active(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, v)| matches!(v, Value::Bool(true)))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn any(&self) -> bool {
        self.0.values().any(|v| matches!(v, Value::Bool(true)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataTeam {
    pub has_data_engineers: Option<bool>,
    pub data_team_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinanceLeader {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueDriver {
    pub driver: Option<String>,
    pub reasoning: Option<String>,
}

/// Outreach context prepared upstream, including the multi-signal history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextForOutreach {
    #[serde(default, deserialize_with = "lenient")]
    pub talking_points: Vec<String>,
    #[serde(default)]
    pub form_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content_downloaded: Vec<String>,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub signal_history: Vec<SignalHistoryEntry>,
    #[serde(default, deserialize_with = "lenient")]
    pub engagement_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalHistoryEntry {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
}

// ============ Aggregate responses ============

/// Response of the `overview` action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverviewData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_downloads: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub high_quality_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub high_quality_pct: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub converted_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub converted_pct: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_tier: TierBreakdown,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_status: StatusBreakdown,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_signal_type: Vec<SignalTypeSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_content: Vec<ContentSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_persona: Vec<PersonaSummary>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub available_signal_types: Vec<LabeledValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakdown {
    #[serde(rename = "P0", default, deserialize_with = "null_as_default")]
    pub p0: u64,
    #[serde(rename = "P1", default, deserialize_with = "null_as_default")]
    pub p1: u64,
    #[serde(rename = "P2", default, deserialize_with = "null_as_default")]
    pub p2: u64,
    #[serde(rename = "P3", default, deserialize_with = "null_as_default")]
    pub p3: u64,
}

impl TierBreakdown {
    pub fn get(&self, tier: SignalTier) -> u64 {
        match tier {
            SignalTier::P0 => self.p0,
            SignalTier::P1 => self.p1,
            SignalTier::P2 => self.p2,
            SignalTier::P3 => self.p3,
        }
    }

    pub fn total(&self) -> u64 {
        self.p0 + self.p1 + self.p2 + self.p3
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    #[serde(default, deserialize_with = "null_as_default")]
    pub new: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub working: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub researching: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub done: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rejected: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalTypeSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub signal_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pct: f64,
}

/// Per-content row embedded in the overview.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_name: String,
    #[serde(default)]
    pub signal_type: Option<String>,
    #[serde(default)]
    pub signal_type_label: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub high_quality: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quality_pct: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub converted: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub converted_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub persona: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pct: f64,
    #[serde(default)]
    pub high_quality: Option<u64>,
    #[serde(default)]
    pub quality_pct: Option<f64>,
    #[serde(default)]
    pub avg_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledValue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
}

/// One day of the `trend` action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendPoint {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub high_quality: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub converted: u64,
}

/// One row of the `content-summary` action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPerformance {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub p0: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub p1: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub p2: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub p3: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub high_quality_pct: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub converted: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub converted_pct: f64,
}

// ============ Wire envelopes ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadsEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub leads: Vec<Lead>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<ContentPerformance>,
}

/// Error body returned by the edge function on non-2xx.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
