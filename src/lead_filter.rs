//! In-memory filtering and sorting of lead lists.
//!
//! A filter is a conjunction of independent predicates, so the order in which
//! they are applied never changes the result. Sorting is a single-key stable
//! comparator with a direction that toggles on repeat selection.

use crate::classification::{funnel_stage_with, FunnelStage, QualificationRules};
use crate::models::Lead;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Parse an upstream timestamp into UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f] +ZZZZ`, a naive datetime (assumed
/// UTC) or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f %z")
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
}

fn lead_date(lead: &Lead) -> Option<NaiveDate> {
    lead.timestamp().and_then(parse_timestamp).map(|dt| dt.date_naive())
}

/// One independent condition on a lead.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadPredicate {
    Tier(String),
    Status(String),
    SignalType(String),
    Content(String),
    Persona(String),
    Stage(FunnelStage),
    /// Case-insensitive substring over email, company and content name.
    Search(String),
    /// Inclusive lower bound on the lead date.
    From(NaiveDate),
    /// Inclusive upper bound on the lead date.
    To(NaiveDate),
}

fn eq_ignore_case(value: Option<&str>, expected: &str) -> bool {
    value
        .map(|v| v.trim().eq_ignore_ascii_case(expected.trim()))
        .unwrap_or(false)
}

impl LeadPredicate {
    pub fn matches(&self, lead: &Lead, rules: &QualificationRules) -> bool {
        match self {
            LeadPredicate::Tier(tier) => eq_ignore_case(Some(lead.signal_tier.as_str()), tier),
            LeadPredicate::Status(status) => {
                // "working" in the status picker also covers "researching"
                eq_ignore_case(Some(lead.action_status.as_str()), status)
                    || (status.eq_ignore_ascii_case("working")
                        && eq_ignore_case(Some(lead.action_status.as_str()), "researching"))
            }
            LeadPredicate::SignalType(kind) => {
                eq_ignore_case(lead.trigger_signal_type.as_deref(), kind)
            }
            LeadPredicate::Content(name) => eq_ignore_case(lead.content_name.as_deref(), name),
            LeadPredicate::Persona(persona) => {
                eq_ignore_case(lead.detected_persona.as_deref(), persona)
            }
            LeadPredicate::Stage(stage) => funnel_stage_with(lead, rules) == *stage,
            LeadPredicate::Search(query) => {
                let query = query.to_lowercase();
                [
                    Some(lead.email.as_str()),
                    lead.company_name.as_deref(),
                    lead.content_name.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&query))
            }
            LeadPredicate::From(from) => lead_date(lead).map(|d| d >= *from).unwrap_or(false),
            LeadPredicate::To(to) => lead_date(lead).map(|d| d <= *to).unwrap_or(false),
        }
    }
}

/// Query-string shape of the lead filters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LeadFilterParams {
    pub tier: Option<String>,
    pub status: Option<String>,
    pub signal_type: Option<String>,
    pub content: Option<String>,
    pub persona: Option<String>,
    pub stage: Option<String>,
    #[serde(alias = "search")]
    pub q: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Conjunction of predicates. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    predicates: Vec<LeadPredicate>,
}

impl LeadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: LeadPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[LeadPredicate] {
        &self.predicates
    }

    /// Builds a filter from query parameters; blank values are ignored.
    pub fn from_params(params: &LeadFilterParams) -> Result<Self, String> {
        // "all" is what the pickers send for "no filter"
        fn present(value: &Option<String>) -> Option<&str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
        }
        fn date(name: &str, raw: &str) -> Result<NaiveDate, String> {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| format!("'{}' must be a date in YYYY-MM-DD format", name))
        }

        let mut filter = Self::new();
        if let Some(tier) = present(&params.tier) {
            filter = filter.with(LeadPredicate::Tier(tier.to_string()));
        }
        if let Some(status) = present(&params.status) {
            filter = filter.with(LeadPredicate::Status(status.to_string()));
        }
        if let Some(kind) = present(&params.signal_type) {
            filter = filter.with(LeadPredicate::SignalType(kind.to_string()));
        }
        if let Some(content) = present(&params.content) {
            filter = filter.with(LeadPredicate::Content(content.to_string()));
        }
        if let Some(persona) = present(&params.persona) {
            filter = filter.with(LeadPredicate::Persona(persona.to_string()));
        }
        if let Some(stage) = present(&params.stage) {
            let stage = FunnelStage::parse(stage).ok_or_else(|| {
                format!(
                    "Unknown stage '{}'. Expected one of: mql, pre_mql, rejected, working, closed, new",
                    stage
                )
            })?;
            filter = filter.with(LeadPredicate::Stage(stage));
        }
        if let Some(query) = present(&params.q) {
            filter = filter.with(LeadPredicate::Search(query.to_string()));
        }
        let from = present(&params.from).map(|raw| date("from", raw)).transpose()?;
        let to = present(&params.to).map(|raw| date("to", raw)).transpose()?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err("'from' must not be after 'to'".to_string());
            }
        }
        if let Some(from) = from {
            filter = filter.with(LeadPredicate::From(from));
        }
        if let Some(to) = to {
            filter = filter.with(LeadPredicate::To(to));
        }
        Ok(filter)
    }

    pub fn matches(&self, lead: &Lead, rules: &QualificationRules) -> bool {
        self.predicates.iter().all(|p| p.matches(lead, rules))
    }

    /// Matching leads, in input order.
    pub fn apply<'a>(&self, leads: &'a [Lead], rules: &QualificationRules) -> Vec<&'a Lead> {
        leads.iter().filter(|l| self.matches(l, rules)).collect()
    }
}

/// Sortable columns of the leads table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Date,
    Email,
    Company,
    Content,
    Persona,
    Tier,
    TotalScore,
    IcpFit,
    Intent,
    Status,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" | "created_at" => Some(SortKey::Date),
            "email" => Some(SortKey::Email),
            "company" | "company_name" => Some(SortKey::Company),
            "content" | "content_name" => Some(SortKey::Content),
            "persona" => Some(SortKey::Persona),
            "tier" | "signal_tier" => Some(SortKey::Tier),
            "score" | "total_score" => Some(SortKey::TotalScore),
            "icp" | "icp_fit_score" => Some(SortKey::IcpFit),
            "intent" | "intent_score" => Some(SortKey::Intent),
            "status" | "action_status" => Some(SortKey::Status),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, SortKey::TotalScore | SortKey::IcpFit | SortKey::Intent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Current sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Date,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    /// Column click: the same column flips direction, a new column starts descending.
    pub fn toggle(self, key: SortKey) -> Self {
        if self.key == key {
            Self {
                key,
                direction: self.direction.flipped(),
            }
        } else {
            Self {
                key,
                direction: SortDirection::Desc,
            }
        }
    }

    pub fn compare(&self, a: &Lead, b: &Lead) -> Ordering {
        let ordering = if self.key.is_numeric() {
            let (x, y) = (numeric_value(a, self.key), numeric_value(b, self.key));
            compare_optional_f64(x, y)
        } else {
            text_value(a, self.key).cmp(&text_value(b, self.key))
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Stable in-place sort.
    pub fn sort(&self, leads: &mut [&Lead]) {
        leads.sort_by(|a, b| self.compare(a, b));
    }
}

fn numeric_value(lead: &Lead, key: SortKey) -> Option<f64> {
    let value = match key {
        SortKey::TotalScore => lead.total_score,
        SortKey::IcpFit => lead.icp_fit_score,
        SortKey::Intent => lead.intent_score,
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

/// Missing values order lowest.
fn compare_optional_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn text_value(lead: &Lead, key: SortKey) -> Option<String> {
    let raw = match key {
        SortKey::Date => {
            // Chronological when parseable; RFC 3339 strings also sort lexically.
            return lead.timestamp().map(|ts| {
                parse_timestamp(ts)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| ts.to_string())
            });
        }
        SortKey::Email => Some(lead.email.as_str()),
        SortKey::Company => lead.company_name.as_deref(),
        SortKey::Content => lead.content_name.as_deref(),
        SortKey::Persona => lead.detected_persona.as_deref(),
        SortKey::Tier => Some(lead.signal_tier.as_str()),
        SortKey::Status => Some(lead.action_status.as_str()),
        SortKey::TotalScore | SortKey::IcpFit | SortKey::Intent => None,
    };
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}
