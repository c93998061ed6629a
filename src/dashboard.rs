//! Page-shaped view models for the Overview, Content and Leads pages and the
//! lead detail panel.
//!
//! Builders are pure functions over upstream data; the `load_*` functions fetch
//! what a page needs and fail as a whole when any call fails.

use crate::classification::{classify_with, LeadClassification, QualificationRules};
use crate::errors::AppError;
use crate::funnel::{percentage, FunnelStats};
use crate::gated_content_client::{GatedContentClient, LeadsQuery};
use crate::labels::{
    is_personal_email, quality_band, rejection_group, score_band, signal_type_label,
    status_label, tier_label, QualityBand, RejectionGroup, ScoreBand, ICP_SCORE_CEILING,
    INTENT_SCORE_CEILING, SIGNAL_TYPE_LABELS, TOTAL_SCORE_CEILING,
};
use crate::lead_filter::{parse_timestamp, LeadFilter, SortState};
use crate::models::{
    ContentPerformance, ContentSummary, FinanceLeader, LabeledValue, Lead, NewsItem,
    OverviewData, PersonaSummary, SignalHistoryEntry, SignalTier, TrendPoint,
};
use chrono::NaiveDate;
use serde::Serialize;

pub const NO_DATA: &str = "No data available";
pub const NO_TREND_DATA: &str = "No trend data available";
pub const NO_CONTENT_DATA: &str = "No content data available";
pub const NO_PERSONA_DATA: &str = "No persona data available";
pub const NO_LEADS: &str = "No leads found";
pub const NO_RESEARCH: &str = "No AI research available for this lead";

const TOP_CONTENT: usize = 5;
const TOP_PERSONAS: usize = 6;
const TECH_CATEGORIES: usize = 3;
const TOOLS_PER_CATEGORY: usize = 3;
const FINANCE_LEADERS: usize = 3;
const NEWS_ITEMS: usize = 2;

/// A list that carries a placeholder message when it is empty.
#[derive(Debug, Clone, Serialize)]
pub struct Section<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
}

impl<T> Section<T> {
    pub fn new(items: Vec<T>, placeholder: &'static str) -> Self {
        let empty_message = items.is_empty().then_some(placeholder);
        Self {
            items,
            empty_message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============ Overview ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    pub title: &'static str,
    pub value: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub date: String,
    /// `MM/dd`, or the raw date when it cannot be parsed.
    pub label: String,
    pub downloads: u64,
    pub high_quality: u64,
    pub low_quality: u64,
    pub converted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSlice {
    pub tier: SignalTier,
    pub label: &'static str,
    pub count: u64,
    /// Whole percent of all tiered leads.
    pub pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentRow {
    #[serde(flatten)]
    pub content: ContentSummary,
    pub quality_band: QualityBand,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewPage {
    pub days: u32,
    pub metrics: Vec<MetricCard>,
    pub trend: Section<TrendRow>,
    pub quality_distribution: Section<TierSlice>,
    pub top_content: Section<ContentRow>,
    pub personas: Section<PersonaSummary>,
    pub available_signal_types: Vec<LabeledValue>,
}

fn format_count(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn trend_label(date: &str) -> String {
    let parsed = date
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .or_else(|| parse_timestamp(date).map(|dt| dt.date_naive()));
    match parsed {
        Some(day) => day.format("%m/%d").to_string(),
        None => date.to_string(),
    }
}

pub fn trend_rows(points: &[TrendPoint]) -> Vec<TrendRow> {
    points
        .iter()
        .map(|p| TrendRow {
            date: p.date.clone(),
            label: trend_label(&p.date),
            downloads: p.downloads,
            high_quality: p.high_quality,
            low_quality: p.downloads.saturating_sub(p.high_quality),
            converted: p.converted,
        })
        .collect()
}

/// Non-zero tiers with their share of the total.
pub fn quality_distribution(overview: &OverviewData) -> Vec<TierSlice> {
    let total = overview.by_tier.total();
    SignalTier::ALL
        .iter()
        .filter(|tier| overview.by_tier.get(**tier) > 0)
        .map(|tier| {
            let count = overview.by_tier.get(*tier);
            TierSlice {
                tier: *tier,
                label: tier_label(*tier),
                count,
                pct: percentage(count as usize, total as usize, 0),
            }
        })
        .collect()
}

fn content_row(mut content: ContentSummary) -> ContentRow {
    if content.signal_type_label.is_none() {
        content.signal_type_label = content
            .signal_type
            .as_deref()
            .map(|t| signal_type_label(t).to_string());
    }
    let quality_band = quality_band(content.quality_pct);
    ContentRow {
        content,
        quality_band,
    }
}

impl OverviewPage {
    pub fn build(overview: OverviewData, trend: Vec<TrendPoint>, days: u32) -> Self {
        let top_persona = overview.by_persona.first();
        let metrics = vec![
            MetricCard {
                title: "Total Downloads",
                value: overview.total_downloads.to_string(),
                subtitle: format!("Last {} days", days),
            },
            MetricCard {
                title: "High Quality",
                value: format!("{}%", format_count(overview.high_quality_pct)),
                subtitle: format!("{} P0/P1 leads", overview.high_quality_count),
            },
            MetricCard {
                title: "Converted",
                value: format!("{}%", format_count(overview.converted_pct)),
                subtitle: format!("{} moved to pipeline", overview.converted_count),
            },
            MetricCard {
                title: "Top Persona",
                value: top_persona
                    .map(|p| p.persona.clone())
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| "N/A".to_string()),
                subtitle: format!(
                    "{}% of downloads",
                    format_count(top_persona.map(|p| p.pct).unwrap_or(0.0))
                ),
            },
        ];

        let quality = quality_distribution(&overview);
        let top_content = overview
            .by_content
            .iter()
            .take(TOP_CONTENT)
            .cloned()
            .map(content_row)
            .collect();
        let personas = overview.by_persona.iter().take(TOP_PERSONAS).cloned().collect();

        Self {
            days,
            metrics,
            trend: Section::new(trend_rows(&trend), NO_TREND_DATA),
            quality_distribution: Section::new(quality, NO_DATA),
            top_content: Section::new(top_content, NO_CONTENT_DATA),
            personas: Section::new(personas, NO_PERSONA_DATA),
            available_signal_types: overview.available_signal_types,
        }
    }
}

pub async fn load_overview(
    client: &GatedContentClient,
    days: u32,
) -> Result<OverviewPage, AppError> {
    let (overview, trend) = tokio::try_join!(client.overview(), client.trend(days))?;
    Ok(OverviewPage::build(overview, trend, days))
}

// ============ Content ============

#[derive(Debug, Clone, Serialize)]
pub struct ContentPerformanceRow {
    #[serde(flatten)]
    pub content: ContentPerformance,
    pub quality_band: QualityBand,
    pub converted_band: QualityBand,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentPage {
    pub total_pieces: usize,
    pub total_downloads: u64,
    /// Rounded mean of the per-asset high-quality percentages.
    pub avg_quality: f64,
    pub rows: Section<ContentPerformanceRow>,
}

impl ContentPage {
    pub fn build(content: Vec<ContentPerformance>) -> Self {
        let total_pieces = content.len();
        let total_downloads = content.iter().map(|c| c.downloads).sum();
        let avg_quality = if content.is_empty() {
            0.0
        } else {
            (content.iter().map(|c| c.high_quality_pct).sum::<f64>() / content.len() as f64).round()
        };
        let rows = content
            .into_iter()
            .map(|content| ContentPerformanceRow {
                quality_band: quality_band(content.high_quality_pct),
                converted_band: quality_band(content.converted_pct),
                content,
            })
            .collect();

        Self {
            total_pieces,
            total_downloads,
            avg_quality,
            rows: Section::new(rows, NO_CONTENT_DATA),
        }
    }
}

pub async fn load_content(client: &GatedContentClient) -> Result<ContentPage, AppError> {
    Ok(ContentPage::build(client.content_summary().await?))
}

// ============ Leads ============

/// Name to show for a lead: first/last name, else the local part of the email.
pub fn display_name(lead: &Lead) -> String {
    let full = [lead.first_name.as_deref(), lead.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !full.is_empty() {
        return full;
    }
    lead.email
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadRow {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub personal_email: bool,
    pub company_name: Option<String>,
    pub content_name: Option<String>,
    pub persona: Option<String>,
    pub tier: String,
    pub tier_label: Option<&'static str>,
    pub status: String,
    pub status_label: &'static str,
    pub signal_type: Option<String>,
    pub signal_type_label: Option<String>,
    pub total_score: Option<f64>,
    pub icp_fit_score: Option<f64>,
    pub intent_score: Option<f64>,
    pub date: Option<String>,
    pub classification: LeadClassification,
}

impl LeadRow {
    pub fn from_lead(lead: &Lead, rules: &QualificationRules) -> Self {
        Self {
            id: lead.id.clone(),
            email: lead.email.clone(),
            display_name: display_name(lead),
            personal_email: is_personal_email(&lead.email),
            company_name: lead.company_name.clone(),
            content_name: lead.content_name.clone(),
            persona: lead.detected_persona.clone(),
            tier: lead.signal_tier.clone(),
            tier_label: lead.tier().map(tier_label),
            status: lead.action_status.clone(),
            status_label: status_label(&lead.action_status),
            signal_type: lead.trigger_signal_type.clone(),
            signal_type_label: lead.signal_type_label.clone().or_else(|| {
                lead.trigger_signal_type
                    .as_deref()
                    .map(|t| signal_type_label(t).to_string())
            }),
            total_score: lead.total_score,
            icp_fit_score: lead.icp_fit_score,
            intent_score: lead.intent_score,
            date: lead.timestamp().map(str::to_string),
            classification: classify_with(lead, rules),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadsPage {
    /// Leads returned upstream before local filtering.
    pub fetched: usize,
    pub matching: usize,
    pub sort: SortState,
    pub rows: Section<LeadRow>,
    pub funnel: FunnelStats,
}

impl LeadsPage {
    /// Filters, sorts and classifies `leads`.
    ///
    /// The funnel covers every fetched lead, narrowed to `funnel_content` when set.
    pub fn build(
        leads: &[Lead],
        filter: &LeadFilter,
        sort: SortState,
        funnel_content: Option<&str>,
        rules: &QualificationRules,
    ) -> Self {
        let mut matching = filter.apply(leads, rules);
        sort.sort(&mut matching);

        let rows: Vec<LeadRow> = matching.iter().map(|l| LeadRow::from_lead(l, rules)).collect();

        Self {
            fetched: leads.len(),
            matching: rows.len(),
            sort,
            rows: Section::new(rows, NO_LEADS),
            funnel: FunnelStats::compute(leads, funnel_content, rules),
        }
    }
}

pub async fn load_leads(
    client: &GatedContentClient,
    query: &LeadsQuery,
    filter: &LeadFilter,
    sort: SortState,
    funnel_content: Option<&str>,
    rules: &QualificationRules,
) -> Result<LeadsPage, AppError> {
    let leads = client.leads(query).await?;
    Ok(LeadsPage::build(&leads, filter, sort, funnel_content, rules))
}

pub async fn load_funnel(
    client: &GatedContentClient,
    query: &LeadsQuery,
    content: Option<&str>,
    rules: &QualificationRules,
) -> Result<FunnelStats, AppError> {
    let leads = client.leads(query).await?;
    Ok(FunnelStats::compute(&leads, content, rules))
}

// ============ Lead detail ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreView {
    pub value: Option<f64>,
    pub ceiling: f64,
    pub band: ScoreBand,
}

impl ScoreView {
    fn new(value: Option<f64>, ceiling: f64) -> Self {
        Self {
            value,
            ceiling,
            band: score_band(value.unwrap_or(0.0), ceiling),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub total: ScoreView,
    pub icp_fit: ScoreView,
    pub intent: ScoreView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionView {
    pub reason: String,
    pub group: RejectionGroup,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechCategory {
    pub category: String,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueDriverView {
    pub driver: String,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchView {
    pub overview: Option<String>,
    pub transformation_signals: Vec<String>,
    pub why_now_signals: Vec<String>,
    pub tech_stack: Vec<TechCategory>,
    pub finance_leaders: Vec<FinanceLeader>,
    pub recent_news: Vec<NewsItem>,
    pub value_driver: Option<ValueDriverView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadDetail {
    #[serde(flatten)]
    pub row: LeadRow,
    pub role: String,
    pub company_domain: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<String>,
    pub scores: ScoreSummary,
    pub rejection: Option<RejectionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_message: Option<&'static str>,
    pub talking_points: Vec<String>,
    pub signal_history: Vec<SignalHistoryEntry>,
}

fn humanize(raw: &str) -> String {
    raw.replace('_', " ")
}

fn research_view(lead: &Lead) -> Option<ResearchView> {
    let research = lead.ai_research.as_ref()?;
    let company = research.company.as_ref();

    let signals = |flags: Option<&crate::models::SignalFlags>| -> Vec<String> {
        flags
            .map(|f| f.active().into_iter().map(humanize).collect())
            .unwrap_or_default()
    };

    Some(ResearchView {
        overview: company.and_then(|c| c.overview.clone()),
        transformation_signals: signals(company.and_then(|c| c.transformation_signals.as_ref())),
        why_now_signals: signals(company.and_then(|c| c.why_now_signals.as_ref())),
        tech_stack: company
            .map(|c| {
                c.tech_stack_categorized
                    .iter()
                    .take(TECH_CATEGORIES)
                    .map(|(category, tools)| TechCategory {
                        category: humanize(category),
                        tools: tools.iter().take(TOOLS_PER_CATEGORY).cloned().collect(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        finance_leaders: research
            .finance_leaders_found
            .iter()
            .take(FINANCE_LEADERS)
            .cloned()
            .collect(),
        recent_news: company
            .map(|c| c.recent_news.iter().take(NEWS_ITEMS).cloned().collect())
            .unwrap_or_default(),
        value_driver: research.recommended_value_driver.as_ref().and_then(|v| {
            v.driver.as_deref().map(|driver| ValueDriverView {
                driver: humanize(driver),
                reasoning: v.reasoning.clone(),
            })
        }),
    })
}

impl LeadDetail {
    pub fn build(lead: &Lead, rules: &QualificationRules) -> Self {
        let research = research_view(lead);
        let context = lead.context_for_outreach.as_ref();

        Self {
            row: LeadRow::from_lead(lead, rules),
            role: lead
                .title
                .clone()
                .or_else(|| lead.detected_persona.clone())
                .unwrap_or_else(|| "Unknown Role".to_string()),
            company_domain: lead.company_domain.clone(),
            industry: lead.industry.clone(),
            employee_count: lead.employee_count.clone(),
            scores: ScoreSummary {
                total: ScoreView::new(lead.total_score, TOTAL_SCORE_CEILING),
                icp_fit: ScoreView::new(lead.icp_fit_score, ICP_SCORE_CEILING),
                intent: ScoreView::new(lead.intent_score, INTENT_SCORE_CEILING),
            },
            rejection: lead
                .rejection_reason
                .as_deref()
                .filter(|r| !r.trim().is_empty())
                .map(|reason| {
                    let group = rejection_group(reason);
                    RejectionView {
                        reason: reason.to_string(),
                        group,
                        label: group.label(),
                    }
                }),
            research_message: research.is_none().then_some(NO_RESEARCH),
            research,
            talking_points: context.map(|c| c.talking_points.clone()).unwrap_or_default(),
            signal_history: lead.signal_history().to_vec(),
        }
    }
}

/// Fetches the lead list and returns the detail view for `id`.
///
/// The edge function has no single-lead action, so the lead is looked up in the
/// most recent `limit` leads.
pub async fn load_lead_detail(
    client: &GatedContentClient,
    id: &str,
    limit: u32,
    rules: &QualificationRules,
) -> Result<LeadDetail, AppError> {
    let leads = client.leads(&LeadsQuery::with_limit(limit)).await?;
    leads
        .iter()
        .find(|l| l.id == id)
        .map(|lead| LeadDetail::build(lead, rules))
        .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
}

/// Known signal types for the signal-type picker.
pub fn signal_type_options() -> Vec<LabeledValue> {
    SIGNAL_TYPE_LABELS
        .iter()
        .map(|(value, label)| LabeledValue {
            value: value.to_string(),
            label: label.to_string(),
        })
        .collect()
}
