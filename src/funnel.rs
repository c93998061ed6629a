use crate::classification::{is_mql_with, is_pre_mql_with, QualificationRules};
use crate::lead_filter::LeadPredicate;
use crate::models::{ActionStatus, Lead, SignalTier};
use serde::Serialize;

/// Lead → MQL funnel counts for one set of leads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunnelStats {
    pub total: usize,
    pub new: usize,
    /// `working` plus `researching`.
    pub working: usize,
    pub rejected: usize,
    pub pre_mql: usize,
    pub mql: usize,
    pub p0: usize,
    pub p1: usize,
    /// MQL share of total, one decimal.
    pub conversion_rate: f64,
    /// P0 + P1 share of total, whole percent.
    pub quality_rate: f64,
}

/// Percentage rounded to `decimals` places; zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize, decimals: i32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let factor = 10f64.powi(decimals);
    (part as f64 / whole as f64 * 100.0 * factor).round() / factor
}

impl FunnelStats {
    /// Computes the funnel, optionally restricted to one content asset.
    ///
    /// The content match is the same one the lead table uses.
    pub fn compute(
        leads: &[Lead],
        content_filter: Option<&str>,
        rules: &QualificationRules,
    ) -> Self {
        let predicate = content_filter.map(|name| LeadPredicate::Content(name.to_string()));
        let selected = leads.iter().filter(|lead| match &predicate {
            Some(p) => p.matches(lead, rules),
            None => true,
        });
        Self::from_leads(selected, rules)
    }

    pub fn from_leads<'a, I>(leads: I, rules: &QualificationRules) -> Self
    where
        I: IntoIterator<Item = &'a Lead>,
    {
        let mut stats = FunnelStats::default();

        for lead in leads {
            stats.total += 1;
            match lead.status() {
                Some(ActionStatus::New) => stats.new += 1,
                Some(ActionStatus::Working) | Some(ActionStatus::Researching) => stats.working += 1,
                Some(ActionStatus::Rejected) => stats.rejected += 1,
                Some(ActionStatus::Done) | None => {}
            }
            match lead.tier() {
                Some(SignalTier::P0) => stats.p0 += 1,
                Some(SignalTier::P1) => stats.p1 += 1,
                _ => {}
            }
            if is_pre_mql_with(lead, rules) {
                stats.pre_mql += 1;
                if is_mql_with(lead, rules) {
                    stats.mql += 1;
                }
            }
        }

        stats.conversion_rate = percentage(stats.mql, stats.total, 1);
        stats.quality_rate = percentage(stats.p0 + stats.p1, stats.total, 0);
        stats
    }
}
