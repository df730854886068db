//! Read-only reporting views over the collections.
//!
//! # Responsibility
//! - Derive dashboard, report and log figures from template/run slices.
//! - Keep every figure a pure function of its inputs.
//!
//! # Invariants
//! - Nothing in this module mutates collections or touches storage.
//! - All window math takes the reference instant `now` as an argument
//!   instead of reading the clock.

use crate::model::checklist::{
    ChecklistInstance, ChecklistTemplate, InstanceId, ItemId, ItemStatus, TemplateId,
};
use crate::model::notification::AppNotification;
use crate::model::user::{Role, User, UserId};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;

/// Title shown for runs whose template has been deleted.
pub const UNKNOWN_TEMPLATE_TITLE: &str = "Unknown template";

/// Time window a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportWindow {
    Last7Days,
    Last15Days,
    Last30Days,
    /// Explicit date range; either bound may be open.
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl ReportWindow {
    /// Returns whether `moment` falls inside the window relative to `now`.
    ///
    /// Relative windows reach back N days from `now` snapped to start of
    /// day. Custom bounds cover the start date from midnight and the end
    /// date through its whole day.
    pub fn contains(&self, moment: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Last7Days => relative_contains(7, moment, now),
            Self::Last15Days => relative_contains(15, moment, now),
            Self::Last30Days => relative_contains(30, moment, now),
            Self::Custom { start, end } => {
                if let Some(start) = start {
                    if moment < start.and_time(NaiveTime::MIN).and_utc() {
                        return false;
                    }
                }
                if let Some(end) = end {
                    let ceiling = match end.succ_opt() {
                        Some(next_day) => next_day.and_time(NaiveTime::MIN).and_utc(),
                        None => return true,
                    };
                    if moment >= ceiling {
                        return false;
                    }
                }
                true
            }
        }
    }
}

fn relative_contains(days: u64, moment: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match now.date_naive().checked_sub_days(Days::new(days)) {
        Some(floor_date) => moment >= floor_date.and_time(NaiveTime::MIN).and_utc(),
        None => true,
    }
}

/// Window plus optional template selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportFilter {
    pub window: ReportWindow,
    pub template_id: Option<TemplateId>,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            window: ReportWindow::Last30Days,
            template_id: None,
        }
    }
}

impl ReportFilter {
    fn matches(&self, instance: &ChecklistInstance, now: DateTime<Utc>) -> bool {
        if let Some(template_id) = self.template_id {
            if instance.template_id != template_id {
                return false;
            }
        }
        self.window.contains(instance.created_at, now)
    }
}

/// Headline figures for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub completed_checklists: usize,
    pub total_non_conformities: usize,
    pub conformity_rate: String,
}

/// Summarizes filtered *completed* runs: how many there were, how many
/// non-conforming items they carried, and the conformity rate.
pub fn dashboard_summary(
    instances: &[ChecklistInstance],
    filter: &ReportFilter,
    now: DateTime<Utc>,
) -> DashboardSummary {
    let mut completed_checklists = 0;
    let mut conforming = 0;
    let mut non_conforming = 0;

    for instance in instances {
        if !instance.completed || !filter.matches(instance, now) {
            continue;
        }
        completed_checklists += 1;
        for item in &instance.items {
            match item.status {
                ItemStatus::Conforming => conforming += 1,
                ItemStatus::NonConforming => non_conforming += 1,
                _ => {}
            }
        }
    }

    DashboardSummary {
        completed_checklists,
        total_non_conformities: non_conforming,
        conformity_rate: conformity_rate(conforming, non_conforming),
    }
}

/// One wedge of the item-status pie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSlice {
    pub status: ItemStatus,
    pub count: usize,
}

/// Counts item statuses across all filtered runs, completed or not.
///
/// Zero-count statuses are omitted; the remaining slices keep a fixed
/// order: conforming, non-conforming, not-applicable, pending.
pub fn status_distribution(
    instances: &[ChecklistInstance],
    filter: &ReportFilter,
    now: DateTime<Utc>,
) -> Vec<StatusSlice> {
    const ORDER: [ItemStatus; 4] = [
        ItemStatus::Conforming,
        ItemStatus::NonConforming,
        ItemStatus::NotApplicable,
        ItemStatus::Pending,
    ];
    let mut counts = [0usize; 4];

    for instance in instances {
        if !filter.matches(instance, now) {
            continue;
        }
        for item in &instance.items {
            let slot = match item.status {
                ItemStatus::Conforming => 0,
                ItemStatus::NonConforming => 1,
                ItemStatus::NotApplicable => 2,
                ItemStatus::Pending => 3,
            };
            counts[slot] += 1;
        }
    }

    ORDER
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| StatusSlice {
            status: *status,
            count,
        })
        .collect()
}

/// Non-conformity total of one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNonConformities {
    pub template_id: TemplateId,
    pub title: String,
    pub non_conformities: usize,
}

/// Non-conforming item totals per template over filtered completed runs.
///
/// Templates without any non-conformities are omitted.
pub fn non_conformities_by_template(
    templates: &[ChecklistTemplate],
    instances: &[ChecklistInstance],
    filter: &ReportFilter,
    now: DateTime<Utc>,
) -> Vec<TemplateNonConformities> {
    templates
        .iter()
        .filter(|template| filter.template_id.map_or(true, |id| id == template.id))
        .map(|template| {
            let non_conformities: usize = instances
                .iter()
                .filter(|instance| {
                    instance.template_id == template.id
                        && instance.completed
                        && filter.matches(instance, now)
                })
                .map(ChecklistInstance::non_conforming_count)
                .sum();

            TemplateNonConformities {
                template_id: template.id,
                title: template.title.clone(),
                non_conformities,
            }
        })
        .filter(|row| row.non_conformities > 0)
        .collect()
}

/// Per-template row of the management report table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateReport {
    pub template_id: TemplateId,
    pub title: String,
    pub total_executions: usize,
    pub total_non_conformities: usize,
    pub conformity_rate: String,
}

/// Per-template execution and conformity stats over filtered completed
/// runs. Every selected template gets a row, even with zero executions.
///
/// Rows are sorted by executions descending; ties keep template order.
pub fn template_performance(
    templates: &[ChecklistTemplate],
    instances: &[ChecklistInstance],
    filter: &ReportFilter,
    now: DateTime<Utc>,
) -> Vec<TemplateReport> {
    let mut rows: Vec<TemplateReport> = templates
        .iter()
        .filter(|template| filter.template_id.map_or(true, |id| id == template.id))
        .map(|template| {
            let mut total_executions = 0;
            let mut conforming = 0;
            let mut non_conforming = 0;

            for instance in instances {
                if instance.template_id != template.id
                    || !instance.completed
                    || !filter.matches(instance, now)
                {
                    continue;
                }
                total_executions += 1;
                for item in &instance.items {
                    match item.status {
                        ItemStatus::Conforming => conforming += 1,
                        ItemStatus::NonConforming => non_conforming += 1,
                        _ => {}
                    }
                }
            }

            TemplateReport {
                template_id: template.id,
                title: template.title.clone(),
                total_executions,
                total_non_conformities: non_conforming,
                conformity_rate: conformity_rate(conforming, non_conforming),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.total_executions.cmp(&a.total_executions));
    rows
}

/// One non-conforming item occurrence in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonConformityEntry {
    pub instance_id: InstanceId,
    pub template_title: String,
    pub date: DateTime<Utc>,
    pub item_id: ItemId,
    pub item_text: String,
}

/// Every non-conforming item of completed runs joined with its template
/// title, newest run first.
///
/// Runs whose template was deleted are skipped entirely; the log only
/// shows occurrences it can still attribute.
pub fn non_conformity_log(
    templates: &[ChecklistTemplate],
    instances: &[ChecklistInstance],
) -> Vec<NonConformityEntry> {
    let mut entries = Vec::new();

    for instance in instances {
        if !instance.completed {
            continue;
        }
        let template = match templates
            .iter()
            .find(|template| template.id == instance.template_id)
        {
            Some(template) => template,
            None => continue,
        };
        for item in &instance.items {
            if item.status != ItemStatus::NonConforming {
                continue;
            }
            entries.push(NonConformityEntry {
                instance_id: instance.id,
                template_title: template.title.clone(),
                date: instance.created_at,
                item_id: item.id,
                item_text: item.text.clone(),
            });
        }
    }

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

/// One completed run in the history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedEntry {
    pub instance_id: InstanceId,
    pub template_title: String,
    pub created_at: DateTime<Utc>,
    pub conforming: usize,
    pub non_conforming: usize,
}

/// Completed runs newest first with their template title.
///
/// Deleted templates fall back to [`UNKNOWN_TEMPLATE_TITLE`] so orphaned
/// history stays visible.
pub fn completed_overview(
    templates: &[ChecklistTemplate],
    instances: &[ChecklistInstance],
    template_filter: Option<TemplateId>,
) -> Vec<CompletedEntry> {
    let mut entries: Vec<CompletedEntry> = instances
        .iter()
        .filter(|instance| instance.completed)
        .filter(|instance| template_filter.map_or(true, |id| instance.template_id == id))
        .map(|instance| {
            let template_title = templates
                .iter()
                .find(|template| template.id == instance.template_id)
                .map_or(UNKNOWN_TEMPLATE_TITLE.to_string(), |template| {
                    template.title.clone()
                });
            let conforming = instance
                .items
                .iter()
                .filter(|item| item.status == ItemStatus::Conforming)
                .count();

            CompletedEntry {
                instance_id: instance.id,
                template_title,
                created_at: instance.created_at,
                conforming,
                non_conforming: instance.non_conforming_count(),
            }
        })
        .collect();

    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    entries
}

/// Conformity percentage with one decimal place.
///
/// Returns the literal `"0.0"` when there are no conforming or
/// non-conforming items at all.
pub fn conformity_rate(conforming: usize, non_conforming: usize) -> String {
    let denominator = conforming + non_conforming;
    if denominator == 0 {
        return "0.0".to_string();
    }
    format!("{:.1}", conforming as f64 * 100.0 / denominator as f64)
}

/// Active users per canonical role title.
///
/// The legacy operator label folds into `Operator`; unknown labels are
/// counted under their raw spelling.
pub fn role_counts(users: &[User]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for user in users {
        let key = match Role::canonical(&user.role) {
            Some(role) => role.title().to_string(),
            None => user.role.clone(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Number of unread notifications addressed to `user_id`.
pub fn unread_count(notifications: &[AppNotification], user_id: UserId) -> usize {
    notifications
        .iter()
        .filter(|notification| notification.user_id == user_id && !notification.read)
        .count()
}

/// Notifications addressed to `user_id`, newest first.
///
/// Filtering by a template hides notifications that carry no template
/// reference.
pub fn notifications_for(
    notifications: &[AppNotification],
    user_id: UserId,
    template_filter: Option<TemplateId>,
) -> Vec<&AppNotification> {
    let mut selected: Vec<&AppNotification> = notifications
        .iter()
        .filter(|notification| notification.user_id == user_id)
        .filter(|notification| {
            template_filter.map_or(true, |id| notification.template_id == Some(id))
        })
        .collect();

    selected.sort_by(|a, b| b.date.cmp(&a.date));
    selected
}
