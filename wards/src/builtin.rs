//! Rules shipped with the product: 39 events in six categories.

use crate::catalog::{Catalog, CatalogEntry, CatalogError};
use crate::descriptions::{Category, DescriptionRegistry, EventDescription};
use crate::fields::{FieldDefinition, FieldError, FieldKind, FieldSchemaRegistry, OptionValue, SelectOption};
use crate::path::{PathError, PolicyPath};
use crate::resolve::LegacyAlias;

const FINANCIAL_HEALTH: &str = "financial_health";
const CAPACITY_OPTIMIZATION: &str = "capacity_optimization";
const CUSTOMER_RETENTION: &str = "customer_retention";
const GROWTH_MARKETING: &str = "growth_marketing";
const SAFETY_COMPLIANCE: &str = "safety_compliance";
const WORKFORCE_OPS: &str = "workforce_ops";

/// Rules listed as upcoming; they stay disabled at provisioning.
pub const PLANNED_EVENTS: [&str; 6] = [
    "inquiry_conversion_drop",
    "birthday_greeting",
    "enrollment_anniversary",
    "announcement_urgent",
    "announcement_digest",
    "staff_absence_schedule_risk",
];

/// (event, category, title, description), in catalog order.
const EVENTS: [(&str, &str, &str, &str); 39] = [
    ("payment_due_reminder", FINANCIAL_HEALTH, "Payment due reminder",
     "Reminds guardians 3 days and 1 day before a payment is due."),
    ("invoice_partial_balance", FINANCIAL_HEALTH, "Partial payment notice",
     "Notifies guardians when a partial payment leaves a balance."),
    ("recurring_payment_failed", FINANCIAL_HEALTH, "Recurring payment failed",
     "Notifies guardians when a recurring charge fails."),
    ("revenue_target_under", FINANCIAL_HEALTH, "Revenue below target",
     "Alerts administrators when revenue trails the monthly target."),
    ("collection_rate_drop", FINANCIAL_HEALTH, "Collection rate drop",
     "Alerts administrators when the collection rate falls."),
    ("overdue_outstanding_over_limit", FINANCIAL_HEALTH, "Overdue balance over limit",
     "Alerts administrators when outstanding overdue amounts exceed a limit."),
    ("revenue_required_per_day", FINANCIAL_HEALTH, "Required daily revenue",
     "Reports the daily revenue needed to reach the monthly target."),
    ("top_overdue_customers_digest", FINANCIAL_HEALTH, "Top overdue customers",
     "Summarizes the customers with the largest overdue balances."),
    ("refund_spike", FINANCIAL_HEALTH, "Refund spike",
     "Alerts administrators when refunds increase sharply."),
    ("monthly_business_report", FINANCIAL_HEALTH, "Monthly business report",
     "Builds the monthly business report for administrators."),
    ("class_fill_rate_low_persistent", CAPACITY_OPTIMIZATION, "Persistently low class fill rate",
     "Alerts administrators when a class stays under-filled."),
    ("ai_suggest_class_merge", CAPACITY_OPTIMIZATION, "Class merge suggestion",
     "Detects under-filled classes and suggests merging them."),
    ("time_slot_fill_rate_low", CAPACITY_OPTIMIZATION, "Low time slot fill rate",
     "Alerts administrators when a time slot is under-filled."),
    ("high_fill_rate_expand_candidate", CAPACITY_OPTIMIZATION, "Expansion candidates",
     "Recommends classes with a high fill rate for expansion."),
    ("unused_class_persistent", CAPACITY_OPTIMIZATION, "Persistently unused class",
     "Alerts administrators about classes that stay unused."),
    ("weekly_ops_summary", CAPACITY_OPTIMIZATION, "Weekly operations summary",
     "Builds the weekly operations summary for administrators."),
    ("class_reminder_today", CUSTOMER_RETENTION, "Class reminder today",
     "Reminds guardians before today's class starts."),
    ("class_schedule_tomorrow", CUSTOMER_RETENTION, "Tomorrow's schedule",
     "Sends tomorrow's class schedule to guardians every evening."),
    ("consultation_reminder", CUSTOMER_RETENTION, "Consultation reminder",
     "Reminds guardians 24 hours and 2 hours before a consultation."),
    ("absence_first_day", CUSTOMER_RETENTION, "First absence",
     "Notifies guardians immediately on a student's first absence."),
    ("churn_increase", CUSTOMER_RETENTION, "Churn increase",
     "Alerts administrators when churn rises."),
    ("ai_suggest_churn_focus", CUSTOMER_RETENTION, "Churn focus suggestion",
     "Flags students at high risk of leaving for focused care."),
    ("attendance_rate_drop_weekly", CUSTOMER_RETENTION, "Weekly attendance drop",
     "Alerts administrators when weekly attendance falls."),
    ("risk_students_weekly_kpi", CUSTOMER_RETENTION, "At-risk students weekly KPI",
     "Summarizes weekly indicators for at-risk students."),
    ("new_member_drop", GROWTH_MARKETING, "New member drop",
     "Alerts administrators when new enrollments decline."),
    ("inquiry_conversion_drop", GROWTH_MARKETING, "Inquiry conversion drop",
     "Alerts administrators when inquiry conversion falls."),
    ("birthday_greeting", GROWTH_MARKETING, "Birthday greeting",
     "Sends a greeting on a student's birthday."),
    ("enrollment_anniversary", GROWTH_MARKETING, "Enrollment anniversary",
     "Sends a message on a student's enrollment anniversary."),
    ("regional_underperformance", GROWTH_MARKETING, "Regional underperformance",
     "Alerts administrators when results trail the region."),
    ("regional_rank_drop", GROWTH_MARKETING, "Regional rank drop",
     "Alerts administrators when the regional rank drops."),
    ("class_change_or_cancel", SAFETY_COMPLIANCE, "Class change or cancellation",
     "Notifies guardians immediately when a class changes or is cancelled."),
    ("checkin_reminder", SAFETY_COMPLIANCE, "Check-in reminder",
     "Reminds students to check in before class."),
    ("checkout_missing_alert", SAFETY_COMPLIANCE, "Missing check-out",
     "Notifies guardians when a check-out is missing after class."),
    ("announcement_urgent", SAFETY_COMPLIANCE, "Urgent announcement",
     "Notifies guardians immediately of an urgent announcement."),
    ("announcement_digest", SAFETY_COMPLIANCE, "Announcement digest",
     "Sends guardians a weekly or monthly digest of announcements."),
    ("consultation_summary_ready", SAFETY_COMPLIANCE, "Consultation summary ready",
     "Notifies guardians when a consultation summary is available."),
    ("attendance_pattern_anomaly", SAFETY_COMPLIANCE, "Attendance pattern anomaly",
     "Notifies guardians when a student's attendance pattern looks unusual."),
    ("teacher_workload_imbalance", WORKFORCE_OPS, "Teacher workload imbalance",
     "Alerts administrators when workload is uneven across teachers."),
    ("staff_absence_schedule_risk", WORKFORCE_OPS, "Staff absence schedule risk",
     "Alerts administrators when staff absences put the schedule at risk."),
];

pub fn catalog() -> Result<Catalog, CatalogError> {
    Catalog::new(EVENTS.iter().map(|&(event, ..)| {
        if PLANNED_EVENTS.contains(&event) {
            CatalogEntry::planned(event)
        } else {
            CatalogEntry::active(event)
        }
    }))
}

pub fn descriptions() -> DescriptionRegistry {
    let categories = [
        (FINANCIAL_HEALTH, "Financial health", "Cash flow, collections and revenue KPIs"),
        (CAPACITY_OPTIMIZATION, "Capacity optimization", "Class capacity, timetable and class operations"),
        (CUSTOMER_RETENTION, "Customer retention", "Attendance, churn prevention and risk care"),
        (GROWTH_MARKETING, "Growth marketing", "Acquisition, conversion and regional benchmarks"),
        (SAFETY_COMPLIANCE, "Safety and compliance", "Safety, announcements, consent and dispute risk"),
        (WORKFORCE_OPS, "Workforce operations", "Teacher and staff workload, absences and cover"),
    ];
    let mut registry = DescriptionRegistry::new(
        categories
            .iter()
            .zip(1..)
            .map(|(&(id, title, description), order)| Category {
                id: id.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                order,
            })
            .collect(),
    );
    for &(event, category, title, description) in &EVENTS {
        registry.insert(event, EventDescription::new(title, description, category));
    }
    registry
}

pub fn field_schemas() -> Result<FieldSchemaRegistry, FieldError> {
    let mut registry = FieldSchemaRegistry::new();

    // financial_health
    let e = "payment_due_reminder";
    registry.insert(e, vec![
        channel(e)?,
        at_least(e, "days_before_first", "First reminder (days before)", 1.0, 3.0)?,
        at_least(e, "days_before_second", "Second reminder (days before)", 1.0, 1.0)?,
    ]);
    for e in ["invoice_partial_balance", "recurring_payment_failed"] {
        registry.insert(e, vec![channel(e)?]);
    }
    let e = "revenue_target_under";
    registry.insert(e, vec![at_least(e, "monthly_target", "Monthly revenue target", 0.0, 10_000_000.0)?]);
    let e = "collection_rate_drop";
    registry.insert(e, vec![at_least(e, "threshold", "Collection rate threshold (%)", 0.0, 90.0)?]);
    let e = "overdue_outstanding_over_limit";
    registry.insert(e, vec![
        channel(e)?,
        at_least(e, "limit_amount", "Overdue amount limit", 0.0, 500_000.0)?,
    ]);
    let e = "revenue_required_per_day";
    registry.insert(e, vec![at_least(e, "monthly_target", "Monthly revenue target", 0.0, 10_000_000.0)?]);
    registry.insert("top_overdue_customers_digest", Vec::new());
    let e = "refund_spike";
    registry.insert(e, vec![at_least(e, "threshold", "Refund spike factor", 1.0, 2.0)?]);
    let e = "monthly_business_report";
    registry.insert(e, vec![between(e, "report_day", "Report day of month", 1.0, 28.0, 1.0)?]);

    // capacity_optimization
    let e = "class_fill_rate_low_persistent";
    registry.insert(e, vec![
        between(e, "threshold", "Fill rate threshold (%)", 0.0, 100.0, 50.0)?,
        at_least(e, "persistent_days", "Persistence (days)", 1.0, 7.0)?,
    ]);
    registry.insert("ai_suggest_class_merge", Vec::new());
    let e = "time_slot_fill_rate_low";
    registry.insert(e, vec![between(e, "threshold", "Fill rate threshold (%)", 0.0, 100.0, 30.0)?]);
    let e = "high_fill_rate_expand_candidate";
    registry.insert(e, vec![between(e, "threshold", "Fill rate threshold (%)", 0.0, 100.0, 90.0)?]);
    let e = "unused_class_persistent";
    registry.insert(e, vec![at_least(e, "persistent_days", "Unused for (days)", 1.0, 30.0)?]);
    let e = "weekly_ops_summary";
    let weekdays = ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"]
        .iter()
        .zip(0..)
        .map(|(label, day)| SelectOption::new(OptionValue::Integer(day), label))
        .collect();
    registry.insert(e, vec![FieldDefinition::new(
        e,
        "report_day_of_week",
        "Report day of week",
        FieldKind::select(weekdays, Some(OptionValue::Integer(1)))?,
    )?]);

    // customer_retention
    let e = "class_reminder_today";
    registry.insert(e, vec![
        channel(e)?,
        at_least(e, "minutes_before", "Minutes before class", 1.0, 30.0)?,
    ]);
    let e = "class_schedule_tomorrow";
    registry.insert(e, vec![
        channel(e)?,
        FieldDefinition::new(e, "notification_time", "Send at (HH:MM)", FieldKind::text(Some("20:00")))?,
    ]);
    let e = "consultation_reminder";
    registry.insert(e, vec![
        channel(e)?,
        at_least(e, "hours_before_first", "First reminder (hours before)", 1.0, 24.0)?,
        at_least(e, "hours_before_second", "Second reminder (hours before)", 1.0, 2.0)?,
    ]);
    registry.insert("absence_first_day", vec![channel("absence_first_day")?]);
    let e = "churn_increase";
    registry.insert(e, vec![at_least(e, "threshold", "Churn increase threshold", 1.0, 2.0)?]);
    registry.insert("ai_suggest_churn_focus", Vec::new());
    let e = "attendance_rate_drop_weekly";
    registry.insert(e, vec![at_least(e, "threshold", "Attendance drop threshold (%)", 0.0, 10.0)?]);
    registry.insert("risk_students_weekly_kpi", Vec::new());

    // growth_marketing
    let e = "new_member_drop";
    registry.insert(e, vec![between(e, "threshold", "New member drop threshold (%)", 0.0, 100.0, 20.0)?]);
    let e = "inquiry_conversion_drop";
    registry.insert(e, vec![at_least(e, "threshold", "Conversion drop threshold (%)", 0.0, 10.0)?]);
    for e in ["birthday_greeting", "enrollment_anniversary"] {
        registry.insert(e, vec![channel(e)?, approval(e, true)?]);
    }
    let e = "regional_underperformance";
    registry.insert(e, vec![at_least(e, "threshold", "Underperformance threshold (%)", 0.0, 20.0)?]);
    let e = "regional_rank_drop";
    registry.insert(e, vec![at_least(e, "threshold", "Rank drop threshold", 1.0, 5.0)?]);

    // safety_compliance
    registry.insert("class_change_or_cancel", vec![channel("class_change_or_cancel")?]);
    let e = "checkin_reminder";
    registry.insert(e, vec![
        channel(e)?,
        at_least(e, "minutes_before", "Minutes before class", 1.0, 15.0)?,
    ]);
    let e = "checkout_missing_alert";
    registry.insert(e, vec![
        channel(e)?,
        at_least(e, "grace_period_minutes", "Grace period (minutes)", 0.0, 10.0)?,
    ]);
    let e = "announcement_urgent";
    registry.insert(e, vec![channel(e)?, approval(e, false)?]);
    let e = "announcement_digest";
    registry.insert(e, vec![
        channel(e)?,
        approval(e, true)?,
        FieldDefinition::new(
            e,
            "digest_period",
            "Digest period",
            FieldKind::select(
                vec![
                    SelectOption::new(OptionValue::text("weekly"), "Weekly"),
                    SelectOption::new(OptionValue::text("monthly"), "Monthly"),
                ],
                Some(OptionValue::text("weekly")),
            )?,
        )?,
    ]);
    let e = "consultation_summary_ready";
    registry.insert(e, vec![
        at_least(e, "min_length", "Minimum summary length", 1.0, 50.0)?,
        channel(e)?,
        approval(e, true)?,
    ]);
    let e = "attendance_pattern_anomaly";
    registry.insert(e, vec![
        at_least(e, "threshold", "Anomaly threshold", 1.0, 3.0)?,
        between(e, "priority", "Priority", 0.0, 100.0, 50.0)?,
        at_least(e, "ttl_days", "Suggestion lifetime (days)", 1.0, 7.0)?,
        FieldDefinition::grouped(
            e,
            "throttle_daily_limit",
            "Daily send limit",
            "throttle.daily_limit",
            FieldKind::number(Some(1.0), None, Some(20.0))?,
        )?,
        FieldDefinition::grouped(
            e,
            "throttle_student_limit",
            "Per-student send limit",
            "throttle.student_limit",
            FieldKind::number(Some(1.0), None, Some(5.0))?,
        )?,
        channel(e)?,
        approval(e, true)?,
    ]);

    // workforce_ops
    let e = "teacher_workload_imbalance";
    registry.insert(e, vec![at_least(e, "threshold", "Imbalance threshold", 1.0, 5.0)?]);
    registry.insert("staff_absence_schedule_risk", Vec::new());

    Ok(registry)
}

/// Read-only aliases for documents written before the rules were renamed.
pub fn legacy_aliases() -> Result<Vec<LegacyAlias>, PathError> {
    Ok(vec![
        LegacyAlias::new(
            PolicyPath::enabled("consultation_summary_ready")?,
            PolicyPath::parse("auto_consultation_summary.enabled")?,
        ),
        LegacyAlias::new(
            PolicyPath::enabled("attendance_pattern_anomaly")?,
            PolicyPath::parse("auto_message_suggestion.enabled")?,
        ),
    ])
}

fn channel(event: &str) -> Result<FieldDefinition, FieldError> {
    FieldDefinition::new(
        event,
        "channel",
        "Notification channel",
        FieldKind::select(
            vec![
                SelectOption::new(OptionValue::text("sms"), "SMS"),
                SelectOption::new(OptionValue::text("kakao_at"), "Kakao AlimTalk"),
            ],
            Some(OptionValue::text("kakao_at")),
        )?,
    )
}

fn approval(event: &str, default: bool) -> Result<FieldDefinition, FieldError> {
    FieldDefinition::new(
        event,
        "require_approval",
        "Require approval before sending",
        FieldKind::boolean(Some(default)),
    )
}

fn at_least(event: &str, field: &str, label: &str, min: f64, default: f64) -> Result<FieldDefinition, FieldError> {
    FieldDefinition::new(event, field, label, FieldKind::number(Some(min), None, Some(default))?)
}

fn between(
    event: &str,
    field: &str,
    label: &str,
    min: f64,
    max: f64,
    default: f64,
) -> Result<FieldDefinition, FieldError> {
    FieldDefinition::new(event, field, label, FieldKind::number(Some(min), Some(max), Some(default))?)
}
