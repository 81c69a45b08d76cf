use chrono::{DateTime, Utc};

use crate::store::models::CurationRule;
use crate::util::time::hours_between;

/// Whether `rule` is due at `now`.
///
/// A rule that never ran is always due. After a run, recurring rules wait for
/// their interval in whole elapsed hours; one-shot rules never run again.
#[must_use]
pub fn should_run(rule: &CurationRule, now: DateTime<Utc>) -> bool {
    let Some(last_run) = rule.last_run else {
        return true;
    };
    match rule.actions.schedule_interval.min_hours() {
        Some(min_hours) => hours_between(last_run, now) >= min_hours,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{CurationActions, CurationCriteria, ScheduleInterval};
    use chrono::Duration;
    use rstest::rstest;
    use uuid::Uuid;

    fn rule(interval: ScheduleInterval, last_run: Option<DateTime<Utc>>) -> CurationRule {
        let now = Utc::now();
        CurationRule {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "gated".into(),
            is_active: true,
            criteria: CurationCriteria::default(),
            actions: CurationActions {
                schedule_interval: interval,
                ..CurationActions::default()
            },
            last_run,
            run_count: 0,
            items_curated: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case(ScheduleInterval::Daily, 10, false)]
    #[case(ScheduleInterval::Daily, 25, true)]
    #[case(ScheduleInterval::Daily, 24, true)]
    #[case(ScheduleInterval::Weekly, 167, false)]
    #[case(ScheduleInterval::Weekly, 168, true)]
    #[case(ScheduleInterval::Monthly, 719, false)]
    #[case(ScheduleInterval::Monthly, 720, true)]
    #[case(ScheduleInterval::None, 10_000, false)]
    fn interval_boundaries(#[case] interval: ScheduleInterval, #[case] hours_ago: i64, #[case] expected: bool) {
        let now = Utc::now();
        let rule = rule(interval, Some(now - Duration::hours(hours_ago)));
        assert_eq!(should_run(&rule, now), expected);
    }

    #[rstest]
    #[case(ScheduleInterval::None)]
    #[case(ScheduleInterval::Daily)]
    #[case(ScheduleInterval::Monthly)]
    fn never_run_rules_are_due(#[case] interval: ScheduleInterval) {
        assert!(should_run(&rule(interval, None), Utc::now()));
    }
}
