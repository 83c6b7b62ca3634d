use chrono::{DateTime, Days, Months, SubsecRound, Utc};

use crate::core::{Recurrence, Reminder};

/// The occurrence after `from`, or `None` for one-off reminders.
///
/// Month and year steps land on the last day of the target month when the
/// day does not exist there (Jan 31 + 1 month = Feb 28/29).
pub fn advance(from: DateTime<Utc>, recurrence: Recurrence) -> Option<DateTime<Utc>> {
    match recurrence {
        Recurrence::Once => None,
        Recurrence::Daily => from.checked_add_days(Days::new(1)),
        Recurrence::Weekly => from.checked_add_days(Days::new(7)),
        Recurrence::Monthly => from.checked_add_months(Months::new(1)),
        Recurrence::Yearly => from.checked_add_months(Months::new(12)),
    }
}

/// Mark `reminder` done at `now`.
///
/// One-off reminders are closed. Recurring ones stay open and move to their
/// next occurrence, counted from `now` when `reoccur_from_completion` is set
/// and from the previous due date otherwise.
pub fn complete(reminder: &mut Reminder, now: DateTime<Utc>) {
    let base = if reminder.reoccur_from_completion {
        now.trunc_subsecs(0)
    } else {
        reminder.date
    };
    match advance(base, reminder.recurrence) {
        Some(next) => {
            reminder.date = next;
            reminder.completed = false;
        }
        None => reminder.completed = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn reminder(recurrence: Recurrence, from_completion: bool) -> Reminder {
        Reminder {
            id: 1,
            contact_id: 1,
            message: "Call".to_string(),
            date: at(2026, 1, 31),
            by_mail: false,
            recurrence,
            reoccur_from_completion: from_completion,
            completed: false,
            last_sent: None,
        }
    }

    #[test]
    fn test_advance_steps() {
        let from = at(2026, 1, 31);
        assert_eq!(advance(from, Recurrence::Once), None);
        assert_eq!(advance(from, Recurrence::Daily), Some(at(2026, 2, 1)));
        assert_eq!(advance(from, Recurrence::Weekly), Some(at(2026, 2, 7)));
        assert_eq!(advance(from, Recurrence::Monthly), Some(at(2026, 2, 28)));
        assert_eq!(advance(at(2024, 2, 29), Recurrence::Yearly), Some(at(2025, 2, 28)));
    }

    #[test]
    fn test_complete_once_closes() {
        let mut r = reminder(Recurrence::Once, false);
        complete(&mut r, at(2026, 2, 3));
        assert!(r.completed);
        assert_eq!(r.date, at(2026, 1, 31));
    }

    #[test]
    fn test_complete_from_due_date() {
        let mut r = reminder(Recurrence::Weekly, false);
        complete(&mut r, at(2026, 2, 3));
        assert!(!r.completed);
        assert_eq!(r.date, at(2026, 2, 7));
    }

    #[test]
    fn test_complete_from_completion_time() {
        let mut r = reminder(Recurrence::Weekly, true);
        complete(&mut r, at(2026, 2, 3));
        assert!(!r.completed);
        assert_eq!(r.date, at(2026, 2, 10));
    }

    #[test]
    fn test_complete_from_completion_drops_subseconds() {
        let mut r = reminder(Recurrence::Daily, true);
        let now = at(2026, 2, 3) + chrono::Duration::milliseconds(420);
        complete(&mut r, now);
        assert_eq!(r.date, at(2026, 2, 4));
    }
}
