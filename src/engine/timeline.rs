use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::{FincoreError, Result};
use crate::schedule::{Amortization, EventKind, ExtraordinaryEvent};

/// one entry of the merged schedule/event timeline
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TimelineEntry {
    pub date: NaiveDate,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EntryKind {
    Scheduled { ratio: Decimal, amortizes_interest: bool },
    Prepayment { amount: Decimal },
    Settlement,
}

/// merge a validated schedule with the extraordinary events into a single
/// ordered timeline.
///
/// On a shared date the event precedes the scheduled amortization; several
/// events on one date keep caller order. An early settlement becomes the
/// terminal entry and every scheduled entry past it is discarded.
pub(crate) fn build(
    schedule: &[Amortization],
    events: &[ExtraordinaryEvent],
) -> Result<Vec<TimelineEntry>> {
    let anchor = schedule[0].date;
    let last = schedule[schedule.len() - 1].date;

    for (i, event) in events.iter().enumerate() {
        if event.date <= anchor || event.date > last {
            return Err(FincoreError::InvalidSchedule {
                message: format!("event {} at {} falls outside the schedule ({} to {}]", i, event.date, anchor, last),
            });
        }

        if i > 0 && event.date < events[i - 1].date {
            return Err(FincoreError::InvalidSchedule {
                message: format!("event {} at {} precedes the previous event", i, event.date),
            });
        }

        if i > 0 && matches!(events[i - 1].kind, EventKind::EarlySettlement) {
            return Err(FincoreError::InvalidSchedule {
                message: format!("event {} follows an early settlement", i),
            });
        }

        if let EventKind::Prepayment { amount } = &event.kind {
            if amount.is_negative() || amount.is_zero() {
                return Err(FincoreError::InvalidAmount {
                    message: format!("prepayment at {} has non-positive amount {}", event.date, amount),
                });
            }
        }
    }

    let mut timeline = Vec::with_capacity(schedule.len() + events.len());
    let mut entries = schedule.iter();
    let mut pending = events.iter().peekable();

    // the anchor always leads
    let first = schedule[0].clone();
    timeline.push(scheduled_entry(&first));
    entries.next();

    for entry in entries {
        // events up to and including this date apply first
        while let Some(&event) = pending.peek() {
            if event.date > entry.date {
                break;
            }

            pending.next();

            match &event.kind {
                EventKind::Prepayment { amount } => timeline.push(TimelineEntry {
                    date: event.date,
                    kind: EntryKind::Prepayment { amount: amount.as_decimal() },
                }),
                EventKind::EarlySettlement => {
                    timeline.push(TimelineEntry {
                        date: event.date,
                        kind: EntryKind::Settlement,
                    });

                    return Ok(timeline);
                }
            }
        }

        timeline.push(scheduled_entry(entry));
    }

    Ok(timeline)
}

fn scheduled_entry(entry: &Amortization) -> TimelineEntry {
    TimelineEntry {
        date: entry.date,
        kind: EntryKind::Scheduled {
            ratio: entry.ratio,
            amortizes_interest: entry.amortizes_interest,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> Vec<Amortization> {
        vec![
            Amortization::anchor(date(2022, 3, 9)),
            Amortization::new(date(2022, 4, 11), dec!(0.5)),
            Amortization::new(date(2022, 5, 9), dec!(0.5)),
        ]
    }

    #[test]
    fn test_plain_schedule_passes_through() {
        let timeline = build(&schedule(), &[]).unwrap();

        assert_eq!(timeline.len(), 3);
        assert!(matches!(timeline[0].kind, EntryKind::Scheduled { .. }));
        assert_eq!(timeline[2].date, date(2022, 5, 9));
    }

    #[test]
    fn test_event_interleaves_by_date() {
        let events = vec![ExtraordinaryEvent::prepayment(date(2022, 4, 20), Money::from_major(100))];
        let timeline = build(&schedule(), &events).unwrap();

        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline[2].date, date(2022, 4, 20));
        assert!(matches!(timeline[2].kind, EntryKind::Prepayment { .. }));
    }

    #[test]
    fn test_event_precedes_scheduled_on_same_date() {
        let events = vec![ExtraordinaryEvent::prepayment(date(2022, 4, 11), Money::from_major(100))];
        let timeline = build(&schedule(), &events).unwrap();

        assert_eq!(timeline.len(), 4);
        assert!(matches!(timeline[1].kind, EntryKind::Prepayment { .. }));
        assert!(matches!(timeline[2].kind, EntryKind::Scheduled { .. }));
        assert_eq!(timeline[1].date, timeline[2].date);
    }

    #[test]
    fn test_same_date_events_keep_caller_order() {
        let events = vec![
            ExtraordinaryEvent::prepayment(date(2022, 4, 20), Money::from_major(100)),
            ExtraordinaryEvent::prepayment(date(2022, 4, 20), Money::from_major(50)),
        ];
        let timeline = build(&schedule(), &events).unwrap();

        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline[2].kind, EntryKind::Prepayment { amount: dec!(100) });
        assert_eq!(timeline[3].kind, EntryKind::Prepayment { amount: dec!(50) });
    }

    #[test]
    fn test_early_settlement_truncates() {
        let events = vec![ExtraordinaryEvent::early_settlement(date(2022, 4, 20))];
        let timeline = build(&schedule(), &events).unwrap();

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[2].date, date(2022, 4, 20));
        assert!(matches!(timeline[2].kind, EntryKind::Settlement));
    }

    #[test]
    fn test_event_outside_schedule_rejected() {
        let events = vec![ExtraordinaryEvent::prepayment(date(2022, 6, 1), Money::from_major(100))];
        assert!(build(&schedule(), &events).is_err());

        let events = vec![ExtraordinaryEvent::prepayment(date(2022, 3, 9), Money::from_major(100))];
        assert!(build(&schedule(), &events).is_err());
    }

    #[test]
    fn test_unordered_events_rejected() {
        let events = vec![
            ExtraordinaryEvent::prepayment(date(2022, 4, 20), Money::from_major(100)),
            ExtraordinaryEvent::prepayment(date(2022, 4, 12), Money::from_major(50)),
        ];

        assert!(build(&schedule(), &events).is_err());
    }

    #[test]
    fn test_event_after_settlement_rejected() {
        let events = vec![
            ExtraordinaryEvent::early_settlement(date(2022, 4, 12)),
            ExtraordinaryEvent::prepayment(date(2022, 4, 20), Money::from_major(50)),
        ];

        assert!(build(&schedule(), &events).is_err());
    }

    #[test]
    fn test_non_positive_prepayment_rejected() {
        let events = vec![ExtraordinaryEvent::prepayment(date(2022, 4, 20), Money::ZERO)];
        let err = build(&schedule(), &events).unwrap_err();

        assert!(matches!(err, FincoreError::InvalidAmount { .. }));
    }
}
