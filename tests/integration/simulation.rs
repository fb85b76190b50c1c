//! End-to-end polling simulation.
//!
//! Drives `TableMonitor` cycles against scripted feed windows and checks
//! the notifications, counters, and snapshots that come out the other end.

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::Duration;

    use serpent::alerts::{Notification, NotificationKind};
    use serpent::backtest::replay::Replayer;
    use serpent::engine::clock::FixedClock;
    use serpent::engine::monitor::{CycleOutcome, MonitorSettings, TableMonitor};
    use serpent::engine::spawn_monitors;
    use serpent::strategy::signal::Transition;
    use serpent::strategy::trend::TrendConfig;
    use serpent::types::{Outcome, PatternSet};

    use crate::mock_feed::{warm_up, window_after, windows_for, RecordingNotifier, ScriptedFeed, Step};

    const TABLE: &str = "Mega Roulette";

    fn fast_settings() -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_millis(1),
            empty_backoff: Duration::from_millis(1),
            error_backoff: Duration::from_millis(1),
            ..MonitorSettings::default()
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn monitor_with(
        table: &str,
        feed: &ScriptedFeed,
        notifier: &RecordingNotifier,
        clock: Arc<FixedClock>,
        settings: MonitorSettings,
    ) -> TableMonitor {
        TableMonitor::new(
            table,
            Arc::new(feed.clone()),
            Arc::new(notifier.clone()),
            clock,
            PatternSet::black_snake(),
            TrendConfig::default(),
            settings,
        )
    }

    fn monitor(table: &str, feed: &ScriptedFeed, notifier: &RecordingNotifier) -> TableMonitor {
        monitor_with(
            table,
            feed,
            notifier,
            Arc::new(FixedClock::new(day())),
            fast_settings(),
        )
    }

    fn values(outcomes: &[Outcome]) -> Vec<u8> {
        outcomes.iter().map(|o| o.value()).collect()
    }

    #[tokio::test]
    async fn test_entry_two_gales_then_loss() {
        let feed = ScriptedFeed::new();
        feed.push(TABLE, windows_for(&[9, 0, 3, 5]));
        let notifier = RecordingNotifier::new();
        let mut m = monitor(TABLE, &feed, &notifier);

        for _ in 0..4 {
            m.run_cycle().await.unwrap();
        }

        assert_eq!(
            notifier.kinds_for(TABLE),
            vec![
                NotificationKind::Entry,
                NotificationKind::Retry,
                NotificationKind::Retry,
                NotificationKind::Loss,
            ]
        );
        let sent = notifier.sent();
        assert!(matches!(sent[1].1, Notification::Retry { level: 1, .. }));
        assert!(matches!(sent[2].1, Notification::Retry { level: 2, .. }));
        match &sent[3].1 {
            Notification::Loss { recent } => assert_eq!(values(recent), vec![5, 3, 0]),
            other => panic!("expected loss, got {other:?}"),
        }

        let session = m.session().unwrap();
        let tally = session.machine().tally();
        assert_eq!(tally.entries, 1);
        assert_eq!(tally.losses, 1);
        assert_eq!(tally.resolved, 1);
        assert_eq!(m.subscribe().borrow().state, "IDLE");
        assert_eq!(feed.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_win_on_first_gale() {
        let feed = ScriptedFeed::new();
        feed.push(TABLE, windows_for(&[9, 0, 17]));
        let notifier = RecordingNotifier::new();
        let mut m = monitor(TABLE, &feed, &notifier);

        m.run_cycle().await.unwrap();
        m.run_cycle().await.unwrap();
        let last = m.run_cycle().await.unwrap();

        match last {
            CycleOutcome::Processed {
                transition: Some(Transition::Win { level, recent, .. }),
                ..
            } => {
                assert_eq!(level, 1);
                assert_eq!(values(&recent), vec![17, 0, 9]);
            }
            other => panic!("expected a win, got {other:?}"),
        }

        let tally = m.session().unwrap().machine().tally().clone();
        assert_eq!(tally.wins, 1);
        assert_eq!(tally.wins_by_retry, [0, 1, 0]);
        assert_eq!(tally.win_streak, 1);
    }

    #[tokio::test]
    async fn test_warming_then_entry() {
        let feed = ScriptedFeed::new();
        feed.push(TABLE, [Step::Window(vec![9, 1, 2, 9, 1, 2, 9, 1, 2, 9])]);
        feed.push(TABLE, [window_after(&[9])]);
        let notifier = RecordingNotifier::new();
        let mut m = monitor(TABLE, &feed, &notifier);

        assert_eq!(
            m.run_cycle().await.unwrap(),
            CycleOutcome::Warming { history_len: 10 }
        );
        assert!(notifier.sent().is_empty());

        let second = m.run_cycle().await.unwrap();
        assert!(matches!(
            second,
            CycleOutcome::Processed {
                transition: Some(Transition::Entry { .. }),
                ..
            }
        ));
        assert_eq!(m.subscribe().borrow().state, "ARMED");
        assert_eq!(m.subscribe().borrow().history_len, 61);
    }

    #[tokio::test]
    async fn test_unchanged_window_is_not_reprocessed() {
        let feed = ScriptedFeed::new();
        feed.push(TABLE, [window_after(&[9]), window_after(&[9])]);
        let notifier = RecordingNotifier::new();
        let mut m = monitor(TABLE, &feed, &notifier);

        m.run_cycle().await.unwrap();
        let second = m.run_cycle().await.unwrap();

        assert_eq!(
            second,
            CycleOutcome::Unchanged {
                outcome: Outcome::new(9).unwrap()
            }
        );
        assert_eq!(notifier.kinds_for(TABLE), vec![NotificationKind::Entry]);
        assert_eq!(m.session().unwrap().machine().state().label(), "ARMED");
    }

    #[tokio::test]
    async fn test_feed_error_then_recovery() {
        let feed = ScriptedFeed::new();
        feed.push(TABLE, [Step::Error("maintenance".into()), Step::Empty]);
        feed.push(TABLE, [window_after(&[9])]);
        let notifier = RecordingNotifier::new();
        let settings = MonitorSettings {
            error_backoff: Duration::from_secs(5),
            empty_backoff: Duration::from_secs(2),
            ..fast_settings()
        };
        let mut m = monitor_with(TABLE, &feed, &notifier, Arc::new(FixedClock::new(day())), settings);

        let failed = m.run_cycle().await;
        assert!(failed.is_err());
        assert_eq!(m.backoff_for(&failed), Duration::from_secs(5));

        let empty = m.run_cycle().await;
        assert_eq!(empty.as_ref().unwrap(), &CycleOutcome::Empty);
        assert_eq!(m.backoff_for(&empty), Duration::from_secs(2));

        let recovered = m.run_cycle().await;
        assert!(matches!(recovered, Ok(CycleOutcome::Processed { .. })));
        assert_eq!(m.backoff_for(&recovered), Duration::from_millis(1));
        assert_eq!(notifier.kinds_for(TABLE), vec![NotificationKind::Entry]);
    }

    #[tokio::test]
    async fn test_day_rollover_resets_counters() {
        let feed = ScriptedFeed::new();
        feed.push(TABLE, windows_for(&[9, 6]));
        feed.push(TABLE, [Step::Empty]);
        let notifier = RecordingNotifier::new();
        let clock = Arc::new(FixedClock::new(day()));
        let mut m = monitor_with(TABLE, &feed, &notifier, clock.clone(), fast_settings());

        m.run_cycle().await.unwrap();
        m.run_cycle().await.unwrap();
        assert_eq!(m.session().unwrap().machine().tally().wins, 1);

        clock.advance_days(1);
        assert_eq!(m.run_cycle().await.unwrap(), CycleOutcome::Empty);

        let session = m.session().unwrap();
        assert_eq!(session.day(), NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
        assert_eq!(session.machine().tally().wins, 0);
        assert_eq!(session.machine().tally().entries, 0);
        // History survives the reset.
        assert_eq!(session.history().size(), 62);
    }

    #[tokio::test]
    async fn test_trend_broadcast_precedes_entry() {
        let feed = ScriptedFeed::new();
        feed.push(TABLE, windows_for(&[9]));
        let notifier = RecordingNotifier::new();
        let settings = MonitorSettings {
            trend_broadcast_cycles: Some(10),
            ..fast_settings()
        };
        let mut m = monitor_with(TABLE, &feed, &notifier, Arc::new(FixedClock::new(day())), settings);

        m.run_cycle().await.unwrap();

        assert_eq!(
            notifier.kinds_for(TABLE),
            vec![NotificationKind::TrendUpdate, NotificationKind::Entry]
        );
        match &notifier.sent()[0].1 {
            Notification::TrendUpdate {
                trends, history_len, ..
            } => {
                assert_eq!(*history_len, 61);
                assert_eq!(trends[0].outcome.value(), 9);
            }
            other => panic!("expected trend update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tables_run_independently() {
        let feed = ScriptedFeed::new();
        feed.push("A", windows_for(&[9, 6]));
        feed.push("B", windows_for(&[1, 0, 3, 5]));
        let notifier = RecordingNotifier::new();

        let a = monitor("A", &feed, &notifier);
        let b = monitor("B", &feed, &notifier);
        let (rx_a, rx_b) = (a.subscribe(), b.subscribe());

        let handles = spawn_monitors(vec![a, b]);
        tokio::time::sleep(Duration::from_millis(300)).await;
        for h in &handles {
            h.abort();
        }

        assert_eq!(
            notifier.kinds_for("A"),
            vec![NotificationKind::Entry, NotificationKind::Win]
        );
        assert_eq!(
            notifier.kinds_for("B"),
            vec![
                NotificationKind::Entry,
                NotificationKind::Retry,
                NotificationKind::Retry,
                NotificationKind::Loss,
            ]
        );
        assert_eq!(rx_a.borrow().tally.wins, 1);
        assert_eq!(rx_a.borrow().tally.losses, 0);
        assert_eq!(rx_b.borrow().tally.wins, 0);
        assert_eq!(rx_b.borrow().tally.losses, 1);
    }

    #[tokio::test]
    async fn test_replay_agrees_with_live_cycles() {
        let tail = [9u8, 0, 3, 5];
        let feed = ScriptedFeed::new();
        feed.push(TABLE, windows_for(&tail));
        let notifier = RecordingNotifier::new();
        let mut m = monitor(TABLE, &feed, &notifier);
        for _ in 0..tail.len() {
            m.run_cycle().await.unwrap();
        }

        let mut spins = warm_up();
        spins.extend(tail);
        let spins: Vec<Outcome> = spins.into_iter().map(|v| Outcome::new(v).unwrap()).collect();
        let report = Replayer::new(PatternSet::black_snake(), TrendConfig::default(), 500, 61).run(&spins);

        assert_eq!(&report.tally, m.session().unwrap().machine().tally());
        assert_eq!(report.transitions.len(), notifier.sent().len());
    }
}
