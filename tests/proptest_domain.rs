//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that domain components maintain their
//! invariants across random histories, periods and clock times.

use chrono::{NaiveTime, Utc};
use proptest::prelude::*;

use wingo_signal_bot::domain::accuracy::{AccuracyState, BetResult};
use wingo_signal_bot::domain::arbiter::Arbiter;
use wingo_signal_bot::domain::draw::{DrawRecord, Period, SizeClass};
use wingo_signal_bot::domain::policy::TimeWindow;
use wingo_signal_bot::domain::posting::{Effect, PostingAutomaton};
use wingo_signal_bot::domain::prediction::{Source, Verdict};
use wingo_signal_bot::domain::strategy::Strategy as _;
use wingo_signal_bot::domain::strategy::{PatternFrequency, StreakRule};

fn size() -> impl Strategy<Value = SizeClass> {
    prop_oneof![Just(SizeClass::Big), Just(SizeClass::Small)]
}

fn minute_of_day() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

// ── Draw Properties ─────────────────────────────────────────

proptest! {
    /// Size is Big exactly for values 5..=9.
    #[test]
    fn size_class_splits_at_five(value in 0i64..=9) {
        let draw = DrawRecord::new(Period::parse("1").unwrap(), value, Utc::now()).unwrap();
        let expected = if value >= 5 { SizeClass::Big } else { SizeClass::Small };
        prop_assert_eq!(draw.size, expected);
    }

    /// Values outside 0..=9 never become draws.
    #[test]
    fn out_of_range_values_rejected(value in prop_oneof![-1000i64..0, 10i64..1000]) {
        prop_assert!(DrawRecord::new(Period::parse("1").unwrap(), value, Utc::now()).is_err());
    }

    /// The next period is always strictly greater.
    #[test]
    fn next_period_is_greater(digits in "[0-9]{1,18}") {
        let period = Period::parse(&digits).unwrap();
        let next = period.next();
        prop_assert!(next > period, "{next} must follow {period}");
    }

    /// Numeric ordering matches integer ordering for equal-width periods.
    #[test]
    fn period_order_is_numeric(a in 0u64..10_000_000, b in 0u64..10_000_000) {
        let pa = Period::parse(&format!("2024{a:07}")).unwrap();
        let pb = Period::parse(&format!("2024{b:07}")).unwrap();
        prop_assert_eq!(pa.cmp(&pb), a.cmp(&b));
    }
}

// ── Window Properties ───────────────────────────────────────

proptest! {
    /// A window always contains both of its ends.
    #[test]
    fn window_contains_its_ends(start in minute_of_day(), end in minute_of_day()) {
        let window = TimeWindow::new(start, end);
        prop_assert!(window.contains(start));
        prop_assert!(window.contains(end));
    }

    /// A wrapping window is the complement of the open gap between its ends.
    #[test]
    fn wrapping_window_is_complement(
        start in minute_of_day(),
        end in minute_of_day(),
        t in minute_of_day(),
    ) {
        prop_assume!(end < start);
        let window = TimeWindow::new(start, end);
        let in_gap = end < t && t < start;
        prop_assert_eq!(window.contains(t), !in_gap);
    }

    /// Formatting then parsing gives the same window.
    #[test]
    fn window_display_parses_back(start in minute_of_day(), end in minute_of_day()) {
        let window = TimeWindow::new(start, end);
        prop_assert_eq!(TimeWindow::parse(&window.to_string()).unwrap(), window);
    }
}

// ── Strategy Properties ─────────────────────────────────────

proptest! {
    /// Streak rules only speak with a long enough history and a fixed confidence.
    #[test]
    fn streak_rule_confidence_is_tabled(history in prop::collection::vec(size(), 0..40)) {
        let p = StreakRule::default().evaluate(&history);
        if history.len() < 5 {
            prop_assert!(!p.is_opinion());
        }
        if p.is_opinion() {
            prop_assert!([70.0, 75.0, 85.0].contains(&p.confidence()));
        }
    }

    /// Pattern confidence is a strict majority share.
    #[test]
    fn pattern_confidence_is_majority(history in prop::collection::vec(size(), 0..200)) {
        let p = PatternFrequency::default().evaluate(&history);
        if p.is_opinion() {
            prop_assert!(p.confidence() > 50.0 && p.confidence() <= 100.0);
        } else {
            prop_assert_eq!(p.confidence(), 0.0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The arbiter always returns a verdict within [0, cap].
    #[test]
    fn arbiter_confidence_within_cap(
        history in prop::collection::vec(size(), 1..60),
        cap in 50.0f64..100.0,
    ) {
        let arbiter = Arbiter::default();
        let last = *history.last().unwrap();
        let verdict = arbiter.select(&history, last).verdict;
        prop_assert!((0.0..=99.0).contains(&verdict.confidence));

        let capped = Arbiter::new(51.0, cap).select(&history, last).verdict;
        prop_assert!(capped.confidence <= cap);
        prop_assert_eq!(capped.source, Source::BlindTrend);
        prop_assert_eq!(capped.pick, last);
    }
}

// ── Accuracy Properties ─────────────────────────────────────

proptest! {
    /// Wins never exceed bets and the recent window stays at ten.
    #[test]
    fn accuracy_counters_consistent(
        rounds in prop::collection::vec((size(), prop::option::of(size())), 0..100),
    ) {
        let mut state = AccuracyState::new();
        let mut scored = 0u64;
        for (real, predicted) in rounds {
            if let Some(result) = state.record(real, predicted) {
                scored += 1;
                prop_assert_eq!(result == BetResult::Win, Some(real) == predicted);
            }
        }
        prop_assert_eq!(state.total_bets, scored);
        prop_assert!(state.wins <= state.total_bets);
        prop_assert!(state.recent().count() <= 10);
        prop_assert!((0.0..=100.0).contains(&state.win_rate()));
    }
}

// ── Posting Automaton Properties ────────────────────────────

proptest! {
    /// The loss counter never passes the limit and suspension is sticky.
    #[test]
    fn automaton_suspends_at_limit(
        rounds in prop::collection::vec((0i64..=9, size(), any::<bool>()), 1..80),
        limit in 1u32..6,
    ) {
        let mut automaton = PostingAutomaton::new(limit);
        let mut period = Period::parse("20240101100010000").unwrap();
        let mut suspended = false;

        for (value, pick, should_post) in rounds {
            period = period.next();
            let draw = DrawRecord::new(period.clone(), value, Utc::now()).unwrap();
            let verdict = Verdict { pick, confidence: 60.0, source: Source::BlindTrend };
            let effects = automaton.on_round_resolved(&draw, &verdict, should_post);

            prop_assert!(automaton.consecutive_losses() <= limit);
            let bad_series = effects.iter().any(|e| matches!(e, Effect::BadSeries { .. }));
            prop_assert!(!(suspended && bad_series), "bad series announced twice");
            if suspended {
                prop_assert!(effects.is_empty());
            }
            suspended = automaton.is_suspended();
        }
    }
}
