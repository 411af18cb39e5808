use chrono::{Datelike, Days, NaiveDate, Weekday};
use gymbuddy_lib::stats::{
    build_series, daily_goal_progress, history, last_workout_before, month_heatmap,
    personal_records, summary_stats, week_range, week_stats, weekly_goal_progress,
};
use gymbuddy_lib::{
    CardioEntry, Catalogs, DailyLog, ExerciseEntry, GoalTarget, Goals, HeatLevel, LogStore,
    SetEntry, SummaryMode,
};
use serde_json::json;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn store(days: Vec<(NaiveDate, DailyLog)>) -> LogStore {
    days.into_iter().collect()
}

fn run(km: f64, time: f64) -> CardioEntry {
    CardioEntry {
        km: Some(km),
        kcal: None,
        time: Some(time),
    }
}

#[test]
fn test_week_range_is_monday_to_sunday_all_year() {
    let mut day = date(2023, 12, 20);
    let last = date(2025, 1, 10);
    while day <= last {
        let range = week_range(day);
        assert_eq!(range.start.weekday(), Weekday::Mon, "start for {day}");
        assert_eq!(range.end.weekday(), Weekday::Sun, "end for {day}");
        assert_eq!(range.end - range.start, chrono::Duration::days(6));
        assert!(range.contains(day));
        day = day.succ_opt().unwrap();
    }
}

#[test]
fn test_week_range_across_year_boundary() {
    let range = week_range(date(2025, 1, 1));
    assert_eq!(range.start, date(2024, 12, 30));
    assert_eq!(range.end, date(2025, 1, 5));
}

#[test]
fn test_week_stats_totals() {
    let logs = store(vec![
        (
            date(2024, 3, 4),
            DailyLog::default()
                .with_exercise("Pompki", ExerciseEntry::SetGroup { sets: 3.0, reps: 10.0 })
                .with_cardio("Bieganie", run(5.0, 30.0)),
        ),
        (
            date(2024, 3, 10),
            DailyLog::default()
                .with_exercise("Pompki", ExerciseEntry::LegacyTotal(12.0))
                .with_cardio("Bieganie", run(2.5, 15.0)),
        ),
        // next week
        (
            date(2024, 3, 11),
            DailyLog::default().with_exercise("Pompki", ExerciseEntry::LegacyTotal(100.0)),
        ),
    ]);
    let stats = week_stats(&logs, date(2024, 3, 6));
    assert_eq!(stats.exercises["Pompki"], 42.0);
    assert_eq!(stats.cardio["Bieganie"].km, 7.5);
    assert_eq!(stats.cardio["Bieganie"].time, 45.0);
    assert_eq!(stats.range.start, date(2024, 3, 4));
}

#[test]
fn test_day_summary_single_weight_has_no_diff() {
    let logs = store(vec![
        (date(2024, 3, 5), DailyLog::default().with_weight(80.0)),
        (date(2024, 3, 6), DailyLog::default().with_weight(79.0)),
    ]);
    let stats = summary_stats(&logs, date(2024, 3, 5), SummaryMode::Day);
    assert_eq!(stats.weight_diff, None);
    assert_eq!(stats.weight_diff_display(), None);
}

#[test]
fn test_week_summary_weight_diff() {
    let logs = store(vec![
        (date(2024, 3, 4), DailyLog::default().with_weight(70.0)),
        (
            date(2024, 3, 6),
            DailyLog::default()
                .with_exercise("Pompki", ExerciseEntry::LegacyTotal(20.0))
                .with_cardio(
                    "Rower",
                    CardioEntry {
                        km: Some(10.0),
                        kcal: Some(250.0),
                        time: Some(40.0),
                    },
                ),
        ),
        (date(2024, 3, 8), DailyLog::default().with_weight(72.0)),
    ]);
    let stats = summary_stats(&logs, date(2024, 3, 7), SummaryMode::Week);
    assert_eq!(stats.weight_diff, Some(2.0));
    assert_eq!(stats.weight_diff_display().as_deref(), Some("2.0"));
    assert_eq!(stats.total_reps, 20.0);
    assert_eq!(stats.total_kcal, 250.0);
    assert_eq!(stats.total_km, 10.0);
    assert_eq!(stats.total_time, 40.0);
    assert_eq!(stats.exercise_stats["Pompki"], 20.0);
}

#[test]
fn test_uncataloged_exercises_still_aggregate() {
    // "Martwy ciąg" was logged and later removed from the catalog
    let logs = store(vec![
        (
            date(2024, 3, 5),
            DailyLog::default()
                .with_exercise("Martwy ciąg", ExerciseEntry::SetGroup { sets: 5.0, reps: 5.0 })
                .with_exercise("Pompki", ExerciseEntry::LegacyTotal(10.0)),
        ),
        (
            date(2024, 3, 7),
            DailyLog::default().with_exercise("Martwy ciąg", ExerciseEntry::LegacyTotal(8.0)),
        ),
    ]);

    let week = week_stats(&logs, date(2024, 3, 6));
    assert_eq!(week.exercises["Martwy ciąg"], 33.0);

    let summary = summary_stats(&logs, date(2024, 3, 6), SummaryMode::Week);
    assert_eq!(summary.exercise_stats["Martwy ciąg"], 33.0);
    assert_eq!(summary.total_reps, 43.0);
}

#[test]
fn test_month_summary_rounds_weight_diff() {
    let logs = store(vec![
        (date(2024, 2, 1), DailyLog::default().with_weight(80.25)),
        (date(2024, 2, 29), DailyLog::default().with_weight(79.0)),
    ]);
    let stats = summary_stats(&logs, date(2024, 2, 10), SummaryMode::Month);
    assert_eq!(stats.range.end, date(2024, 2, 29));
    assert_eq!(stats.weight_diff_display().as_deref(), Some("-1.3"));
}

#[test]
fn test_build_series_covers_leap_day() {
    let logs = store(vec![(
        date(2024, 2, 29),
        DailyLog::default().with_exercise("Plank", ExerciseEntry::LegacyTotal(3.0)),
    )]);
    let series = build_series(&logs, date(2024, 2, 27), date(2024, 3, 2));
    let dates: Vec<NaiveDate> = series.iter().map(|p| p.date).collect();
    assert_eq!(
        dates,
        vec![
            date(2024, 2, 27),
            date(2024, 2, 28),
            date(2024, 2, 29),
            date(2024, 3, 1),
            date(2024, 3, 2)
        ]
    );
    for point in &series {
        assert_eq!(point.cardio_km, 0.0);
        assert_eq!(point.cardio_kcal, 0.0);
        assert_eq!(point.cardio_time, 0.0);
    }
    assert_eq!(series[2].exercise("Plank"), 3.0);
    assert_eq!(series[0].exercise("Plank"), 0.0);
}

#[test]
fn test_build_series_reversed_range_is_empty() {
    let series = build_series(&LogStore::new(), date(2024, 3, 2), date(2024, 3, 1));
    assert!(series.is_empty());
}

#[test]
fn test_history_lists_days_with_content_newest_first() {
    let catalog = Catalogs::default().exercises;
    let logs = store(vec![
        (date(2024, 3, 1), DailyLog::default().with_weight(80.0)),
        (date(2024, 3, 2), DailyLog::default().with_measurement("waist", 82.0)),
        (
            date(2024, 3, 3),
            DailyLog::default().with_exercise("Pompki", ExerciseEntry::LegacyTotal(10.0)),
        ),
        (
            date(2024, 3, 4),
            DailyLog::default().with_exercise("Unknown", ExerciseEntry::LegacyTotal(10.0)),
        ),
        (date(2024, 3, 5), DailyLog::default().with_cardio("Bieganie", run(3.0, 20.0))),
    ]);
    let days: Vec<NaiveDate> = history(&logs, &catalog, date(2024, 3, 1), date(2024, 3, 7))
        .iter()
        .map(|p| p.date)
        .collect();
    assert_eq!(days, vec![date(2024, 3, 5), date(2024, 3, 3), date(2024, 3, 1)]);
}

#[test]
fn test_personal_record_prefers_later_higher_value() {
    let catalog = Catalogs::default().exercises;
    let logs = store(vec![
        (
            date(2024, 3, 1),
            DailyLog::default().with_exercise(
                "Pompki",
                ExerciseEntry::SetList(vec![
                    SetEntry::new(10.0, None),
                    SetEntry::new(15.0, None),
                    SetEntry::new(8.0, None),
                ]),
            ),
        ),
        (
            date(2024, 3, 8),
            DailyLog::default().with_exercise("Pompki", ExerciseEntry::LegacyTotal(20.0)),
        ),
    ]);
    let records = personal_records(&logs, &catalog);
    let pompki = records["Pompki"];
    assert_eq!(pompki.max_reps, 20.0);
    assert_eq!(pompki.date, date(2024, 3, 8));
    assert!(!records.contains_key("Przysiady"));
}

#[test]
fn test_personal_record_tie_keeps_earliest() {
    let catalog = vec!["Przysiady".to_string()];
    let logs = store(vec![
        (
            date(2024, 1, 1),
            DailyLog::default().with_exercise("Przysiady", ExerciseEntry::SetGroup { sets: 4.0, reps: 15.0 }),
        ),
        (
            date(2024, 1, 2),
            DailyLog::default().with_exercise("Przysiady", ExerciseEntry::LegacyTotal(15.0)),
        ),
    ]);
    let records = personal_records(&logs, &catalog);
    assert_eq!(records["Przysiady"].date, date(2024, 1, 1));
    assert_eq!(records["Przysiady"].max_reps, 15.0);
}

#[test]
fn test_heatmap_fire_and_empty_days() {
    let mut goals = Goals::empty();
    goals.daily.insert("Pompki".into(), GoalTarget::Total(20.0));
    goals.daily.insert("Przysiady".into(), GoalTarget::SetGroup { sets: 4.0, reps: 15.0 });

    let logs = store(vec![
        (
            date(2024, 3, 5),
            DailyLog::default().with_exercise("Pompki", ExerciseEntry::LegacyTotal(25.0)),
        ),
        (
            date(2024, 3, 6),
            DailyLog::default()
                .with_exercise("Pompki", ExerciseEntry::LegacyTotal(10.0))
                .with_exercise("Plank", ExerciseEntry::LegacyTotal(2.0))
                .with_cardio("Bieganie", run(5.0, 30.0)),
        ),
    ]);
    let days = month_heatmap(&logs, &goals, 2024, 3);
    assert_eq!(days.len(), 31);

    let fire = &days[4];
    assert_eq!(fire.day, 5);
    assert!(fire.is_fire);
    assert_eq!(fire.intensity, 1);
    assert_eq!(fire.level(), HeatLevel::Fire);

    let busy = &days[5];
    assert!(!busy.is_fire);
    assert_eq!(busy.intensity, 3);
    assert_eq!(busy.level(), HeatLevel::Medium);

    let empty = &days[0];
    assert_eq!(empty.intensity, 0);
    assert!(!empty.is_fire);
    assert_eq!(empty.level(), HeatLevel::Empty);
}

#[test]
fn test_heatmap_day_without_goals_is_never_fire() {
    let mut goals = Goals::empty();
    goals.daily.insert("Pompki".into(), GoalTarget::Total(20.0));

    let logs = store(vec![(
        date(2024, 3, 7),
        DailyLog::default().with_exercise("Plank", ExerciseEntry::LegacyTotal(50.0)),
    )]);
    let days = month_heatmap(&logs, &goals, 2024, 3);
    let day = &days[6];
    assert_eq!(day.day, 7);
    assert_eq!(day.intensity, 1);
    assert!(!day.is_fire);
    assert_eq!(day.level(), HeatLevel::Light);
}

#[test]
fn test_heatmap_invalid_month_is_empty() {
    assert!(month_heatmap(&LogStore::new(), &Goals::default(), 2024, 13).is_empty());
    assert_eq!(month_heatmap(&LogStore::new(), &Goals::default(), 2023, 2).len(), 28);
}

#[test]
fn test_weekly_goal_progress() {
    let catalogs = Catalogs::default();
    let goals = Goals::default();
    let logs = store(vec![(
        date(2024, 3, 5),
        DailyLog::default()
            .with_exercise("Pompki", ExerciseEntry::LegacyTotal(150.0))
            .with_cardio("Bieganie", run(25.0, 60.0)),
    )]);
    let progress = weekly_goal_progress(&logs, &goals, &catalogs, date(2024, 3, 7));
    assert!(progress.has_any_goals());

    assert_eq!(progress.exercises.len(), 1);
    let pompki = &progress.exercises[0];
    assert_eq!(pompki.name, "Pompki");
    assert_eq!(pompki.progress.percent, 50.0);
    assert!(!pompki.progress.is_done);

    assert_eq!(progress.cardio.len(), 1);
    let bieganie = &progress.cardio[0];
    let km = bieganie.km.unwrap();
    assert_eq!(km.percent, 100.0);
    assert!(km.is_exceeded);
    assert!(bieganie.is_exceeded());
    assert_eq!(bieganie.time.unwrap().current, 60.0);
}

#[test]
fn test_weekly_goal_progress_without_goals() {
    let progress = weekly_goal_progress(
        &LogStore::new(),
        &Goals::empty(),
        &Catalogs::default(),
        date(2024, 3, 7),
    );
    assert!(!progress.has_any_goals());
}

#[test]
fn test_daily_goal_progress_per_set() {
    let catalogs = Catalogs::default();
    let goals = Goals::default();
    let logs = store(vec![(
        date(2024, 3, 5),
        DailyLog::default().with_weight(81.5).with_exercise(
            "Pompki",
            ExerciseEntry::SetList(vec![
                SetEntry::new(20.0, None),
                SetEntry::new(18.0, Some(10.0)),
            ]),
        ),
    )]);
    let progress = daily_goal_progress(&logs, &goals, &catalogs, date(2024, 3, 5));
    assert_eq!(progress.weight, Some(81.5));

    let pompki = &progress.exercises[0];
    assert_eq!(pompki.group, "Klatka");
    assert_eq!(pompki.total, 38.0);
    assert_eq!(pompki.detail, "20, 10kg×18");
    assert_eq!(pompki.progress.unwrap().target, 60.0);
    assert_eq!(pompki.sets.len(), 2);
    assert!(pompki.sets[0].is_done);
    assert!(!pompki.sets[1].is_done);

    let plank = &progress.exercises[2];
    assert_eq!(plank.progress, None);
    assert_eq!(plank.detail, "");

    let bieganie = &progress.cardio[0];
    assert_eq!(bieganie.km, 0.0);
    assert_eq!(bieganie.goals.as_ref().and_then(|g| g.km).map(|p| p.target), Some(5.0));
    assert!(progress.cardio[1].goals.is_none());
}

#[test]
fn test_last_workout_before_skips_weight_only_days() {
    let logs = store(vec![
        (
            date(2024, 3, 1),
            DailyLog::default().with_exercise("Pompki", ExerciseEntry::LegacyTotal(10.0)),
        ),
        (date(2024, 3, 3), DailyLog::default().with_weight(80.0)),
        (
            date(2024, 3, 5),
            DailyLog::default().with_exercise("Pompki", ExerciseEntry::LegacyTotal(10.0)),
        ),
    ]);
    assert_eq!(last_workout_before(&logs, date(2024, 3, 5)), Some(date(2024, 3, 1)));
    assert_eq!(last_workout_before(&logs, date(2024, 3, 6)), Some(date(2024, 3, 5)));
    assert_eq!(last_workout_before(&logs, date(2024, 3, 1)), None);
}

#[test]
fn test_aggregations_are_idempotent() {
    let raw = json!({
        "2024-03-04": {"weight": 80, "exercises": {"Pompki": [{"r": 12, "w": 5}], "Plank": 3}},
        "2024-03-05": {"weight": "79.5", "cardio": {"Bieganie": {"km": "5", "time": 31}}},
        "2024-03-07": {"exercises": {"Przysiady": {"sets": 4, "reps": 15}}}
    });
    let logs = LogStore::from_json(&raw);
    let goals = Goals::default();
    let catalogs = Catalogs::default();
    let d = date(2024, 3, 6);
    let end = d.checked_add_days(Days::new(3)).unwrap();

    assert_eq!(week_stats(&logs, d), week_stats(&logs, d));
    for mode in [SummaryMode::Day, SummaryMode::Week, SummaryMode::Month] {
        assert_eq!(summary_stats(&logs, d, mode), summary_stats(&logs, d, mode));
    }
    assert_eq!(build_series(&logs, d, end), build_series(&logs, d, end));
    assert_eq!(
        personal_records(&logs, &catalogs.exercises),
        personal_records(&logs, &catalogs.exercises)
    );
    assert_eq!(month_heatmap(&logs, &goals, 2024, 3), month_heatmap(&logs, &goals, 2024, 3));
    assert_eq!(
        weekly_goal_progress(&logs, &goals, &catalogs, d),
        weekly_goal_progress(&logs, &goals, &catalogs, d)
    );
    assert_eq!(
        daily_goal_progress(&logs, &goals, &catalogs, d),
        daily_goal_progress(&logs, &goals, &catalogs, d)
    );
}
