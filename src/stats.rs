// src/stats.rs
//! Derived views over a journal snapshot: weekly totals, period summaries,
//! chart series, personal records and the monthly activity heatmap.
//!
//! Everything here is a pure function of its arguments. Catalogs and goals
//! are passed in explicitly, so the same snapshot always yields the same
//! result.
use crate::format::{format_history, goal_total, total_reps};
use crate::model::{CardioMetric, Catalogs, DailyLog, ExerciseEntry, GoalScope, Goals, LogStore};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every calendar day in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Monday-to-Sunday week containing `date`.
#[must_use]
pub fn week_range(date: NaiveDate) -> DateRange {
    let offset = u64::from(date.weekday().num_days_from_monday());
    let start = date.checked_sub_days(Days::new(offset)).unwrap_or(date);
    let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
    DateRange::new(start, end)
}

/// First to last calendar day of `date`'s month.
#[must_use]
pub fn month_range(date: NaiveDate) -> DateRange {
    let start = date.with_day(1).unwrap_or(date);
    let end = last_day_of_month(date.year(), date.month()).unwrap_or(date);
    DateRange::new(start, end)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CardioTotals {
    pub km: f64,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekStats {
    pub exercises: BTreeMap<String, f64>,
    pub cardio: BTreeMap<String, CardioTotals>,
    pub range: DateRange,
}

/// Per-exercise reps and per-cardio km/time for the week containing `date`.
#[must_use]
pub fn week_stats(logs: &LogStore, date: NaiveDate) -> WeekStats {
    let range = week_range(date);
    let mut exercises: BTreeMap<String, f64> = BTreeMap::new();
    let mut cardio: BTreeMap<String, CardioTotals> = BTreeMap::new();

    for (_, day) in logs.range(range.start, range.end) {
        for (name, entry) in &day.exercises {
            *exercises.entry(name.clone()).or_default() += entry.total_reps();
        }
        for (name, entry) in &day.cardio {
            let totals = cardio.entry(name.clone()).or_default();
            totals.km += entry.km();
            totals.time += entry.time();
        }
    }

    WeekStats {
        exercises,
        cardio,
        range,
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SummaryMode {
    Day,
    #[default]
    Week,
    Month,
}

impl SummaryMode {
    #[must_use]
    pub fn range(self, date: NaiveDate) -> DateRange {
        match self {
            Self::Day => DateRange::new(date, date),
            Self::Week => week_range(date),
            Self::Month => month_range(date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_kcal: f64,
    pub total_time: f64,
    pub total_reps: f64,
    pub total_km: f64,
    pub exercise_stats: BTreeMap<String, f64>,
    /// Last minus first recorded weight in the window, one decimal.
    /// `None` with fewer than two weigh-ins.
    pub weight_diff: Option<f64>,
    pub range: DateRange,
}

impl SummaryStats {
    /// Weight change with exactly one decimal, e.g. `2.0`.
    #[must_use]
    pub fn weight_diff_display(&self) -> Option<String> {
        self.weight_diff.map(|d| format!("{d:.1}"))
    }
}

/// Totals for the day, week or month around `date`.
#[must_use]
pub fn summary_stats(logs: &LogStore, date: NaiveDate, mode: SummaryMode) -> SummaryStats {
    let range = mode.range(date);
    let mut stats = SummaryStats {
        total_kcal: 0.0,
        total_time: 0.0,
        total_reps: 0.0,
        total_km: 0.0,
        exercise_stats: BTreeMap::new(),
        weight_diff: None,
        range,
    };
    let mut weights = Vec::new();

    for (_, day) in logs.range(range.start, range.end) {
        for entry in day.cardio.values() {
            stats.total_kcal += entry.kcal();
            stats.total_time += entry.time();
            stats.total_km += entry.km();
        }
        for (name, entry) in &day.exercises {
            let count = entry.total_reps();
            stats.total_reps += count;
            *stats.exercise_stats.entry(name.clone()).or_default() += count;
        }
        if let Some(w) = day.weight {
            weights.push(w);
        }
    }

    if weights.len() >= 2 {
        if let (Some(first), Some(last)) = (weights.first(), weights.last()) {
            stats.weight_diff = Some(round_one_decimal(last - first));
        }
    }
    stats
}

fn round_one_decimal(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    // avoid printing "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// One day of chart data. Cardio figures are summed across all activities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub exercises: BTreeMap<String, f64>,
    pub cardio_km: f64,
    pub cardio_kcal: f64,
    pub cardio_time: f64,
}

impl SeriesPoint {
    fn for_day(date: NaiveDate, day: Option<&DailyLog>) -> Self {
        let mut point = Self {
            date,
            weight: None,
            exercises: BTreeMap::new(),
            cardio_km: 0.0,
            cardio_kcal: 0.0,
            cardio_time: 0.0,
        };
        let Some(day) = day else {
            return point;
        };
        point.weight = day.weight;
        for entry in day.cardio.values() {
            point.cardio_km += entry.km();
            point.cardio_kcal += entry.kcal();
            point.cardio_time += entry.time();
        }
        point.exercises = day
            .exercises
            .iter()
            .map(|(name, entry)| (name.clone(), entry.total_reps()))
            .collect();
        point
    }

    #[must_use]
    pub fn exercise(&self, name: &str) -> f64 {
        self.exercises.get(name).copied().unwrap_or(0.0)
    }

    /// Whether the day shows up in the history view.
    #[must_use]
    pub fn has_content(&self, exercise_catalog: &[String]) -> bool {
        self.weight.is_some_and(|w| w != 0.0)
            || self.cardio_time > 0.0
            || exercise_catalog.iter().any(|ex| self.exercise(ex) != 0.0)
    }
}

/// One point per calendar day in `[start, end]`, logged or not.
#[must_use]
pub fn build_series(logs: &LogStore, start: NaiveDate, end: NaiveDate) -> Vec<SeriesPoint> {
    DateRange::new(start, end)
        .days()
        .map(|date| SeriesPoint::for_day(date, logs.get(date)))
        .collect()
}

/// Days in `[start, end]` with anything worth showing, newest first.
#[must_use]
pub fn history(
    logs: &LogStore,
    exercise_catalog: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = build_series(logs, start, end)
        .into_iter()
        .filter(|p| p.has_content(exercise_catalog))
        .collect();
    points.reverse();
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PersonalRecord {
    pub max_reps: f64,
    pub date: NaiveDate,
}

/// Best single effort per cataloged exercise across the whole journal.
/// Ties keep the earliest date; exercises without a positive record are left out.
#[must_use]
pub fn personal_records(
    logs: &LogStore,
    exercise_catalog: &[String],
) -> BTreeMap<String, PersonalRecord> {
    let mut records = BTreeMap::new();
    for exercise in exercise_catalog {
        let mut best: Option<PersonalRecord> = None;
        for (date, day) in logs.iter() {
            let Some(entry) = day.exercises.get(exercise) else {
                continue;
            };
            let day_max = entry.best_set();
            if day_max > best.map_or(0.0, |b| b.max_reps) {
                best = Some(PersonalRecord {
                    max_reps: day_max,
                    date: *date,
                });
            }
        }
        if let Some(record) = best {
            records.insert(exercise.clone(), record);
        }
    }
    records
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapDay {
    pub day: u32,
    pub date: NaiveDate,
    pub intensity: u32,
    pub is_fire: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HeatLevel {
    Fire,
    Empty,
    Light,
    Medium,
    Strong,
}

impl HeatmapDay {
    #[must_use]
    pub const fn level(&self) -> HeatLevel {
        if self.is_fire {
            return HeatLevel::Fire;
        }
        match self.intensity {
            0 => HeatLevel::Empty,
            1..=2 => HeatLevel::Light,
            3..=4 => HeatLevel::Medium,
            _ => HeatLevel::Strong,
        }
    }
}

/// Activity intensity for every day of `month` (1-based) in `year`.
///
/// A day is on fire when its reps beat the summed daily goals of the
/// exercises actually performed that day. Exercises skipped that day don't
/// count toward the goal. Returns nothing for an invalid month.
#[must_use]
pub fn month_heatmap(logs: &LogStore, goals: &Goals, year: i32, month: u32) -> Vec<HeatmapDay> {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, month, 1),
        last_day_of_month(year, month),
    ) else {
        return Vec::new();
    };

    DateRange::new(first, last)
        .days()
        .map(|date| {
            let mut intensity = 0;
            let mut reps_today = 0.0;
            let mut goal_today = 0.0;
            if let Some(day) = logs.get(date) {
                for (name, entry) in &day.exercises {
                    let count = entry.total_reps();
                    if count > 0.0 {
                        intensity += 1;
                        reps_today += count;
                        goal_today += goal_total(goals.exercise_target(GoalScope::Daily, name));
                    }
                }
                if !day.cardio.is_empty() {
                    intensity += 1;
                }
            }
            HeatmapDay {
                day: date.day(),
                date,
                intensity,
                is_fire: goal_today > 0.0 && reps_today > goal_today,
            }
        })
        .collect()
}

/// Progress toward a target, as drawn by a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub current: f64,
    pub target: f64,
    pub percent: f64,
    pub is_done: bool,
    pub is_exceeded: bool,
}

impl Progress {
    #[must_use]
    pub fn new(current: f64, target: f64) -> Self {
        let has_target = target > 0.0;
        Self {
            current,
            target,
            percent: if has_target {
                (current / target * 100.0).min(100.0)
            } else {
                0.0
            },
            is_done: has_target && current >= target,
            is_exceeded: has_target && current > target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseProgress {
    pub name: String,
    pub progress: Progress,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardioProgress {
    pub name: String,
    pub km: Option<Progress>,
    pub time: Option<Progress>,
}

impl CardioProgress {
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        [self.km, self.time].iter().flatten().any(|p| p.is_exceeded)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyProgress {
    pub range: DateRange,
    pub exercises: Vec<ExerciseProgress>,
    pub cardio: Vec<CardioProgress>,
}

impl WeeklyProgress {
    #[must_use]
    pub fn has_any_goals(&self) -> bool {
        !self.exercises.is_empty() || !self.cardio.is_empty()
    }
}

fn cardio_progress(
    goals: &Goals,
    scope: GoalScope,
    name: &str,
    km: f64,
    time: f64,
) -> Option<CardioProgress> {
    let target_km = goals.cardio_target(scope, name, CardioMetric::Km);
    let target_time = goals.cardio_target(scope, name, CardioMetric::Time);
    if target_km.is_none() && target_time.is_none() {
        return None;
    }
    Some(CardioProgress {
        name: name.to_string(),
        km: target_km.map(|t| Progress::new(km, t)),
        time: target_time.map(|t| Progress::new(time, t)),
    })
}

/// Weekly goals of the week containing `date`, in catalog order.
/// Only names with a nonzero weekly target are listed.
#[must_use]
pub fn weekly_goal_progress(
    logs: &LogStore,
    goals: &Goals,
    catalogs: &Catalogs,
    date: NaiveDate,
) -> WeeklyProgress {
    let stats = week_stats(logs, date);

    let exercises = catalogs
        .exercises
        .iter()
        .filter_map(|name| {
            let target = goal_total(goals.exercise_target(GoalScope::Weekly, name));
            (target != 0.0).then(|| ExerciseProgress {
                name: name.clone(),
                progress: Progress::new(stats.exercises.get(name).copied().unwrap_or(0.0), target),
            })
        })
        .collect();

    let cardio = catalogs
        .cardio
        .iter()
        .filter_map(|name| {
            let totals = stats.cardio.get(name).copied().unwrap_or_default();
            cardio_progress(goals, GoalScope::Weekly, name, totals.km, totals.time)
        })
        .collect();

    WeeklyProgress {
        range: stats.range,
        exercises,
        cardio,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyExerciseProgress {
    pub name: String,
    pub group: String,
    pub total: f64,
    pub detail: String,
    /// `None` when the exercise has no daily goal.
    pub progress: Option<Progress>,
    /// Each logged set against the goal's reps per set, when the goal has one.
    pub sets: Vec<Progress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCardioProgress {
    pub name: String,
    pub km: f64,
    pub kcal: f64,
    pub time: f64,
    pub goals: Option<CardioProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub exercises: Vec<DailyExerciseProgress>,
    pub cardio: Vec<DailyCardioProgress>,
}

/// Every cataloged exercise and cardio activity for `date`, against daily goals.
#[must_use]
pub fn daily_goal_progress(
    logs: &LogStore,
    goals: &Goals,
    catalogs: &Catalogs,
    date: NaiveDate,
) -> DailyProgress {
    let day = logs.get(date);

    let exercises = catalogs
        .exercises
        .iter()
        .map(|name| {
            let entry = day.and_then(|d| d.exercises.get(name));
            let goal = goals.exercise_target(GoalScope::Daily, name);
            let total = total_reps(entry);
            let target = goal_total(goal);
            let sets = match (entry, goal.and_then(|g| g.reps_per_set())) {
                (Some(ExerciseEntry::SetList(sets)), Some(per_set)) if per_set > 0.0 => {
                    sets.iter().map(|s| Progress::new(s.reps, per_set)).collect()
                }
                _ => Vec::new(),
            };
            DailyExerciseProgress {
                name: name.clone(),
                group: catalogs.group_of(name).to_string(),
                total,
                detail: format_history(entry),
                progress: (target > 0.0).then(|| Progress::new(total, target)),
                sets,
            }
        })
        .collect();

    let cardio = catalogs
        .cardio
        .iter()
        .map(|name| {
            let entry = day.and_then(|d| d.cardio.get(name)).copied().unwrap_or_default();
            DailyCardioProgress {
                name: name.clone(),
                km: entry.km(),
                kcal: entry.kcal(),
                time: entry.time(),
                goals: cardio_progress(goals, GoalScope::Daily, name, entry.km(), entry.time()),
            }
        })
        .collect();

    DailyProgress {
        date,
        weight: day.and_then(|d| d.weight),
        exercises,
        cardio,
    }
}

/// Most recent day before `date` with at least one exercise logged.
#[must_use]
pub fn last_workout_before(logs: &LogStore, date: NaiveDate) -> Option<NaiveDate> {
    logs.before(date)
        .rev()
        .find(|(_, day)| !day.exercises.is_empty())
        .map(|(d, _)| *d)
}
