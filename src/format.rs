// src/format.rs
use crate::model::{ExerciseEntry, GoalTarget};
use chrono::{Datelike, NaiveDate, Weekday};

const WEEKDAYS_PL: [&str; 7] = ["pon.", "wt.", "śr.", "czw.", "pt.", "sob.", "niedz."];
const MONTHS_PL: [&str; 12] = [
    "sty", "lut", "mar", "kwi", "maj", "cze", "lip", "sie", "wrz", "paź", "lis", "gru",
];

/// Total reps logged for an exercise on one day. Absent entries count as 0.
#[must_use]
pub fn total_reps(entry: Option<&ExerciseEntry>) -> f64 {
    entry.map_or(0.0, ExerciseEntry::total_reps)
}

/// Total reps a goal asks for. Absent goals count as 0.
#[must_use]
pub fn goal_total(goal: Option<&GoalTarget>) -> f64 {
    goal.map_or(0.0, GoalTarget::total)
}

/// Prints a number the way it was typed: `20` rather than `20.0`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Short description of a day's sets, e.g. `20kg×10, 8`.
#[must_use]
pub fn format_history(entry: Option<&ExerciseEntry>) -> String {
    match entry {
        None => String::new(),
        Some(ExerciseEntry::LegacyTotal(total)) if *total == 0.0 => String::new(),
        Some(ExerciseEntry::LegacyTotal(total)) => format_number(*total),
        Some(ExerciseEntry::SetGroup { sets, reps }) => {
            format!("{} serie × {}", format_number(*sets), format_number(*reps))
        }
        Some(ExerciseEntry::SetList(sets)) => sets
            .iter()
            .map(|set| match set.weight {
                Some(w) if w != 0.0 => format!("{}kg×{}", format_number(w), format_number(set.reps)),
                _ => format_number(set.reps),
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn weekday_pl(day: Weekday) -> &'static str {
    WEEKDAYS_PL[day.num_days_from_monday() as usize]
}

fn month_pl(date: NaiveDate) -> &'static str {
    MONTHS_PL[date.month0() as usize]
}

/// Polish short date with weekday, e.g. `pt., 1 mar`.
#[must_use]
pub fn format_date_pl(date: NaiveDate) -> String {
    format!("{}, {}", weekday_pl(date.weekday()), format_day_month_pl(date))
}

/// Polish day and short month, e.g. `1 mar`.
#[must_use]
pub fn format_day_month_pl(date: NaiveDate) -> String {
    format!("{} {}", date.day(), month_pl(date))
}
