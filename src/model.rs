// src/model.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::warn;

pub const DEFAULT_GROUP: &str = "Inne";

pub const AVAILABLE_GROUPS: [&str; 8] = [
    "Klatka", "Plecy", "Nogi", "Barki", "Biceps", "Triceps", "Brzuch", DEFAULT_GROUP,
];

/// Catalog spelling of a muscle group, matched case-insensitively.
pub fn canonical_group(name: &str) -> Option<&'static str> {
    AVAILABLE_GROUPS
        .iter()
        .copied()
        .find(|group| group.eq_ignore_ascii_case(name.trim()))
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Coerces a stored JSON value to a finite number.
/// Anything that isn't a number or a numeric string ends up as 0.
pub fn to_number_or_zero(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Like `to_number_or_zero`, but `null`, absent and empty-string values stay absent.
fn optional_number(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(to_number_or_zero(v)),
    }
}

fn number_field(map: &Map<String, Value>, field: &str) -> f64 {
    map.get(field).map_or(0.0, to_number_or_zero)
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_FORMAT).ok()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// One performed set: reps and an optional load in kg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetEntry {
    #[serde(rename = "r")]
    pub reps: f64,
    #[serde(rename = "w")]
    pub weight: Option<f64>,
}

impl SetEntry {
    #[must_use]
    pub const fn new(reps: f64, weight: Option<f64>) -> Self {
        Self { reps, weight }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(map) => Some(Self {
                reps: number_field(map, "r").max(0.0),
                weight: optional_number(map.get("w")).filter(|w| *w > 0.0),
            }),
            other => Some(Self {
                reps: to_number_or_zero(other).max(0.0),
                weight: None,
            }),
        }
    }
}

/// A day's result for one exercise.
///
/// Older logs stored a bare total, later ones a uniform `{sets, reps}` block,
/// current ones a list of individual sets. All three are still readable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExerciseEntry {
    LegacyTotal(f64),
    SetGroup { sets: f64, reps: f64 },
    SetList(Vec<SetEntry>),
}

impl ExerciseEntry {
    /// Converts a raw stored value. `null` means "no entry".
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(Self::SetList(
                items.iter().filter_map(SetEntry::from_json).collect(),
            )),
            Value::Object(map) => Some(Self::SetGroup {
                sets: number_field(map, "sets"),
                reps: number_field(map, "reps"),
            }),
            other => Some(Self::LegacyTotal(to_number_or_zero(other))),
        }
    }

    #[must_use]
    pub fn total_reps(&self) -> f64 {
        match self {
            Self::LegacyTotal(total) => *total,
            Self::SetGroup { sets, reps } => sets * reps,
            Self::SetList(sets) => sets.iter().map(|s| s.reps).sum(),
        }
    }

    /// Best single effort of the day: the biggest set for a list, the per-set
    /// reps for a group, the stored value for a legacy total.
    #[must_use]
    pub fn best_set(&self) -> f64 {
        match self {
            Self::LegacyTotal(total) => *total,
            Self::SetGroup { reps, .. } => *reps,
            Self::SetList(sets) => sets.iter().map(|s| s.reps).fold(0.0, f64::max),
        }
    }

    /// Drops empty sets and non-positive weights before the entry is stored.
    #[must_use]
    pub fn cleaned(self) -> Self {
        match self {
            Self::SetList(sets) => Self::SetList(
                sets.into_iter()
                    .filter(|s| s.reps.is_finite() && s.reps > 0.0)
                    .map(|s| SetEntry {
                        reps: s.reps,
                        weight: s.weight.filter(|w| w.is_finite() && *w > 0.0),
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CardioEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kcal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CardioField {
    Km,
    Kcal,
    Time,
}

impl CardioEntry {
    fn from_json(map: &Map<String, Value>) -> Self {
        Self {
            km: optional_number(map.get("km")),
            kcal: optional_number(map.get("kcal")),
            time: optional_number(map.get("time")),
        }
    }

    #[must_use]
    pub fn km(&self) -> f64 {
        self.km.unwrap_or(0.0)
    }

    #[must_use]
    pub fn kcal(&self) -> f64 {
        self.kcal.unwrap_or(0.0)
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.time.unwrap_or(0.0)
    }

    pub fn set(&mut self, field: CardioField, value: Option<f64>) {
        match field {
            CardioField::Km => self.km = value,
            CardioField::Kcal => self.kcal = value,
            CardioField::Time => self.time = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DailyLog {
    pub weight: Option<f64>,
    pub measurements: BTreeMap<String, f64>,
    pub exercises: BTreeMap<String, ExerciseEntry>,
    pub cardio: BTreeMap<String, CardioEntry>,
}

impl DailyLog {
    pub fn from_json(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let measurements = object_entries(map.get("measurements"))
            .filter_map(|(name, v)| optional_number(Some(v)).map(|n| (name.clone(), n)))
            .collect();
        let exercises = object_entries(map.get("exercises"))
            .filter_map(|(name, v)| ExerciseEntry::from_json(v).map(|e| (name.clone(), e)))
            .collect();
        let cardio = object_entries(map.get("cardio"))
            .filter_map(|(name, v)| match v {
                Value::Object(fields) => Some((name.clone(), CardioEntry::from_json(fields))),
                _ => None,
            })
            .collect();

        Self {
            weight: optional_number(map.get("weight")),
            measurements,
            exercises,
            cardio,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    #[must_use]
    pub fn with_exercise(mut self, name: &str, entry: ExerciseEntry) -> Self {
        self.exercises.insert(name.to_string(), entry);
        self
    }

    #[must_use]
    pub fn with_cardio(mut self, name: &str, entry: CardioEntry) -> Self {
        self.cardio.insert(name.to_string(), entry);
        self
    }

    #[must_use]
    pub fn with_measurement(mut self, name: &str, cm: f64) -> Self {
        self.measurements.insert(name.to_string(), cm);
        self
    }
}

fn object_entries(value: Option<&Value>) -> impl Iterator<Item = (&String, &Value)> {
    value.and_then(Value::as_object).into_iter().flatten()
}

/// Date-keyed journal of daily logs.
///
/// Edits never mutate a store in place: `with_day` hands back a new store,
/// so any snapshot a caller holds stays consistent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogStore {
    days: BTreeMap<NaiveDate, DailyLog>,
}

impl LogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: &Value) -> Self {
        let mut days = BTreeMap::new();
        for (key, day) in object_entries(Some(value)) {
            match parse_date_key(key) {
                Some(date) => {
                    days.insert(date, DailyLog::from_json(day));
                }
                None => warn!("Skipping log entry with invalid date key '{}'", key),
            }
        }
        Self { days }
    }

    /// # Errors
    /// Returns `serde_json::Error` if a day fails to serialize.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        let mut map = Map::new();
        for (date, day) in &self.days {
            map.insert(date_key(*date), serde_json::to_value(day)?);
        }
        Ok(Value::Object(map))
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&DailyLog> {
        self.days.get(&date)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&NaiveDate, &DailyLog)> {
        self.days.iter()
    }

    /// Days within `[start, end]`, ascending. Empty when `start > end`.
    pub fn range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl DoubleEndedIterator<Item = (&NaiveDate, &DailyLog)> {
        let bounds = (start <= end).then_some(start..=end);
        bounds.into_iter().flat_map(move |b| self.days.range(b))
    }

    /// Days strictly before `date`, ascending.
    pub fn before(&self, date: NaiveDate) -> impl DoubleEndedIterator<Item = (&NaiveDate, &DailyLog)> {
        self.days.range(..date)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Returns a copy of the store with the day at `date` edited by `edit`.
    /// The day is created empty if it doesn't exist yet.
    #[must_use]
    pub fn with_day<F>(&self, date: NaiveDate, edit: F) -> Self
    where
        F: FnOnce(&mut DailyLog),
    {
        let mut days = self.days.clone();
        edit(days.entry(date).or_default());
        Self { days }
    }
}

impl FromIterator<(NaiveDate, DailyLog)> for LogStore {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, DailyLog)>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

/// A daily or weekly target for an exercise or cardio metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GoalTarget {
    Total(f64),
    SetGroup { sets: f64, reps: f64 },
}

impl GoalTarget {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(map) => Some(Self::SetGroup {
                sets: number_field(map, "sets"),
                reps: number_field(map, "reps"),
            }),
            other => Some(Self::Total(to_number_or_zero(other))),
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        match self {
            Self::Total(total) => *total,
            Self::SetGroup { sets, reps } => sets * reps,
        }
    }

    /// Reps expected in each set, only known for set-group targets.
    #[must_use]
    pub const fn reps_per_set(&self) -> Option<f64> {
        match self {
            Self::Total(_) => None,
            Self::SetGroup { reps, .. } => Some(*reps),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GoalScope {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CardioMetric {
    Km,
    Time,
}

/// Goal key for a cardio metric, e.g. `Bieganie_km`.
#[must_use]
pub fn cardio_goal_key(cardio: &str, metric: CardioMetric) -> String {
    format!("{cardio}_{metric}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Goals {
    pub daily: BTreeMap<String, GoalTarget>,
    pub weekly: BTreeMap<String, GoalTarget>,
}

impl Default for Goals {
    fn default() -> Self {
        let daily = BTreeMap::from([
            ("Pompki".to_string(), GoalTarget::SetGroup { sets: 3.0, reps: 20.0 }),
            ("Przysiady".to_string(), GoalTarget::SetGroup { sets: 4.0, reps: 15.0 }),
            ("Bieganie_time".to_string(), GoalTarget::Total(30.0)),
            ("Bieganie_km".to_string(), GoalTarget::Total(5.0)),
        ]);
        let weekly = BTreeMap::from([
            ("Pompki".to_string(), GoalTarget::Total(300.0)),
            ("Bieganie_km".to_string(), GoalTarget::Total(20.0)),
            ("Bieganie_time".to_string(), GoalTarget::Total(120.0)),
        ]);
        Self { daily, weekly }
    }
}

impl Goals {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            daily: BTreeMap::new(),
            weekly: BTreeMap::new(),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        let parse = |scope: &str| -> BTreeMap<String, GoalTarget> {
            object_entries(value.get(scope))
                .filter_map(|(name, v)| GoalTarget::from_json(v).map(|t| (name.clone(), t)))
                .collect()
        };
        Self {
            daily: parse("daily"),
            weekly: parse("weekly"),
        }
    }

    /// # Errors
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    #[must_use]
    pub const fn scope(&self, scope: GoalScope) -> &BTreeMap<String, GoalTarget> {
        match scope {
            GoalScope::Daily => &self.daily,
            GoalScope::Weekly => &self.weekly,
        }
    }

    pub fn scope_mut(&mut self, scope: GoalScope) -> &mut BTreeMap<String, GoalTarget> {
        match scope {
            GoalScope::Daily => &mut self.daily,
            GoalScope::Weekly => &mut self.weekly,
        }
    }

    #[must_use]
    pub fn exercise_target(&self, scope: GoalScope, exercise: &str) -> Option<&GoalTarget> {
        self.scope(scope).get(exercise)
    }

    /// Cardio target, `None` when unset or zero.
    #[must_use]
    pub fn cardio_target(&self, scope: GoalScope, cardio: &str, metric: CardioMetric) -> Option<f64> {
        self.scope(scope)
            .get(&cardio_goal_key(cardio, metric))
            .map(GoalTarget::total)
            .filter(|t| *t != 0.0)
    }
}

/// User-defined names the journal knows about.
/// Logs may still mention names that were removed from here since.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalogs {
    pub exercises: Vec<String>,
    pub cardio: Vec<String>,
    pub exercise_groups: BTreeMap<String, String>,
}

impl Default for Catalogs {
    fn default() -> Self {
        Self {
            exercises: vec!["Pompki".into(), "Przysiady".into(), "Plank".into()],
            cardio: vec!["Bieganie".into(), "Rower".into()],
            exercise_groups: BTreeMap::from([
                ("Pompki".to_string(), "Klatka".to_string()),
                ("Przysiady".to_string(), "Nogi".to_string()),
                ("Plank".to_string(), "Brzuch".to_string()),
            ]),
        }
    }
}

impl Catalogs {
    #[must_use]
    pub fn group_of(&self, exercise: &str) -> &str {
        self.exercise_groups
            .get(exercise)
            .map_or(DEFAULT_GROUP, String::as_str)
    }
}

/// Reads an ordered list of names, skipping non-strings and duplicates.
pub fn name_list_from_json(value: &Value) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for item in value.as_array().into_iter().flatten() {
        if let Some(name) = item.as_str() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

pub fn group_map_from_json(value: &Value) -> BTreeMap<String, String> {
    object_entries(Some(value))
        .filter_map(|(name, group)| group.as_str().map(|g| (name.clone(), g.to_string())))
        .collect()
}
