// src/cli.rs
use chrono::{Days, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use gymbuddy_lib::SetEntry;

#[derive(Parser, Debug)]
#[command(author, version, about = "A workout journal: daily logs, goals and summaries", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Print tables as CSV instead
    #[arg(long, global = true)]
    pub export_csv: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeCli {
    Daily,
    Weekly,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryModeCli {
    Day,
    Week,
    Month,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardioFieldCli {
    Km,
    Kcal,
    Time,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardioMetricCli {
    Km,
    Time,
}

// Custom parser for date strings and shorthands
pub fn parse_date_shorthand(s: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match s.to_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| "Date out of range".to_string()),
        _ => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
            .map_err(|_| {
                format!(
                    "Invalid date format: '{s}'. Use 'today', 'yesterday', YYYY-MM-DD, DD.MM.YYYY, or YYYY/MM/DD."
                )
            }),
    }
}

/// Parses one set: `REPS`, `REPSxKG` or `REPS@KG` (e.g. `12`, `10x22.5`).
pub fn parse_set(s: &str) -> Result<SetEntry, String> {
    let (reps_str, weight_str) = match s.split_once(['x', 'X', '@']) {
        Some((r, w)) => (r, Some(w)),
        None => (s, None),
    };
    let reps: f64 = reps_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid reps in set '{s}'. Use REPS or REPSxKG, e.g. 10x22.5."))?;
    if !reps.is_finite() || reps <= 0.0 {
        return Err(format!("Reps must be a positive number in set '{s}'."));
    }
    let weight = match weight_str {
        Some(w) => Some(
            w.trim()
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|_| format!("Invalid weight in set '{s}'."))?,
        ),
        None => None,
    };
    Ok(SetEntry::new(reps, weight))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log your bodyweight (omit the value to clear it)
    Weight {
        /// Bodyweight in kg
        weight: Option<f64>,
        /// Date ('today', 'yesterday', YYYY-MM-DD, DD.MM.YYYY, YYYY/MM/DD)
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Log a body measurement in cm (omit the value to clear it)
    Measure {
        /// Measurement name (e.g. "waist")
        name: String,
        value: Option<f64>,
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Log individual sets for an exercise, e.g. `sets Pompki 20 18 15x10`
    Sets {
        exercise: String,
        /// Sets as REPS or REPSxKG
        #[arg(required = true, value_parser = parse_set)]
        sets: Vec<SetEntry>,
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Log a uniform block of sets for an exercise
    SetGroup {
        exercise: String,
        #[arg(short, long)]
        sets: f64,
        #[arg(short, long)]
        reps: f64,
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Log a plain rep total for an exercise
    Total {
        exercise: String,
        reps: f64,
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Remove an exercise result from a day
    ClearExercise {
        exercise: String,
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Log cardio distance, calories and/or time
    Cardio {
        /// Cardio activity (e.g. "Bieganie")
        name: String,
        #[arg(long)]
        km: Option<f64>,
        #[arg(long)]
        kcal: Option<f64>,
        /// Minutes
        #[arg(long)]
        time: Option<f64>,
        /// Fields to clear
        #[arg(long, value_enum)]
        clear: Vec<CardioFieldCli>,
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Copy exercises and cardio from the last earlier workout
    CopyLast {
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Totals for a day, week or month
    Summary {
        /// Defaults to the configured summary mode
        #[arg(short, long, value_enum)]
        mode: Option<SummaryModeCli>,
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Weekly totals and weekly goal progress
    Week {
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// A day's exercises and cardio against daily goals
    Today {
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        date: NaiveDate,
    },
    /// Day-by-day series for charting
    Chart {
        /// Number of days to show (defaults to the configured chart range)
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        /// Last day of the chart
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        end: NaiveDate,
        /// Only show this exercise besides weight and cardio
        #[arg(short, long)]
        exercise: Option<String>,
    },
    /// Days with anything logged, newest first
    History {
        #[arg(short = 'n', long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
        days: u32,
        #[arg(long, value_parser = parse_date_shorthand, default_value = "today")]
        end: NaiveDate,
    },
    /// Best single effort per exercise
    Records,
    /// Monthly activity calendar
    Heatmap {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// List cataloged exercises with their muscle groups
    ListExercises,
    /// Add an exercise to the catalog
    AddExercise {
        name: String,
        /// Muscle group: Klatka, Plecy, Nogi, Barki, Biceps, Triceps, Brzuch or Inne
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Remove an exercise from the catalog (logged history is kept)
    RemoveExercise { name: String },
    /// Change the muscle group of an exercise
    SetGroupOf { exercise: String, group: String },
    /// List cataloged cardio activities
    ListCardio,
    /// Add a cardio activity to the catalog
    AddCardio { name: String },
    /// Remove a cardio activity from the catalog (logged history is kept)
    RemoveCardio { name: String },
    /// List daily and weekly goals
    ListGoals,
    /// Set an exercise goal, either a total or sets x reps
    SetGoal {
        #[arg(value_enum)]
        scope: ScopeCli,
        exercise: String,
        #[arg(long, conflicts_with_all = ["sets", "reps"], required_unless_present = "sets")]
        total: Option<f64>,
        #[arg(long, requires = "reps")]
        sets: Option<f64>,
        #[arg(long, requires = "sets")]
        reps: Option<f64>,
    },
    /// Set a cardio distance or time goal
    SetCardioGoal {
        #[arg(value_enum)]
        scope: ScopeCli,
        cardio: String,
        #[arg(value_enum)]
        metric: CardioMetricCli,
        value: f64,
    },
    /// Remove a goal (use NAME_km / NAME_time for cardio goals)
    ClearGoal {
        #[arg(value_enum)]
        scope: ScopeCli,
        name: String,
    },
    /// Exchange documents with the remote store
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
    /// Set how many days `chart` shows by default
    SetChartRange {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        days: u32,
    },
    /// Set the summary mode used when `summary` gets no --mode
    SetSummaryMode {
        #[arg(value_enum)]
        mode: SummaryModeCli,
    },
    /// Set the table header color (e.g. Green, DarkBlue)
    SetHeaderColor { color: String },
    /// Enable or disable dark mode (true/false)
    SetDarkMode {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    GenerateCompletion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum SyncAction {
    /// Replace local documents with the remote copies
    Pull,
    /// Upload every local document now
    Push,
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
