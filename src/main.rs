//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Days, Local, NaiveDate};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdout};
use strum::IntoEnumIterator;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use gymbuddy_lib::{
    format_date_pl, format_day_month_pl, format_number, AppService, CardioField, CardioMetric,
    DailyProgress, DocumentKey, ExerciseEntry, GoalScope, GoalTarget, HeatLevel, HeatmapDay, Progress,
    SeriesPoint, SummaryMode, SummaryStats, WeekStats, WeeklyProgress,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let config_path = gymbuddy_lib::get_config_path_util()
        .context("Failed to determine configuration file path")?;
    let config = gymbuddy_lib::load_config_util(&config_path)
        .with_context(|| format!("Failed to load config from {config_path:?}"))?;
    init_tracing(&config.log_level);

    let mut service = AppService::open(config, config_path)
        .context("Failed to initialize application service")?;
    if let Err(e) = service.attach_sync_from_config() {
        warn!("Remote sync disabled: {}", e);
    }

    let result = run(&mut service, cli_args.command, export_csv).await;
    // Pending uploads would be lost when the runtime shuts down.
    service.flush_sync().await;
    result
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[allow(clippy::too_many_lines)]
async fn run(service: &mut AppService, command: cli::Commands, export_csv: bool) -> Result<()> {
    let header_color = service.config.table_header_color();

    match command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        // --- Daily log ---
        cli::Commands::Weight { weight, date } => {
            service.set_weight(date, weight)?;
            match weight {
                Some(w) => println!("Logged bodyweight {} kg on {}.", format_number(w), date),
                None => println!("Cleared bodyweight on {date}."),
            }
        }
        cli::Commands::Measure { name, value, date } => {
            service.set_measurement(date, &name, value)?;
            match value {
                Some(v) => println!("Logged {} = {} cm on {}.", name.trim(), format_number(v), date),
                None => println!("Cleared {} on {}.", name.trim(), date),
            }
        }
        cli::Commands::Sets { exercise, sets, date } => {
            let entry = ExerciseEntry::SetList(sets);
            service.set_exercise(date, &exercise, entry)?;
            print_logged_exercise(service, date, &exercise);
        }
        cli::Commands::SetGroup { exercise, sets, reps, date } => {
            if sets <= 0.0 || reps <= 0.0 {
                bail!("Sets and reps must both be positive.");
            }
            service.set_exercise(date, &exercise, ExerciseEntry::SetGroup { sets, reps })?;
            print_logged_exercise(service, date, &exercise);
        }
        cli::Commands::Total { exercise, reps, date } => {
            service.set_exercise(date, &exercise, ExerciseEntry::LegacyTotal(reps))?;
            print_logged_exercise(service, date, &exercise);
        }
        cli::Commands::ClearExercise { exercise, date } => {
            if service.clear_exercise(date, &exercise)? {
                println!("Removed '{exercise}' from {date}.");
            } else {
                println!("Nothing logged for '{exercise}' on {date}.");
            }
        }
        cli::Commands::Cardio { name, km, kcal, time, clear, date } => {
            let updates = [
                (CardioField::Km, km),
                (CardioField::Kcal, kcal),
                (CardioField::Time, time),
            ];
            if updates.iter().all(|(_, v)| v.is_none()) && clear.is_empty() {
                bail!("Nothing to log. Pass --km, --kcal, --time or --clear.");
            }
            for (field, value) in updates {
                if value.is_some() {
                    service.set_cardio_field(date, &name, field, value)?;
                }
            }
            for field in clear {
                service.set_cardio_field(date, &name, cardio_field_from_cli(field), None)?;
            }
            let entry = service
                .logs()
                .get(date)
                .and_then(|d| d.cardio.get(name.trim()))
                .copied()
                .unwrap_or_default();
            println!(
                "{} on {}: {} km, {} kcal, {} min",
                name.trim(),
                date,
                format_number(entry.km()),
                format_number(entry.kcal()),
                format_number(entry.time())
            );
        }
        cli::Commands::CopyLast { date } => {
            let source = service.copy_last_workout(date)?;
            println!(
                "Copied workout from {} ({}) to {}.",
                source,
                format_date_pl(source),
                date
            );
        }

        // --- Views ---
        cli::Commands::Summary { mode, date } => {
            let mode = mode.map_or(service.config.default_summary_mode, summary_mode_from_cli);
            let stats = service.summary(date, mode);
            if export_csv {
                print_summary_csv(&stats)?;
            } else {
                print_summary_table(&stats, mode, header_color);
            }
        }
        cli::Commands::Week { date } => {
            let stats = service.week_stats(date);
            let progress = service.weekly_goal_progress(date);
            if export_csv {
                print_week_csv(&stats)?;
            } else {
                print_week_table(&stats, &progress, header_color);
            }
        }
        cli::Commands::Today { date } => {
            let progress = service.daily_goal_progress(date);
            if export_csv {
                print_today_csv(&progress)?;
            } else {
                print_today_table(&progress, header_color);
            }
        }
        cli::Commands::Chart { days, end, exercise } => {
            let range = match days {
                Some(n) => {
                    let start = end.checked_sub_days(Days::new(u64::from(n) - 1)).unwrap_or(end);
                    gymbuddy_lib::DateRange::new(start, end)
                }
                None => service.default_chart_range(end),
            };
            let exercises = match exercise {
                Some(name) => vec![name],
                None => service.catalogs().exercises.clone(),
            };
            let series = service.series(range.start, range.end);
            print_series(&series, &exercises, export_csv, header_color)?;
        }
        cli::Commands::History { days, end } => {
            let start = end.checked_sub_days(Days::new(u64::from(days) - 1)).unwrap_or(end);
            let points = service.history(start, end);
            if points.is_empty() {
                println!("Nothing logged between {start} and {end}.");
            } else {
                print_history(&points, export_csv, header_color)?;
            }
        }
        cli::Commands::Records => {
            let records = service.personal_records();
            if records.is_empty() {
                println!("No personal records yet.");
            } else {
                let rows = records
                    .iter()
                    .map(|(name, record)| {
                        vec![
                            name.clone(),
                            format_number(record.max_reps),
                            record.date.to_string(),
                        ]
                    })
                    .collect();
                emit(&["Exercise", "Max reps", "Date"], rows, export_csv, header_color)?;
            }
        }
        cli::Commands::Heatmap { year, month } => {
            let today = Local::now().date_naive();
            let year = year.unwrap_or_else(|| today.year());
            let month = month.unwrap_or_else(|| today.month());
            let days = service.month_heatmap(year, month);
            if days.is_empty() {
                bail!("Invalid month {year}-{month:02}.");
            }
            if export_csv {
                print_heatmap_csv(&days)?;
            } else {
                print_heatmap_table(&days, header_color);
            }
        }

        // --- Catalogs ---
        cli::Commands::ListExercises => {
            let catalogs = service.catalogs();
            let rows = catalogs
                .exercises
                .iter()
                .map(|name| vec![name.clone(), catalogs.group_of(name).to_string()])
                .collect();
            emit(&["Exercise", "Group"], rows, export_csv, header_color)?;
        }
        cli::Commands::AddExercise { name, group } => {
            service.add_exercise(&name, group.as_deref())?;
            println!(
                "Added exercise '{}' ({}).",
                name.trim(),
                service.catalogs().group_of(name.trim())
            );
        }
        cli::Commands::RemoveExercise { name } => {
            service.remove_exercise(&name)?;
            println!("Removed exercise '{name}'. Logged history is kept.");
        }
        cli::Commands::SetGroupOf { exercise, group } => {
            service.set_exercise_group(&exercise, &group)?;
            println!("'{}' now belongs to {}.", exercise, group.trim());
        }
        cli::Commands::ListCardio => {
            let rows = service
                .catalogs()
                .cardio
                .iter()
                .map(|name| vec![name.clone()])
                .collect();
            emit(&["Cardio"], rows, export_csv, header_color)?;
        }
        cli::Commands::AddCardio { name } => {
            service.add_cardio(&name)?;
            println!("Added cardio '{}'.", name.trim());
        }
        cli::Commands::RemoveCardio { name } => {
            service.remove_cardio(&name)?;
            println!("Removed cardio '{name}'. Logged history is kept.");
        }

        // --- Goals ---
        cli::Commands::ListGoals => {
            let goals = service.goals();
            let mut rows = Vec::new();
            for scope in [GoalScope::Daily, GoalScope::Weekly] {
                for (name, target) in goals.scope(scope) {
                    rows.push(vec![scope.to_string(), name.clone(), describe_goal(target)]);
                }
            }
            emit(&["Scope", "Name", "Target"], rows, export_csv, header_color)?;
        }
        cli::Commands::SetGoal { scope, exercise, total, sets, reps } => {
            let target = match (total, sets, reps) {
                (Some(t), _, _) => GoalTarget::Total(t),
                (None, Some(sets), Some(reps)) => GoalTarget::SetGroup { sets, reps },
                _ => bail!("Pass either --total or both --sets and --reps."),
            };
            let scope = scope_from_cli(scope);
            service.set_goal(scope, &exercise, Some(target))?;
            println!("Set {} goal for '{}': {}.", scope, exercise.trim(), describe_goal(&target));
        }
        cli::Commands::SetCardioGoal { scope, cardio, metric, value } => {
            let scope = scope_from_cli(scope);
            let metric = metric_from_cli(metric);
            service.set_cardio_goal(scope, &cardio, metric, Some(value))?;
            println!(
                "Set {} {} goal for '{}': {}.",
                scope,
                metric,
                cardio.trim(),
                format_number(value)
            );
        }
        cli::Commands::ClearGoal { scope, name } => {
            let scope = scope_from_cli(scope);
            if service.clear_goal(scope, &name)? {
                println!("Cleared {scope} goal '{name}'.");
            } else {
                println!("No {scope} goal named '{name}'.");
            }
        }

        // --- Sync ---
        cli::Commands::Sync { action } => match action {
            cli::SyncAction::Pull => {
                let updated = service.pull_remote().await?;
                println!("Pulled {updated} document(s) from the remote store.");
            }
            cli::SyncAction::Push => {
                let sent = service.push_all().await?;
                println!("Pushed {sent} document(s) to the remote store.");
            }
        },

        // --- Config ---
        cli::Commands::SetChartRange { days } => {
            service.set_chart_range_days(days)?;
            println!("Chart range set to {days} day(s).");
        }
        cli::Commands::SetSummaryMode { mode } => {
            let mode = summary_mode_from_cli(mode);
            service.set_default_summary_mode(mode)?;
            println!("Default summary mode set to {mode}.");
        }
        cli::Commands::SetHeaderColor { color } => {
            service.set_header_color(&color)?;
            println!("Header color set to {}.", service.config.theme.header_color);
        }
        cli::Commands::SetDarkMode { enabled } => {
            service.set_dark_mode(enabled)?;
            println!("Dark mode {}.", if enabled { "enabled" } else { "disabled" });
        }
        cli::Commands::DbPath => {
            println!("Database file is located at: {:?}", service.db_path);
            for key in DocumentKey::iter() {
                if let Some(saved) = service.last_saved(key)? {
                    println!(
                        "  {} last saved {}",
                        key.as_str(),
                        saved.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
    }
    Ok(())
}

// --- CLI enum conversions ---

const fn scope_from_cli(scope: cli::ScopeCli) -> GoalScope {
    match scope {
        cli::ScopeCli::Daily => GoalScope::Daily,
        cli::ScopeCli::Weekly => GoalScope::Weekly,
    }
}

const fn summary_mode_from_cli(mode: cli::SummaryModeCli) -> SummaryMode {
    match mode {
        cli::SummaryModeCli::Day => SummaryMode::Day,
        cli::SummaryModeCli::Week => SummaryMode::Week,
        cli::SummaryModeCli::Month => SummaryMode::Month,
    }
}

const fn cardio_field_from_cli(field: cli::CardioFieldCli) -> CardioField {
    match field {
        cli::CardioFieldCli::Km => CardioField::Km,
        cli::CardioFieldCli::Kcal => CardioField::Kcal,
        cli::CardioFieldCli::Time => CardioField::Time,
    }
}

const fn metric_from_cli(metric: cli::CardioMetricCli) -> CardioMetric {
    match metric {
        cli::CardioMetricCli::Km => CardioMetric::Km,
        cli::CardioMetricCli::Time => CardioMetric::Time,
    }
}

// --- Output helpers ---

fn describe_goal(target: &GoalTarget) -> String {
    match target {
        GoalTarget::Total(total) => format_number(*total),
        GoalTarget::SetGroup { sets, reps } => {
            format!("{} × {}", format_number(*sets), format_number(*reps))
        }
    }
}

fn describe_progress(progress: &Progress) -> String {
    let marker = if progress.is_exceeded {
        " 🔥"
    } else if progress.is_done {
        " ✓"
    } else {
        ""
    };
    format!(
        "{}/{} ({:.0}%){}",
        format_number(progress.current),
        format_number(progress.target),
        progress.percent,
        marker
    )
}

fn optional_progress(progress: Option<&Progress>) -> String {
    progress.map_or_else(|| "-".to_string(), describe_progress)
}

fn print_logged_exercise(service: &AppService, date: NaiveDate, exercise: &str) {
    let entry = service
        .logs()
        .get(date)
        .and_then(|d| d.exercises.get(exercise.trim()));
    println!(
        "{} on {}: {} ({} reps)",
        exercise.trim(),
        date,
        gymbuddy_lib::format_history(entry),
        format_number(gymbuddy_lib::total_reps(entry))
    );
}

fn new_table(headers: &[&str], header_color: Color) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(header_color)));
    table
}

fn write_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Prints rows as a table, or as CSV with `--export-csv`.
fn emit(headers: &[&str], rows: Vec<Vec<String>>, export_csv: bool, header_color: Color) -> Result<()> {
    if export_csv {
        return write_csv(headers, &rows);
    }
    let mut table = new_table(headers, header_color);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
    Ok(())
}

fn summary_rows(stats: &SummaryStats) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec!["Total reps".to_string(), format_number(stats.total_reps)],
        vec!["Distance (km)".to_string(), format_number(stats.total_km)],
        vec!["Calories (kcal)".to_string(), format_number(stats.total_kcal)],
        vec!["Cardio time (min)".to_string(), format_number(stats.total_time)],
        vec![
            "Weight change (kg)".to_string(),
            stats.weight_diff_display().unwrap_or_else(|| "-".to_string()),
        ],
    ];
    for (name, reps) in &stats.exercise_stats {
        rows.push(vec![name.clone(), format_number(*reps)]);
    }
    rows
}

fn print_summary_table(stats: &SummaryStats, mode: SummaryMode, header_color: Color) {
    println!(
        "Summary ({}): {} - {}",
        mode,
        format_day_month_pl(stats.range.start),
        format_day_month_pl(stats.range.end)
    );
    let mut table = new_table(&["Metric", "Value"], header_color);
    for row in summary_rows(stats) {
        table.add_row(row);
    }
    println!("{table}");
}

fn print_summary_csv(stats: &SummaryStats) -> Result<()> {
    write_csv(&["Metric", "Value"], &summary_rows(stats))
}

fn print_week_table(stats: &WeekStats, progress: &WeeklyProgress, header_color: Color) {
    println!(
        "Week {} - {}",
        format_day_month_pl(stats.range.start),
        format_day_month_pl(stats.range.end)
    );

    let mut exercises = new_table(&["Exercise", "Reps", "Weekly goal"], header_color);
    for (name, reps) in &stats.exercises {
        let goal = progress.exercises.iter().find(|p| &p.name == name);
        exercises.add_row(vec![
            name.clone(),
            format_number(*reps),
            optional_progress(goal.map(|g| &g.progress)),
        ]);
    }
    for goal in &progress.exercises {
        if !stats.exercises.contains_key(&goal.name) {
            exercises.add_row(vec![goal.name.clone(), "0".to_string(), describe_progress(&goal.progress)]);
        }
    }
    println!("{exercises}");

    let mut cardio = new_table(&["Cardio", "km", "Time (min)", "km goal", "Time goal"], header_color);
    for (name, totals) in &stats.cardio {
        let goal = progress.cardio.iter().find(|p| &p.name == name);
        cardio.add_row(vec![
            name.clone(),
            format_number(totals.km),
            format_number(totals.time),
            optional_progress(goal.and_then(|g| g.km.as_ref())),
            optional_progress(goal.and_then(|g| g.time.as_ref())),
        ]);
    }
    for goal in &progress.cardio {
        if !stats.cardio.contains_key(&goal.name) {
            cardio.add_row(vec![
                goal.name.clone(),
                "0".to_string(),
                "0".to_string(),
                optional_progress(goal.km.as_ref()),
                optional_progress(goal.time.as_ref()),
            ]);
        }
    }
    println!("{cardio}");
}

fn print_week_csv(stats: &WeekStats) -> Result<()> {
    let mut rows: Vec<Vec<String>> = stats
        .exercises
        .iter()
        .map(|(name, reps)| vec![name.clone(), format_number(*reps), String::new(), String::new()])
        .collect();
    for (name, totals) in &stats.cardio {
        rows.push(vec![
            name.clone(),
            String::new(),
            format_number(totals.km),
            format_number(totals.time),
        ]);
    }
    write_csv(&["Name", "Reps", "Km", "Time_min"], &rows)
}

fn print_today_table(progress: &DailyProgress, header_color: Color) {
    let weight = progress
        .weight
        .map_or_else(String::new, |w| format!(" ({} kg)", format_number(w)));
    println!("{}{}", format_date_pl(progress.date), weight);

    let mut exercises = new_table(&["Exercise", "Group", "Logged", "Daily goal", "Sets"], header_color);
    for ex in &progress.exercises {
        let sets = ex
            .sets
            .iter()
            .map(|s| format!("{}{}", format_number(s.current), if s.is_done { "✓" } else { "" }))
            .collect::<Vec<_>>()
            .join(" ");
        exercises.add_row(vec![
            ex.name.clone(),
            ex.group.clone(),
            if ex.detail.is_empty() { "-".to_string() } else { ex.detail.clone() },
            optional_progress(ex.progress.as_ref()),
            sets,
        ]);
    }
    println!("{exercises}");

    let mut cardio = new_table(
        &["Cardio", "km", "kcal", "Time (min)", "km goal", "Time goal"],
        header_color,
    );
    for c in &progress.cardio {
        let goals = c.goals.as_ref();
        cardio.add_row(vec![
            c.name.clone(),
            format_number(c.km),
            format_number(c.kcal),
            format_number(c.time),
            optional_progress(goals.and_then(|g| g.km.as_ref())),
            optional_progress(goals.and_then(|g| g.time.as_ref())),
        ]);
    }
    println!("{cardio}");
}

fn print_today_csv(progress: &DailyProgress) -> Result<()> {
    let mut rows: Vec<Vec<String>> = progress
        .exercises
        .iter()
        .map(|ex| {
            vec![
                ex.name.clone(),
                format_number(ex.total),
                ex.progress.map_or_else(String::new, |p| format_number(p.target)),
                String::new(),
                String::new(),
                String::new(),
            ]
        })
        .collect();
    for c in &progress.cardio {
        rows.push(vec![
            c.name.clone(),
            String::new(),
            String::new(),
            format_number(c.km),
            format_number(c.kcal),
            format_number(c.time),
        ]);
    }
    write_csv(&["Name", "Reps", "Reps_goal", "Km", "Kcal", "Time_min"], &rows)
}

fn print_series(
    series: &[SeriesPoint],
    exercises: &[String],
    export_csv: bool,
    header_color: Color,
) -> Result<()> {
    let mut headers = vec!["Date", "Weight (kg)"];
    headers.extend(exercises.iter().map(String::as_str));
    headers.extend(["km", "kcal", "Time (min)"]);

    let rows = series
        .iter()
        .map(|point| {
            let mut row = vec![
                if export_csv {
                    point.date.to_string()
                } else {
                    format_day_month_pl(point.date)
                },
                point.weight.map_or_else(String::new, format_number),
            ];
            row.extend(exercises.iter().map(|ex| format_number(point.exercise(ex))));
            row.extend([
                format_number(point.cardio_km),
                format_number(point.cardio_kcal),
                format_number(point.cardio_time),
            ]);
            row
        })
        .collect();
    emit(&headers, rows, export_csv, header_color)
}

fn print_history(points: &[SeriesPoint], export_csv: bool, header_color: Color) -> Result<()> {
    let rows = points
        .iter()
        .map(|point| {
            let exercises = point
                .exercises
                .iter()
                .filter(|(_, reps)| **reps != 0.0)
                .map(|(name, reps)| format!("{}: {}", name, format_number(*reps)))
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                if export_csv {
                    point.date.to_string()
                } else {
                    format_date_pl(point.date)
                },
                point.weight.map_or_else(String::new, format_number),
                exercises,
                format_number(point.cardio_km),
                format_number(point.cardio_time),
            ]
        })
        .collect();
    emit(
        &["Date", "Weight (kg)", "Exercises", "km", "Time (min)"],
        rows,
        export_csv,
        header_color,
    )
}

const fn heat_marker(level: HeatLevel) -> &'static str {
    match level {
        HeatLevel::Fire => "🔥",
        HeatLevel::Empty => "",
        HeatLevel::Light => "░",
        HeatLevel::Medium => "▒",
        HeatLevel::Strong => "█",
    }
}

fn print_heatmap_table(days: &[HeatmapDay], header_color: Color) {
    let mut table = new_table(&["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"], header_color);
    let leading = days
        .first()
        .map_or(0, |d| d.date.weekday().num_days_from_monday() as usize);

    let mut cells: Vec<String> = vec![String::new(); leading];
    cells.extend(
        days.iter()
            .map(|d| format!("{:>2}{}", d.day, heat_marker(d.level()))),
    );
    for week in cells.chunks(7) {
        let mut row = week.to_vec();
        row.resize(7, String::new());
        table.add_row(row);
    }
    println!("{table}");
    println!("░ 1-2  ▒ 3-4  █ 5+  🔥 daily goals beaten");
}

fn print_heatmap_csv(days: &[HeatmapDay]) -> Result<()> {
    let rows: Vec<Vec<String>> = days
        .iter()
        .map(|d| {
            vec![
                d.date.to_string(),
                d.intensity.to_string(),
                d.is_fire.to_string(),
                d.level().to_string(),
            ]
        })
        .collect();
    write_csv(&["Date", "Intensity", "Is_fire", "Level"], &rows)
}
