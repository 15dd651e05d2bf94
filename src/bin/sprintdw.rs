use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use sprintdw::timestamp::RawTimestamp;
use sprintdw::{AnalysisWindow, RawSnapshot, SprintDW, SprintReport};

#[derive(Parser)]
#[command(name = "sprintdw", about = "Sprint burndown and delivery metrics")]
struct Cli {
    /// Database path (default: ~/.sprintdw/sprintdw.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ReportArgs {
    /// Snapshot JSON file (default: config `snapshot_path`)
    #[arg(long)]
    snapshot: Option<String>,
    /// Evaluate as of this instant (YYYY-MM-DD or RFC 3339; default: now)
    #[arg(long)]
    as_of: Option<String>,
    /// Analysis window (e.g. 7d, 30d, 90d, sprint; default: config `velocity_window` or 30d)
    #[arg(long)]
    window: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily ideal vs. actual remaining points
    Burndown(ReportArgs),
    /// Completed points per trailing week
    Velocity(ReportArgs),
    /// Per-task cycle times and their distribution
    CycleTime(ReportArgs),
    /// Workload and throughput per collaborator
    Contributors(ReportArgs),
    /// Tasks created vs. completed per day
    Trend(ReportArgs),
    /// Sprint rollup
    Summary(ReportArgs),
    /// Every series at once
    Report(ReportArgs),
    /// Manage manual burndown overrides
    Override {
        #[command(subcommand)]
        action: OverrideAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum OverrideAction {
    /// Record the remaining points for one day
    Set {
        /// Day to correct (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Remaining points on that day
        #[arg(long)]
        remaining: i64,
        /// Free-text note shown on the chart
        #[arg(long)]
        note: Option<String>,
        /// Who made the correction (default: config `user_name`)
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        snapshot: Option<String>,
    },
    /// Remove the override for one day
    Remove {
        #[arg(long)]
        date: String,
        #[arg(long)]
        snapshot: Option<String>,
    },
    /// List stored overrides for the sprint
    List {
        #[arg(long)]
        snapshot: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[derive(Clone, Copy)]
enum View {
    Burndown,
    Velocity,
    CycleTime,
    Contributors,
    Trend,
    Summary,
    Full,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => sprintdw::Database::open_at(path).await?,
        None => sprintdw::Database::open().await?,
    };
    let dw = SprintDW::new(db);

    match cli.command {
        Commands::Burndown(args) => handle_report(&dw, View::Burndown, args).await?,
        Commands::Velocity(args) => handle_report(&dw, View::Velocity, args).await?,
        Commands::CycleTime(args) => handle_report(&dw, View::CycleTime, args).await?,
        Commands::Contributors(args) => handle_report(&dw, View::Contributors, args).await?,
        Commands::Trend(args) => handle_report(&dw, View::Trend, args).await?,
        Commands::Summary(args) => handle_report(&dw, View::Summary, args).await?,
        Commands::Report(args) => handle_report(&dw, View::Full, args).await?,
        Commands::Override { action } => handle_override(&dw, action).await?,
        Commands::Config { action } => handle_config(&dw, action).await?,
    }

    Ok(())
}

/// Snapshot path from the flag, else from stored config.
async fn load_snapshot(dw: &SprintDW, flag: Option<String>) -> anyhow::Result<RawSnapshot> {
    let path = match flag {
        Some(p) => p,
        None => dw
            .config_get(sprintdw::CONFIG_SNAPSHOT_PATH)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No snapshot given. Pass --snapshot or run \
                     'sprintdw config set snapshot_path <file>'."
                )
            })?,
    };
    log::debug!("Loading snapshot from {path}");
    Ok(RawSnapshot::load(&path)?)
}

fn parse_as_of(as_of: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match as_of {
        None => Ok(Utc::now()),
        Some(s) => RawTimestamp::Text(s.to_string())
            .to_instant()
            .ok_or_else(|| anyhow::anyhow!("Invalid --as-of '{s}'. Use YYYY-MM-DD or RFC 3339.")),
    }
}

async fn handle_report(dw: &SprintDW, view: View, args: ReportArgs) -> anyhow::Result<()> {
    let raw = load_snapshot(dw, args.snapshot).await?;
    let now = parse_as_of(args.as_of.as_deref())?;
    let window = match &args.window {
        Some(w) => AnalysisWindow::parse(w)?,
        None => dw.default_window().await?,
    };
    let report = dw.report(&raw, window, now).await?;

    if args.json {
        let out = match view {
            View::Burndown => serde_json::to_string_pretty(&report.burndown)?,
            View::Velocity => serde_json::to_string_pretty(&report.velocity)?,
            View::CycleTime => serde_json::to_string_pretty(&report.cycle_time)?,
            View::Contributors => serde_json::to_string_pretty(&report.contributors)?,
            View::Trend => serde_json::to_string_pretty(&report.completion_trend)?,
            View::Summary => serde_json::to_string_pretty(&report.summary)?,
            View::Full => serde_json::to_string_pretty(&report)?,
        };
        println!("{out}");
        return Ok(());
    }

    println!(
        "Sprint {} (as of {}, window {})",
        report.sprint_key,
        now.format("%Y-%m-%d %H:%M UTC"),
        report.window
    );
    match view {
        View::Burndown => print_burndown(&report),
        View::Velocity => print_velocity(&report),
        View::CycleTime => print_cycle_time(&report),
        View::Contributors => print_contributors(&report),
        View::Trend => print_trend(&report),
        View::Summary => print_summary(&report),
        View::Full => {
            print_summary(&report);
            print_burndown(&report);
            print_velocity(&report);
            print_cycle_time(&report);
            print_contributors(&report);
            print_trend(&report);
        }
    }
    Ok(())
}

async fn handle_override(dw: &SprintDW, action: OverrideAction) -> anyhow::Result<()> {
    match action {
        OverrideAction::Set {
            date,
            remaining,
            note,
            by,
            snapshot,
        } => {
            if remaining < 0 {
                anyhow::bail!("--remaining must be zero or more (got {remaining})");
            }
            let raw = load_snapshot(dw, snapshot).await?;
            let snap = dw.snapshot(&raw, Utc::now()).await?;
            let date = sprintdw::date_util::parse_date_key(&date)?;
            let by = match by {
                Some(b) => Some(b),
                None => dw.config_get(sprintdw::CONFIG_USER_NAME).await?,
            };
            let entry = dw.override_set(&snap, date, remaining, note, by).await?;
            println!(
                "Override saved: {} remaining {} (completed {})",
                entry.date, entry.remaining_points, entry.completed_points
            );
        }
        OverrideAction::Remove { date, snapshot } => {
            let raw = load_snapshot(dw, snapshot).await?;
            let sprint_key = raw.ingest(Utc::now()).sprint.key();
            let date = sprintdw::date_util::parse_date_key(&date)?;
            if dw.override_remove(&sprint_key, date).await? {
                println!("Override removed for {date}.");
            } else {
                println!("No override stored for {date}.");
            }
        }
        OverrideAction::List { snapshot, json } => {
            let raw = load_snapshot(dw, snapshot).await?;
            let sprint_key = raw.ingest(Utc::now()).sprint.key();
            let entries = dw.override_list(&sprint_key).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No overrides stored for {sprint_key}.");
            } else {
                println!("{:<12} {:>9} {:>9}  {:<12} Note", "Date", "Remaining", "Completed", "By");
                for e in &entries {
                    println!(
                        "{:<12} {:>9} {:>9}  {:<12} {}",
                        e.date.to_string(),
                        e.remaining_points,
                        e.completed_points,
                        e.updated_by.as_deref().unwrap_or("-"),
                        e.note.as_deref().unwrap_or("")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_config(dw: &SprintDW, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match dw.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            dw.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = dw.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

fn print_summary(r: &SprintReport) {
    let s = &r.summary;
    println!("  Summary:");
    if let Some(goal) = &s.sprint_goal {
        println!("    Goal:        {goal}");
    }
    println!(
        "    Points:      {}/{} done ({:.1}%), {} remaining",
        s.completed_points, s.total_points, s.completion_rate, s.remaining_points
    );
    println!("    Working day: {}/{}", s.working_days_elapsed, s.working_days_total);
    match s.velocity_target {
        Some(target) => println!(
            "    Velocity:    {:.1}/wk avg, {:.1} predicted, target {target:.1}",
            s.avg_velocity, s.predicted_velocity
        ),
        None => println!(
            "    Velocity:    {:.1}/wk avg, {:.1} predicted",
            s.avg_velocity, s.predicted_velocity
        ),
    }
    println!("    Projected:   {}", s.projected_completion);
    println!("    Efficiency:  {:.1}%", s.team_efficiency);
    println!("    Cycle time:  {:.1} days avg", s.avg_cycle_time);
}

fn print_burndown(r: &SprintReport) {
    println!("  Burndown:");
    println!("    {:<12} {:>8} {:>8}", "Date", "Ideal", "Actual");
    for p in &r.burndown {
        let mut flags = Vec::new();
        if p.is_today {
            flags.push("today");
        }
        if !p.is_working_day {
            flags.push("off");
        }
        if p.is_manual {
            flags.push("manual");
        }
        if p.is_projected {
            flags.push("projected");
        }
        let note = p.note.as_deref().map(|n| format!(" \"{n}\"")).unwrap_or_default();
        println!(
            "    {:<12} {:>8.1} {:>8.1} {}{}",
            p.date.to_string(),
            p.ideal_remaining,
            p.actual_remaining,
            flags.join(","),
            note
        );
    }
}

fn print_velocity(r: &SprintReport) {
    println!("  Velocity:");
    for b in &r.velocity {
        println!(
            "    {:<8} {} .. {}  {:>4} pts / {:>4} cap ({:.0}%)  {:+}",
            b.label, b.start, b.end, b.completed, b.capacity, b.utilization, b.trend
        );
    }
}

fn print_cycle_time(r: &SprintReport) {
    let ct = &r.cycle_time;
    println!("  Cycle Time:");
    match (ct.stats.median_days, ct.stats.p90_days) {
        (Some(median), Some(p90)) => {
            println!("    Measured: {} tasks", ct.stats.tasks_measured);
            println!("    Average:  {:.1} days", ct.stats.avg_days);
            println!("    Median:   {median:.1} days");
            println!("    P90:      {p90:.1} days");
            println!(
                "    Range:    {}-{} days",
                ct.stats.min_days.unwrap_or(0),
                ct.stats.max_days.unwrap_or(0)
            );
        }
        _ => println!("    No tasks with both start and done events"),
    }
    for b in &ct.distribution {
        println!("    {:<10} {:>4} ({}%)", b.bucket, b.count, b.percentage);
    }
}

fn print_contributors(r: &SprintReport) {
    println!("  Contributors:");
    if r.contributors.is_empty() {
        println!("    None");
        return;
    }
    for c in &r.contributors {
        println!(
            "    {:<20} {}/{} tasks, {}/{} pts, workload {}, \
             {:.1}% eff, {:.1} pts/wk, {:.1}d cycle",
            c.name,
            c.tasks_completed,
            c.tasks_total,
            c.points_completed,
            c.points_total,
            c.workload,
            c.efficiency,
            c.velocity,
            c.avg_cycle_time
        );
    }
}

fn print_trend(r: &SprintReport) {
    println!("  Completion Trend:");
    println!(
        "    {:<12} {:>7} {:>9} {:>5} {:>10}",
        "Date", "Created", "Completed", "Net", "Cumulative"
    );
    for t in &r.completion_trend {
        println!(
            "    {:<12} {:>7} {:>9} {:>+5} {:>10}",
            t.date.to_string(),
            t.created,
            t.completed,
            t.net,
            t.cumulative
        );
    }
}
