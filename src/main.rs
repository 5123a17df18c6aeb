use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};
use colored::*;
use jiff::{Timestamp, Zoned, civil::Date, tz::TimeZone};
use tracing::{info, warn};
use uuid::Uuid;

use taskflow::{
    Workspace,
    config::{Config, init_logging},
    input::{CliError, check_span, parse_date, parse_instant, require_title, resolve_duration},
    models::{
        project::{AddProjectParameters, ProjectPatch},
        task::{AddTaskParameters, Priority, TaskPatch},
        tree,
    },
    services::{
        calendar::{CalendarDay, week_start},
        views::{Filter, SortKey},
    },
    storage::{
        json::JsonFileStorage,
        legacy::{LegacyImport, import_legacy},
        writer::BackgroundWriter,
    },
};

mod ui;

type App = Workspace<BackgroundWriter<JsonFileStorage>>;

#[derive(Parser)]
#[command(
    name = "taskflow",
    about = "Nested tasks, projects and a calendar for your terminal"
)]
struct Cli {
    /// Store file (defaults to $TASKFLOW_STORE, then the data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show root tasks with their expanded subtasks
    List {
        #[arg(short, long, value_enum, default_value_t)]
        filter: Filter,

        #[arg(short, long, value_enum, default_value_t)]
        sort: SortKey,

        /// Match title, description or category, subtasks included
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Only tasks of this project
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Add a root task to the current project
    Add {
        title: String,

        #[command(flatten)]
        fields: TaskFields,

        /// Assign to a project instead of the current one
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Add a subtask under an existing task
    Sub {
        /// Parent task id, id prefix or title
        parent: String,

        title: String,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// Change fields of a task
    Edit {
        /// Task id, id prefix or title
        task: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        #[command(flatten)]
        fields: TaskFields,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// Remove start, end and duration
        #[arg(long)]
        clear_schedule: bool,
    },

    /// Toggle completion of a task
    Done { task: String },

    /// Toggle whether a task shows its subtasks
    Expand { task: String },

    /// Archive a task
    Archive { task: String },

    /// Restore an archived task
    Unarchive { task: String },

    /// Archive every completed task
    ArchiveCompleted,

    /// Delete every completed task and whatever sits under it
    ClearCompleted,

    /// Delete a task with its subtasks
    Delete { task: String },

    /// Move a task from one position to another among its siblings
    Reorder {
        /// Position to move from (1-based)
        from: usize,

        /// Position to move to (1-based)
        to: usize,

        /// Reorder the subtasks of this task instead of the root list
        #[arg(long)]
        parent: Option<String>,
    },

    /// Re-attach a task under another task, or at the root
    Move {
        task: String,

        /// New parent; omit to promote to a root task
        #[arg(long)]
        under: Option<String>,
    },

    /// Show counters for all tasks or one project
    Stats {
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Show scheduled tasks
    #[command(subcommand)]
    Calendar(CalendarCommands),

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),
}

#[derive(Debug, clap::Args)]
struct TaskFields {
    /// Free-form notes
    #[arg(short, long)]
    description: Option<String>,

    /// Category label
    #[arg(short, long)]
    category: Option<String>,

    #[arg(short = 'P', long, value_enum)]
    priority: Option<Priority>,

    /// Deadline (e.g. "tomorrow", "2025-03-01", "2025-03-01 14:00")
    #[arg(long)]
    due: Option<String>,

    /// Start of the scheduled time
    #[arg(long)]
    start: Option<String>,

    /// End of the scheduled time
    #[arg(long)]
    end: Option<String>,

    /// Duration in minutes (defaults to the start/end span)
    #[arg(long)]
    duration: Option<i64>,
}

#[derive(Debug, Subcommand)]
enum CalendarCommands {
    /// Tasks on one day
    Day {
        #[arg(short, long)]
        date: Option<String>,
    },
    /// The week containing a day, Sunday first
    Week {
        #[arg(short, long)]
        date: Option<String>,
    },
    /// The month containing a day
    Month {
        #[arg(short, long)]
        date: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ProjectCommands {
    /// Create a new project
    New {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Hex color such as #10b981
        #[arg(short, long)]
        color: Option<String>,
        #[arg(short, long)]
        icon: Option<String>,
    },
    /// List active projects
    List {
        /// Show archived projects instead
        #[arg(long)]
        archived: bool,
    },
    /// Change fields of a project
    Edit {
        project: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        color: Option<String>,
        #[arg(short, long)]
        icon: Option<String>,
    },
    /// Archive a project
    Archive { project: String },
    /// Restore an archived project
    Unarchive { project: String },
    /// Delete a project and its tasks
    Delete { project: String },
    /// Move a project in the active list (1-based positions)
    Reorder { from: usize, to: usize },
    /// Select the project new tasks go to
    Use {
        project: Option<String>,
        /// Clear the current project
        #[arg(long, conflicts_with = "project")]
        none: bool,
    },
}

/// Wall-clock context shared by every command.
struct Clock {
    now: Timestamp,
    today: Date,
    tz: TimeZone,
}

fn main() {
    let cli = Cli::parse();
    let config = Config::resolve(cli.store.clone(), cli.log_level.clone());
    init_logging(&config.log_level);

    if let Err(e) = run(cli, &config) {
        eprintln!("{} {}", "Error:".red(), e);
        if let CliError::ResolveTask(_) | CliError::ResolveProject(_) = e {
            eprintln!("Use an id prefix from `taskflow list` to pick a single match");
        }
        process::exit(1);
    }
}

fn run(cli: Cli, config: &Config) -> Result<(), CliError> {
    let storage = JsonFileStorage::new(config.store_path.clone()).with_backup_limit(config.backup_limit);

    match import_legacy(&storage, &config.legacy_path) {
        Ok(LegacyImport::Imported { tasks }) => {
            println!("Imported {} tasks from {}", tasks, config.legacy_path.display());
        }
        Ok(LegacyImport::Skipped { existing_tasks }) => {
            info!(existing_tasks, "legacy import skipped");
        }
        Ok(LegacyImport::NoLegacyFile) => {}
        Err(e) => warn!(error = %e, "legacy import failed"),
    }

    let writer = BackgroundWriter::spawn(
        JsonFileStorage::new(config.store_path.clone()).with_backup_limit(config.backup_limit),
    );
    let mut workspace = Workspace::open(&storage, writer)?;

    let zoned = Zoned::now();
    let clock = Clock {
        now: zoned.timestamp(),
        today: zoned.date(),
        tz: zoned.time_zone().clone(),
    };

    let command = cli.command.unwrap_or(Commands::List {
        filter: Filter::default(),
        sort: SortKey::default(),
        search: None,
        project: None,
    });
    let result = execute(&mut workspace, command, &clock);

    workspace.close().shutdown();
    result
}

fn execute(workspace: &mut App, command: Commands, clock: &Clock) -> Result<(), CliError> {
    match command {
        Commands::List {
            filter,
            sort,
            search,
            project,
        } => {
            let project = project.map(|p| workspace.resolve_project(&p)).transpose()?;
            workspace.set_filter(filter);
            workspace.set_sort(sort);
            workspace.set_search(search.unwrap_or_default());
            workspace.set_project_scope(project);

            let visible = workspace.visible_tasks();
            if visible.is_empty() {
                println!("No tasks");
                return Ok(());
            }
            let title = match project.and_then(|id| workspace.project(id)) {
                Some(project) => project.name.clone(),
                None => String::from("Tasks"),
            };
            ui::render_view_header(&title, visible.len());
            for task in visible {
                ui::render_task_tree(task, workspace.store(), 0, clock.now, &clock.tz);
            }
        }
        Commands::Add {
            title,
            fields,
            project,
        } => {
            let title = require_title(&title)?;
            let project_id = project.map(|p| workspace.resolve_project(&p)).transpose()?;
            let mut parameters = new_task_parameters(title, fields, clock)?;
            parameters.project_id = project_id;

            let task = workspace.add_task(parameters);
            println!("{} {} {}", "Added".green(), ui::short_id(task.id).dimmed(), task.title.bold());
        }
        Commands::Sub {
            parent,
            title,
            fields,
        } => {
            let title = require_title(&title)?;
            let parent_id = workspace.resolve_task(&parent)?;
            let parameters = new_task_parameters(title, fields, clock)?;

            if let Some(task) = workspace.add_subtask(parent_id, parameters) {
                println!("{} {} {}", "Added".green(), ui::short_id(task.id).dimmed(), task.title.bold());
            }
        }
        Commands::Edit {
            task,
            title,
            fields,
            clear_due,
            clear_schedule,
        } => {
            let id = workspace.resolve_task(&task)?;
            let patch = edit_patch(workspace, id, title, fields, clear_due, clear_schedule, clock)?;
            if patch.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            workspace.update_task(id, patch);
            if let Some(task) = workspace.task(id) {
                ui::render_task_details(task, workspace.store(), &clock.tz);
            }
        }
        Commands::Done { task } => {
            let id = workspace.resolve_task(&task)?;
            if let Some(completed) = workspace.toggle_completed(id) {
                let title = workspace.task(id).map(|t| t.title.clone()).unwrap_or_default();
                if completed {
                    println!("{} {}", "Completed".green(), title.bold());
                } else {
                    println!("{} {}", "Reopened".yellow(), title.bold());
                }
            }
        }
        Commands::Expand { task } => {
            let id = workspace.resolve_task(&task)?;
            if let Some(expanded) = workspace.toggle_expanded(id) {
                println!("{}", if expanded { "Expanded" } else { "Collapsed" });
            }
        }
        Commands::Archive { task } => {
            let id = workspace.resolve_task(&task)?;
            if workspace.archive_task(id) {
                println!("{}", "Archived".dimmed());
            }
        }
        Commands::Unarchive { task } => {
            let id = workspace.resolve_task(&task)?;
            if workspace.unarchive_task(id) {
                println!("Restored");
            }
        }
        Commands::ArchiveCompleted => {
            let count = workspace.archive_completed();
            println!("Archived {} completed {}", count, plural(count, "task"));
        }
        Commands::ClearCompleted => {
            let count = workspace.clear_completed();
            println!("Deleted {} {}", count, plural(count, "task"));
        }
        Commands::Delete { task } => {
            let id = workspace.resolve_task(&task)?;
            if let Some(removed) = workspace.delete_task(id) {
                let subtasks = tree::count(&removed.subtasks);
                if subtasks > 0 {
                    println!(
                        "{} {} and {} {}",
                        "Deleted".red(),
                        removed.title.bold(),
                        subtasks,
                        plural(subtasks, "subtask")
                    );
                } else {
                    println!("{} {}", "Deleted".red(), removed.title.bold());
                }
            }
        }
        Commands::Reorder { from, to, parent } => {
            let container = parent.map(|p| workspace.resolve_task(&p)).transpose()?;
            let (from, to) = (zero_based(from)?, zero_based(to)?);
            if !workspace.move_sibling(container, from, to) {
                return Err(CliError::InvalidPosition(from.max(to) + 1));
            }
            println!("Reordered");
        }
        Commands::Move { task, under } => {
            let id = workspace.resolve_task(&task)?;
            let parent = under.map(|p| workspace.resolve_task(&p)).transpose()?;
            workspace.move_task(id, parent)?;
            match parent.and_then(|p| workspace.task(p)) {
                Some(parent) => println!("Moved under {}", parent.title.bold()),
                None => println!("Moved to the root list"),
            }
        }
        Commands::Stats { project } => match project {
            Some(project) => {
                let id = workspace.resolve_project(&project)?;
                let stats = workspace.project_stats(id, clock.now);
                let name = workspace.project(id).map(|p| p.name.clone()).unwrap_or_default();
                ui::render_stats(&name, &stats);
            }
            None => ui::render_stats("All tasks", &workspace.stats(clock.now)),
        },
        Commands::Calendar(command) => execute_calendar(workspace, command, clock)?,
        Commands::Project(command) => execute_project(workspace, command)?,
    }
    Ok(())
}

fn execute_calendar(workspace: &App, command: CalendarCommands, clock: &Clock) -> Result<(), CliError> {
    let anchor = |date: Option<String>| match date {
        Some(date) => parse_date(&date, clock.today),
        None => Ok(clock.today),
    };

    match command {
        CalendarCommands::Day { date } => {
            let date = anchor(date)?;
            let day = CalendarDay {
                date,
                in_month: true,
                is_today: date == clock.today,
                tasks: workspace.tasks_on(date, &clock.tz),
            };
            ui::render_calendar_day(&day, &clock.tz);
        }
        CalendarCommands::Week { date } => {
            let date = anchor(date)?;
            let week = workspace.week_view(date, clock.today, &clock.tz);
            let count: usize = week.iter().map(|d| d.tasks.len()).sum();
            ui::render_view_header(
                &format!("Week of {}", week_start(date).strftime("%b %-d")),
                count,
            );
            for day in &week {
                ui::render_calendar_day(day, &clock.tz);
            }
        }
        CalendarCommands::Month { date } => {
            let date = anchor(date)?;
            let month = workspace.month_view(date, clock.today, &clock.tz);
            let count: usize = month.iter().filter(|d| d.in_month).map(|d| d.tasks.len()).sum();
            ui::render_view_header(&date.strftime("%B %Y").to_string(), count);
            ui::render_month_grid(&month);
        }
    }
    Ok(())
}

fn execute_project(workspace: &mut App, command: ProjectCommands) -> Result<(), CliError> {
    match command {
        ProjectCommands::New {
            name,
            description,
            color,
            icon,
        } => {
            let name = require_title(&name)?;
            let project = workspace.add_project(AddProjectParameters {
                name,
                description,
                color,
                icon,
                is_archived: false,
            });
            println!("{} {}", "Created project".green(), project.name.bold());
        }
        ProjectCommands::List { archived } => {
            let current = workspace.current_project().map(|p| p.id);
            let projects = if archived {
                workspace.archived_projects()
            } else {
                workspace.active_projects()
            };
            if projects.is_empty() {
                println!("No projects");
                return Ok(());
            }
            let heading = if archived { "ARCHIVED PROJECTS" } else { "PROJECTS" };
            println!("\n  {}\n", heading.cyan());
            for project in projects {
                let count = workspace.project_task_count(project.id);
                ui::render_project_line(project, count, current == Some(project.id));
            }
            println!();
        }
        ProjectCommands::Edit {
            project,
            name,
            description,
            color,
            icon,
        } => {
            let id = workspace.resolve_project(&project)?;
            let name = name.map(|n| require_title(&n)).transpose()?;
            let patch = ProjectPatch {
                name,
                description: description.map(non_empty),
                color,
                icon: icon.map(non_empty),
                is_archived: None,
            };
            workspace.update_project(id, patch);
            println!("Updated project");
        }
        ProjectCommands::Archive { project } => {
            let id = workspace.resolve_project(&project)?;
            workspace.archive_project(id);
            println!("{}", "Archived project".dimmed());
        }
        ProjectCommands::Unarchive { project } => {
            let id = workspace.resolve_project(&project)?;
            workspace.unarchive_project(id);
            println!("Restored project");
        }
        ProjectCommands::Delete { project } => {
            let id = workspace.resolve_project(&project)?;
            if let Some(result) = workspace.delete_project(id) {
                println!(
                    "{} {} ({} {} removed)",
                    "Deleted project".red(),
                    result.project.name.bold(),
                    result.cascaded_tasks_count,
                    plural(result.cascaded_tasks_count, "task")
                );
            }
        }
        ProjectCommands::Reorder { from, to } => {
            let (from, to) = (zero_based(from)?, zero_based(to)?);
            if !workspace.reorder_projects(from, to) {
                return Err(CliError::InvalidPosition(from.max(to) + 1));
            }
            println!("Reordered projects");
        }
        ProjectCommands::Use { project, none } => {
            match (project, none) {
                (Some(project), _) => {
                    let id = workspace.resolve_project(&project)?;
                    workspace.set_current_project(Some(id));
                }
                (None, true) => {
                    workspace.set_current_project(None);
                }
                (None, false) => {}
            }
            match workspace.current_project() {
                Some(project) => println!("Now using {}", project.name.bold()),
                None => println!("No current project"),
            }
        }
    }
    Ok(())
}

fn new_task_parameters(
    title: String,
    fields: TaskFields,
    clock: &Clock,
) -> Result<AddTaskParameters, CliError> {
    let instant = |value: Option<String>| {
        value
            .map(|v| parse_instant(&v, clock.today, &clock.tz))
            .transpose()
    };
    let due_date = instant(fields.due)?;
    let start_date_time = instant(fields.start)?;
    let end_date_time = instant(fields.end)?;
    check_span(start_date_time, end_date_time)?;

    Ok(AddTaskParameters {
        title,
        description: fields.description,
        category: fields.category,
        priority: fields.priority.unwrap_or_default(),
        completed: false,
        due_date,
        start_date_time,
        end_date_time,
        duration: resolve_duration(fields.duration, start_date_time, end_date_time),
        project_id: None,
    })
}

/// Builds the patch for `edit`. The duration follows a changed start/end
/// span unless one is given explicitly.
fn edit_patch(
    workspace: &App,
    id: Uuid,
    title: Option<String>,
    fields: TaskFields,
    clear_due: bool,
    clear_schedule: bool,
    clock: &Clock,
) -> Result<TaskPatch, CliError> {
    let instant = |value: Option<String>| {
        value
            .map(|v| parse_instant(&v, clock.today, &clock.tz))
            .transpose()
    };
    let title = title.map(|t| require_title(&t)).transpose()?;
    let due = instant(fields.due)?;
    let start = instant(fields.start)?;
    let end = instant(fields.end)?;

    let mut patch = TaskPatch {
        title,
        description: fields.description.map(non_empty),
        category: fields.category.map(non_empty),
        priority: fields.priority,
        due_date: due.map(Some),
        duration: fields.duration.map(Some),
        ..TaskPatch::default()
    };
    if clear_due {
        patch.due_date = Some(None);
    }

    if clear_schedule {
        patch.start_date_time = Some(None);
        patch.end_date_time = Some(None);
        patch.duration = Some(None);
    } else if start.is_some() || end.is_some() {
        let existing = workspace.task(id);
        let start = start.or_else(|| existing.and_then(|t| t.start_date_time));
        let end = end.or_else(|| existing.and_then(|t| t.end_date_time));
        check_span(start, end)?;

        patch.start_date_time = Some(start);
        patch.end_date_time = Some(end);
        if let Some(minutes) = resolve_duration(fields.duration, start, end) {
            patch.duration = Some(Some(minutes));
        }
    }
    Ok(patch)
}

/// Empty input clears an optional field.
fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn zero_based(position: usize) -> Result<usize, CliError> {
    position.checked_sub(1).ok_or(CliError::InvalidPosition(position))
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
