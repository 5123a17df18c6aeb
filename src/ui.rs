use colored::*;
use jiff::{Timestamp, tz::TimeZone};
use uuid::Uuid;

use taskflow::{
    models::{
        project::Project,
        store::Store,
        task::{Priority, Task},
        tree,
    },
    services::{
        calendar::{self, CalendarDay},
        views::TaskStats,
    },
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// First eight hex digits; enough to resolve a task from the command line.
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

pub fn get_status_glyph(task: &Task, now: Timestamp) -> ColoredString {
    if task.archived {
        "▪".dimmed()
    } else if task.completed {
        "✓".dimmed()
    } else if task.is_overdue(now) {
        "●".red()
    } else {
        "○".normal()
    }
}

fn priority_marker(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => "!!".red().bold(),
        Priority::Medium => "! ".yellow(),
        Priority::Low => "  ".normal(),
    }
}

/// `#rrggbb` to a truecolor swatch; anything else renders plain.
fn swatch(color: &str) -> ColoredString {
    let hex = color.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range).and_then(|c| u8::from_str_radix(c, 16).ok())
    };
    match (hex.len(), channel(0..2), channel(2..4), channel(4..6)) {
        (6, Some(r), Some(g), Some(b)) => "■".truecolor(r, g, b),
        _ => "■".normal(),
    }
}

/// Right-hand context of a task line: category, schedule and project.
fn task_context(task: &Task, store: &Store, tz: &TimeZone) -> String {
    let mut parts = vec![];
    if let Some(category) = &task.category {
        parts.push(format!("#{category}"));
    }
    if let Some(range) = calendar::time_range(task, tz) {
        parts.push(range);
    } else if let Some(due) = task.due_date {
        let zoned = due.to_zoned(tz.clone());
        if zoned.time() == jiff::civil::Time::midnight() {
            parts.push(format!("Due {}", zoned.strftime("%b %-d")));
        } else {
            parts.push(format!("Due {}", zoned.strftime("%b %-d %-I:%M %p")));
        }
    }
    if let Some(project) = task.project_id.and_then(|id| store.get_project(id)) {
        parts.push(project.name.clone());
    }
    parts.join("  ·  ")
}

fn print_aligned(left: ColoredString, left_visible_len: usize, right: &str) {
    let terminal_width = get_terminal_width();
    let right_visible_len = right.chars().count();
    let total_content = left_visible_len + right_visible_len;

    if !right.is_empty() && total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!("{}{}{}", left, " ".repeat(padding), right.dimmed());
    } else if !right.is_empty() {
        println!("{}  {}", left, right.dimmed());
    } else {
        println!("{}", left);
    }
}

/// One task and, when expanded, its subtasks in manual order.
pub fn render_task_tree(task: &Task, store: &Store, depth: usize, now: Timestamp, tz: &TimeZone) {
    let indent = "    ".repeat(depth);
    let id_str = short_id(task.id);
    let glyph = get_status_glyph(task, now);
    let fold = match (task.subtasks.is_empty(), task.is_expanded) {
        (true, _) => " ",
        (false, true) => "▾",
        (false, false) => "▸",
    };
    let hidden = if !task.subtasks.is_empty() && !task.is_expanded {
        format!(" (+{})", task.subtasks.len())
    } else {
        String::new()
    };

    let plain = format!("  {indent}{id_str} {fold} o     {}{hidden}", task.title);
    let left = format!(
        "  {indent}{} {fold} {glyph} {}  {}{}",
        id_str.dimmed(),
        priority_marker(task.priority),
        task.title,
        hidden.dimmed()
    );
    let styled_left = if task.completed || task.archived {
        left.dimmed()
    } else {
        left.bold()
    };

    print_aligned(styled_left, plain.chars().count(), &task_context(task, store, tz));

    if task.is_expanded {
        for subtask in tree::ordered(&task.subtasks) {
            render_task_tree(subtask, store, depth + 1, now, tz);
        }
    }
}

/// Single task with every field, for `show`-style output after edits.
pub fn render_task_details(task: &Task, store: &Store, tz: &TimeZone) {
    println!("\n  {} {}", short_id(task.id).dimmed(), task.title.bold());
    if let Some(description) = &task.description {
        println!("    {}", description);
    }
    println!("    {} {}", "priority".dimmed(), task.priority.as_str());
    if let Some(project) = task.project_id.and_then(|id| store.get_project(id)) {
        println!("    {} {}", "project".dimmed(), project.name);
    }
    if let Some(range) = calendar::time_range(task, tz) {
        println!("    {} {}", "time".dimmed(), range);
    }
    if let Some(due) = task.due_date {
        println!("    {} {}", "due".dimmed(), due.to_zoned(tz.clone()).strftime("%a %b %-d %Y, %-I:%M %p"));
    }
    if let Some(minutes) = task.duration {
        println!("    {} {}", "duration".dimmed(), calendar::format_duration(minutes));
    }
    println!();
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let task_word = if count == 1 { "task" } else { "tasks" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, task_word);
}

/// Render a section header (e.g., "Sunday, Jun 9")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

pub fn render_stats(title: &str, stats: &TaskStats) {
    println!("\n  {}\n", title.cyan().bold());
    let rows = [
        ("Total", stats.total.to_string().normal()),
        ("Active", stats.active.to_string().normal()),
        ("Completed", stats.completed.to_string().green()),
        ("Archived", stats.archived.to_string().dimmed()),
        ("High priority", stats.high_priority.to_string().yellow()),
        ("Overdue", stats.overdue.to_string().red()),
    ];
    for (label, value) in rows {
        println!("  {:<15}{}", label, value);
    }
    println!();
}

pub fn render_project_line(project: &Project, task_count: usize, is_current: bool) {
    let marker = if is_current { "▶".green() } else { " ".normal() };
    let icon = project.icon.as_deref().unwrap_or(" ");
    let name = if project.is_archived {
        project.name.dimmed()
    } else {
        project.name.bold()
    };
    let count = format!("({} {})", task_count, if task_count == 1 { "task" } else { "tasks" });
    println!(
        "  {} {} {} {}  {}",
        marker,
        swatch(&project.color),
        icon,
        name,
        count.dimmed()
    );
    if let Some(description) = &project.description {
        println!("        {}", description.dimmed());
    }
}

/// Day cell with its tasks, used by the day and week views.
pub fn render_calendar_day(day: &CalendarDay<'_>, tz: &TimeZone) {
    let title = day.date.strftime("%A, %b %-d").to_string();
    let title = if day.is_today {
        format!("{title} (today)")
    } else {
        title
    };
    render_section_header(&title);

    if day.tasks.is_empty() {
        println!("    {}", "Nothing scheduled".dimmed());
        return;
    }
    for task in &day.tasks {
        let time = calendar::display_time(task, tz)
            .map(|label| label.to_string())
            .unwrap_or_default();
        let range = calendar::time_range(task, tz).unwrap_or_default();
        let glyph = if task.completed { "✓".dimmed() } else { "○".normal() };
        println!(
            "    {} {:<12} {}  {}",
            glyph,
            time,
            task.title.bold(),
            range.dimmed()
        );
    }
}

/// Seven columns, Sunday first, one row per week with task counts.
pub fn render_month_grid(days: &[CalendarDay<'_>]) {
    let header = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
        .map(|d| format!("{d:<8}"))
        .join("");
    println!("  {}", header.cyan());

    for week in days.chunks(7) {
        let mut row = String::new();
        for day in week {
            let count = if day.tasks.is_empty() {
                String::new()
            } else {
                format!("({})", day.tasks.len())
            };
            let cell = format!("{:>2} {:<5}", day.date.day(), count);
            let cell = if day.is_today {
                cell.green().bold()
            } else if day.in_month {
                cell.normal()
            } else {
                cell.dimmed()
            };
            row.push_str(&format!("{cell} "));
        }
        println!("  {}", row);
    }
    println!();
}
