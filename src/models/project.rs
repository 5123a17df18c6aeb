use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PROJECT_NAME: &str = "Personal Tasks";
pub const DEFAULT_PROJECT_DESCRIPTION: &str = "Default project for personal tasks";
pub const DEFAULT_PROJECT_ICON: &str = "📋";

pub const DEFAULT_PROJECT_COLORS: [&str; 10] = [
    "#3b82f6", // blue
    "#10b981", // green
    "#f59e0b", // yellow
    "#ef4444", // red
    "#8b5cf6", // purple
    "#06b6d4", // cyan
    "#f97316", // orange
    "#84cc16", // lime
    "#ec4899", // pink
    "#6b7280", // gray
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    /// UUID of the project
    pub id: Uuid,
    /// Name of the project
    pub name: String,
    /// Description of the project
    pub description: Option<String>,
    /// Hex color used when rendering the project
    pub color: String,
    /// Optional emoji icon
    pub icon: Option<String>,
    pub is_archived: bool,
    /// Manual ordering among projects
    pub order: i64,
    /// Created at timestamp of the project
    pub created_at: Timestamp,
    /// Updated at timestamp of the project
    pub updated_at: Timestamp,
}

#[derive(Debug, Default, Clone)]
pub struct AddProjectParameters {
    pub name: String,
    pub description: Option<String>,
    /// Falls back to the palette when absent
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_archived: bool,
}

#[derive(Debug, Default, Clone)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub icon: Option<Option<String>>,
    pub is_archived: Option<bool>,
}

impl ProjectPatch {
    pub fn apply(self, project: &mut Project) {
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
        if let Some(color) = self.color {
            project.color = color;
        }
        if let Some(icon) = self.icon {
            project.icon = icon;
        }
        if let Some(is_archived) = self.is_archived {
            project.is_archived = is_archived;
        }
        project.updated_at = Timestamp::now();
    }
}

/// Palette color for the n-th project.
pub fn palette_color(n: usize) -> &'static str {
    DEFAULT_PROJECT_COLORS[n % DEFAULT_PROJECT_COLORS.len()]
}
