use serde::{Deserialize, Serialize};

/// Who a task or calendar item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Operator,
    Agent,
}

/// Task board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Inbox,
    Next,
    Doing,
    Blocked,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarStatus {
    Planned,
    Active,
    Done,
    Canceled,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $($ty::$variant => $text,)+
                };
                write!(f, "{s}")
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($ty))),
                }
            }
        }
    };
}

text_enum!(Owner { Operator => "operator", Agent => "agent" });
text_enum!(TaskStatus {
    Inbox => "inbox",
    Next => "next",
    Doing => "doing",
    Blocked => "blocked",
    Done => "done",
});
text_enum!(CalendarStatus {
    Planned => "planned",
    Active => "active",
    Done => "done",
    Canceled => "canceled",
});

/// A manually planned calendar entry. Never touched by the cron cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItem {
    pub id: String,
    pub title: String,
    pub owner: Owner,
    pub status: CalendarStatus,
    /// ISO-8601 start time as entered by the user.
    pub scheduled_for: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCalendarItem {
    pub title: String,
    pub owner: Owner,
    pub status: CalendarStatus,
    pub scheduled_for: String,
    #[serde(default)]
    pub duration_min: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; only the fields present are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItemPatch {
    pub title: Option<String>,
    pub owner: Option<Owner>,
    pub status: Option<CalendarStatus>,
    pub scheduled_for: Option<String>,
    pub duration_min: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub owner: Owner,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds; bumped on every update.
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: Owner,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub owner: Option<Owner>,
    pub status: Option<TaskStatus>,
}

/// Dashboard preferences, stored as the `settings` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub operator_nickname: String,
    pub agent_nickname: String,
    pub openclaw_workspace_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            operator_nickname: "Operator".to_string(),
            agent_nickname: "Agent".to_string(),
            openclaw_workspace_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub operator_nickname: Option<String>,
    pub agent_nickname: Option<String>,
    pub openclaw_workspace_dir: Option<String>,
}
