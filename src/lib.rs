pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod ordering;
pub mod preferences;
pub mod rollover;
pub mod schema;
pub mod stats;
pub mod tables;
pub mod time_input;
pub mod tracker;

pub const BASE_URL: &str = "http://localhost:37241";
pub const TASKS_API: &str = "tasks";
pub const SECTIONS_API: &str = "sections";
pub const GOALS_API: &str = "goals";
pub const TITLES_API: &str = "titles";
pub const TIMESTAMPS_API: &str = "timestamps";
pub const DAYS_API: &str = "days";
pub const PLANNER_API: &str = "planner";
pub const STATS_API: &str = "stats";
pub const AUTH_API: &str = "auth";

/// Header carrying the authenticated user id, set by the auth gateway.
pub const USER_HEADER: &str = "x-user-id";

/// Timestamp name recorded after each midnight rollover.
pub const LAST_TASK_MOVE: &str = "lastTaskMoveTime";

/// Number of days shown by the planner view.
pub const PLANNER_DAYS: i64 = 7;
