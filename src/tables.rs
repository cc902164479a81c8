use crate::schema::*;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::deserialize::{FromSql, Result};
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{IsNull, Output, ToSql};
use diesel::sql_types::Jsonb;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

// * Subtasks .................................................................

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub order: i32,
}

/// Ordered subtask list, stored inline on the task row as JSONB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[serde(transparent)]
#[diesel(sql_type = Jsonb)]
pub struct Subtasks(pub Vec<Subtask>);

impl ToSql<Jsonb, Pg> for Subtasks {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> diesel::serialize::Result {
        // JSONB binary format: a version byte followed by the JSON text
        out.write_all(&[1])?;
        serde_json::to_writer(&mut *out, &self.0)?;
        Ok(IsNull::No)
    }
}

impl FromSql<Jsonb, Pg> for Subtasks {
    fn from_sql(bytes: PgValue) -> Result<Self> {
        let bytes = bytes.as_bytes();
        match bytes.split_first() {
            Some((&1, json)) => Ok(Subtasks(serde_json::from_slice(json)?)),
            _ => Err("Unsupported JSONB encoding version".into()),
        }
    }
}

impl Subtasks {
    /// Sorts by `order`, then rewrites `order` to match the position.
    pub fn normalize(&mut self) {
        self.0.sort_by_key(|s| s.order);
        for (index, subtask) in self.0.iter_mut().enumerate() {
            subtask.order = index as i32;
        }
    }

    pub fn find_mut(&mut self, subtask_id: &str) -> Option<&mut Subtask> {
        self.0.iter_mut().find(|s| s.id == subtask_id)
    }
}

// * Tasks ....................................................................

#[derive(Debug, Queryable, Selectable, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::tasks)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i32,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub subtasks: Subtasks,
    pub goal_ids: Vec<i32>,
    pub background_color: Option<String>,
    pub is_saved: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub completed: bool,
    pub date: Option<NaiveDate>,
    pub scheduled_time: Option<&'a str>,
    pub sort_order: i32,
    pub subtasks: Subtasks,
    pub goal_ids: Vec<i32>,
    pub background_color: Option<&'a str>,
    pub is_saved: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial update; `None` fields are left untouched.
#[derive(AsChangeset, Default)]
#[diesel(table_name = tasks)]
pub struct TaskChangeset {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub sort_order: Option<i32>,
    pub subtasks: Option<Subtasks>,
    pub goal_ids: Option<Vec<i32>>,
    pub background_color: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn get_by_id(
        conn: &mut PgConnection,
        owner: &str,
        task_id: i32,
    ) -> diesel::QueryResult<Task> {
        use crate::schema::tasks::dsl::*;
        tasks
            .filter(id.eq(task_id))
            .filter(user_id.eq(owner))
            .select(Task::as_select())
            .first(conn)
    }

    pub fn for_day(
        conn: &mut PgConnection,
        owner: &str,
        day: NaiveDate,
    ) -> diesel::QueryResult<Vec<Task>> {
        use crate::schema::tasks::dsl::*;
        tasks
            .filter(user_id.eq(owner))
            .filter(date.eq(day))
            .order((sort_order.asc(), id.asc()))
            .select(Task::as_select())
            .load(conn)
    }

    pub fn for_range(
        conn: &mut PgConnection,
        owner: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> diesel::QueryResult<Vec<Task>> {
        use crate::schema::tasks::dsl::*;
        tasks
            .filter(user_id.eq(owner))
            .filter(date.ge(from))
            .filter(date.le(to))
            .order((date.asc(), sort_order.asc(), id.asc()))
            .select(Task::as_select())
            .load(conn)
    }
}

// * Sections .................................................................

#[derive(Debug, Queryable, Selectable, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::sections)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: i32,
    pub user_id: String,
    pub text: String,
    pub time: String,
    pub date: NaiveDate,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub background_color: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sections)]
pub struct NewSection<'a> {
    pub user_id: &'a str,
    pub text: &'a str,
    pub time: &'a str,
    pub date: NaiveDate,
    pub sort_order: i32,
    pub background_color: Option<&'a str>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = sections)]
pub struct SectionChangeset {
    pub text: Option<String>,
    pub time: Option<String>,
    pub date: Option<NaiveDate>,
    pub sort_order: Option<i32>,
    pub background_color: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Section {
    pub fn for_day(
        conn: &mut PgConnection,
        owner: &str,
        day: NaiveDate,
    ) -> diesel::QueryResult<Vec<Section>> {
        use crate::schema::sections::dsl::*;
        sections
            .filter(user_id.eq(owner))
            .filter(date.eq(day))
            .order((sort_order.asc(), id.asc()))
            .select(Section::as_select())
            .load(conn)
    }

    pub fn for_range(
        conn: &mut PgConnection,
        owner: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> diesel::QueryResult<Vec<Section>> {
        use crate::schema::sections::dsl::*;
        sections
            .filter(user_id.eq(owner))
            .filter(date.ge(from))
            .filter(date.le(to))
            .order((date.asc(), sort_order.asc(), id.asc()))
            .select(Section::as_select())
            .load(conn)
    }
}

// * Goals ....................................................................

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressType {
    Percentage,
    Numerical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown value: {0}")]
pub struct UnknownVariant(pub String);

impl ProgressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressType::Percentage => "percentage",
            ProgressType::Numerical => "numerical",
        }
    }
}

impl FromStr for ProgressType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(ProgressType::Percentage),
            "numerical" => Ok(ProgressType::Numerical),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Archived => "archived",
        }
    }
}

impl FromStr for GoalStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "archived" => Ok(GoalStatus::Archived),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Queryable, Selectable, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::goals)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i32,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub progress: i32,
    pub progress_type: String,
    pub current_step: i32,
    pub total_steps: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = goals)]
pub struct NewGoal<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub deadline: Option<NaiveDate>,
    pub progress: i32,
    pub progress_type: &'a str,
    pub current_step: i32,
    pub total_steps: i32,
    pub status: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = goals)]
pub struct GoalChangeset {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub progress: Option<i32>,
    pub progress_type: Option<String>,
    pub current_step: Option<i32>,
    pub total_steps: Option<i32>,
    pub status: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

// * Titles and timestamps ....................................................

#[derive(Debug, Queryable, Selectable, Insertable, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::titles)]
#[serde(rename_all = "camelCase")]
pub struct DayTitle {
    pub user_id: String,
    pub date: NaiveDate,
    pub title: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Queryable, Selectable, Insertable, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::timestamps)]
#[serde(rename_all = "camelCase")]
pub struct UserTimestamp {
    pub user_id: String,
    pub name: String,
    pub value: NaiveDateTime,
}

impl UserTimestamp {
    /// Inserts or replaces the named timestamp for a user.
    pub fn upsert(conn: &mut PgConnection, stamp: &UserTimestamp) -> diesel::QueryResult<usize> {
        use crate::schema::timestamps::dsl::*;
        diesel::insert_into(timestamps)
            .values(stamp)
            .on_conflict((user_id, name))
            .do_update()
            .set(value.eq(stamp.value))
            .execute(conn)
    }
}
