//! Midnight rollover: unfinished work moves to the next day.
//!
//! For a given day, completed tasks and sections dated on or before that day
//! are deleted, and incomplete tasks are moved to the following day, placed
//! after whatever is already scheduled there.

use crate::api::Pool;
use crate::tables::{Section, Task, UserTimestamp};
use crate::tracker::TRACKER;
use crate::LAST_TASK_MOVE;
use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

/// Writes needed to roll one user's list over to the next day.
#[derive(Debug, Default, PartialEq)]
pub struct RolloverPlan {
    pub target: Option<NaiveDate>,
    pub delete_tasks: Vec<i32>,
    pub delete_sections: Vec<i32>,
    /// `(task id, new order)` for each task moved to the target day.
    pub moves: Vec<(i32, i32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverSummary {
    pub target_date: NaiveDate,
    pub deleted_tasks: usize,
    pub deleted_sections: usize,
    pub moved_tasks: usize,
}

/// Plans the rollover of `day`.
///
/// `tasks` and `sections` may contain anything; only dated, non-template
/// items on or before `day` are considered. `next_day_max_order` is the
/// highest order already used on the following day.
pub fn plan_rollover(
    tasks: &[Task],
    sections: &[Section],
    next_day_max_order: Option<i32>,
    day: NaiveDate,
) -> RolloverPlan {
    let mut stale: Vec<&Task> = tasks
        .iter()
        .filter(|t| !t.is_saved && t.date.is_some_and(|d| d <= day))
        .collect();
    stale.sort_by_key(|t| (t.date, t.sort_order, t.id));

    let mut next_order = next_day_max_order.map_or(0, |max| max + 1);
    let mut plan = RolloverPlan {
        target: day.succ_opt(),
        ..Default::default()
    };

    for task in stale {
        if task.completed {
            plan.delete_tasks.push(task.id);
        } else {
            plan.moves.push((task.id, next_order));
            next_order += 1;
        }
    }

    plan.delete_sections = sections
        .iter()
        .filter(|s| s.date <= day)
        .map(|s| s.id)
        .collect();

    plan
}

/// True when the last recorded rollover happened before `today`.
pub fn is_due(last_run: Option<NaiveDateTime>, today: NaiveDate) -> bool {
    last_run.map_or(true, |t| t.date() < today)
}

/// Runs the rollover of `day` for one user in a single transaction.
pub fn move_incomplete_tasks_to_next_day(
    conn: &mut PgConnection,
    owner: &str,
    day: NaiveDate,
    now: NaiveDateTime,
) -> QueryResult<RolloverSummary> {
    let Some(target) = day.succ_opt() else {
        return Err(diesel::result::Error::NotFound);
    };

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let stale_tasks = {
            use crate::schema::tasks::dsl::*;
            tasks
                .filter(user_id.eq(owner))
                .filter(date.le(day))
                .select(Task::as_select())
                .load(conn)?
        };
        let stale_sections = {
            use crate::schema::sections::dsl::*;
            sections
                .filter(user_id.eq(owner))
                .filter(date.le(day))
                .select(Section::as_select())
                .load(conn)?
        };
        let next_max = next_day_max_order(conn, owner, target)?;
        TRACKER.record_reads(stale_tasks.len() + stale_sections.len() + 2);

        let plan = plan_rollover(&stale_tasks, &stale_sections, next_max, day);

        let deleted_tasks = {
            use crate::schema::tasks::dsl::*;
            diesel::delete(tasks.filter(id.eq_any(&plan.delete_tasks))).execute(conn)?
        };
        let deleted_sections = {
            use crate::schema::sections::dsl::*;
            diesel::delete(sections.filter(id.eq_any(&plan.delete_sections))).execute(conn)?
        };
        for &(task_id, new_order) in &plan.moves {
            use crate::schema::tasks::dsl::*;
            diesel::update(tasks.find(task_id))
                .set((date.eq(target), sort_order.eq(new_order), updated_at.eq(now)))
                .execute(conn)?;
        }

        UserTimestamp::upsert(
            conn,
            &UserTimestamp {
                user_id: owner.to_string(),
                name: LAST_TASK_MOVE.to_string(),
                value: now,
            },
        )?;
        TRACKER.record_writes(plan.moves.len() + 3);

        Ok(RolloverSummary {
            target_date: target,
            deleted_tasks,
            deleted_sections,
            moved_tasks: plan.moves.len(),
        })
    })
}

fn next_day_max_order(
    conn: &mut PgConnection,
    owner: &str,
    target: NaiveDate,
) -> QueryResult<Option<i32>> {
    use diesel::dsl::max;

    let task_max: Option<i32> = {
        use crate::schema::tasks::dsl::*;
        tasks
            .filter(user_id.eq(owner))
            .filter(date.eq(target))
            .select(max(sort_order))
            .first(conn)?
    };
    let section_max: Option<i32> = {
        use crate::schema::sections::dsl::*;
        sections
            .filter(user_id.eq(owner))
            .filter(date.eq(target))
            .select(max(sort_order))
            .first(conn)?
    };
    Ok(task_max.max(section_max))
}

/// Users with dated items whose last rollover is older than `today`.
pub fn due_users(conn: &mut PgConnection, today: NaiveDate) -> QueryResult<Vec<String>> {
    let mut owners: BTreeSet<String> = {
        use crate::schema::tasks::dsl::*;
        tasks
            .filter(date.lt(today))
            .select(user_id)
            .distinct()
            .load::<String>(conn)?
            .into_iter()
            .collect()
    };
    {
        use crate::schema::sections::dsl::*;
        owners.extend(
            sections
                .filter(date.lt(today))
                .select(user_id)
                .distinct()
                .load::<String>(conn)?,
        );
    }

    let last_runs: Vec<(String, NaiveDateTime)> = {
        use crate::schema::timestamps::dsl::*;
        timestamps
            .filter(name.eq(LAST_TASK_MOVE))
            .select((user_id, value))
            .load(conn)?
    };
    TRACKER.record_reads(owners.len() + last_runs.len());

    Ok(owners
        .into_iter()
        .filter(|owner| {
            let last = last_runs
                .iter()
                .find(|(u, _)| u == owner)
                .map(|(_, v)| *v);
            is_due(last, today)
        })
        .collect())
}

/// Rolls every due user over into `today`.
pub fn run_due_rollovers(pool: &Pool, today: NaiveDate) -> anyhow::Result<usize> {
    let mut conn = pool.get()?;
    let yesterday = today - ChronoDuration::days(1);
    let owners = due_users(&mut conn, today)?;
    let now = Local::now().naive_local();

    for owner in &owners {
        match move_incomplete_tasks_to_next_day(&mut conn, owner, yesterday, now) {
            Ok(summary) => info!(
                user = %owner,
                moved = summary.moved_tasks,
                deleted = summary.deleted_tasks,
                "Rolled tasks over to {}",
                summary.target_date
            ),
            Err(e) => error!(user = %owner, "Rollover failed: {}", e),
        }
    }
    Ok(owners.len())
}

/// Spawns the polling loop that triggers rollovers after midnight.
pub fn spawn_scheduler(pool: Arc<Pool>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            let today = Local::now().date_naive();
            match run_due_rollovers(&pool, today) {
                Ok(0) => debug!("No rollovers due"),
                Ok(n) => info!("Ran rollover for {} users", n),
                Err(e) => error!("Rollover check failed: {}", e),
            }
        }
    })
}
