use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use daybook_rest_api::auth::AuthMode;
use daybook_rest_api::client::{self, CreateGoalRequest, CreateSectionRequest, CreateTaskRequest};
use daybook_rest_api::client::{ListGoalsParams, ListSectionsParams, ListTasksParams};
use daybook_rest_api::client::UpdateTaskRequest;
use daybook_rest_api::config::Config;
use daybook_rest_api::preferences::{Preferences, DEFAULT_PREFERENCES_FILE};
use daybook_rest_api::tables::ProgressType;
use daybook_rest_api::time_input::format_time_from_input;
use daybook_rest_api::{api, rollover};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// The address to bind to, overrides DAYBOOK_ADDR
        #[arg(short, long)]
        addr: Option<SocketAddr>,
    },
    /// Client commands
    Client {
        /// The base URL of the API
        #[arg(long, default_value = daybook_rest_api::BASE_URL)]
        url: String,
        /// User id sent with every request
        #[arg(long, env = "DAYBOOK_USER")]
        user: String,
        /// Display preferences applied to day and planner views
        #[arg(long, default_value = DEFAULT_PREFERENCES_FILE)]
        prefs: PathBuf,
        #[command(subcommand)]
        command: ClientCommands,
    },
    /// Normalize a typed time such as `930` to `09:30`
    Time { input: String },
    /// Local display preferences
    Prefs {
        #[arg(long, default_value = DEFAULT_PREFERENCES_FILE)]
        file: PathBuf,
        #[command(subcommand)]
        command: PrefsCommands,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    Sections {
        #[command(subcommand)]
        command: SectionCommands,
    },
    Goals {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Show one day
    Day { date: NaiveDate },
    /// Show the seven-day planner
    Planner {
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Drag an item of a day list from one index to another
    Move {
        date: NaiveDate,
        drag_index: usize,
        hover_index: usize,
    },
    /// Set the title of a day
    Title { date: NaiveDate, title: String },
    /// Move unfinished tasks of a day to the next day
    Rollover {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Completion stats for a week
    Stats {
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Server-wide read/write counters
    Operations,
    /// Check credentials against the sign-up or login rules
    Validate {
        email: String,
        password: String,
        #[arg(long)]
        signup: bool,
    },
    Health,
}

#[derive(Subcommand)]
enum TaskCommands {
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only library templates
        #[arg(long)]
        saved: bool,
    },
    Get {
        id: i32,
    },
    Create {
        title: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
        #[arg(long = "goal")]
        goal_ids: Vec<i32>,
    },
    Update {
        id: i32,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<String>,
    },
    Toggle {
        id: i32,
    },
    Delete {
        id: i32,
    },
    /// Copy a task into the library
    Save {
        id: i32,
    },
    /// Schedule a copy of a library template
    Instantiate {
        id: i32,
        date: NaiveDate,
    },
    /// Append a subtask
    Subtask {
        id: i32,
        title: String,
    },
}

#[derive(Subcommand)]
enum SectionCommands {
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Create {
        text: String,
        time: String,
        date: NaiveDate,
    },
    Delete {
        id: i32,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    List,
    Create {
        title: String,
        /// Track progress in steps instead of a percentage
        #[arg(long)]
        steps: Option<i32>,
    },
    Progress {
        id: i32,
        value: i32,
    },
    Tasks {
        id: i32,
    },
    Delete {
        id: i32,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    Show,
    Set { key: String, value: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr } => serve(addr).await,
        Commands::Client {
            url,
            user,
            prefs,
            command,
        } => {
            let prefs = Preferences::load(&prefs)?;
            run_client(&url, &user, &prefs, command).await
        }
        Commands::Time { input } => match format_time_from_input(&input) {
            Some(time) => {
                println!("{time}");
                Ok(())
            }
            None => bail!("No time found in {input:?}"),
        },
        Commands::Prefs { file, command } => {
            let mut prefs = Preferences::load(&file)?;
            if let PrefsCommands::Set { key, value } = command {
                prefs.set(&key, &value)?;
                prefs.save(&file)?;
            }
            print_json(&prefs)
        }
    }
}

async fn serve(addr: Option<SocketAddr>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let addr = addr.unwrap_or(config.addr);

    let pool = api::build_pool(&config.database_url, config.pool_size);
    let state = api::AppState::new(pool);
    rollover::spawn_scheduler(state.pool.clone(), config.rollover_interval);
    let app = api::router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_client(
    url: &str,
    user: &str,
    prefs: &Preferences,
    command: ClientCommands,
) -> anyhow::Result<()> {
    match command {
        ClientCommands::Tasks { command } => run_tasks(url, user, command).await,
        ClientCommands::Sections { command } => match command {
            SectionCommands::List { date } => print_json(
                &client::fetch_sections(url, user, &ListSectionsParams { date }).await?,
            ),
            SectionCommands::Create { text, time, date } => print_json(
                &client::create_section(
                    url,
                    user,
                    CreateSectionRequest {
                        text,
                        time,
                        date,
                        background_color: None,
                    },
                )
                .await?,
            ),
            SectionCommands::Delete { id } => {
                client::delete_section(url, user, id).await?;
                println!("Section {id} deleted");
                Ok(())
            }
        },
        ClientCommands::Goals { command } => match command {
            GoalCommands::List => {
                print_json(&client::fetch_goals(url, user, &ListGoalsParams::default()).await?)
            }
            GoalCommands::Create { title, steps } => {
                let request = CreateGoalRequest {
                    title,
                    description: String::new(),
                    deadline: None,
                    progress_type: match steps {
                        Some(_) => ProgressType::Numerical,
                        None => ProgressType::Percentage,
                    },
                    total_steps: steps.unwrap_or(0),
                };
                print_json(&client::create_goal(url, user, request).await?)
            }
            GoalCommands::Progress { id, value } => {
                print_json(&client::set_goal_progress(url, user, id, value).await?)
            }
            GoalCommands::Tasks { id } => {
                print_json(&client::fetch_goal_tasks(url, user, id).await?)
            }
            GoalCommands::Delete { id } => {
                client::delete_goal(url, user, id).await?;
                println!("Goal {id} deleted");
                Ok(())
            }
        },
        ClientCommands::Day { date } => {
            print_json(&prefs.arrange(client::fetch_day(url, user, date).await?))
        }
        ClientCommands::Planner { start } => {
            let days: Vec<_> = client::fetch_planner(url, user, start)
                .await?
                .into_iter()
                .map(|day| prefs.arrange(day))
                .collect();
            print_json(&days)
        }
        ClientCommands::Move {
            date,
            drag_index,
            hover_index,
        } => print_json(&client::move_day_item(url, user, date, drag_index, hover_index).await?),
        ClientCommands::Title { date, title } => {
            print_json(&client::set_title(url, user, date, &title).await?)
        }
        ClientCommands::Rollover { date } => print_json(&client::rollover(url, user, date).await?),
        ClientCommands::Stats { start } => {
            print_json(&client::fetch_week_stats(url, user, start, None).await?)
        }
        ClientCommands::Operations => print_json(&client::fetch_operation_stats(url).await?),
        ClientCommands::Validate {
            email,
            password,
            signup,
        } => {
            let mode = if signup {
                AuthMode::Signup
            } else {
                AuthMode::Login
            };
            print_json(&client::validate_credentials(url, &email, &password, mode).await?)
        }
        ClientCommands::Health => print_json(&client::fetch_health(url).await?),
    }
}

async fn run_tasks(url: &str, user: &str, command: TaskCommands) -> anyhow::Result<()> {
    match command {
        TaskCommands::List { date, saved } => {
            let params = ListTasksParams {
                date,
                saved: saved.then_some(true),
                ..Default::default()
            };
            print_json(&client::fetch_tasks(url, user, &params).await?)
        }
        TaskCommands::Get { id } => print_json(&client::fetch_task(url, user, id).await?),
        TaskCommands::Create {
            title,
            date,
            time,
            subtasks,
            goal_ids,
        } => {
            let request = CreateTaskRequest {
                title,
                date,
                scheduled_time: time,
                subtasks,
                goal_ids,
                ..Default::default()
            };
            print_json(&client::create_task(url, user, request).await?)
        }
        TaskCommands::Update {
            id,
            title,
            date,
            time,
        } => {
            let request = UpdateTaskRequest {
                title,
                date,
                scheduled_time: time,
                ..Default::default()
            };
            print_json(&client::update_task(url, user, id, request).await?)
        }
        TaskCommands::Toggle { id } => print_json(&client::toggle_task(url, user, id).await?),
        TaskCommands::Delete { id } => {
            client::delete_task(url, user, id).await?;
            println!("Task {id} deleted");
            Ok(())
        }
        TaskCommands::Save { id } => print_json(&client::save_task(url, user, id).await?),
        TaskCommands::Instantiate { id, date } => {
            print_json(&client::instantiate_task(url, user, id, date).await?)
        }
        TaskCommands::Subtask { id, title } => {
            print_json(&client::add_subtask(url, user, id, &title).await?)
        }
    }
}
