use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use orgchart_core::{
    load_settings, picker, NoOpReason, OrgChartClient, OrgChartError, OrgChartEvent,
};
use shared::domain::EmployeeId;
use tokio::sync::broadcast;
use tracing::warn;

mod render;

use render::{render_columns, render_forest, render_path};

#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; `orgchart.toml` is used when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Top-level trees.
    Forest,
    /// Everyone, with whether they already report to someone.
    Roster {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Column layout rooted at `--root` (default: the main root).
    Show {
        #[arg(long)]
        root: Option<i64>,
        #[arg(long = "collapse")]
        collapse: Vec<i64>,
        /// Re-root at the displayed root's manager first.
        #[arg(long)]
        up: bool,
    },
    /// Chain of managers from the root down to `employee`.
    Path {
        employee: i64,
        #[arg(long)]
        root: Option<i64>,
    },
    Assign {
        manager: i64,
        #[arg(required = true)]
        employees: Vec<i64>,
        #[arg(long)]
        root: Option<i64>,
    },
    /// Keep only `--keep` among the manager's direct reports.
    Unassign {
        manager: i64,
        #[arg(long)]
        keep: Vec<i64>,
        #[arg(long)]
        root: Option<i64>,
    },
}

fn ids(raw: &[i64]) -> Vec<EmployeeId> {
    raw.iter().copied().map(EmployeeId).collect()
}

/// Open on `root`. A root without a subtree still renders as a single node,
/// so that failure is only reported.
async fn open(client: &OrgChartClient, root: Option<i64>) -> Result<()> {
    match client.open(root.map(EmployeeId)).await {
        Ok(_) => Ok(()),
        Err(err @ OrgChartError::Fetch(_)) => {
            if client.store().snapshot().await.root.is_some() {
                warn!(error = %err, "showing single-node fallback");
                Ok(())
            } else {
                Err(err.into())
            }
        }
        Err(err) => Err(err.into()),
    }
}

fn print_alerts(events: &mut broadcast::Receiver<OrgChartEvent>) {
    while let Ok(event) = events.try_recv() {
        if let OrgChartEvent::Alert(message) = event {
            eprintln!("alert: {message}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(token) = cli.token {
        settings.token = Some(token);
    }
    let client = OrgChartClient::from_settings(&settings)?;
    let mut events = client.subscribe_events();

    match cli.command {
        Command::Forest => {
            client.store().load().await?;
            let forest = client.store().snapshot().await.forest;
            print!("{}", render_forest(&forest));
        }
        Command::Roster { search } => {
            client.store().load().await?;
            let state = client.store().snapshot().await;
            for employee in picker::search_roster(&state.roster, &search) {
                let placed = if state.is_assigned_anywhere(employee.id) {
                    "assigned"
                } else {
                    "free"
                };
                println!(
                    "{:>6}  {:<28} {:<24} {placed}",
                    employee.id.0,
                    employee.name,
                    employee.reporting_manager_name.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Show { root, collapse, up } => {
            open(&client, root).await?;
            if up && !client.go_up().await? {
                eprintln!("already at the top");
            }
            for id in collapse {
                client.store().toggle_collapse(EmployeeId(id)).await;
            }
            let state = client.store().snapshot().await;
            print!("{}", render_columns(&state));
        }
        Command::Path { employee, root } => {
            open(&client, root).await?;
            let path = client.path_to(EmployeeId(employee)).await?;
            let state = client.store().snapshot().await;
            println!("{}", render_path(&state, &path));
        }
        Command::Assign {
            manager,
            employees,
            root,
        } => {
            open(&client, root).await?;
            let result = client.assign(EmployeeId(manager), &ids(&employees)).await;
            print_alerts(&mut events);
            let accepted = result?;
            println!("assigned {} employee(s) to #{manager}", accepted.len());
            print!("{}", render_columns(&client.store().snapshot().await));
        }
        Command::Unassign {
            manager,
            keep,
            root,
        } => {
            open(&client, root).await?;
            let result = client.unassign(EmployeeId(manager), &ids(&keep)).await;
            print_alerts(&mut events);
            let removed = result?;
            if removed.is_empty() {
                println!("{}", NoOpReason::NothingToRemove.user_message());
            } else {
                println!("unassigned {} employee(s) from #{manager}", removed.len());
                print!("{}", render_columns(&client.store().snapshot().await));
            }
        }
    }

    Ok(())
}
