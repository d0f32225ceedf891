use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use team_grid_lib::columns::types::{CellValue, ColumnKey};
use team_grid_lib::commands;
use team_grid_lib::config::ENV_TEAM_GRID_CONFIG;
use team_grid_lib::options::types::Member;
use team_grid_lib::store::memory::InMemoryStore;
use team_grid_lib::store::types::WorkspaceId;
use team_grid_lib::tasks::types::Task;
use team_grid_lib::{AppError, AppResult, EditableGrid, GridConfig, GridServices};

#[derive(Debug, Default)]
struct CliFlags {
    config_path: Option<PathBuf>,
}

fn parse_cli_flags() -> AppResult<CliFlags> {
    let mut flags = CliFlags::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().ok_or_else(|| {
                    AppError::Config("Missing value after --config. Use --config <path>.".to_owned())
                })?;
                flags.config_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_cli_help();
                std::process::exit(0);
            }
            other => {
                return Err(AppError::Config(format!(
                    "Unknown argument '{other}'. Run with --help for usage."
                )));
            }
        }
    }
    Ok(flags)
}

fn print_cli_help() {
    println!("Usage: team-grid [--config <path>]");
    println!();
    println!("The config path may also be given through {ENV_TEAM_GRID_CONFIG}.");
    println!("Type `help` at the prompt for the list of grid commands.");
}

fn print_commands() {
    println!("list                         show active and completed rows");
    println!("export                       print the visible rows as JSON");
    println!("new <ticket> [company]       create a row");
    println!("delete <row>                 delete a row");
    println!("filter [text]                filter rows by text; no text clears");
    println!("edit <row> <column>          open a cell for editing");
    println!("type <text>                  replace the text of the open cell");
    println!("enter | newline | esc | blur");
    println!("choices                      list the choices for the open cell");
    println!("pick <value|+new|+invite>    pick a choice in the open cell");
    println!("date <YYYY-MM-DD|none>       set the open date cell");
    println!("add-option <value>           finish an \"add new option\" modal");
    println!("invite <address>             finish an \"invite user\" modal");
    println!("cancel                       dismiss the open modal");
    println!("quit");
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let flags = parse_cli_flags()?;
    let config_path = flags
        .config_path
        .or_else(|| std::env::var_os(ENV_TEAM_GRID_CONFIG).map(PathBuf::from));
    let config = match config_path {
        Some(path) => GridConfig::load(&path)?,
        None => GridConfig::default(),
    };
    team_grid_lib::init_tracing(&config.logging.filter);

    let store = Arc::new(InMemoryStore::new());
    store.register_contact("ana@example.com", Member::new("u-ana", "Ana"));
    store.register_contact("ben@example.com", Member::new("u-ben", "Ben"));

    let workspace = WorkspaceId::from(config.workspace.as_str());
    let grid = EditableGrid::new(workspace, GridServices::from_backend(store), config);
    grid.mount().await?;

    let mut events = grid.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(?event, "grid event");
        }
    });

    info!(workspace = %grid.workspace(), "ready; type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if let Err(error) = run_command(&grid, line).await {
            println!("error: {error}");
        }
    }

    let affected = grid.unmount().await?;
    info!(affected, "pending saves settled on exit");
    Ok(())
}

async fn run_command(grid: &EditableGrid, line: &str) -> AppResult<()> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    match command {
        "help" => print_commands(),
        "list" => print_rows(grid),
        "export" => println!("{}", commands::export_tasks(grid)?),
        "new" => {
            let (ticket_no, company) = rest.split_once(' ').unwrap_or((rest, ""));
            let created =
                commands::create_task(grid, ticket_no.to_owned(), company.trim().to_owned()).await?;
            println!("created {}", created.id);
        }
        "delete" => commands::delete_task(grid, rest.to_owned()).await?,
        "filter" => commands::set_filter(grid, rest.to_owned()),
        "edit" => {
            let (row, column) = rest
                .split_once(' ')
                .ok_or_else(|| AppError::Usage("usage: edit <row> <column>".to_owned()))?;
            commands::begin_edit(grid, row.to_owned(), column.to_owned()).await?;
        }
        "type" => commands::type_text(grid, rest.to_owned()).await?,
        "enter" | "newline" | "esc" | "blur" => commands::press_key(grid, command).await?,
        "choices" => {
            for choice in commands::cell_choices(grid)? {
                let marker = if choice.enabled { " " } else { "x" };
                println!("[{marker}] {}", choice.label);
            }
        }
        "pick" => {
            if let Some(request) = commands::pick(grid, rest.to_owned()).await? {
                println!("modal open: {:?} for {}", request.kind, request.origin);
            }
        }
        "date" => commands::set_date(grid, rest.to_owned()).await?,
        "add-option" => {
            let stored = commands::complete_add_option(grid, rest.to_owned()).await?;
            println!("added option '{stored}'");
        }
        "invite" => {
            let member = commands::complete_invite(grid, rest.to_owned()).await?;
            println!("{} is a member", member.label);
        }
        "cancel" => commands::cancel_subflow(grid)?,
        other => println!("unknown command '{other}'; type `help`"),
    }
    Ok(())
}

fn print_rows(grid: &EditableGrid) {
    let view = commands::list_tasks(grid);
    println!("-- active ({})", view.active.len());
    for task in &view.active {
        print_row(grid, task);
    }
    println!("-- completed ({})", view.completed.len());
    for task in &view.completed {
        print_row(grid, task);
    }
}

fn print_row(grid: &EditableGrid, task: &Task) {
    let cell = |column| {
        grid.display_value(&task.id, column)
            .map(|value: CellValue| value.display())
            .unwrap_or_default()
    };
    let indicator = [ColumnKey::TicketNo, ColumnKey::Notes, ColumnKey::InquiryDetails]
        .into_iter()
        .find_map(|column| grid.indicator(&task.id, column))
        .map(|status| format!(" [{status:?}]"))
        .unwrap_or_default();
    println!(
        "{} | {} | {} | {} | {} | dev: {}{}",
        task.id,
        cell(ColumnKey::TicketNo),
        cell(ColumnKey::Company),
        cell(ColumnKey::Status),
        cell(ColumnKey::Priority),
        cell(ColumnKey::Developer),
        indicator
    );
}
