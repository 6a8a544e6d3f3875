//! Library client - terminal front-end for the library catalog
//!
//! Reads one command per line from stdin and redraws the book list.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt};

use library_client::{
    config::{AppConfig, LoggingConfig},
    services::{
        mutations::MutationOutcome,
        notifications::{ChannelNotifier, Notification},
    },
    ui::{render, LibraryController},
    AppState,
};

const HELP: &str = "\
Commands:
  list                      show the current page
  refresh                   reload books from the server
  search <text>             filter by title or author
  clear                     clear the search
  page <n> | next | prev    move between pages
  size <n>                  change books per page
  add [<title> | <author>]  add a book
  edit <id>                 edit a book
  title <text>              set the title in the open form
  author <text>             set the author in the open form
  save                      submit the open form
  delete <id>               delete a book (asks for confirmation)
  yes | no                  answer the confirmation
  cancel                    close the open dialog
  quit                      leave";

enum Flow {
    Redraw,
    Quiet,
    Quit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting library client v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Library API at {}", config.api.base_url);

    let (notifier, mut notifications) = ChannelNotifier::new();
    let state = AppState::connect(config, Arc::new(notifier))?;
    let mut controller = state.controller();

    if let Err(e) = controller.load().await {
        tracing::warn!("Initial load failed: {}", e);
    }
    draw(&controller);
    print_notifications(&mut notifications);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt();
    while let Some(line) = lines.next_line().await? {
        match handle(&mut controller, line.trim()).await {
            Flow::Quit => break,
            Flow::Redraw => {
                controller.settled().await;
                draw(&controller);
            }
            Flow::Quiet => {}
        }
        print_notifications(&mut notifications);
        print_prompt();
    }

    tracing::info!("Library client stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("library_client={}", logging.level).into());

    let (writer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "library-client.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(logging.directory.is_none())
                    .with_writer(writer),
            )
            .init();
    }

    guard
}

async fn handle(controller: &mut LibraryController, line: &str) -> Flow {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => Flow::Quiet,
        "help" | "?" => {
            println!("{}", HELP);
            Flow::Quiet
        }
        "quit" | "exit" => Flow::Quit,
        "list" => Flow::Redraw,
        "refresh" => {
            // Failures show up as the list's error line
            let _ = controller.refresh().await;
            Flow::Redraw
        }
        "search" => {
            controller.set_query(rest);
            Flow::Redraw
        }
        "clear" => {
            controller.set_query("");
            Flow::Redraw
        }
        "page" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => {
                controller.set_page(n - 1);
                Flow::Redraw
            }
            _ => usage("page <number>"),
        },
        "next" => {
            let snapshot = controller.snapshot();
            if snapshot.page + 1 < snapshot.page_count {
                controller.set_page(snapshot.page + 1);
            }
            Flow::Redraw
        }
        "prev" => {
            let page = controller.view_state().page;
            controller.set_page(page.saturating_sub(1));
            Flow::Redraw
        }
        "size" => match rest.parse::<usize>() {
            Ok(n) if controller.set_page_size(n) => Flow::Redraw,
            _ => {
                println!("Page size must be one of {:?}", controller.page_size_options());
                Flow::Quiet
            }
        },
        "add" => {
            controller.open_add_form();
            match rest.split_once('|') {
                Some((title, author)) => {
                    controller.set_title(title);
                    controller.set_author(author);
                    submit(controller).await
                }
                None => Flow::Redraw,
            }
        }
        "edit" => match rest.parse::<i64>() {
            Ok(id) => {
                controller.open_edit_form(id);
                Flow::Redraw
            }
            Err(_) => usage("edit <id>"),
        },
        "title" => {
            if !controller.set_title(rest) {
                println!("No form is open");
            }
            Flow::Redraw
        }
        "author" => {
            if !controller.set_author(rest) {
                println!("No form is open");
            }
            Flow::Redraw
        }
        "save" => submit(controller).await,
        "delete" => match rest.parse::<i64>() {
            Ok(id) => {
                controller.request_delete(id);
                Flow::Redraw
            }
            Err(_) => usage("delete <id>"),
        },
        "yes" | "y" => match controller.confirm_delete().await {
            Some(outcome) => report(outcome),
            None => {
                println!("Nothing to confirm");
                Flow::Quiet
            }
        },
        "no" | "n" | "cancel" => {
            controller.cancel();
            Flow::Redraw
        }
        other => {
            println!("Unknown command: {} (type help)", other);
            Flow::Quiet
        }
    }
}

async fn submit(controller: &LibraryController) -> Flow {
    match controller.submit_form().await {
        Some(outcome) => report(outcome),
        None => {
            println!("No form is open");
            Flow::Quiet
        }
    }
}

fn report(outcome: MutationOutcome) -> Flow {
    if let MutationOutcome::Busy = outcome {
        println!("Another change is still in progress");
    }
    Flow::Redraw
}

fn usage(text: &str) -> Flow {
    println!("usage: {}", text);
    Flow::Quiet
}

fn draw(controller: &LibraryController) {
    print!("{}", render::render_list(&controller.snapshot()));
    if let Some(modal) = render::render_modal(&controller.modal()) {
        print!("{}", modal);
    }
}

fn print_notifications(notifications: &mut UnboundedReceiver<Notification>) {
    while let Ok(notification) = notifications.try_recv() {
        println!("{}", render::render_notification(&notification));
    }
}

fn print_prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}
