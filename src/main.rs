use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use fitchat::app::{ActionOutcome, AppController, MessageView};
use fitchat::chat::HttpAnswering;
use fitchat::cli::{self, Command};
use fitchat::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    let questions = Arc::new(config.load_questions()?);
    let answering = Arc::new(HttpAnswering::new(&config.backend_url, config.request_timeout)?);

    eprintln!("🏋️ Fitchat v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", answering.endpoint());
    eprintln!("   {}\n", cli::HELP);

    let mut app = AppController::from_config(&config, questions, answering);

    println!("{}", cli::render(&app.view()));
    eprint!("> ");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };

        let actions = match cli::parse_input(&line, &app.view()) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => {
                eprintln!("{}", cli::HELP);
                eprint!("> ");
                continue;
            }
            Ok(Command::Actions(actions)) => actions,
            Err(msg) => {
                eprintln!("⚠️  {}", msg);
                eprint!("> ");
                continue;
            }
        };

        let mut redraw = false;
        for action in actions {
            match app.handle(action).await {
                Ok(ActionOutcome::Updated) => redraw = true,
                Ok(ActionOutcome::Reply(message)) => {
                    println!("\n{}\n", cli::render_message(&MessageView::from(&message)));
                }
                Ok(ActionOutcome::ChatFailed(e)) => eprintln!("❌ {}", e),
                Ok(ActionOutcome::Exported(text)) => println!("\n{}\n", text),
                Err(e) => {
                    eprintln!("⚠️  {}", e);
                    break;
                }
            }
        }
        if redraw {
            println!("\n{}\n", cli::render(&app.view()));
        }
        eprint!("> ");
    }

    eprintln!("Bye!");
    Ok(())
}
