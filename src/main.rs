use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use lifetales::backend::gemini_stages;
use lifetales::cli::{Cli, Commands, ConfigAction, InputSource, classify_input};
use lifetales::config::Config;
use lifetales::pipeline::{AgentStatus, MemoryInput};
use lifetales::session::Session;
use lifetales::stages::NoIllustrator;
use lifetales::story::{Chapter, StorySpace};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Weave {
            title,
            theme,
            json,
            timeout,
            no_illustrations,
            image_dir,
            inputs,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(timeout) = timeout {
                config.pipeline = config.pipeline.with_uniform_timeout(timeout);
            }
            let options = WeaveOptions {
                title,
                theme,
                json,
                quiet: cli.quiet,
                no_illustrations,
                image_dir,
            };
            run_weave(config, options, &inputs).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "lifetales",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("lifetales={default_level}"))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the explicit config file, or the default one if it exists.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()?)?,
    };
    Ok(config.with_env_overrides())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = match custom_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

struct WeaveOptions {
    title: String,
    theme: String,
    json: bool,
    quiet: bool,
    no_illustrations: bool,
    image_dir: Option<PathBuf>,
}

async fn run_weave(config: Config, options: WeaveOptions, inputs: &[String]) -> Result<()> {
    let mut stages = gemini_stages(&config).context("failed to set up the generative backend")?;
    if options.no_illustrations {
        stages = stages.with_illustrator(Arc::new(NoIllustrator));
    }
    let mut session = Session::new(&config, stages);
    let story_id = session
        .create_story(&options.title, &options.theme)?
        .id()
        .to_string();

    let printer = (!options.quiet).then(|| spawn_status_printer(&session));

    let mut failures = 0usize;
    for (index, arg) in inputs.iter().enumerate() {
        let input = match read_input(arg) {
            Ok(input) => input,
            Err(e) => {
                failures += 1;
                eprintln!("{} input {}: {:#}", "✗".red(), index + 1, e);
                continue;
            }
        };
        if let Err(e) = session.record_memory(&story_id, input).await {
            failures += 1;
            eprintln!("{} input {}: {}", "✗".red(), index + 1, e);
        }
    }

    if let Some(printer) = printer {
        // Let the last status reach the printer before stopping it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        printer.abort();
    }

    let story = session
        .get_story(&story_id)
        .context("story disappeared from the session")?;

    if let Some(dir) = &options.image_dir {
        save_illustrations(story, dir)?;
    }

    if options.json {
        println!("{}", story.to_json_pretty()?);
    } else {
        print_story(story);
    }

    if story.chapter_count() == 0 {
        anyhow::bail!("no chapters were recorded ({failures} of {} inputs failed)", inputs.len());
    }
    Ok(())
}

fn read_input(arg: &str) -> Result<MemoryInput> {
    match classify_input(arg) {
        InputSource::AudioFile { path, mime_type } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(MemoryInput::audio(bytes, mime_type))
        }
        InputSource::TextFile(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(MemoryInput::text(text))
        }
        InputSource::Literal(text) => Ok(MemoryInput::text(text)),
    }
}

fn spawn_status_printer(session: &Session) -> tokio::task::JoinHandle<()> {
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_status(event.status),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "status printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_status(status: AgentStatus) {
    let label = format!("{:<12}", status.to_string());
    match status {
        AgentStatus::Completed => eprintln!("{} {}", label.green().bold(), status.message()),
        AgentStatus::Error => eprintln!("{} {}", label.red().bold(), status.message()),
        AgentStatus::Idle => {}
        _ => eprintln!("{} {}", label.cyan(), status.message().dimmed()),
    }
}

fn print_story(story: &StorySpace) {
    println!("{}", story.title().bold());
    println!("{}", format!("Theme: {}", story.theme()).dimmed());
    for (number, chapter) in story.chapters().rev().enumerate() {
        println!();
        print_chapter(number + 1, chapter);
    }
}

fn print_chapter(number: usize, chapter: &Chapter) {
    let tags = chapter.tags().join(", ");
    println!(
        "{} {} {}",
        format!("Chapter {number}").bold(),
        format!("[{}]", chapter.mood()).yellow(),
        tags.dimmed()
    );
    println!("{}", chapter.narrative());
    if chapter.illustration().is_some() {
        println!("{}", "(illustrated)".dimmed());
    }
}

fn save_illustrations(story: &StorySpace, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for (number, chapter) in story.chapters().rev().enumerate() {
        let Some(illustration) = chapter.illustration() else {
            continue;
        };
        let ext = illustration
            .mime_type
            .strip_prefix("image/")
            .unwrap_or("bin");
        let path = dir.join(format!("chapter-{:02}.{}", number + 1, ext));
        std::fs::write(&path, illustration.decode()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "illustration saved");
    }
    Ok(())
}
