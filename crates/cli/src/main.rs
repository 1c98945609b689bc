//! edutools console - drives the classroom mechanics over a simulated host.

mod command;
mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use edutools_core::ActorId;
use edutools_host::{ConsolePresenter, Environment, JsonPropertyStore, LangTranslator, PropertyStore, SimEnvironment};
use edutools_mechanics::{content_scan, feedback, sweep, Console, ConsoleScheduler};
use edutools_navigation::{
    DismissReason, ExternalSender, Form, FormResponse, MenuScene, Navigation, NavigationEngine, NoticeScene,
    Response, SceneRegistry,
};
use edutools_scheduler::TaskScheduler;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::{Command, HELP};
use crate::config::ConsoleConfig;

type World = Console<SimEnvironment, JsonPropertyStore>;

const DEFAULT_LANG: &str = include_str!("../lang/en_US.lang");

#[derive(Parser)]
#[command(name = "edutools")]
#[command(about = "Interactive console for classroom navigation and background mechanics", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Milliseconds per tick
    #[arg(long)]
    tick_millis: Option<u64>,
    /// Property store file
    #[arg(long)]
    store: Option<PathBuf>,
    /// Translation (.lang) file; the bundled English strings otherwise
    #[arg(long)]
    lang: Option<PathBuf>,
    /// Fixed jitter seed
    #[arg(long)]
    seed: Option<u64>,
    /// Log filter used when EDUTOOLS_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("EDUTOOLS_LOG").unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ConsoleConfig::load(cli.config.as_deref()).await?;
    if let Some(millis) = cli.tick_millis {
        config = config.with_tick_millis(millis);
    }
    if let Some(store) = cli.store {
        config = config.with_store_path(store);
    }
    if let Some(lang) = cli.lang {
        config = config.with_lang_path(lang);
    }
    if let Some(seed) = cli.seed {
        config.scheduler = config.scheduler.with_seed(seed);
    }

    let translator = match &config.lang_path {
        Some(path) => LangTranslator::load(path).await?,
        None => LangTranslator::parse(DEFAULT_LANG),
    };
    let store = JsonPropertyStore::open(&config.store_path).await?;

    let navigation = NavigationEngine::new(
        scene_registry(&config),
        ConsolePresenter::new(translator),
        config.navigation.clone(),
    );
    let mut console = Console::new(navigation, SimEnvironment::default(), store);
    let mut scheduler: ConsoleScheduler<SimEnvironment, JsonPropertyStore> = TaskScheduler::new(config.scheduler.clone());

    sweep::install(&mut scheduler, &config.sweep);
    feedback::install(&config.feedback, &mut scheduler, &mut console.navigation);
    content_scan::install(&config.content_scan, &mut scheduler)?;
    let external = console.navigation.external_requests();

    info!(
        tick_millis = config.tick_millis,
        scenes = console.navigation.registry().len(),
        tasks = scheduler.len(),
        "console started"
    );
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_millis.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                for (request, result) in console.navigation.pump_external() {
                    if let Ok(Navigation::Busy) = result {
                        println!("{} is busy; {} was not opened", request.actor, request.scene);
                    }
                }
                scheduler.tick(&mut console);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = execute(command, &mut console, &scheduler, &external) {
                            println!("error: {e}");
                        }
                    }
                    Err(e) => println!("error: {e}"),
                }
            }
        }
        for rendered in console.navigation.presenter_mut().drain_output() {
            println!("{rendered}");
        }
    }

    console.store.flush().await?;
    info!(path = %console.store.path().display(), "settings flushed");
    Ok(())
}

fn scene_registry(config: &ConsoleConfig) -> SceneRegistry {
    let mut registry = SceneRegistry::new();
    registry.register(config.navigation.root_scene.clone(), |_| {
        MenuScene::new("edutools.menu.title")
            .body("edutools.menu.body")
            .entry("edutools.menu.about", "about")
            .entry("edutools.menu.help", "help")
    });
    registry.register("about", |_| NoticeScene::new("edutools.about.title", "edutools.about.body"));
    registry.register("help", |_| NoticeScene::new("edutools.help.title", "edutools.help.body"));
    registry.register(config.navigation.fallback_scene.clone(), |_| NoticeScene::fallback());
    registry
}

fn execute(
    command: Command,
    console: &mut World,
    scheduler: &ConsoleScheduler<SimEnvironment, JsonPropertyStore>,
    external: &ExternalSender,
) -> Result<()> {
    match command {
        Command::Join(actor) => {
            if console.environment.join(actor.clone()) {
                println!("{actor} joined");
            } else {
                println!("{actor} is already online");
            }
        }
        Command::Leave(actor) => {
            if console.environment.leave(&actor) {
                console.disconnect(&actor);
                println!("{actor} left");
            } else {
                println!("{actor} is not online");
            }
        }
        Command::Open(request) => {
            if !external.send(request) {
                warn!("navigation engine is gone");
            }
        }
        Command::Press(actor, index) => respond(console, &actor, |form| match form {
            Form::Action { .. } => Ok(FormResponse::Submitted(Response::Button(index))),
            Form::Message { .. } => Ok(FormResponse::Submitted(Response::Accepted(index == 0))),
            Form::Modal { .. } => bail!("modal forms take `submit`"),
        })?,
        Command::Submit(actor, values) => {
            respond(console, &actor, |_| Ok(FormResponse::Submitted(Response::Values(values))))?
        }
        Command::Close(actor) => respond(console, &actor, |_| {
            Ok(FormResponse::Dismissed(DismissReason::UserClosed))
        })?,
        Command::Busy(actor) => {
            let presenter = console.navigation.presenter_mut();
            let occupied = !presenter.is_occupied(&actor);
            presenter.set_occupied(&actor, occupied);
            println!("{actor} busy: {occupied}");
        }
        Command::Give(actor, item) => match console.environment.give(&actor, item.as_str()) {
            Some(slot) => println!("{actor} slot {slot}: {item}"),
            None => println!("{actor} is offline or has a full inventory"),
        },
        Command::Status => print_status(console, scheduler),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

/// Close the actor's open form and hand the answer to navigation.
fn respond<F>(console: &mut World, actor: &ActorId, answer: F) -> Result<()>
where
    F: FnOnce(&Form) -> Result<FormResponse>,
{
    let Some((request, form)) = console.navigation.presenter().open_form(actor) else {
        bail!("{actor} has no open form");
    };
    let response = answer(form)?;
    console.navigation.presenter_mut().take(actor);
    let navigation = console.navigation.deliver(actor, request, response)?;
    println!("{actor}: {navigation:?}");
    Ok(())
}

fn print_status(console: &World, scheduler: &ConsoleScheduler<SimEnvironment, JsonPropertyStore>) {
    println!("tick {} | {} tasks | {} sessions", scheduler.now(), scheduler.len(), console.navigation.session_count());
    for actor in console.environment.online_actors() {
        let scene = console
            .navigation
            .current_scene(&actor)
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let helper = console
            .helpers
            .lookup_by_key(&actor)
            .map_or_else(|| "-".to_string(), ToString::to_string);
        println!(
            "  {actor}: scene {scene}, helper {helper}, {} items",
            console.environment.inventory(&actor).len()
        );
    }
    println!(
        "  helpers alive: {} | properties: {}",
        console.environment.helpers().len(),
        console.store.keys().len()
    );
}
