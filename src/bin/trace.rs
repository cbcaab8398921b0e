//! Model Trace CLI
//!
//! Plays the two-player scoring model and prints every event it raises.

use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use familiar_models::{
    define_field, define_model_with_config, define_object, EventKind, ModelConfig, ModelEvent,
    ObjectSchema, OutputFormat,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "model-trace")]
#[command(about = "Run the scoring model and print its value, commit and snapshot events")]
struct Cli {
    /// Config file (defaults to models.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Number of rounds to play
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Take a snapshot before the first round
    #[arg(long)]
    snapshot: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn scoring_schema() -> ObjectSchema {
    define_object()
        .object("player1", define_object().field("score", define_field(0i64)))
        .object("player2", define_object().field("score", define_field(0i64)))
        .field("name", define_field(String::from("Round 1")))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ModelConfig::load_from(cli.config.as_deref())?;
    let rounds = cli.rounds.unwrap_or(config.trace.rounds);
    let snapshot_first = cli.snapshot || config.trace.snapshot_first;
    let format = cli.format.unwrap_or(config.trace.output_format);

    let schema = define_model_with_config(scoring_schema(), &config.emitter)?;
    let model = schema.create()?;

    let events: Rc<RefCell<Vec<ModelEvent>>> = Rc::new(RefCell::new(Vec::new()));
    for kind in EventKind::ALL {
        let events = Rc::clone(&events);
        model.on(kind, move |event| events.borrow_mut().push(event.clone()));
    }

    if snapshot_first {
        model.snapshot();
    }

    let player1 = model.typed::<i64>("player1.score")?;
    let player2 = model.typed::<i64>("player2.score")?;
    for round in 1..=i64::from(rounds) {
        player1.update(|score| score + 33 % round)?;
        let lead = player1.get()?;
        player2.update(|score| score + lead % 5)?;
        model.commit();
    }

    for event in events.borrow().iter() {
        match format {
            OutputFormat::Compact => println!("{}", serde_json::to_string(&event.to_record())?),
            OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(&event.to_record())?),
            OutputFormat::Text => println!("{}", event),
        }
    }

    tracing::info!(rounds, revision = model.revision(), "trace finished");
    Ok(())
}
