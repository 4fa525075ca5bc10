use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mindforge-cli", version, about = "Mindforge CLI")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Knowledge documents
    Doc {
        #[command(subcommand)]
        action: commands::doc::DocAction,
    },
    /// Training sessions and progress
    Train {
        #[command(subcommand)]
        action: commands::train::TrainAction,
    },
    /// Habit tracking
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Synapse knowledge graph
    Graph {
        #[command(subcommand)]
        action: commands::graph::GraphAction,
    },
    /// Prompt library
    Prompt {
        #[command(subcommand)]
        action: commands::prompt::PromptAction,
    },
    /// Global mode
    Mode {
        #[command(subcommand)]
        action: commands::mode::ModeAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Onboarding flag
    Onboarding {
        #[command(subcommand)]
        action: commands::onboarding::OnboardingAction,
    },
    /// Run pending timers in real time and print every event
    Run {
        /// How long to run
        #[arg(long, default_value = "30")]
        seconds: u64,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("MINDFORGE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Doc { action } => commands::doc::run(action),
        Commands::Train { action } => commands::train::run(action),
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Graph { action } => commands::graph::run(action),
        Commands::Prompt { action } => commands::prompt::run(action),
        Commands::Mode { action } => commands::mode::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Onboarding { action } => commands::onboarding::run(action),
        Commands::Run { seconds } => commands::run::run(seconds),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
