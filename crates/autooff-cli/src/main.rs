use anyhow::Result;
use autooff_cli::OutputFormat;
use autooff_cli::commands::{self, LicenseAction, RunArgs, SettingsAction};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autooff")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Switch off every selected item on a Teal resume in one go",
    long_about = "Auto-OFF drives the Teal resume editor through Chrome: it opens every \
                  collapsible section, finds the checkboxes and switches that are on, and \
                  turns them off while keeping the items you chose to preserve."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Storage file for settings and usage counters [default: ~/.autooff/storage.json]
    #[arg(long, global = true, env = "AUTOOFF_STORE", value_name = "FILE")]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch or attach to Chrome and run Auto-OFF on the open resume
    Run {
        /// Path to the Chrome binary
        #[arg(long, env = "AUTOOFF_CHROME_PATH")]
        chrome_path: Option<PathBuf>,

        /// Attach to a Chrome already listening on this debugging port
        #[arg(long, env = "AUTOOFF_CDP_PORT")]
        port: Option<u16>,

        /// Page to open when launching Chrome
        #[arg(long, env = "AUTOOFF_URL", default_value = "https://app.tealhq.com")]
        url: String,

        /// Chrome profile name, kept under ~/.autooff/profiles
        #[arg(long, default_value = "default", conflicts_with = "temp_profile")]
        profile: String,

        /// Use a throwaway profile instead of a named one
        #[arg(long)]
        temp_profile: bool,

        /// Pause after each section, in milliseconds
        #[arg(long, value_name = "MS")]
        section_pause_ms: Option<u64>,

        /// Start right away instead of waiting for Enter
        #[arg(short, long)]
        yes: bool,
    },

    /// Run Auto-OFF against a page described by a JSON fixture
    Simulate {
        /// Path to the page fixture
        #[arg(value_name = "FIXTURE")]
        fixture: PathBuf,

        /// Collapse the fixed delays to zero
        #[arg(long)]
        instant: bool,

        /// Pause after each section, in milliseconds
        #[arg(long, value_name = "MS")]
        section_pause_ms: Option<u64>,

        /// Maximum number of passes over the opened sections
        #[arg(long, default_value_t = 3)]
        max_passes: usize,
    },

    /// Show usage counters, license state and the last run's performance
    Status,

    /// View and change Auto-OFF settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Activate a license or list the available plans
    License {
        #[command(subcommand)]
        action: LicenseAction,
    },

    /// Serve the demo payment and license API
    Serve {
        /// Port to listen on
        #[arg(
            short,
            long,
            env = "AUTOOFF_LICENSE_PORT",
            default_value_t = autooff_license::DEFAULT_PORT
        )]
        port: u16,
    },

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts for autooff.

SUPPORTED SHELLS:
    bash, zsh, fish, powershell, elvish

INSTALLATION:
    bash:  autooff completion --shell bash >> ~/.bashrc
    zsh:   autooff completion --shell zsh > ~/.zfunc/_autooff
           (add `fpath+=~/.zfunc` to ~/.zshrc before compinit)
    fish:  autooff completion --shell fish > ~/.config/fish/completions/autooff.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let store = cli.store;
    let format = cli.format;

    match cli.command {
        Commands::Run {
            chrome_path,
            port,
            url,
            profile,
            temp_profile,
            section_pause_ms,
            yes,
        } => commands::run::execute(
            RunArgs {
                chrome_path,
                port,
                url,
                profile: (!temp_profile).then_some(profile),
                section_pause_ms,
                wait_for_enter: !yes,
            },
            store,
            format,
        ),
        Commands::Simulate {
            fixture,
            instant,
            section_pause_ms,
            max_passes,
        } => commands::simulate::execute(
            &fixture,
            instant,
            section_pause_ms,
            max_passes,
            store,
            format,
        ),
        Commands::Status => commands::status::execute(store, format),
        Commands::Settings { action } => commands::settings::execute(action, store, format),
        Commands::License { action } => commands::license::execute(action, store, format),
        Commands::Serve { port } => commands::serve::execute(port),
        Commands::Completion { shell } => commands::completion::execute(shell, &mut Cli::command()),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "autooff=debug,autooff_cli=debug,autooff_core=debug,\
             autooff_browser=debug,autooff_license=debug",
        )
    } else {
        EnvFilter::new(
            "autooff=info,autooff_cli=info,autooff_license=info,\
             autooff_core=warn,autooff_browser=warn",
        )
    };

    // Logs go to stderr so JSON output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
