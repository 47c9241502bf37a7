use clap::Parser;
use upass::cli::commands;
use upass::cli::{Cli, Commands, KeyAction};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Key { ref action } => match action {
            KeyAction::Set => commands::key::execute_set(&cli),
            KeyAction::Clear => commands::key::execute_clear(&cli),
        },
        Commands::Save {
            ref site,
            ref username,
            ref password,
            force,
        } => commands::save::execute(&cli, site, username, password.as_deref(), force),
        Commands::Get { ref site } => commands::get::execute(&cli, site),
        Commands::Import { ref file } => commands::import_cmd::execute(&cli, file),
        Commands::Export { ref output } => commands::export::execute(&cli, output.as_deref()),
        Commands::Init => commands::init::execute(&cli),
        Commands::Status => commands::status::execute(&cli),
        Commands::Serve => commands::serve::execute(&cli),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
    };

    if let Err(e) = result {
        upass::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr so stdout stays clean for `get`, `export`
/// and `serve`.  `UPASS_LOG` takes a full filter; `--verbose` means debug.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("UPASS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "upass=debug,warn" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
