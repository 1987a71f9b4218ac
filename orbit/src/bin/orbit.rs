use clap::Parser;
use orbit::{
    args::{Args, Commands, WorkspaceSubcommands},
    commands::run,
};

fn main() {
    env_logger::init();
    let args = Args::parse();
    let command = args.subcommand.unwrap_or(Commands::Workspace {
        subcommand: Some(WorkspaceSubcommands::List),
    });
    if let Err(e) = run(&args.config, command) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
