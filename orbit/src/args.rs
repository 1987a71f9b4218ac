use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Manage the workspaces of the signed-in user
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Session file holding the server URL and tokens
    #[arg(long, default_value = "orbit-client.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub subcommand: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Workspace {
        #[command(subcommand)]
        subcommand: Option<WorkspaceSubcommands>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceSubcommands {
    Create { name: String },
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let args = Args::parse_from(["orbit", "workspace", "create", "Acme Corp"]);
        assert_eq!(args.config, PathBuf::from("orbit-client.toml"));
        match args.subcommand {
            Some(Commands::Workspace {
                subcommand: Some(WorkspaceSubcommands::Create { name }),
            }) => assert_eq!(name, "Acme Corp"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_with_config() {
        let args = Args::parse_from(["orbit", "--config", "/tmp/s.toml", "workspace", "list"]);
        assert_eq!(args.config, PathBuf::from("/tmp/s.toml"));
        assert!(matches!(
            args.subcommand,
            Some(Commands::Workspace {
                subcommand: Some(WorkspaceSubcommands::List)
            })
        ));
    }
}
