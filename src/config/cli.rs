use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "hydra-hub")]
#[command(about = "Control hub for modules spread over Hydra subsystems")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "hydra.toml", global = true)]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output", global = true)]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines", global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List modules known to any subsystem
    Modules {
        /// Only modules installed somewhere
        #[arg(long)]
        installed: bool,
    },
    /// List versions of a module compatible with each subsystem
    Versions { module_id: String },
    /// Install a module, one version constraint per subsystem
    Install {
        module_id: String,
        /// `<subsystem>=<constraint>`, repeatable
        #[arg(
            long = "version",
            value_name = "SUBSYSTEM=CONSTRAINT",
            value_parser = parse_subsystem_constraint,
            required = true
        )]
        versions: Vec<(String, String)>,
    },
    Uninstall { module_id: String },
    Activate { module_id: String },
    Deactivate { module_id: String },
    Upgrade {
        module_id: String,
        #[arg(long, default_value = "*")]
        constraint: String,
    },
    Downgrade {
        module_id: String,
        #[arg(long)]
        constraint: String,
    },
}

/// Splits `server-1=^1.2` at the first `=`, so `server-1==1.2.0` keeps `=1.2.0`.
pub fn parse_subsystem_constraint(raw: &str) -> Result<(String, String), String> {
    let (subsystem, constraint) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <subsystem>=<constraint>, got '{}'", raw))?;
    let subsystem = subsystem.trim();
    if subsystem.is_empty() {
        return Err(format!("missing subsystem id in '{}'", raw));
    }
    Ok((subsystem.to_string(), constraint.trim().to_string()))
}
