mod state;

use anyhow::{bail, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser, Subcommand};
use roles_core::{
    load_config, parse_capability, status_of, Address, RegistryConfig, Role, RoleRegistry,
    RolesResult, Selector,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use state::StateFile;

#[derive(Debug, Parser)]
#[command(name = "roles-cli", version = "0.1.0")]
struct Cli {
    /// State file holding the registry and its events
    #[arg(long, global = true, default_value = "roles-state.json")]
    state: PathBuf,

    /// Config file (toml or json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new registry state file
    Init {
        /// Principal made root
        #[arg(long)]
        deployer: Option<Address>,
        /// Registry address
        #[arg(long)]
        address: Option<Address>,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },
    /// Give a user a role
    AddUserRole {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        user: Address,
        #[arg(long)]
        role: Role,
    },
    /// Take a role away from a user
    RemoveUserRole {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        user: Address,
        #[arg(long)]
        role: Role,
    },
    /// Whether a user holds a role
    HasUserRole {
        #[arg(long)]
        user: Address,
        #[arg(long)]
        role: Role,
    },
    /// Print a user's role set
    UserRoles {
        #[arg(long)]
        user: Address,
    },
    /// Grant a role a capability given as target:selector
    AddCapability {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        capability: String,
    },
    /// Revoke a capability from a role
    RemoveCapability {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        capability: String,
    },
    /// Print the role set of a capability
    CapabilityRoles {
        #[arg(long)]
        capability: String,
    },
    /// Set or clear a user's root flag
    SetRoot {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        user: Address,
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        enabled: bool,
    },
    /// Set or clear a capability's public flag
    SetPublic {
        #[arg(long)]
        caller: Address,
        #[arg(long)]
        capability: String,
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        enabled: bool,
    },
    /// Whether a user may call a capability
    CanCall {
        #[arg(long)]
        user: Address,
        #[arg(long)]
        capability: String,
    },
    /// Print the selector of an operation signature
    Selector {
        /// e.g. addUserRole(address,uint8)
        signature: String,
    },
    /// Print recorded events
    Events {
        /// Only events of this kind, e.g. RoleAdded
        #[arg(long)]
        name: Option<String>,
    },
}

/// How a command ended when it did not fail outright.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Done,
    Refused,
}

impl Outcome {
    fn exit_code(&self) -> u8 {
        match self {
            Outcome::Done => 0,
            Outcome::Refused => 2,
        }
    }
}

/// Exit status for a command line clap did not accept.
///
/// Help and version requests succeed; every other rejection is a parse
/// failure and must not look like a refusal.
fn parse_failure_code(e: &clap::Error) -> u8 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn report<W: Write>(out: &mut W, result: RolesResult<()>) -> Result<Outcome> {
    let status = status_of(&result);
    writeln!(out, "{} ({})", status, status.code())?;
    match result {
        Ok(()) => Ok(Outcome::Done),
        Err(e) => {
            warn!("{}", e);
            Ok(Outcome::Refused)
        }
    }
}

fn init<W: Write>(
    cli: &Cli,
    config: &RegistryConfig,
    deployer: Option<Address>,
    address: Option<Address>,
    force: bool,
    out: &mut W,
) -> Result<Outcome> {
    if cli.state.exists() && !force {
        bail!(
            "State file {} already exists, pass --force to overwrite",
            cli.state.display()
        );
    }

    let mut config = config.clone();
    if let Some(address) = address {
        config.registry.address = address;
    }
    if let Some(deployer) = deployer {
        config.registry.deployer = deployer;
    }
    config.validate()?;

    let registry = RoleRegistry::from_config(&config);
    StateFile {
        registry: registry.snapshot(),
        events: Vec::new(),
    }
    .save(&cli.state)?;

    info!("Initialized registry {} in {:?}", registry.address(), cli.state);
    writeln!(out, "{}", registry.address())?;
    Ok(Outcome::Done)
}

fn run<W: Write>(cli: Cli, config: &RegistryConfig, out: &mut W) -> Result<Outcome> {
    match &cli.command {
        Commands::Init {
            deployer,
            address,
            force,
        } => return init(&cli, config, *deployer, *address, *force, out),
        Commands::Selector { signature } => {
            writeln!(out, "{}", Selector::from_signature(signature))?;
            return Ok(Outcome::Done);
        }
        _ => {}
    }

    let (registry, history) = StateFile::load(&cli.state)?.open(config.events.capacity)?;

    let outcome = match cli.command {
        Commands::AddUserRole { caller, user, role } => {
            report(out, registry.add_user_role(caller, user, role))?
        }
        Commands::RemoveUserRole { caller, user, role } => {
            report(out, registry.remove_user_role(caller, user, role))?
        }
        Commands::HasUserRole { user, role } => {
            writeln!(out, "{}", registry.has_user_role(user, role))?;
            return Ok(Outcome::Done);
        }
        Commands::UserRoles { user } => {
            writeln!(out, "{}", registry.user_roles(user))?;
            return Ok(Outcome::Done);
        }
        Commands::AddCapability {
            caller,
            role,
            capability,
        } => {
            let result = parse_capability(&capability).and_then(|c| {
                registry.add_role_capability(caller, role, c.target, c.selector)
            });
            report(out, result)?
        }
        Commands::RemoveCapability {
            caller,
            role,
            capability,
        } => {
            let result = parse_capability(&capability).and_then(|c| {
                registry.remove_role_capability(caller, role, c.target, c.selector)
            });
            report(out, result)?
        }
        Commands::CapabilityRoles { capability } => match parse_capability(&capability) {
            Ok(c) => {
                writeln!(out, "{}", registry.capability_roles(c.target, c.selector))?;
                return Ok(Outcome::Done);
            }
            Err(e) => return report(out, Err(e)),
        },
        Commands::SetRoot {
            caller,
            user,
            enabled,
        } => report(out, registry.set_root_user(caller, user, enabled))?,
        Commands::SetPublic {
            caller,
            capability,
            enabled,
        } => {
            let result = parse_capability(&capability).and_then(|c| {
                registry.set_public_capability(caller, c.target, c.selector, enabled)
            });
            report(out, result)?
        }
        Commands::CanCall { user, capability } => match parse_capability(&capability) {
            Ok(c) => {
                writeln!(out, "{}", registry.can_call(user, c.target, c.selector))?;
                return Ok(Outcome::Done);
            }
            Err(e) => return report(out, Err(e)),
        },
        Commands::Events { name } => {
            for record in history.records() {
                if name.as_deref().map_or(true, |name| record.name() == name) {
                    writeln!(out, "{}", record)?;
                }
            }
            return Ok(Outcome::Done);
        }
        // Handled before the state file is opened
        Commands::Init { .. } | Commands::Selector { .. } => return Ok(Outcome::Done),
    };

    // Refusals are recorded too
    StateFile::capture(&registry, &history).save(&cli.state)?;
    Ok(outcome)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_failure_code(&e));
        }
    };

    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    // Initialize logging
    init_tracing(&config.log_level);

    let stdout = io::stdout();
    match run(cli, &config, &mut stdout.lock()) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
