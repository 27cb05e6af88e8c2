use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "iotc")]
#[command(version)]
#[command(about = "Declarative management of Azure IoT Central applications", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Declaration file [default: ./iotcentral.toml]
    #[arg(long, global = true, env = "IOTCENTRAL_CONFIG")]
    pub config: Option<String>,

    /// State file [default: iotcentral.state.json next to the declaration file]
    #[arg(long, global = true, env = "IOTCENTRAL_STATE")]
    pub state: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Create, update and delete entities to match the declaration file
    Apply(ApplyArgs),

    /// Re-read every managed entity into the state file
    Refresh(JobsArgs),

    /// Bring an existing entity under management
    Import {
        /// Address to import into, e.g. iotcentral_device.thermostat
        address: String,

        /// Remote ID of the entity
        id: String,
    },

    /// Delete managed entities
    Destroy(DestroyArgs),

    /// Inspect the state file
    #[command(subcommand)]
    State(StateCommand),

    /// List every device in the application
    Devices(OutputArgs),

    /// List every organization in the application
    Organizations(OutputArgs),

    /// Look up a role by display name
    Role {
        /// Display name, e.g. "Org Administrator"
        display_name: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Reconciliation
// ============================================================================

#[derive(Parser)]
pub struct JobsArgs {
    /// Number of entities reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Only plan matching resources (type or type.name)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Re-read managed entities before planning
    #[arg(long)]
    pub refresh: bool,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only apply matching resources (type or type.name)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Don't make changes, just show what would happen
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Re-read managed entities before planning
    #[arg(long)]
    pub refresh: bool,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

#[derive(Parser)]
pub struct DestroyArgs {
    /// Only destroy matching resources (type or type.name)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

// ============================================================================
// State and data
// ============================================================================

#[derive(Subcommand)]
pub enum StateCommand {
    /// List managed addresses
    List,

    /// Show the stored attributes of an address
    Show {
        /// Address, e.g. iotcentral_organization.north
        address: String,
    },
}

#[derive(Parser)]
pub struct OutputArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
