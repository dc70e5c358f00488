use std::path::PathBuf;

use careboard::config::Overrides;
use careboard_api_types::{CaregiverPermissions, MealType, RecordId};
use clap::{Args, Parser, Subcommand, ValueEnum};
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

#[derive(Parser, Debug)]
#[command(
    name = "careboard-cli",
    version,
    about = "Command-line client for the careboard dashboard API"
)]
pub struct Cli {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "CAREBOARD_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in, sign out, inspect the stored session.
    #[command(subcommand)]
    Session(SessionCmd),
    /// Treatment plan steps.
    #[command(subcommand)]
    PlanItems(PlanItemsCmd),
    /// Daily journal entries.
    #[command(subcommand)]
    Journal(JournalCmd),
    /// Meal logs.
    #[command(subcommand)]
    Diet(DietCmd),
    /// Uploaded document metadata.
    #[command(subcommand)]
    Documents(DocumentsCmd),
    /// Encouraging snippets.
    #[command(subcommand)]
    HopeSnippets(HopeSnippetsCmd),
    /// Saved research articles.
    #[command(subcommand)]
    Research(ResearchCmd),
    /// Delegated caregivers.
    #[command(subcommand)]
    Caregivers(CaregiversCmd),
}

#[derive(Subcommand, Debug)]
pub enum SessionCmd {
    /// Exchange credentials for a token and store it.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAREBOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Read the password from a file instead.
        #[arg(long, value_name = "PATH")]
        password_file: Option<PathBuf>,
    },
    /// Forget the stored token.
    Logout,
    /// Show whether a token is stored.
    Status,
}

#[derive(Subcommand, Debug)]
pub enum PlanItemsCmd {
    List,
    Get {
        id: RecordId,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// RFC 3339 timestamp.
        #[arg(long, value_parser = parse_timestamp)]
        due_at: Option<OffsetDateTime>,
    },
    Update {
        id: RecordId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_parser = parse_timestamp)]
        due_at: Option<OffsetDateTime>,
    },
    /// Flip the completed flag.
    Toggle {
        id: RecordId,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(Args, Debug, Default)]
pub struct JournalFields {
    #[arg(long)]
    pub mood: Option<u8>,
    #[arg(long = "pain")]
    pub pain_level: Option<u8>,
    #[arg(long = "energy")]
    pub energy_level: Option<u8>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum JournalCmd {
    List,
    Get {
        id: RecordId,
    },
    Create {
        /// Entry date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        date: Date,
        #[command(flatten)]
        fields: JournalFields,
    },
    Update {
        id: RecordId,
        #[command(flatten)]
        fields: JournalFields,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MealArg {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl From<MealArg> for MealType {
    fn from(value: MealArg) -> Self {
        match value {
            MealArg::Breakfast => MealType::Breakfast,
            MealArg::Lunch => MealType::Lunch,
            MealArg::Dinner => MealType::Dinner,
            MealArg::Snack => MealType::Snack,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum DietCmd {
    List,
    Get {
        id: RecordId,
    },
    Create {
        #[arg(long, value_parser = parse_date)]
        date: Date,
        #[arg(long, value_enum)]
        meal: MealArg,
        #[arg(long)]
        description: String,
        #[arg(long)]
        calories: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    Update {
        id: RecordId,
        #[arg(long, value_enum)]
        meal: Option<MealArg>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        calories: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocumentsCmd {
    List,
    Get {
        id: RecordId,
    },
    /// Register document metadata.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        file_name: String,
        #[arg(long)]
        content_type: Option<String>,
    },
    Rename {
        id: RecordId,
        #[arg(long)]
        title: String,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(Subcommand, Debug)]
pub enum HopeSnippetsCmd {
    List,
    Get {
        id: RecordId,
    },
    Create {
        #[arg(long)]
        text: String,
        #[arg(long)]
        source: Option<String>,
    },
    Update {
        id: RecordId,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Flip the favorite flag.
    Favorite {
        id: RecordId,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResearchCmd {
    List,
    Get {
        id: RecordId,
    },
    Save {
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        summary: Option<String>,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(Args, Debug, Clone, Copy, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PermissionArgs {
    #[arg(long)]
    pub view_plan: bool,
    #[arg(long)]
    pub edit_plan: bool,
    #[arg(long)]
    pub view_journal: bool,
    #[arg(long)]
    pub view_diet: bool,
    #[arg(long)]
    pub view_documents: bool,
}

impl From<PermissionArgs> for CaregiverPermissions {
    fn from(args: PermissionArgs) -> Self {
        Self {
            view_plan: args.view_plan,
            edit_plan: args.edit_plan,
            view_journal: args.view_journal,
            view_diet: args.view_diet,
            view_documents: args.view_documents,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CaregiversCmd {
    List,
    Get {
        id: RecordId,
    },
    Invite {
        #[arg(long)]
        email: String,
        #[command(flatten)]
        permissions: PermissionArgs,
    },
    /// Replace a caregiver's permissions.
    Update {
        id: RecordId,
        #[command(flatten)]
        permissions: PermissionArgs,
    },
    Delete {
        id: RecordId,
    },
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

fn parse_timestamp(value: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|err| format!("expected RFC 3339: {err}"))
}
