use clap::{Parser, Subcommand};
use notes_core::SortOrder;

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "Keep short notes in sync with your cloud account")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name holding backend configuration and session
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notes
    #[command(alias = "ls")]
    List {
        /// Sort order: newest, oldest, title-asc, title-desc
        #[arg(short, long, default_value = "newest", value_parser = parse_sort_order)]
        sort: SortOrder,
        /// Only show notes whose title or content contains this text
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        #[arg(short, long)]
        title: Option<String>,
        /// Note content (read from stdin or $EDITOR when omitted along with --title)
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Edit an existing note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// Replace the title
        #[arg(short, long)]
        title: Option<String>,
        /// Replace the content
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete an existing note
    #[command(alias = "rm")]
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Show a single note
    Show {
        /// Note ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow the note list live until interrupted
    Watch {
        /// Sort order: newest, oldest, title-asc, title-desc
        #[arg(short, long, default_value = "newest", value_parser = parse_sort_order)]
        sort: SortOrder,
        /// Only show notes whose title or content contains this text
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in, register, or sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Firebase web API key
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
        /// Firebase project id
        #[arg(long, value_name = "ID")]
        project_id: Option<String>,
        /// Firestore REST base URL (e.g. an emulator at <http://localhost:8080/v1>)
        #[arg(long, value_name = "URL")]
        firestore_url: Option<String>,
        /// Auth emulator base URL (e.g. <http://localhost:9099>)
        #[arg(long, value_name = "URL")]
        auth_emulator_url: Option<String>,
        /// Live listener poll interval in milliseconds
        #[arg(long, value_name = "MS")]
        poll_interval_ms: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile config
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status,
    /// Sign out and clear the stored session
    Logout,
}

pub fn parse_sort_order(raw: &str) -> Result<SortOrder, String> {
    raw.parse::<SortOrder>().map_err(|error| error.to_string())
}
