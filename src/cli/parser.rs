use crate::export::{ExportFormat, ExportWhat};
use clap::{Parser, Subcommand};

/// Command-line interface definition for mealbook
#[derive(Parser)]
#[command(
    name = "mealbook",
    version = env!("CARGO_PKG_VERSION"),
    about = "Shared-housing meal accounts: balances, daily meals, breakfast splits and monthly closing",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    /// Identity recorded as performer of the operation
    #[arg(global = true, long = "as", value_name = "NAME")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file
    Config {
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,

        #[arg(long = "check", help = "Check configuration file for missing fields")]
        check: bool,

        #[arg(long = "migrate", help = "Add missing fields with their defaults")]
        migrate: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(long = "editor", help = "Editor to use with --edit")]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,

        #[arg(long = "verify", help = "Replay the ledger and compare with stored balances")]
        verify: bool,
    },

    /// Print the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,

        #[arg(long = "op", help = "Only rows of this operation")]
        operation: Option<String>,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCmd,
    },

    /// Record a deposit
    Deposit {
        user: String,

        /// breakfast | lunch | dinner (or b/l/d)
        category: String,

        amount: String,

        #[arg(long, default_value = "")]
        note: String,
    },

    /// Show, freeze or unfreeze balances
    Balance {
        #[command(subcommand)]
        action: BalanceCmd,
    },

    /// Transaction history, newest first
    History {
        /// Limit to one user
        user: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        kind: Option<String>,

        #[arg(long, short, help = "Filter by year/month/day or a custom range")]
        period: Option<String>,

        #[arg(long = "all", help = "Include reversed transactions")]
        include_reversed: bool,

        #[arg(long, default_value_t = 50)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long)]
        json: bool,
    },

    /// Daily lunch / dinner attendance
    Meal {
        #[command(subcommand)]
        action: MealCmd,
    },

    /// Shared breakfast costs
    Breakfast {
        #[command(subcommand)]
        action: BreakfastCmd,
    },

    /// Month settings, preview and finalization
    Month {
        #[command(subcommand)]
        action: MonthCmd,
    },

    /// Privileged corrections (reason required, always logged)
    Correct {
        #[command(subcommand)]
        action: CorrectCmd,
    },

    /// Create a backup copy of the database
    Backup {
        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(long)]
        compress: bool,

        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Export ledger records for external reporting
    Export {
        #[arg(long, value_enum, default_value = "transactions")]
        what: ExportWhat,

        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        #[arg(long, value_name = "FILE")]
        file: String,

        #[arg(
            long,
            value_name = "RANGE",
            help = "Filter export by year/month/day or a custom range"
        )]
        range: Option<String>,

        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCmd {
    Add { name: String },
    List {
        #[arg(long = "all", help = "Include inactive users")]
        all: bool,
    },
    Activate { name: String },
    Deactivate { name: String },
}

#[derive(Subcommand)]
pub enum BalanceCmd {
    /// Balances of one user, or of everyone
    Show {
        user: Option<String>,
        #[arg(long)]
        json: bool,
    },
    Freeze { user: String, category: String },
    Unfreeze { user: String, category: String },
}

#[derive(Subcommand)]
pub enum MealCmd {
    /// Flip a meal on/off for a day
    Toggle {
        date: String,
        user: String,
        meal: String,
    },
    /// Set a meal explicitly on or off
    Set {
        date: String,
        user: String,
        meal: String,
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    /// Set the meal count (guests); clamped to the configured maximum
    Count {
        date: String,
        user: String,
        meal: String,
        #[arg(allow_hyphen_values = true)]
        count: i64,
    },
    /// Effective record of one day
    Show {
        date: String,
        user: String,
        meal: String,
    },
    /// Month sheet of one user
    Sheet {
        user: String,
        /// YYYY-MM (default: current month)
        month: Option<String>,
    },
    Holiday {
        #[command(subcommand)]
        action: HolidayCmd,
    },
}

#[derive(Subcommand)]
pub enum HolidayCmd {
    Add {
        date: String,
        #[arg(default_value = "")]
        description: String,
    },
    Remove { date: String },
    List {
        /// Period expression (default: current year)
        period: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BreakfastCmd {
    /// Create a draft entry
    Submit {
        date: String,

        #[arg(long, value_name = "TOTAL", help = "Split TOTAL equally among --users")]
        equal: Option<String>,

        #[arg(long, value_delimiter = ',', help = "Participants for --equal")]
        users: Vec<String>,

        #[arg(long = "cost", value_name = "USER=AMOUNT", help = "Individual cost (repeatable)")]
        costs: Vec<String>,

        #[arg(long, default_value = "")]
        description: String,
    },
    /// Edit a draft or reopened entry
    Edit {
        id: i64,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, value_name = "TOTAL")]
        equal: Option<String>,

        #[arg(long, value_delimiter = ',')]
        users: Vec<String>,

        #[arg(long = "cost", value_name = "USER=AMOUNT")]
        costs: Vec<String>,
    },
    Delete { id: i64 },
    /// Finalize and charge every participant
    Deduct { id: i64 },
    /// Refund every participant of a finalized entry
    Reverse {
        id: i64,
        #[arg(long)]
        reason: String,
    },
    List {
        /// Period expression (default: current month)
        period: Option<String>,
    },
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum MonthCmd {
    /// Show (creating the draft if needed) the settings of a month
    Show { month: String },
    /// Update range and rates of a month that is not finalized
    Save {
        month: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long = "lunch-rate")]
        lunch_rate: Option<String>,
        #[arg(long = "dinner-rate")]
        dinner_rate: Option<String>,
    },
    /// Dry-run calculation, nothing is written
    Preview {
        month: String,
        #[arg(long)]
        json: bool,
    },
    /// Lock the month and charge lunch and dinner
    Finalize { month: String },
    List,
}

#[derive(Subcommand)]
pub enum CorrectCmd {
    /// Force new values onto a (possibly finalized) artifact
    Update {
        /// month | breakfast | meal
        target: String,
        /// month: YYYY-MM or id; breakfast: id; meal: id or DATE:USER:MEAL
        id: String,
        /// JSON object with the new values
        #[arg(long)]
        values: String,
        #[arg(long)]
        reason: String,
    },
    /// Lift the finalization lock
    Unfinalize {
        target: String,
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Set a balance to an exact amount
    Balance {
        user: String,
        category: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
        #[arg(long)]
        reason: String,
    },
    /// Cancel a transaction with a reversal pair
    Void {
        tx_id: i64,
        #[arg(long)]
        reason: String,
    },
    /// Correction history, newest first
    Log {
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        json: bool,
    },
}
