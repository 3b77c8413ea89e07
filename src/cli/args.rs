use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::scanner::{CategoryFilter, RiskLevel};

/// macbroom: reclaim disk space from caches, build products and leftovers
#[derive(Parser, Debug)]
#[command(
    name = "macbroom",
    version,
    about = "Find and clean reclaimable disk space",
    long_about = "macbroom scans system caches, developer-tool caches, Docker artifacts,\n\
                   simulators and leftover app data, tracks how they grow between scans,\n\
                   and cleans them to the Trash after confirmation.",
    after_help = "EXAMPLES:\n  \
        macbroom scan                          Scan every category\n  \
        macbroom scan --dev --detailed         Developer caches, one line per target\n  \
        macbroom scan --format json            Machine-readable results\n  \
        macbroom clean --caches                Move system and browser caches to Trash\n  \
        macbroom clean --docker --permanent    Remove Docker artifacts for good\n  \
        macbroom uninstall Slack --dry-run     Preview an app and its leftovers\n  \
        macbroom spacelens ~ --interactive     Browse disk usage\n  \
        macbroom history                       Show what has been freed so far"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode, minimal output
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan for reclaimable space
    Scan {
        #[command(flatten)]
        categories: CategoryArgs,

        /// Show individual targets in results
        #[arg(long)]
        detailed: bool,
    },

    /// Scan, confirm and remove
    Clean {
        #[command(flatten)]
        categories: CategoryArgs,

        /// Delete permanently instead of moving to Trash
        #[arg(long)]
        permanent: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Show what would be removed without touching anything
        #[arg(long)]
        dry_run: bool,

        /// Highest risk level included in the clean
        #[arg(long, default_value = "safe")]
        max_risk: RiskFilter,
    },

    /// Remove an application and its leftover files
    Uninstall {
        /// Application name, without `.app`
        app: String,

        /// Delete permanently instead of moving to Trash
        #[arg(long)]
        permanent: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Show what would be removed without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what takes up space in a directory
    Spacelens {
        /// Directory to analyze
        #[arg(default_value = "~")]
        path: String,

        /// Browse interactively
        #[arg(long, short)]
        interactive: bool,
    },

    /// Show cleanup history and totals
    History,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: CompletionShell,
    },
}

/// Category selectors shared by `scan` and `clean`. No selector means all.
#[derive(Args, Debug, Clone, Default)]
pub struct CategoryArgs {
    /// System caches, logs and crash reports
    #[arg(long)]
    pub system: bool,

    /// Browser caches
    #[arg(long)]
    pub browser: bool,

    /// Xcode derived data, archives and device support
    #[arg(long)]
    pub xcode: bool,

    /// Large and old files
    #[arg(long)]
    pub large: bool,

    /// Dangling Docker images and build cache
    #[arg(long)]
    pub docker: bool,

    /// npm, Yarn and pnpm caches
    #[arg(long)]
    pub node: bool,

    /// Homebrew downloads
    #[arg(long)]
    pub homebrew: bool,

    /// iOS simulator data
    #[arg(long)]
    pub simulator: bool,

    /// pip, Poetry and uv caches
    #[arg(long)]
    pub python: bool,

    /// Cargo registry and git caches
    #[arg(long)]
    pub rust: bool,

    /// Go build and module caches
    #[arg(long)]
    pub go: bool,

    /// JetBrains IDE caches
    #[arg(long)]
    pub jetbrains: bool,

    /// Maven repository
    #[arg(long)]
    pub maven: bool,

    /// Gradle caches and wrapper distributions
    #[arg(long)]
    pub gradle: bool,

    /// Gem and Bundler caches
    #[arg(long)]
    pub ruby: bool,

    /// Every developer-tool category
    #[arg(long)]
    pub dev: bool,

    /// System and browser caches
    #[arg(long)]
    pub caches: bool,

    /// Every category
    #[arg(long)]
    pub all: bool,

    /// Skip paths matching this glob or `dir/**` pattern (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,
}

impl CategoryArgs {
    pub fn to_filter(&self) -> CategoryFilter {
        CategoryFilter {
            system: self.system,
            browser: self.browser,
            xcode: self.xcode,
            large: self.large,
            docker: self.docker,
            node: self.node,
            homebrew: self.homebrew,
            simulator: self.simulator,
            python: self.python,
            rust: self.rust,
            go: self.go,
            ruby: self.ruby,
            jetbrains: self.jetbrains,
            maven: self.maven,
            gradle: self.gradle,
            dev: self.dev,
            caches: self.caches,
            all: self.all,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset to default configuration
    Reset,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Create ~/.macbroom and a default config
    Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Quiet,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RiskFilter {
    Safe,
    Moderate,
    Dangerous,
}

impl RiskFilter {
    pub fn level(self) -> RiskLevel {
        match self {
            RiskFilter::Safe => RiskLevel::Safe,
            RiskFilter::Moderate => RiskLevel::Moderate,
            RiskFilter::Dangerous => RiskLevel::Dangerous,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

impl From<CompletionShell> for clap_complete::Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => clap_complete::Shell::Bash,
            CompletionShell::Zsh => clap_complete::Shell::Zsh,
            CompletionShell::Fish => clap_complete::Shell::Fish,
        }
    }
}
