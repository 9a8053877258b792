use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use pinch::profile::{ProfilePatch, ProfileStore, TourSection, WeddingProfile};
use pinch::tour::{History, NavigateOptions, Navigator, StepId, TourCatalog, TourPosition};
use pinch::tui::app::App;
use pinch::{Config, Database, MemoryProfileStore, MockConcierge, SqliteProfileStore, TourSession};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pinch")]
#[command(author, version, about = "Guided onboarding tour for the Pinch wedding concierge")]
struct Args {
    /// Log more (-v debug, -vv trace). PINCH_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create .pinch/ with a database and config in the current directory
    Init {
        /// Also write an editable copy of the tour catalog
        #[arg(long)]
        with_catalog: bool,
    },

    /// Run the onboarding tour in the terminal
    Tour {
        /// Start on this page (route or slug, e.g. step-4)
        #[arg(long, conflicts_with = "at")]
        page: Option<String>,

        /// Start from a deep link such as 'page=step-4&step=7b'
        #[arg(long)]
        at: Option<String>,

        /// Keep progress in memory only
        #[arg(long)]
        ephemeral: bool,
    },

    /// Show saved onboarding progress
    Status {
        /// Print the stored profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tour pages and their steps
    Pages,

    /// Mark the whole tour as done, as the in-tour Skip button does
    Skip,

    /// Delete the stored profile so the tour starts over
    Reset,

    /// Print a deep link to a tour step
    Link {
        /// Page route or slug
        page: String,

        /// Step id, e.g. 3 or 7b (defaults to the first step)
        step: Option<String>,
    },

    /// Generate shell completion script
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let args = Args::parse();
    let is_tour = matches!(args.command, Command::Tour { .. });
    init_logging(args.verbose, is_tour);

    let result = match args.command {
        Command::Init { with_catalog } => std::env::current_dir()
            .map_err(|e| format!("Could not read current directory: {}", e))
            .and_then(|dir| pinch::init::init_project(&dir, with_catalog)),
        Command::Tour {
            page,
            at,
            ephemeral,
        } => run_tour(page, at, ephemeral),
        Command::Status { json } => show_status(json),
        Command::Pages => list_pages(),
        Command::Skip => skip_tour(),
        Command::Reset => reset_profile(),
        Command::Link { page, step } => print_link(&page, step.as_deref()),
        Command::Completion { shell } => {
            let mut cmd = Args::command();
            generate(shell, &mut cmd, "pinch", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// stderr for one-shot commands; the TUI owns the terminal, so `tour`
/// logs to `.pinch/pinch.log` instead
fn init_logging(verbose: u8, to_file: bool) {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("PINCH_LOG")
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if to_file {
        let log_path = Database::db_path().with_file_name("pinch.log");
        let file = log_path
            .parent()
            .filter(|dir| dir.is_dir())
            .and_then(|_| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_path)
                    .ok()
            });
        match file {
            Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
            None => builder.with_writer(io::sink).init(),
        }
    } else {
        builder.with_writer(io::stderr).init();
    }
}

fn load_catalog(config: &Config) -> Result<TourCatalog, String> {
    TourCatalog::load_configured(config).map_err(|e| e.to_string())
}

fn open_store() -> Result<SqliteProfileStore, String> {
    Database::open()
        .map(SqliteProfileStore::new)
        .map_err(|e| format!("Could not open database: {}", e))
}

fn run_tour(page: Option<String>, at: Option<String>, ephemeral: bool) -> Result<(), String> {
    let config = Config::load();
    let catalog = load_catalog(&config)?;

    let start = match (&page, &at) {
        (_, Some(link)) => Some(TourPosition::decode(link, &catalog).map_err(|e| e.to_string())?),
        (Some(page), None) => {
            let found = catalog
                .find(page)
                .ok_or_else(|| format!("Unknown tour page '{}'", page))?;
            let step = found
                .first_step()
                .ok_or_else(|| format!("Tour page '{}' has no steps", page))?;
            Some(TourPosition::new(found.route.clone(), step))
        }
        (None, None) => None,
    };

    let mut watch_path: Option<PathBuf> = None;
    let store: Rc<dyn ProfileStore> = if ephemeral {
        Rc::new(MemoryProfileStore::new())
    } else {
        let store = open_store()?;
        watch_path = Some(store.database().path().to_path_buf());
        Rc::new(store)
    };

    let history = Rc::new(History::new(config.tour.home_route.as_str()));
    let session = TourSession::new(catalog, &config, store, history.clone());
    let route = match &start {
        Some(position) => position.route.clone(),
        None => session.resume_route(),
    };
    history.navigate_to(&route, NavigateOptions { replace: true });
    tracing::info!(route = %history.current(), ephemeral, "starting tour");

    let concierge = MockConcierge::new(&config.concierge);
    let app = App::new(session, history, concierge, watch_path, start);
    pinch::tui::run(app).map_err(|e| format!("TUI error: {}", e))
}

fn show_status(json: bool) -> Result<(), String> {
    let store = open_store()?;
    let profile = store.get_profile().map_err(|e| e.to_string())?;

    if json {
        let out = serde_json::to_string_pretty(&profile).map_err(|e| e.to_string())?;
        println!("{}", out);
        return Ok(());
    }

    println!("{} {}", "Database:".bold(), store.database().path().display());
    let entries = store.database().entries().map_err(|e| e.to_string())?;
    for entry in &entries {
        println!("  {} {}", entry.key, entry.updated_at.dimmed());
    }
    let Some(profile) = profile else {
        println!("No profile yet. Run {} to begin.", "pinch tour".cyan());
        return Ok(());
    };
    print_profile(&profile);
    Ok(())
}

fn print_profile(profile: &WeddingProfile) {
    let state = if profile.onboarding_complete {
        "complete".green()
    } else if profile.tour_mode {
        "in tour".yellow()
    } else {
        "paused".normal()
    };
    println!("{} {}", "Onboarding:".bold(), state);
    println!("{} {}", "Stage:".bold(), profile.onboarding_step);
    if let Some(names) = &profile.couple_names {
        println!("{} {}", "Couple:".bold(), names);
    }
    if let Some(updated) = &profile.updated_at {
        println!("{} {}", "Updated:".bold(), updated.dimmed());
    }

    println!(
        "\n{} ({}/{})",
        "Sections".bold(),
        profile.tour_progress.completed_count(),
        TourSection::ALL.len()
    );
    for section in TourSection::ALL {
        if profile.tour_progress.get(section) {
            println!("  {} {}", "✓".green(), section);
        } else {
            println!("  {} {}", "·".dimmed(), section);
        }
    }
}

fn list_pages() -> Result<(), String> {
    let config = Config::load();
    let catalog = load_catalog(&config)?;

    for page in catalog.pages() {
        let steps: Vec<String> = page.sequence().iter().map(StepId::to_string).collect();
        let section = page
            .section
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>2}  {:<22} {:<20} {}",
            page.stage,
            page.route.cyan(),
            section,
            steps.join(" ").dimmed()
        );
    }
    Ok(())
}

fn skip_tour() -> Result<(), String> {
    let store = open_store()?;
    let profile = store
        .update_profile(&ProfilePatch::tour_skipped())
        .map_err(|e| format!("Could not save profile: {}", e))?;
    tracing::info!(id = %profile.id, "tour skipped from the command line");
    println!("{} Tour marked as done", "✓".green());
    Ok(())
}

fn reset_profile() -> Result<(), String> {
    let store = open_store()?;
    let existed = store
        .clear()
        .map_err(|e| format!("Could not reset profile: {}", e))?;
    if existed {
        println!("{} Profile removed; the tour will start over", "✓".green());
    } else {
        println!("No profile to reset");
    }
    Ok(())
}

fn print_link(page: &str, step: Option<&str>) -> Result<(), String> {
    let config = Config::load();
    let catalog = load_catalog(&config)?;

    let mut query = vec![("page", page)];
    if let Some(step) = step {
        query.push(("step", step));
    }
    let link = serde_urlencoded::to_string(&query).map_err(|e| e.to_string())?;
    let position = TourPosition::decode(&link, &catalog).map_err(|e| e.to_string())?;
    println!("{}", position.encode());
    Ok(())
}
