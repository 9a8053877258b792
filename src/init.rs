//! Project initialization for pinch
//!
//! `pinch init` creates the `.pinch/` folder: database, config file and,
//! on request, an editable copy of the tour catalog.

use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::db::Database;
use crate::tour::TourCatalog;

/// Starter config, every key at its default
const CONFIG_TOML: &str = r#"# Pinch configuration

[tour]
# Where the tour lands once finished or skipped
home_route = "/dashboard"
# Lower onboardingStep again when Back leaves a page
rewind_onboarding_step = false
# Replacement step script, relative to this file
# catalog_path = "catalog.toml"

[tooltip]
retry_delay_ms = 100
max_retries = 20
width = 44
height = 9
gap = 1

[concierge]
reply_delay_ms = 1200
"#;

/// Initialize pinch in `dir`
pub fn init_project(dir: &Path, with_catalog: bool) -> Result<(), String> {
    println!("\n{}", "Initializing Pinch...".magenta().bold());
    println!("   Directory: {}\n", dir.display());

    // 1. Create .pinch directory
    let pinch_dir = dir.join(".pinch");
    create_dir_if_missing(&pinch_dir)?;

    // 2. Open the database once so the tables exist
    let db_path = pinch_dir.join("pinch.db");
    if db_path.exists() {
        println!("   {} .pinch/pinch.db (already exists)", "Skipping".yellow());
    } else {
        Database::open_at(&db_path).map_err(|e| format!("Could not create database: {}", e))?;
        println!("   {} .pinch/pinch.db", "Creating".green());
    }

    // 3. Config file, pointing at the catalog copy when one is written
    let config = if with_catalog {
        CONFIG_TOML.replace("# catalog_path", "catalog_path")
    } else {
        CONFIG_TOML.to_string()
    };
    write_file_if_missing(&pinch_dir.join("config.toml"), &config, ".pinch/config.toml")?;

    // 4. Editable catalog
    if with_catalog {
        write_file_if_missing(
            &pinch_dir.join("catalog.toml"),
            TourCatalog::builtin_source(),
            ".pinch/catalog.toml",
        )?;
    }

    // 5. Keep local state out of git
    add_to_gitignore(dir)?;

    println!("\n{}", "Pinch initialized!".green().bold());
    println!("\nNext steps:");
    println!("  1. Run {} to start the onboarding tour", "pinch tour".cyan());
    println!("  2. Run {} to see saved progress", "pinch status".cyan());
    println!();

    Ok(())
}

fn create_dir_if_missing(path: &Path) -> Result<(), String> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| format!("Could not create {}: {}", path.display(), e))?;
        println!("   {} {}", "Creating".green(), path.display());
    }
    Ok(())
}

fn write_file_if_missing(path: &Path, content: &str, display_name: &str) -> Result<(), String> {
    if path.exists() {
        println!("   {} {} (already exists)", "Skipping".yellow(), display_name);
    } else {
        fs::write(path, content)
            .map_err(|e| format!("Could not write {}: {}", display_name, e))?;
        println!("   {} {}", "Creating".green(), display_name);
    }
    Ok(())
}

fn add_to_gitignore(dir: &Path) -> Result<(), String> {
    let gitignore_path = dir.join(".gitignore");
    let entry = ".pinch/";

    if gitignore_path.exists() {
        let existing = fs::read_to_string(&gitignore_path)
            .map_err(|e| format!("Could not read .gitignore: {}", e))?;

        if existing
            .lines()
            .any(|line| line.trim() == entry || line.trim() == ".pinch")
        {
            return Ok(());
        }

        let new_content = format!("{}\n\n# Pinch local state\n{}\n", existing.trim_end(), entry);
        fs::write(&gitignore_path, new_content)
            .map_err(|e| format!("Could not update .gitignore: {}", e))?;
        println!("   {} .gitignore (added .pinch/)", "Updated".green());
    } else {
        let content = format!("# Pinch local state\n{}\n", entry);
        fs::write(&gitignore_path, content)
            .map_err(|e| format!("Could not create .gitignore: {}", e))?;
        println!("   {} .gitignore", "Creating".green());
    }

    Ok(())
}
