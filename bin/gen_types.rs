//! Writes TypeScript declarations for the profile types the web app shares.
//!
//! Usage: cargo run --bin gen_types --features ts-rs [OUT_FILE]

use pinch::{StepId, TourProgress, WeddingProfile, TS};
use std::path::PathBuf;

fn main() {
    let out = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("web/src/types/generated/profile.ts"));

    let decls = [StepId::decl(), TourProgress::decl(), WeddingProfile::decl()];
    let mut contents = String::from("// Generated by gen_types. Do not edit.\n\n");
    for decl in decls {
        contents.push_str("export ");
        contents.push_str(&decl);
        contents.push_str("\n\n");
    }

    if let Some(dir) = out.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Could not create {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }
    if let Err(e) = std::fs::write(&out, contents) {
        eprintln!("Could not write {}: {}", out.display(), e);
        std::process::exit(1);
    }
    println!("Wrote {}", out.display());
}
