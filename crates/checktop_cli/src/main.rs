//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `checktop_core` wiring.
//! - Keep output deterministic for quick local sanity checks.

use checktop_core::{ChecklistService, SqliteCollectionStore};

fn main() {
    let log_dir = std::env::temp_dir().join("checktop-logs");
    match log_dir.to_str() {
        Some(dir) => {
            if let Err(message) =
                checktop_core::init_logging(checktop_core::default_log_level(), dir)
            {
                eprintln!("logging init failed: {message}");
            }
        }
        None => eprintln!("log directory is not valid UTF-8; continuing without file logs"),
    }

    let conn = match checktop_core::open_store_in_memory() {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("store open failed: {err}");
            std::process::exit(1);
        }
    };
    let store = match SqliteCollectionStore::try_new(conn) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("store not ready: {err}");
            std::process::exit(1);
        }
    };
    let service = ChecklistService::open(store);

    println!("checktop_core version={}", checktop_core::core_version());
    println!(
        "seeded templates={} users={}",
        service.templates().len(),
        service.users().len()
    );
}
