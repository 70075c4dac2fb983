//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `festpal_core` linkage.
//! - With a database path argument, report how many festivals it stores.

use festpal_core::{open_db, FestivalRepository, SqliteFestivalRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("festpal_core ping={}", festpal_core::ping());
    println!("festpal_core version={}", festpal_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    let festivals = open_db(&db_path)
        .map_err(|err| err.to_string())
        .and_then(|conn| {
            SqliteFestivalRepository::new(&conn)
                .list_festivals()
                .map(|festivals| festivals.len())
                .map_err(|err| err.to_string())
        });
    match festivals {
        Ok(count) => {
            println!("festpal_core festivals={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("festpal_core db error: {err}");
            ExitCode::FAILURE
        }
    }
}
