//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load `ROWSTORE_*` configuration and open the configured store.
//! - Print a deterministic summary of files and row counts.

use rowstore_core::{CoreConfig, FileService, SqliteFileRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("rowstore_core ping={}", rowstore_core::ping());
    println!("rowstore_core version={}", rowstore_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("rowstore: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if config.init_logging()? {
        log::info!("event=cli_start module=cli status=ok");
    }

    let conn = config.open_db().map_err(|err| err.to_string())?;
    let repo = SqliteFileRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let files = FileService::new(repo)
        .list_files()
        .map_err(|err| err.to_string())?;

    println!("files={}", files.len());
    for file in files {
        println!(
            "file id={} rows={} name={}",
            file.file_id, file.row_count, file.display_name
        );
    }
    Ok(())
}
