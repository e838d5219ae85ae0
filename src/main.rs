use crate::catalog::{convert_dataset, import_catalog, sync_catalog, Catalog};
use crate::cli::{Cli, Command, Config};
use crate::db::PropertyStore;
use crate::responses::error_to_response;
use crate::router::handle;
use crate::state::AppState;
use astra::Server;
use clap::Parser;
use std::process::ExitCode;

mod catalog;
mod chart;
mod cli;
mod db;
mod domain;
mod errors;
mod handlers;
mod logging;
mod model;
mod resolver;
mod responses;
mod router;
mod services;
mod spreadsheets;
mod state;

#[cfg(test)]
mod tests;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let result = match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli.config),
        Command::Import => import(&cli.config),
        Command::Convert => convert(&cli.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            tracing::error!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn serve(cfg: &Config) -> Result<(), String> {
    let state = AppState::from_config(cfg);

    if cfg.sync_on_startup {
        sync_catalog(&state.store, &state.catalog);
    }

    tracing::info!(
        addr = %cfg.bind,
        workers = cfg.workers,
        primary_source = state.primary_source(),
        "starting server"
    );

    let server = Server::bind(&cfg.bind).max_workers(cfg.workers);

    server
        .serve(move |req, _info| match handle(req, &state) {
            Ok(resp) => resp,
            Err(err) => error_to_response(err),
        })
        .map_err(|e| format!("Server ended with error: {e}"))?;

    tracing::info!("server shut down cleanly");
    Ok(())
}

fn import(cfg: &Config) -> Result<(), String> {
    let store = PropertyStore::connect(&cfg.db);
    if !store.is_connected() {
        return Err(format!("cannot open property store at {}", cfg.db.display()));
    }

    let catalog = Catalog::load(&cfg.dataset);
    let inserted = import_catalog(&store, &catalog).map_err(|e| e.to_string())?;
    tracing::info!(
        inserted,
        loaded = catalog.len(),
        total = store.count().unwrap_or(-1),
        "import finished"
    );
    Ok(())
}

fn convert(cfg: &Config) -> Result<(), String> {
    let today = chrono::Local::now().date_naive();
    let summary = convert_dataset(&cfg.dataset, today).map_err(|e| e.to_string())?;
    tracing::info!(
        processed = summary.processed,
        written = summary.files_written,
        "converted dataset written to {}",
        cfg.dataset.display()
    );
    Ok(())
}
