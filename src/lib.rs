pub mod client;
pub mod commands;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

pub fn run() {
    if let Err(error) = try_run() {
        eprintln!("failed to launch study plan server: {error}");
        std::process::exit(1);
    }
}

fn try_run() -> Result<(), Box<dyn std::error::Error>> {
    let config = crate::server::ServerConfig::from_env()?;
    crate::utils::logger::init_logging(&config.log_dir)?;

    let state = crate::commands::AppState::from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(crate::server::run_serve(state, config.bind_addr))?;

    Ok(())
}
