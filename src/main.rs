mod cli;
mod commands;
mod config;
mod search;
mod session;
mod tui;
mod types;

fn main() {
    if let Err(err) = cli::run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
