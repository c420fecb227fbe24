pub mod app;
pub mod bruteforcer;
pub mod cli;
pub mod config;
pub mod events;
pub mod output;
pub mod runner;
pub mod target;
pub mod utils;
pub mod wordlist;

#[cfg(test)]
mod tests;
