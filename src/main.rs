use std::path::PathBuf;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional settings file: first CLI arg, then GIFGREP_CONFIG, then
    // ./gifgrep.json (defaults apply if none exists).
    let settings_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GIFGREP_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("gifgrep.json"));

    gifgrep::run(&settings_path).await
}
