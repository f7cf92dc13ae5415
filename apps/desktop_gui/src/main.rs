use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use store_client::config;
use ui::app::RsvpDeskApp;

/// Command-line overrides for the store connection; everything else comes
/// from `store.toml` and the environment.
#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the hosted guest store (overrides STORE_URL)
    #[arg(long)]
    store_url: Option<String>,
    /// Project api key for the store (overrides STORE_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(url) = args.store_url {
        config::apply_base_url(&mut settings, &url);
    }
    if let Some(key) = args.api_key {
        settings.api_key = key;
    }
    tracing::info!(rest_url = %settings.rest_url, "starting rsvp desk");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Event RSVP Desk")
            .with_inner_size([560.0, 680.0])
            .with_min_inner_size([440.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Event RSVP Desk",
        options,
        Box::new(|_cc| Ok(Box::new(RsvpDeskApp::new(cmd_tx, ui_rx)))),
    )
}
