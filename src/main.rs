use eframe::egui;

use nmr_view::app::ViewerApp;
use nmr_view::config::ViewerConfig;

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    log::info!("Starting NMR spectrum viewer v{}", env!("CARGO_PKG_VERSION"));

    let config = ViewerConfig::from_env();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("NMR Spectrum Viewer"),
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    // a missing GL context fails here and ends the process with the error
    eframe::run_native(
        "NMR Spectrum Viewer",
        options,
        Box::new(|cc| Ok(Box::new(ViewerApp::new(cc, config)?))),
    )
}
