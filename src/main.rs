mod app;
mod color;
mod state;
mod ui;

use app::DashboardApp;
use eframe::egui;
use pandemic_dashboard::DashboardConfig;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::from_env();
    let mut state = AppState::new(config);

    // A missing dataset is not fatal for the window: the error is shown in
    // the top bar and the user can open another file.
    let data_path = state.config.data_path.clone();
    state.open(&data_path);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Pandemic Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(state)))),
    )
}
