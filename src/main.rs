#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use std::path::PathBuf;
use traffic_light::settings::{resolve_settings_path, startup_log_path, Settings};

fn main() -> anyhow::Result<()> {
    let settings_path = resolve_settings_path()?;
    let mut settings = match Settings::load(&settings_path) {
        Ok(settings) => settings,
        Err(err) => {
            // Release builds have no console; leave the reason on disk.
            traffic_light::logging::init(false, Some(startup_log_path(&settings_path)));
            tracing::error!("{err:#}");
            return Err(err);
        }
    };
    traffic_light::logging::init(
        settings.debug_logging,
        settings.log_file.as_ref().map(PathBuf::from),
    );
    tracing::debug!(path = %settings_path.display(), "settings loaded");
    settings.sanitize();

    let exit_code = run(settings).map_err(|err| {
        tracing::error!("{err:#}");
        err
    })?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

#[cfg(windows)]
fn run(settings: Settings) -> anyhow::Result<i32> {
    use anyhow::Context;
    use std::rc::Rc;

    let app = Rc::new(traffic_light::App::native(settings));
    app.run().context("overlay startup failed")
}

#[cfg(not(windows))]
fn run(_settings: Settings) -> anyhow::Result<i32> {
    anyhow::bail!("the overlay needs the Win32 window and keyboard hook APIs")
}
