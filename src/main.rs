use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use umbra::{
    App, FrameOutcome, Result, Settings, ShadowRenderer, SoftwareBackend, UmbraError,
    build_default_scene,
};

/// Frame time used to advance the animation when rendering headless.
const HEADLESS_FRAME_TIME: Duration = Duration::from_micros(16_667);

/// Two-pass shadow mapping viewer.
#[derive(Debug, Parser)]
#[command(name = "umbra", version, about)]
struct Args {
    /// Settings file (JSON); missing fields keep their defaults.
    #[arg(short, long, value_name = "SETTINGS_JSON")]
    config: Option<PathBuf>,

    /// Render without a window and write the shaded frame as PNG.
    #[arg(long, value_name = "OUT_PNG")]
    headless: Option<PathBuf>,

    /// Frames to render before the snapshot is taken.
    #[arg(
        short,
        long,
        default_value_t = 1,
        requires = "headless",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    frames: u32,
}

fn render_headless(settings: &Settings, out: &Path, frames: u32) -> Result<()> {
    let mut backend = SoftwareBackend::from_settings(&settings.render)?;
    let scene = build_default_scene(&mut backend)?;
    let mut renderer = ShadowRenderer::new(&settings.render, &settings.scene)?;

    let mut rendered = 0;
    for i in 0..frames {
        let elapsed = HEADLESS_FRAME_TIME * i;
        if let FrameOutcome::Rendered(stats) = renderer.render_frame(&mut backend, &scene, elapsed)? {
            log::debug!("{stats:?}");
            rendered += 1;
        }
    }
    log::info!("Rendered {rendered} frame(s) headless");

    backend.save_png(out)
}

fn run(args: &Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match &args.headless {
        Some(out) => render_headless(&settings, out, args.frames),
        None => App::new(settings).run(),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Usage errors exit with status 2 from inside clap.
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ UmbraError::ShadowTargetIncomplete(_)) => {
            log::error!("{err}");
            ExitCode::from(3)
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn headless_flags_parse() {
        let args =
            Args::try_parse_from(["umbra", "--headless", "out.png", "--frames", "4"]).unwrap();
        assert_eq!(args.headless, Some(PathBuf::from("out.png")));
        assert_eq!(args.frames, 4);
        assert!(args.config.is_none());
    }

    #[test]
    fn frames_default_to_one() {
        let args = Args::try_parse_from(["umbra", "-c", "scene.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("scene.json")));
        assert_eq!(args.frames, 1);
        assert!(args.headless.is_none());
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Args::try_parse_from(["umbra", "--frames", "0", "--headless", "a.png"]).is_err());
        assert!(Args::try_parse_from(["umbra", "--frames", "two", "--headless", "a.png"]).is_err());
        assert!(Args::try_parse_from(["umbra", "--frames", "3"]).is_err());
        assert!(Args::try_parse_from(["umbra", "--bogus"]).is_err());
    }
}
