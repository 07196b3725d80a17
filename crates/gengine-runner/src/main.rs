use std::time::Duration;

use gengine::{init_logging, CommandBuffer, LoggingConfig};
use gengine_runner::{exit_status, DemoGame, GameRunner};

/// How long the headless demo runs unless `RunFor=<ms>` is given.
const DEFAULT_RUN_MS: u64 = 2000;

fn main() {
    init_logging(LoggingConfig::default());

    let mut run_ms = DEFAULT_RUN_MS;
    let mut overrides = Vec::new();
    for arg in std::env::args().skip(1) {
        let Some((key, value)) = arg.split_once('=') else {
            log::warn!("ignoring argument '{arg}', expected Key=Value");
            continue;
        };
        if key.eq_ignore_ascii_case("runfor") {
            match value.parse() {
                Ok(ms) => run_ms = ms,
                Err(_) => log::warn!("malformed RunFor '{value}', keeping {run_ms} ms"),
            }
        } else {
            overrides.push((key.to_string(), value.to_string()));
        }
    }

    let mut runner = GameRunner::new(DemoGame);
    runner.configure(overrides);

    let result = runner.start(|| Ok(CommandBuffer::new())).and_then(|()| {
        std::thread::sleep(Duration::from_millis(run_ms));
        runner.stop()
    });

    let stats = runner.stats();
    log::info!(
        "ran {} logic steps and {} frames ({:.1} tps, {:.1} fps)",
        stats.logic_steps,
        stats.frames,
        stats.tps,
        stats.fps
    );

    if let Err(err) = &result {
        log::error!("engine failed: {err}");
        std::process::exit(exit_status(&result));
    }
}
