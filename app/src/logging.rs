use std::{
    env,
    io::Write,
};

use chrono::Local;
use env_logger::{
    Builder,
    Target,
};
use lb_scrobbler_services::config::LoggingSettings;
use log::LevelFilter;

/// Installs the global logger described by `settings`
///
/// `RUST_LOG` takes precedence over the configured level.
pub(crate) fn init(settings: &LoggingSettings) {
    let mut builder = Builder::new();
    builder.target(Target::Stdout);

    if !settings.enable {
        builder.filter_level(LevelFilter::Off).init();
        return;
    }

    builder.filter_level(settings.level.parse().unwrap_or(LevelFilter::Info));
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    let format = settings.format.clone();
    let timestamp = settings.timestamp;
    builder.format(move |buf, record| {
        let line = render(&format, record.level().as_str(), &record.args().to_string());
        if timestamp {
            writeln!(buf, "{} {line}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
        } else {
            writeln!(buf, "{line}")
        }
    });
    builder.init();
}

fn render(format: &str, level: &str, message: &str) -> String { format.replace("{level}", level).replace("{message}", message) }


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(render("[{level}] {message}", "INFO", "Listening now..."), "[INFO] Listening now...");
        assert_eq!(render("{message}", "WARN", "x"), "x");
    }
}
