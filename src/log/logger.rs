//! Default stderr logger, installed automatically behind the `logger`
//! feature via `ctor` so that a binary linking this crate gets readable
//! output without calling any init function itself.

use std::env;
use std::io::Write;
use std::sync::Mutex;

use ctor::ctor;
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log, Metadata, Record};

use super::print_panic;

const ENV_VAR: &str = "CORO_LOG";

fn level_from_env() -> LevelFilter {
	match env::var(ENV_VAR) {
		Ok(var) => var.parse().unwrap_or(LevelFilter::Info),
		Err(_) => LevelFilter::Info
	}
}

fn level_color(level: Level) -> &'static str {
	match level {
		Level::Error => "\x1b[31m",
		Level::Warn => "\x1b[33m",
		Level::Info => "\x1b[32m",
		Level::Debug => "\x1b[34m",
		Level::Trace => "\x1b[90m"
	}
}

struct StderrLogger {
	stderr: Mutex<std::io::Stderr>
}

impl Log for StderrLogger {
	fn enabled(&self, metadata: &Metadata<'_>) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record<'_>) {
		if !self.enabled(record.metadata()) {
			return;
		}

		let color = level_color(record.level());
		let target = record.target();

		let Ok(mut stderr) = self.stderr.lock() else {
			return;
		};

		let _ = writeln!(
			stderr,
			"{color}[{level: <5}]\x1b[0m \x1b[1m{target}\x1b[0m {args}",
			level = record.level(),
			args = record.args()
		);
	}

	fn flush(&self) {
		if let Ok(mut stderr) = self.stderr.lock() {
			let _ = stderr.flush();
		}
	}
}

lazy_static! {
	static ref LOGGER: StderrLogger = StderrLogger { stderr: Mutex::new(std::io::stderr()) };
}

fn install_panic_hook() {
	std::panic::set_hook(Box::new(|info| {
		print_panic(info.location(), format_args!("{info}"));
	}));
}

#[ctor]
fn init() {
	log::set_max_level(level_from_env());

	if log::set_logger(&*LOGGER).is_ok() {
		install_panic_hook();
	}
}
