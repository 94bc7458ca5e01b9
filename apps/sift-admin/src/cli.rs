use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects, Style},
};

pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("VERGEN_GIT_SHA"), ")");
pub const LONG_VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"\ncommit: ",
	env!("VERGEN_GIT_SHA"),
	"\ntarget: ",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

const HEADING: Style = AnsiColor::Yellow.on_default().effects(Effects::BOLD);

pub fn styles() -> Styles {
	Styles::styled()
		.header(HEADING)
		.usage(HEADING)
		.literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default().effects(Effects::BOLD))
		.valid(AnsiColor::Green.on_default())
		.invalid(AnsiColor::Red.on_default())
}
