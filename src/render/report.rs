//! Provenance report rendering.

use crate::domain::Origin;
use crate::settings::Settings;
use console::Style;

pub const BANNER_WIDTH: usize = 90;
const TITLE: &str = "HyperParams";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub color: bool,
}

impl ReportOptions {
    /// Colour when stdout is a terminal that supports it.
    pub fn detect() -> Self {
        Self { color: console::colors_enabled() }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }
}

fn origin_style(origin: Origin, color: bool) -> Style {
    let style = match origin {
        Origin::Default => Style::new().blue(),
        Origin::Config => Style::new().magenta(),
        Origin::CommandLine => Style::new().yellow(),
        Origin::Unset => Style::new().dim(),
    };
    style.force_styling(color)
}

pub fn render_report(settings: &Settings, options: &ReportOptions) -> String {
    let paint = |text: &str, origin: Origin| origin_style(origin, options.color).apply_to(text).to_string();

    let mut out = String::new();
    out.push_str(&format!("{:-^width$}\n", TITLE, width = BANNER_WIDTH));

    let legend_plain = "(color code: default, config, command_line)";
    let indent = BANNER_WIDTH.saturating_sub(legend_plain.len()) / 2;
    out.push_str(&format!(
        "{}(color code: {}, {}, {})\n",
        " ".repeat(indent),
        paint("default", Origin::Default),
        paint("config", Origin::Config),
        paint("command_line", Origin::CommandLine),
    ));

    for source in &settings.provenance().config_sources {
        out.push_str(&format!(
            "- Reading {} arguments from {}\n",
            source.fields.len(),
            source.path.display()
        ));
    }

    for entry in settings.entries.iter().filter(|e| !e.field.internal) {
        let value = entry.value.as_ref().map_or_else(|| "<unset>".to_string(), ToString::to_string);
        out.push_str(&format!("{}: {}\n", paint(&entry.field.name, entry.origin), value));
    }

    out.push_str(&"-".repeat(BANNER_WIDTH));
    out.push('\n');
    out
}
