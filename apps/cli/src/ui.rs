use std::time::Duration;

use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};
use vidgrade_core::Theme;

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), (secs % 60.0).floor())
    }
}

pub fn create_spinner(msg: &str, theme: Theme) -> ProgressBar {
    let color = match theme {
        Theme::Dark => "cyan",
        Theme::Light => "blue",
    };
    let pb = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{color}}} {{msg}}");
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Accent color for headings and highlights
pub fn accent(theme: Theme) -> Style {
    match theme {
        Theme::Dark => Style::new().cyan(),
        Theme::Light => Style::new().blue(),
    }
}

pub fn banner(theme: Theme, subtitle: &str) {
    println!(
        "\n{}  {}\n",
        accent(theme).bold().apply_to("vidgrade"),
        style(subtitle).dim()
    );
}

pub fn rule() {
    println!("{}", style("─".repeat(60)).dim());
}

pub fn success(msg: impl std::fmt::Display) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print markdown with headings in the accent color.
pub fn print_markdown(text: &str, theme: Theme) {
    let heading = accent(theme).bold();
    for line in text.lines() {
        if line.starts_with('#') {
            println!("{}", heading.apply_to(line));
        } else {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_millis(119_600)), "1m 59s");
    }
}
