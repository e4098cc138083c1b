use colored::{Color, Colorize};
use std::io::{self, IsTerminal, Write};
use tracing::field::Visit;
use tracing::{Event, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// color palette for action output cycling
const ACTION_COLORS: &[Color] = &[
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
    Color::Green,
];

/// get a consistent color for an action label based on hash
pub fn action_color(label: &str) -> Color {
    let hash: usize = label.bytes().map(|b| b as usize).sum();
    ACTION_COLORS[hash % ACTION_COLORS.len()]
}

/// Renders events carrying a `progress` field (`start`, `done`, `failed`)
/// as one status line each on stderr.
pub struct PrettyProgressLayer {
    is_tty: bool,
}

impl Default for PrettyProgressLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PrettyProgressLayer {
    pub fn new() -> Self {
        Self {
            is_tty: io::stderr().is_terminal(),
        }
    }
}

impl<S> Layer<S> for PrettyProgressLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = ProgressVisitor::default();
        event.record(&mut visitor);

        let Some(progress) = visitor.progress else {
            return;
        };

        let mut stderr = io::stderr().lock();
        if let Some(line) = render(
            &progress,
            &visitor.action,
            visitor.duration_ms,
            &visitor.error,
            self.is_tty,
        ) {
            let _ = writeln!(stderr, "{}", line);
        }
    }
}

fn render(
    progress: &str,
    action: &Option<String>,
    duration_ms: Option<u64>,
    error: &Option<String>,
    is_tty: bool,
) -> Option<String> {
    let action = action.as_deref().unwrap_or("unknown");
    let color = action_color(action);

    let line = match progress {
        "start" if is_tty => format!("{} {}", "▶".color(color), action.color(color)),
        "start" => format!("▶ {}", action),
        "done" => {
            let duration = format_duration(duration_ms);
            if is_tty {
                format!("{} {} {}", "✓".green(), action.color(color), duration.dimmed())
            } else {
                format!("✓ {} {}", action, duration)
            }
        }
        "failed" => {
            let mut line = if is_tty {
                format!("{} {}", "✗".red(), action.color(color))
            } else {
                format!("✗ {}", action)
            };
            if let Some(err) = error {
                if is_tty {
                    line.push_str(&format!("\n  {} {}", "│".red(), err));
                } else {
                    line.push_str(&format!("\n  │ {}", err));
                }
            }
            line
        }
        _ => return None,
    };
    Some(line)
}

#[derive(Default)]
struct ProgressVisitor {
    progress: Option<String>,
    action: Option<String>,
    duration_ms: Option<u64>,
    error: Option<String>,
}

impl Visit for ProgressVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "progress" => self.progress = Some(value.to_string()),
            "action" => self.action = Some(value.to_string()),
            "error" => self.error = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if field.name() == "duration_ms" {
            self.duration_ms = Some(value);
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        if field.name() == "duration_ms" {
            self.duration_ms = Some(value as u64);
        }
    }

    // `%value` fields arrive here
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        let s = s.trim_matches('"');
        match field.name() {
            "progress" => self.progress = Some(s.to_string()),
            "action" => self.action = Some(s.to_string()),
            "error" => self.error = Some(s.to_string()),
            _ => {}
        }
    }
}

fn format_duration(ms: Option<u64>) -> String {
    match ms {
        Some(ms) if ms < 1000 => format!("({}ms)", ms),
        Some(ms) => format!("({:.1}s)", ms as f64 / 1000.0),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain() {
        let action = Some("seed ./a.sql".to_string());
        assert_eq!(
            render("start", &action, None, &None, false).as_deref(),
            Some("▶ seed ./a.sql")
        );
        assert_eq!(
            render("done", &action, Some(1500), &None, false).as_deref(),
            Some("✓ seed ./a.sql (1.5s)")
        );
        assert_eq!(
            render("failed", &action, None, &Some("boom".to_string()), false).as_deref(),
            Some("✗ seed ./a.sql\n  │ boom")
        );
        assert!(render("other", &action, None, &None, false).is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(42)), "(42ms)");
        assert_eq!(format_duration(None), "");
    }

    #[test]
    fn test_action_color_is_stable() {
        assert_eq!(action_color("seed a.sql"), action_color("seed a.sql"));
    }
}
