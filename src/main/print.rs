use std::io::{stderr, Write};

use ansi_term::{Color::*, Style};
use buildenv::{CallBacks, Event, LogLevel, LogMessage};

#[derive(Debug, Default, Copy, Clone)]
pub struct Colors {
    pub enabled: bool,
    pub general: Style,
    pub warning: Style,
    pub bold: Style,
    pub action: Style,
}

impl Colors {
    pub fn new() -> Colors {
        Colors {
            enabled: true,
            general: Style::new(),
            warning: Style::new().fg(Yellow).bold(),
            bold: Style::new().bold(),
            action: Style::new().fg(Blue).bold(),
        }
    }
}

/// Reports progress on stderr so stdout stays `eval`-able.
#[derive(Debug)]
pub struct Printer {
    colors: Colors,
}

impl CallBacks for Printer {
    fn event(&mut self, event: Event) {
        let c = self.colors;

        let _ = match event {
            Event::UsingAlternativeFortran(_) | Event::UsingBundledFortran(_) => writeln!(
                stderr(),
                "{} {}",
                c.action.paint("==>"),
                c.general.paint(event.to_string())
            ),
            _ => writeln!(
                stderr(),
                "{} {}",
                c.action.paint("::"),
                c.bold.paint(event.to_string())
            ),
        };
    }

    fn log(&mut self, level: LogLevel, msg: LogMessage) {
        let c = self.colors;
        let _ = match level {
            LogLevel::Warning => {
                writeln!(stderr(), "{}: {}", c.warning.paint(level.to_string()), msg)
            }
            LogLevel::Debug => Ok(()),
        };
    }
}

impl Printer {
    pub fn new(color: bool) -> Self {
        let colors = if color {
            Colors::new()
        } else {
            Colors::default()
        };

        Printer { colors }
    }
}
