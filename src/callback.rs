use std::{cell::RefCell, fmt::Display};

use crate::{build_env::Compiler, BuildEnv};

pub trait CallBacks: std::fmt::Debug {
    fn event(&mut self, _event: Event) {}
    fn log(&mut self, _level: LogLevel, _msg: LogMessage) {}
}

#[derive(Debug)]
pub struct CallBackPrinter;

impl CallBacks for CallBackPrinter {
    fn event(&mut self, event: Event) {
        match event {
            Event::UsingAlternativeFortran(_) | Event::UsingBundledFortran(_) => {
                eprintln!("==> {}", event)
            }
            _ => eprintln!(":: {}", event),
        }
    }

    fn log(&mut self, level: LogLevel, msg: LogMessage) {
        if level != LogLevel::Debug {
            eprintln!("{}: {}", level, msg);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SettingUpBuildEnvironment,
    SelectedCompiler(Compiler),
    FallbackSystemCompiler,
    UsingAlternativeFortran(String),
    UsingBundledFortran(String),
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::SettingUpBuildEnvironment => f.write_str("Setting up build environment..."),
            Event::SelectedCompiler(c) => write!(f, "Using {}", c),
            Event::FallbackSystemCompiler => {
                f.write_str("No compiler found, falling back to the system cc")
            }
            Event::UsingAlternativeFortran(fc) => write!(
                f,
                "Building with an alternative Fortran compiler ({}). This is unsupported.",
                fc
            ),
            Event::UsingBundledFortran(fc) => write!(
                f,
                "Using the bundled fortran compiler {}.\n\
                 This may be changed by setting the FC environment variable.",
                fc
            ),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warning,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => f.write_str("debug"),
            LogLevel::Warning => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMessage {
    NoFortranFlags,
    X11NotInstalled,
    ClearedVariable(String),
    UnknownCpuFamily,
}

impl Display for LogMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogMessage::NoFortranFlags => f.write_str(
                "No Fortran optimization information was provided. You may want to consider\n\
                 setting FCFLAGS and FFLAGS or pass the `--default-fortran-flags` option\n\
                 if your compiler is compatible with GCC.\n\n\
                 If you like the default optimization level of your compiler, ignore this warning.",
            ),
            LogMessage::X11NotInstalled => {
                f.write_str("You do not have X11 installed, this formula may not build.")
            }
            LogMessage::ClearedVariable(key) => write!(f, "cleared inherited {}", key),
            LogMessage::UnknownCpuFamily => {
                f.write_str("unknown cpu family, using the default -march")
            }
        }
    }
}

impl BuildEnv {
    pub fn callback<CB: CallBacks + 'static>(mut self, callbacks: CB) -> Self {
        self.callbacks = Some(Box::new(RefCell::new(callbacks)));
        self
    }

    pub fn event(&self, event: Event) {
        if let Some(cb) = &self.callbacks {
            cb.borrow_mut().event(event)
        }
    }

    pub fn log(&self, level: LogLevel, msg: LogMessage) {
        if let Some(cb) = &self.callbacks {
            cb.borrow_mut().log(level, msg)
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    /// Collects everything reported so tests can assert on it.
    #[derive(Debug, Default, Clone)]
    pub struct Recorder {
        pub events: Rc<RefCell<Vec<Event>>>,
        pub logs: Rc<RefCell<Vec<(LogLevel, LogMessage)>>>,
    }

    impl CallBacks for Recorder {
        fn event(&mut self, event: Event) {
            self.events.borrow_mut().push(event);
        }

        fn log(&mut self, level: LogLevel, msg: LogMessage) {
            self.logs.borrow_mut().push((level, msg));
        }
    }

    #[test]
    fn messages() {
        assert_eq!(
            Event::SelectedCompiler(Compiler::Clang).to_string(),
            "Using clang"
        );
        assert_eq!(LogLevel::Warning.to_string(), "warning");
        assert!(LogMessage::NoFortranFlags
            .to_string()
            .contains("--default-fortran-flags"));
    }
}
