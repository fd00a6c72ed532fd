mod ambient;
mod compiler;
mod cpu;
mod flags;
mod fortran;
mod optimize;
mod target;

pub use ambient::Ambient;
pub use compiler::Compiler;
pub use cpu::CpuFlags;
pub use flags::{Pattern, CFLAGS_FAMILY};

use std::{
    cell::RefCell,
    collections::BTreeMap,
    ffi::OsStr,
    fmt::Write,
    process::{Command, ExitStatus},
    sync::LazyLock,
};

use regex::Regex;

use crate::{
    callback::{CallBacks, Event, LogLevel, LogMessage},
    config::Config,
    error::{CommandErrorExt, Context, Result},
    hardware::Platform,
    options::Options,
};

/// -w: keep signal to noise high
pub const SAFE_CFLAGS_FLAGS: &str = "-w -pipe";

/// Variables that confuse make, cmake or autotools when inherited.
const INTERFERING: [&str; 3] = ["CDPATH", "GREP_OPTIONS", "CLICOLOR_FORCE"];

/// Compiler related variables cleared before the build environment is set up.
pub const CC_ETC: [&str; 10] = [
    "CC",
    "CXX",
    "LD",
    "CPP",
    "CFLAGS",
    "CXXFLAGS",
    "OBJCFLAGS",
    "OBJCXXFLAGS",
    "LDFLAGS",
    "CPPFLAGS",
];

static MAKE_JOBS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-j\d+").unwrap());

/// The compiler and flag variables of one build.
///
/// Variables set here overlay the [`Ambient`] environment the process was
/// started with; reading a variable that was never set falls through to
/// the ambient value. A variable is either set to a non-empty string or
/// absent, never empty.
#[derive(Debug)]
pub struct BuildEnv {
    pub config: Config,
    pub options: Options,
    vars: BTreeMap<String, String>,
    ambient: Ambient,
    compiler: Option<Compiler>,
    pub(crate) callbacks: Option<Box<RefCell<dyn CallBacks>>>,
}

impl BuildEnv {
    pub fn new(config: Config, options: Options) -> Self {
        Self::with_ambient(config, options, Ambient::from_process())
    }

    pub fn with_ambient(config: Config, options: Options, ambient: Ambient) -> Self {
        BuildEnv {
            config,
            options,
            vars: BTreeMap::new(),
            ambient,
            compiler: None,
            callbacks: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match self.vars.get(key) {
            Some(v) => Some(v.as_str()),
            None => self.ambient.get(key),
        }
    }

    pub fn set<V: Into<String>>(&mut self, key: &str, value: V) {
        let value = value.into();
        if value.is_empty() {
            self.unset(key);
        } else {
            self.vars.insert(key.to_string(), value);
        }
    }

    pub fn set_opt<V: Into<String>>(&mut self, key: &str, value: Option<V>) {
        match value {
            Some(value) => self.set(key, value),
            None => self.unset(key),
        }
    }

    /// Removes `key` entirely, hiding any inherited value too.
    pub fn unset(&mut self, key: &str) {
        self.vars.remove(key);
        if self.ambient.get(key).is_some() {
            self.ambient.delete(key);
        }
    }

    /// The variables this environment has set.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn ambient(&self) -> &Ambient {
        &self.ambient
    }

    /// Exports the environment to a child process.
    pub fn apply(&self, command: &mut Command) {
        for key in self.ambient.deleted() {
            command.env_remove(key);
        }
        for (k, v) in &self.vars {
            command.env(k, v);
        }
    }

    /// Runs `program` under this environment and waits for it.
    pub fn exec<P, I, A>(&self, program: P, args: I) -> Result<ExitStatus>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command.args(args);
        self.apply(&mut command);
        let status = command
            .status()
            .cmd_context(&command, Context::RunCommand)?;
        Ok(status)
    }

    /// The environment as POSIX shell commands: an `export` line per set
    /// variable and an `unset` line per inherited one that was cleared.
    pub fn exports(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.vars {
            let _ = writeln!(out, "export {}='{}'", k, v.replace('\'', r"'\''"));
        }
        for k in self.ambient.deleted() {
            if !self.vars.contains_key(k) {
                let _ = writeln!(out, "unset {}", k);
            }
        }
        out
    }

    pub fn setup_build_environment(&mut self) -> Result<()> {
        self.event(Event::SettingUpBuildEnvironment);

        for key in INTERFERING {
            if self.ambient.delete(key).is_some() {
                self.log(LogLevel::Debug, LogMessage::ClearedVariable(key.to_string()));
            }
        }
        self.remove_cc_etc();

        // make any aclocal stuff installed by the package manager available
        if self.config.platform.is_apple() && self.config.xcode_older_than((4, 3)) {
            let aclocal = self.config.prefix.join("share/aclocal");
            self.set("ACLOCAL_PATH", aclocal.display().to_string());
        }

        self.set("MAKEFLAGS", format!("-j{}", self.make_jobs()));

        // the system prefix is already an -isystem and -L directory
        if self.config.custom_prefix() {
            let prefix = self.config.prefix.display().to_string();
            self.set("CPPFLAGS", format!("-isystem {}/include", prefix));
            self.set("LDFLAGS", format!("-L{}/lib", prefix));
            // cmake ignores the variables above
            self.set("CMAKE_PREFIX_PATH", prefix);
        }

        match self.config.platform {
            Platform::Linux => {
                self.set("CC", "gcc");
                self.set("CXX", "g++");
                self.set_cflags(format!("-O2 {}", SAFE_CFLAGS_FLAGS));
                self.set("LD", "ld");
            }
            Platform::MacOS => {
                // Os is what Apple builds everything with
                self.set_cflags(format!("-Os {}", SAFE_CFLAGS_FLAGS));

                let compiler = self.compiler();
                self.select(compiler)?;

                if self.get("CC").is_none() {
                    self.event(Event::FallbackSystemCompiler);
                    let compiler = self.config.default_compiler;
                    self.select(compiler)?;
                    let bin = &self.config.system_bin;
                    let (cc, cxx) = (bin.join("cc"), bin.join("c++"));
                    self.set("CC", cc.display().to_string());
                    self.set("CXX", cxx.display().to_string());
                }
            }
        }

        // build systems often don't notice a changed CC, give them a matching LD
        if self.get("LD").is_none() {
            if let Some(cc) = self.get("CC").map(|s| s.to_string()) {
                self.set("LD", cc);
            }
        }

        Ok(())
    }

    /// Clears the compiler variables, returning what they held.
    ///
    /// Pass the result to [`BuildEnv::restore`] to undo.
    pub fn remove_cc_etc(&mut self) -> BTreeMap<String, String> {
        let mut removed = BTreeMap::new();
        for key in CC_ETC {
            if let Some(value) = self.get(key) {
                removed.insert(key.to_string(), value.to_string());
            }
            self.vars.remove(key);
            if self.ambient.delete(key).is_some() {
                self.log(LogLevel::Debug, LogMessage::ClearedVariable(key.to_string()));
            }
        }
        removed
    }

    pub fn restore(&mut self, removed: BTreeMap<String, String>) {
        for (key, value) in removed {
            self.ambient.restore(&key, value);
            self.vars.remove(&key);
        }
    }

    /// Parallel make jobs, `HOMEBREW_MAKE_JOBS` if it is a positive number.
    pub fn make_jobs(&self) -> usize {
        self.get("HOMEBREW_MAKE_JOBS")
            .and_then(|j| j.trim().parse::<usize>().ok())
            .filter(|&j| j > 0)
            .unwrap_or(self.config.processor_count)
    }

    pub fn deparallelize(&mut self) {
        self.remove("MAKEFLAGS", &*MAKE_JOBS);
    }

    pub fn cc(&self) -> &str {
        self.get("CC").unwrap_or("gcc")
    }

    pub fn cxx(&self) -> &str {
        self.get("CXX").unwrap_or("g++")
    }

    pub fn cflags(&self) -> Option<&str> {
        self.get("CFLAGS")
    }

    pub fn cxxflags(&self) -> Option<&str> {
        self.get("CXXFLAGS")
    }

    pub fn cppflags(&self) -> Option<&str> {
        self.get("CPPFLAGS")
    }

    pub fn ldflags(&self) -> Option<&str> {
        self.get("LDFLAGS")
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::callback::test::Recorder;

    pub fn env_with(config: Config, ambient: &[(&str, &str)]) -> BuildEnv {
        BuildEnv::with_ambient(
            config,
            Options::default(),
            ambient.iter().copied().collect(),
        )
    }

    pub fn empty_env() -> BuildEnv {
        env_with(Config::default(), &[])
    }

    fn linux(processors: usize) -> Config {
        Config {
            processor_count: processors,
            ..Config::default()
        }
    }

    #[test]
    fn setup_linux() {
        let mut env = env_with(
            linux(4),
            &[
                ("CDPATH", ".:/tmp"),
                ("CLICOLOR_FORCE", "1"),
                ("CFLAGS", "-O0 -ggdb"),
                ("LD", "gold"),
                ("HOME", "/root"),
            ],
        );
        env.setup_build_environment().unwrap();

        assert_eq!(env.get("MAKEFLAGS"), Some("-j4"));
        assert_eq!(env.get("CC"), Some("gcc"));
        assert_eq!(env.get("CXX"), Some("g++"));
        assert_eq!(env.get("LD"), Some("ld"));
        for key in CFLAGS_FAMILY {
            assert_eq!(env.get(key), Some("-O2 -w -pipe"));
        }
        assert_eq!(env.get("CDPATH"), None);
        assert_eq!(env.get("CLICOLOR_FORCE"), None);
        assert_eq!(env.get("HOME"), Some("/root"));
        assert_eq!(env.get("CPPFLAGS"), None);
        assert_eq!(env.get("CMAKE_PREFIX_PATH"), None);
    }

    #[test]
    fn make_jobs_override() {
        let mut env = env_with(linux(4), &[("HOMEBREW_MAKE_JOBS", "7")]);
        assert_eq!(env.make_jobs(), 7);

        for bad in ["0", "-3", "many", ""] {
            env = env_with(linux(4), &[("HOMEBREW_MAKE_JOBS", bad)]);
            assert_eq!(env.make_jobs(), 4);
        }
    }

    #[test]
    fn custom_prefix_paths() {
        let config = Config {
            prefix: PathBuf::from("/home/me/.brew"),
            ..linux(2)
        };
        let mut env = env_with(config, &[]);
        env.setup_build_environment().unwrap();

        assert_eq!(env.get("CPPFLAGS"), Some("-isystem /home/me/.brew/include"));
        assert_eq!(env.get("LDFLAGS"), Some("-L/home/me/.brew/lib"));
        assert_eq!(env.get("CMAKE_PREFIX_PATH"), Some("/home/me/.brew"));
    }

    #[test]
    fn remove_cc_etc_snapshot() {
        let mut env = env_with(linux(1), &[("CC", "clang"), ("CPP", "cpp -E")]);
        env.set("CFLAGS", "-O3");

        let removed = env.remove_cc_etc();
        assert_eq!(removed.get("CC").map(|s| s.as_str()), Some("clang"));
        assert_eq!(removed.get("CPP").map(|s| s.as_str()), Some("cpp -E"));
        assert_eq!(removed.get("CFLAGS").map(|s| s.as_str()), Some("-O3"));
        assert_eq!(removed.len(), 3);
        assert!(CC_ETC.iter().all(|k| env.get(k).is_none()));

        // a second pass has nothing left to take
        assert!(env.remove_cc_etc().is_empty());

        env.restore(removed);
        assert_eq!(env.get("CC"), Some("clang"));
        assert_eq!(env.get("CFLAGS"), Some("-O3"));
    }

    #[test]
    fn deparallelize() {
        let mut env = env_with(linux(8), &[]);
        env.setup_build_environment().unwrap();
        env.deparallelize();
        assert_eq!(env.get("MAKEFLAGS"), None);
    }

    #[test]
    fn apply_to_command() {
        let mut env = env_with(linux(2), &[("GREP_OPTIONS", "--color")]);
        env.setup_build_environment().unwrap();

        let mut command = Command::new("make");
        env.apply(&mut command);
        let envs = command
            .get_envs()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().to_string(),
                    v.map(|v| v.to_string_lossy().to_string()),
                )
            })
            .collect::<BTreeMap<_, _>>();

        assert_eq!(envs.get("GREP_OPTIONS"), Some(&None));
        assert_eq!(envs.get("CC"), Some(&Some("gcc".to_string())));
        assert_eq!(envs.get("MAKEFLAGS"), Some(&Some("-j2".to_string())));
    }

    #[test]
    fn exec_sees_environment() {
        let mut env = env_with(linux(1), &[("PATH", "/usr/bin:/bin"), ("CFLAGS", "-O0")]);
        env.set("CC", "clang");
        env.unset("CFLAGS");

        let status = env
            .exec("sh", ["-c", r#"test "$CC" = clang && test -z "${CFLAGS+x}""#])
            .unwrap();
        assert!(status.success());

        let err = env.exec("/nonexistent/cc", ["--version"]).unwrap_err();
        assert!(err.to_string().starts_with("failed to run command"));
    }

    #[test]
    fn exports_quote() {
        let mut env = empty_env();
        env.set("CFLAGS", "-DNAME='x'");
        assert_eq!(env.exports(), "export CFLAGS='-DNAME='\\''x'\\'''\n");
    }

    #[test]
    fn exports_unset_cleared_variables() {
        let mut env = env_with(
            linux(1),
            &[
                ("CDPATH", ".:/tmp"),
                ("CPPFLAGS", "-I/bad"),
                ("LDFLAGS", "-L/bad"),
                ("CPP", "cpp -E"),
                ("HOME", "/root"),
            ],
        );
        env.setup_build_environment().unwrap();
        let exports = env.exports();
        let lines = exports.lines().collect::<Vec<_>>();

        for key in ["CDPATH", "CPPFLAGS", "LDFLAGS", "CPP"] {
            assert!(lines.contains(&format!("unset {}", key).as_str()), "{}", exports);
        }
        assert!(lines.contains(&"export CC='gcc'"));
        // set again by setup, so exported rather than unset
        assert!(!lines.contains(&"unset CC"));
        assert!(!lines.contains(&"unset CFLAGS"));
        assert!(!exports.contains("HOME"));
    }

    #[test]
    fn shortcuts() {
        let mut env = empty_env();
        assert_eq!(env.cc(), "gcc");
        assert_eq!(env.cxx(), "g++");
        env.set("CC", "/usr/bin/clang");
        env.set("LDFLAGS", "-L/opt/lib");
        assert_eq!(env.cc(), "/usr/bin/clang");
        assert_eq!(env.ldflags(), Some("-L/opt/lib"));
        assert_eq!(env.cppflags(), None);
    }

    #[test]
    fn empty_values_unset() {
        let mut env = env_with(linux(1), &[("FOO", "bar")]);
        env.set("FOO", "");
        assert_eq!(env.get("FOO"), None);
        env.set_opt::<String>("BAR", None);
        assert!(env.vars().is_empty());
    }

    #[test]
    fn setup_reports_progress() {
        let recorder = Recorder::default();
        let mut env = env_with(linux(1), &[("CC", "cc")]).callback(recorder.clone());
        env.setup_build_environment().unwrap();

        assert_eq!(
            recorder.events.borrow().first(),
            Some(&Event::SettingUpBuildEnvironment)
        );
        assert!(recorder
            .logs
            .borrow()
            .contains(&(LogLevel::Debug, LogMessage::ClearedVariable("CC".into()))));
    }
}
