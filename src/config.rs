use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    build_env::Compiler,
    error::Result,
    hardware::{self, CpuFamily, Platform},
    installation_variables::{PREFIX, SYSTEM_PREFIX, X11_PREFIX},
    tools::is_executable,
};

/// Host facts and install locations a build environment is derived from.
///
/// [`Config::new`] detects these from the running machine. [`Config::default`]
/// describes a generic non-Apple host and is what tests start from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub platform: Platform,
    pub cpu_family: CpuFamily,
    /// Whether the CPU can run 64-bit code.
    pub cpu_64_bit: bool,
    pub processor_count: usize,

    /// Where the package manager installs things.
    pub prefix: PathBuf,
    /// Prefix the toolchain already searches by default.
    pub system_prefix: PathBuf,
    pub system_bin: PathBuf,
    pub x11_prefix: PathBuf,

    /// Directory holding the developer tools (`gcc-4.0` and friends).
    pub dev_tools_path: PathBuf,
    pub xcode_prefix: Option<PathBuf>,
    pub xcode_version: Option<(u32, u32)>,
    /// The toolchain proxy, if it exists and works.
    pub xcrun: Option<PathBuf>,

    pub default_compiler: Compiler,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            platform: Platform::Linux,
            cpu_family: CpuFamily::Dunno,
            cpu_64_bit: true,
            processor_count: 1,
            prefix: PathBuf::from(SYSTEM_PREFIX),
            system_prefix: PathBuf::from(SYSTEM_PREFIX),
            system_bin: PathBuf::from("/usr/bin"),
            x11_prefix: PathBuf::from(X11_PREFIX),
            dev_tools_path: PathBuf::from("/usr/bin"),
            xcode_prefix: None,
            xcode_version: None,
            xcrun: None,
            default_compiler: Compiler::Gcc,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        let platform = Platform::current();
        let (cpu_family, cpu_64_bit) = hardware::detect_cpu(platform)?;

        let mut config = Config {
            platform,
            cpu_family,
            cpu_64_bit,
            processor_count: hardware::processor_count(),
            prefix: PathBuf::from(PREFIX),
            ..Config::default()
        };

        if let Ok(prefix) = std::env::var("HOMEBREW_PREFIX") {
            config.prefix = PathBuf::from(prefix);
        }

        if platform.is_apple() {
            config.detect_xcode();
        }

        Ok(config)
    }

    /// Whether `prefix` needs its own include and library search flags.
    pub fn custom_prefix(&self) -> bool {
        self.prefix != self.system_prefix
    }

    pub fn x11_installed(&self) -> bool {
        self.x11_prefix.join("lib").is_dir()
    }

    /// Xcode 4.3 moved the command line tools out of `/usr/bin`.
    pub fn xcode_older_than(&self, version: (u32, u32)) -> bool {
        matches!(self.xcode_version, Some(v) if v < version)
    }

    fn detect_xcode(&mut self) {
        let xcode_prefix = match std::env::var("DEVELOPER_DIR") {
            Ok(dir) => Some(PathBuf::from(dir)),
            Err(_) => command_line("xcode-select", &["-print-path"]).map(PathBuf::from),
        };

        self.xcode_version = command_line("xcodebuild", &["-version"])
            .as_deref()
            .and_then(parse_xcode_version);

        let make = self.system_bin.join("make");
        self.dev_tools_path = match &xcode_prefix {
            Some(prefix) if !is_executable(&make) => prefix.join("usr/bin"),
            _ => self.system_bin.clone(),
        };
        self.xcode_prefix = xcode_prefix;

        let xcrun = self.system_bin.join("xcrun");
        if is_executable(&xcrun) {
            self.xcrun = Some(xcrun);
        }

        self.default_compiler = default_compiler(self.xcode_version);
    }
}

fn default_compiler(xcode_version: Option<(u32, u32)>) -> Compiler {
    match xcode_version {
        Some(v) if v < (4, 0) => Compiler::Gcc,
        Some(v) if v < (4, 2) => Compiler::Llvm,
        _ => Compiler::Clang,
    }
}

/// Parses the first line of `xcodebuild -version`, e.g. `Xcode 4.3.2`.
fn parse_xcode_version(s: &str) -> Option<(u32, u32)> {
    let version = s.strip_prefix("Xcode ")?.split_whitespace().next()?;
    let mut parts = version.split('.').map(|p| p.parse::<u32>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().and_then(|p| p.ok()).unwrap_or(0);
    Some((major, minor))
}

/// First line of a helper's stdout, or nothing if it didn't run cleanly.
fn command_line<P: AsRef<Path>>(program: P, args: &[&str]) -> Option<String> {
    let output = Command::new(program.as_ref()).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    stdout.lines().next().map(|l| l.trim().to_string())
}
