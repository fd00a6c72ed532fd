use std::{fmt::Display, path::PathBuf, result::Result as StdResult, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::{
    callback::Event,
    error::{Context, Error, Result, ToolNotFoundError},
    hardware::CpuFamily,
    tools::{is_executable, realpath, xcrun_find, xcrun_knows},
    BuildEnv,
};

use super::CpuFlags;

static XARCH_MARCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-Xarch_i386 (-march=\S*)").unwrap());

/// The C compiler family a build uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Compiler {
    Gcc,
    Llvm,
    Clang,
}

/// Every name a compiler answers to.
const NAMES: &[(&str, Compiler)] = &[
    ("gcc", Compiler::Gcc),
    ("gcc_4_2", Compiler::Gcc),
    ("gcc-4.2", Compiler::Gcc),
    ("llvm", Compiler::Llvm),
    ("llvm-gcc", Compiler::Llvm),
    ("clang", Compiler::Clang),
];

impl Display for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compiler {
    type Err = Error;

    fn from_str(s: &str) -> StdResult<Self, Self::Err> {
        NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, c)| *c)
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}

impl Compiler {
    pub fn name(&self) -> &'static str {
        match self {
            Compiler::Gcc => "gcc",
            Compiler::Llvm => "llvm",
            Compiler::Clang => "clang",
        }
    }
}

impl BuildEnv {
    /// The compiler this build uses, resolved once and then fixed.
    ///
    /// Command line requests win over the `HOMEBREW_USE_*` variables, which
    /// are consulted in the reverse order so the most specific one wins.
    pub fn compiler(&mut self) -> Compiler {
        if let Some(compiler) = self.compiler {
            return compiler;
        }

        let options = &self.options;
        let compiler = if options.use_gcc {
            Compiler::Gcc
        } else if options.use_llvm {
            Compiler::Llvm
        } else if options.use_clang {
            Compiler::Clang
        } else if self.get("HOMEBREW_USE_CLANG").is_some() {
            Compiler::Clang
        } else if self.get("HOMEBREW_USE_LLVM").is_some() {
            Compiler::Llvm
        } else if self.get("HOMEBREW_USE_GCC").is_some() {
            Compiler::Gcc
        } else {
            self.config.default_compiler
        };

        self.compiler = Some(compiler);
        compiler
    }

    pub fn select(&mut self, compiler: Compiler) -> Result<()> {
        match compiler {
            Compiler::Gcc => self.gcc(),
            Compiler::Llvm => {
                self.llvm();
                Ok(())
            }
            Compiler::Clang => {
                self.clang();
                Ok(())
            }
        }
    }

    fn selected(&mut self, compiler: Compiler) {
        self.compiler = Some(compiler);
        self.event(Event::SelectedCompiler(compiler));
    }

    /// Finds a developer tool, preferring `/usr/bin`, then the toolchain
    /// proxy, then the developer directories.
    fn xcrun(&self, tool: &str) -> Option<String> {
        let config = &self.config;

        let direct = config.system_bin.join(tool);
        if is_executable(&direct) {
            return Some(direct.display().to_string());
        }

        if let Some(xcrun) = &config.xcrun {
            if xcrun_knows(xcrun, tool) {
                return Some(format!("{} {}", xcrun.display(), tool));
            }
        }

        let mut candidates = vec![config.dev_tools_path.join(tool)];
        if let Some(xcode) = &config.xcode_prefix {
            candidates.push(
                xcode
                    .join("Toolchains/XcodeDefault.xctoolchain/usr/bin")
                    .join(tool),
            );
        }
        candidates
            .into_iter()
            .find(|c| is_executable(c))
            .map(|c| c.display().to_string())
    }

    /// The tool name if `value` runs it through the toolchain proxy.
    fn proxied<'a>(&self, value: &'a str) -> Option<&'a str> {
        let xcrun = self.config.xcrun.as_ref()?;
        let rest = value.strip_prefix(xcrun.to_str()?)?;
        rest.strip_prefix(' ')
    }

    /// Apple's GCC 4.2.
    ///
    /// Newer Xcodes ship a `gcc` that is really llvm-gcc, that is refused.
    pub fn gcc(&mut self) -> Result<()> {
        let cc = self.xcrun("gcc-4.2");
        let cxx = self.xcrun("g++-4.2");

        let cc = match cc {
            Some(cc) => {
                self.set_opt("CXX", cxx);
                cc
            }
            None => {
                let bin = self.config.prefix.join("bin");
                let (cc, cxx) = (bin.join("gcc-4.2"), bin.join("g++-4.2"));
                if !cc.exists() {
                    let mut searched = vec![
                        self.config.system_bin.clone(),
                        self.config.dev_tools_path.clone(),
                    ];
                    searched.extend(self.config.xcode_prefix.clone());
                    searched.push(bin);
                    return Err(ToolNotFoundError::missing("GCC", searched).into());
                }
                self.set("CXX", cxx.display().to_string());
                cc.display().to_string()
            }
        };

        if self.proxied(&cc).is_none() {
            let real = realpath(&cc, Context::SelectCompiler(Compiler::Gcc))?;
            if real.to_string_lossy().contains("llvm") {
                return Err(ToolNotFoundError::llvm_alias("GCC", PathBuf::from(&cc)).into());
            }
        }
        self.set("CC", cc);

        self.replace_in_cflags("-O4", "-O3");
        self.set_cpu_cflags(
            &CpuFlags::new("core2 -msse4")
                .family(CpuFamily::Penryn, "core2 -msse4.1")
                .family(CpuFamily::Core2, "core2")
                .family(CpuFamily::Core, "prescott")
                .bottle("generic"),
        );
        self.selected(Compiler::Gcc);
        Ok(())
    }

    /// Apple's GCC 4.0, which was never available through xcrun.
    pub fn gcc_4_0(&mut self) {
        let tools = &self.config.dev_tools_path;
        let (cc, cxx) = (tools.join("gcc-4.0"), tools.join("g++-4.0"));
        self.set("CC", cc.display().to_string());
        self.set("CXX", cxx.display().to_string());

        self.replace_in_cflags("-O4", "-O3");
        self.set_cpu_cflags(
            &CpuFlags::new("nocona -mssse3")
                .family(CpuFamily::Core, "prescott")
                .bottle("generic"),
        );
        self.selected(Compiler::Gcc);
    }

    pub fn llvm(&mut self) {
        let cc = self.xcrun("llvm-gcc");
        let cxx = self.xcrun("llvm-g++");
        self.set_opt("CC", cc);
        self.set_opt("CXX", cxx);

        self.set_cpu_cflags(
            &CpuFlags::new("core2 -msse4")
                .family(CpuFamily::Penryn, "core2 -msse4.1")
                .family(CpuFamily::Core2, "core2")
                .family(CpuFamily::Core, "prescott"),
        );
        self.selected(Compiler::Llvm);
    }

    pub fn clang(&mut self) {
        let cc = self.xcrun("clang");
        let cxx = self.xcrun("clang++");
        self.set_opt("CC", cc);
        self.set_opt("CXX", cxx);

        // clang handles per-arch -march itself
        self.replace_in_cflags(&*XARCH_MARCH, "$1");
        // clang mistakenly enables AES-NI on plain Nehalem
        self.set_cpu_cflags(
            &CpuFlags::new("native")
                .family(CpuFamily::Nehalem, "native -Xclang -target-feature -Xclang -aes"),
        );
        self.append_to_cflags("-Qunused-arguments");
        self.selected(Compiler::Clang);
    }

    /// Replaces a proxied CC/CXX with the absolute path behind it, for
    /// builds that can't cope with a space in CC.
    pub fn expand_xcrun(&mut self) -> Result<()> {
        let Some(xcrun) = self.config.xcrun.clone() else {
            return Ok(());
        };
        for key in ["CC", "CXX"] {
            let tool = self
                .get(key)
                .and_then(|v| self.proxied(v))
                .map(|t| t.to_string());
            if let Some(tool) = tool {
                let path = xcrun_find(&xcrun, &tool)?;
                self.set(key, path);
            }
        }
        Ok(())
    }
}
