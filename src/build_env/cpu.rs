use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;

use crate::{
    build_env::{Compiler, Pattern},
    callback::{LogLevel, LogMessage},
    hardware::CpuFamily,
    BuildEnv,
};

static XARCH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-Xarch_i386 -march=").unwrap());

/// Everything a previous [`BuildEnv::set_cpu_cflags`] may have added.
static CPU_FLAGS: LazyLock<[Pattern; 5]> = LazyLock::new(|| {
    [
        Regex::new(r"(-Xarch_i386 )?-march=\S*").unwrap().into(),
        Regex::new(r"(\s*-Xclang\s+\S+)+").unwrap().into(),
        Regex::new(r"-mssse3").unwrap().into(),
        Regex::new(r"-msse4(\.\d)?").unwrap().into(),
        Regex::new(r"-mtune=\S*").unwrap().into(),
    ]
});

static MARCH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-march=\S*").unwrap());

/// Which `-march` to use on which CPU.
///
/// `default` applies to any family without an override. When building a
/// bottle only `bottle` is used, as `-mtune`, so the result runs anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuFlags {
    pub default: String,
    pub overrides: BTreeMap<CpuFamily, String>,
    pub bottle: Option<String>,
}

impl CpuFlags {
    pub fn new<S: Into<String>>(default: S) -> Self {
        CpuFlags {
            default: default.into(),
            ..Default::default()
        }
    }

    pub fn family<S: Into<String>>(mut self, family: CpuFamily, flags: S) -> Self {
        self.overrides.insert(family, flags.into());
        self
    }

    pub fn bottle<S: Into<String>>(mut self, flags: S) -> Self {
        self.bottle = Some(flags.into());
        self
    }

    pub fn flags_for(&self, family: CpuFamily) -> &str {
        self.overrides
            .get(&family)
            .map(|s| s.as_str())
            .unwrap_or(&self.default)
    }
}

impl BuildEnv {
    /// Replaces any CPU tuning flags with the ones `flags` picks for this
    /// machine. Calling this twice with the same flags changes nothing.
    pub fn set_cpu_cflags(&mut self, flags: &CpuFlags) {
        let xarch = self
            .get("CFLAGS")
            .map_or(false, |cflags| XARCH_PREFIX.is_match(cflags));

        for pattern in CPU_FLAGS.iter() {
            for key in super::CFLAGS_FAMILY {
                self.remove_pattern(key, pattern);
            }
        }
        if xarch {
            self.append_to_cflags("-Xarch_i386");
        }

        if self.options.build_bottle {
            if let Some(bottle) = &flags.bottle {
                self.append_to_cflags(format!("-mtune={}", bottle));
            }
        } else {
            let family = self.config.cpu_family;
            if family == CpuFamily::Dunno {
                self.log(LogLevel::Debug, LogMessage::UnknownCpuFamily);
            }
            // -march implies -msse3 and older, so those are never added
            self.append_to_cflags(format!("-march={}", flags.flags_for(family)));
        }

        // not really a cpu flag, but only ever added alongside clang's
        self.remove_from_cflags("-Qunused-arguments");
    }

    pub fn m64(&mut self) {
        self.append_to_cflags("-m64");
        self.append("LDFLAGS", "-arch x86_64");
    }

    pub fn m32(&mut self) {
        self.append_to_cflags("-m32");
        self.append("LDFLAGS", "-arch i386");
    }

    /// i386 and x86_64 in one binary.
    pub fn universal_binary(&mut self) {
        self.append_to_cflags("-arch i386 -arch x86_64");
        // -O4 fails for universal builds
        self.replace_in_cflags("-O4", "-O3");
        self.append("LDFLAGS", "-arch i386 -arch x86_64");

        // a -march for a 32-bit CPU can't be combined with -arch x86_64
        if self.compiler() != Compiler::Clang && !self.config.cpu_64_bit {
            self.replace_in_cflags(&*MARCH, "-Xarch_i386 $0");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        build_env::{test::env_with, CFLAGS_FAMILY},
        config::Config,
    };

    fn on(family: CpuFamily) -> BuildEnv {
        env_with(
            Config {
                cpu_family: family,
                ..Config::default()
            },
            &[],
        )
    }

    #[test]
    fn picks_override() {
        let mut env = on(CpuFamily::Nehalem);
        env.set_cpu_cflags(&CpuFlags::new("prescott").family(CpuFamily::Nehalem, "native"));
        let cflags = env.get("CFLAGS").unwrap();
        assert!(cflags.contains("-march=native"));
        assert!(!cflags.contains("-march=prescott"));
    }

    #[test]
    fn falls_back_to_default() {
        let mut env = on(CpuFamily::Core2);
        env.set_cpu_cflags(&CpuFlags::new("prescott").family(CpuFamily::Nehalem, "native"));
        assert_eq!(env.get("CXXFLAGS"), Some("-march=prescott"));
    }

    #[test]
    fn idempotent() {
        let flags = CpuFlags::new("core2 -msse4")
            .family(CpuFamily::Penryn, "core2 -msse4.1")
            .bottle("generic");

        for bottle in [false, true] {
            let mut once = on(CpuFamily::Penryn);
            once.options.build_bottle = bottle;
            once.set_cflags("-Os -w -pipe");
            once.set_cpu_cflags(&flags);

            let mut twice = on(CpuFamily::Penryn);
            twice.options.build_bottle = bottle;
            twice.set_cflags("-Os -w -pipe");
            twice.set_cpu_cflags(&flags);
            twice.set_cpu_cflags(&flags);

            for key in CFLAGS_FAMILY {
                assert_eq!(once.get(key), twice.get(key));
            }
        }
    }

    #[test]
    fn replaces_previous_tuning() {
        let mut env = on(CpuFamily::Nehalem);
        env.set_cflags("-Os -march=core2 -mssse3 -Xclang -target-feature -Xclang -aes -Qunused-arguments");
        env.set_cpu_cflags(&CpuFlags::new("nocona"));
        assert_eq!(env.get("OBJCFLAGS"), Some("-Os -march=nocona"));
    }

    #[test]
    fn bottle_uses_mtune() {
        let mut env = on(CpuFamily::Nehalem);
        env.options.build_bottle = true;
        env.set_cpu_cflags(&CpuFlags::new("native").bottle("generic"));
        assert_eq!(env.get("CFLAGS"), Some("-mtune=generic"));

        let mut env = on(CpuFamily::Nehalem);
        env.options.build_bottle = true;
        env.set_cpu_cflags(&CpuFlags::new("native"));
        assert_eq!(env.get("CFLAGS"), None);
    }

    #[test]
    fn keeps_xarch_prefix() {
        let mut env = on(CpuFamily::Core);
        env.set_cflags("-Os -Xarch_i386 -march=core2");
        env.set_cpu_cflags(&CpuFlags::new("nocona").family(CpuFamily::Core, "prescott"));
        assert_eq!(env.get("CFLAGS"), Some("-Os -Xarch_i386 -march=prescott"));
    }

    #[test]
    fn architectures() {
        let mut env = on(CpuFamily::Dunno);
        env.m64();
        assert_eq!(env.get("CFLAGS"), Some("-m64"));
        assert_eq!(env.get("LDFLAGS"), Some("-arch x86_64"));

        let mut env = on(CpuFamily::Dunno);
        env.m32();
        assert_eq!(env.get("OBJCXXFLAGS"), Some("-m32"));
        assert_eq!(env.get("LDFLAGS"), Some("-arch i386"));
    }

    #[test]
    fn universal_on_32_bit_cpu() {
        let mut env = env_with(
            Config {
                cpu_64_bit: false,
                ..Config::default()
            },
            &[],
        );
        env.set_cflags("-O4 -march=prescott");
        env.universal_binary();

        assert_eq!(
            env.get("CFLAGS"),
            Some("-O3 -Xarch_i386 -march=prescott -arch i386 -arch x86_64")
        );
        assert_eq!(env.get("LDFLAGS"), Some("-arch i386 -arch x86_64"));
    }

    #[test]
    fn universal_with_clang_keeps_march() {
        let mut env = env_with(
            Config {
                cpu_64_bit: false,
                default_compiler: Compiler::Clang,
                ..Config::default()
            },
            &[],
        );
        env.set_cflags("-Os -march=native");
        env.universal_binary();
        assert_eq!(
            env.get("CFLAGS"),
            Some("-Os -march=native -arch i386 -arch x86_64")
        );
    }
}
