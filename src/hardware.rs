//! Facts about the machine the build runs on.

use std::{fmt::Display, fs::read_to_string, path::Path, process::Command};

use crate::error::{CommandErrorExt, Context, IOContext, IOErrorExt, Result};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    #[default]
    Linux,
    MacOS,
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Linux => f.write_str("linux"),
            Platform::MacOS => f.write_str("macos"),
        }
    }
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_vendor = "apple") {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    pub fn is_apple(self) -> bool {
        self == Platform::MacOS
    }
}

/// Intel micro-architecture family, used to pick a `-march`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CpuFamily {
    Core,
    Core2,
    Penryn,
    Nehalem,
    Arrandale,
    SandyBridge,
    IvyBridge,
    #[default]
    Dunno,
}

impl Display for CpuFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CpuFamily::Core => "core",
            CpuFamily::Core2 => "core2",
            CpuFamily::Penryn => "penryn",
            CpuFamily::Nehalem => "nehalem",
            CpuFamily::Arrandale => "arrandale",
            CpuFamily::SandyBridge => "sandybridge",
            CpuFamily::IvyBridge => "ivybridge",
            CpuFamily::Dunno => "dunno",
        })
    }
}

impl CpuFamily {
    /// Maps an Intel family 6 model number as printed in `/proc/cpuinfo`.
    pub fn from_intel_model(model: u32) -> Self {
        match model {
            0x0e => CpuFamily::Core,
            0x0f | 0x16 => CpuFamily::Core2,
            0x17 | 0x1d => CpuFamily::Penryn,
            0x1a | 0x1e | 0x1f | 0x2e => CpuFamily::Nehalem,
            0x25 | 0x2c | 0x2f => CpuFamily::Arrandale,
            0x2a | 0x2d => CpuFamily::SandyBridge,
            0x3a | 0x3e => CpuFamily::IvyBridge,
            _ => CpuFamily::Dunno,
        }
    }

    /// Maps the value of darwin's `hw.cpufamily` sysctl.
    pub fn from_darwin_cpufamily(id: u32) -> Self {
        match id {
            0x78ea4fbc => CpuFamily::Core,
            0x6b5a4cd2 => CpuFamily::Core2,
            0x73d67300 => CpuFamily::Penryn,
            0x426f69ef => CpuFamily::Nehalem,
            0x573b5eec => CpuFamily::Arrandale,
            0x5490b78c => CpuFamily::SandyBridge,
            0x1f65e835 => CpuFamily::IvyBridge,
            _ => CpuFamily::Dunno,
        }
    }

    /// Reads the family out of a `/proc/cpuinfo` dump.
    pub fn from_cpuinfo(cpuinfo: &str) -> Self {
        let mut intel = false;
        let mut family = None;
        let mut model = None;

        for line in cpuinfo.lines() {
            // only the first processor block matters
            if line.trim().is_empty() && family.is_some() {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key.trim() {
                "vendor_id" => intel = value.trim() == "GenuineIntel",
                "cpu family" => family = value.trim().parse::<u32>().ok(),
                "model" => model = value.trim().parse::<u32>().ok(),
                _ => (),
            }
        }

        match (intel, family, model) {
            (true, Some(6), Some(model)) => CpuFamily::from_intel_model(model),
            _ => CpuFamily::Dunno,
        }
    }
}

/// Whether `/proc/cpuinfo` advertises long mode.
pub fn cpuinfo_64_bit(cpuinfo: &str) -> bool {
    cpuinfo
        .lines()
        .filter_map(|l| l.split_once(':'))
        .filter(|(k, _)| k.trim() == "flags")
        .any(|(_, flags)| flags.split_whitespace().any(|f| f == "lm"))
}

pub fn processor_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub(crate) fn detect_cpu(platform: Platform) -> Result<(CpuFamily, bool)> {
    match platform {
        Platform::Linux => {
            let path = Path::new("/proc/cpuinfo");
            let cpuinfo = match read_to_string(path) {
                Ok(s) => s,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok((CpuFamily::Dunno, cfg!(target_pointer_width = "64")))
                }
                r => r.context(Context::DetectHardware, IOContext::Read(path.into()))?,
            };
            Ok((CpuFamily::from_cpuinfo(&cpuinfo), cpuinfo_64_bit(&cpuinfo)))
        }
        Platform::MacOS => {
            let family = sysctl("hw.cpufamily")?
                .parse::<i64>()
                .map(|id| CpuFamily::from_darwin_cpufamily(id as u32))
                .unwrap_or_default();
            let is_64 = sysctl("hw.cpu64bit_capable")
                .map(|v| v == "1")
                .unwrap_or(cfg!(target_pointer_width = "64"));
            Ok((family, is_64))
        }
    }
}

fn sysctl(name: &str) -> Result<String> {
    let mut command = Command::new("/usr/sbin/sysctl");
    command.arg("-n").arg(name);
    let output = command
        .output()
        .cmd_context(&command, Context::DetectHardware)?;
    let output = String::from_utf8(output.stdout).cmd_context(&command, Context::DetectHardware)?;
    Ok(output.trim().to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    static CPUINFO: &str = "processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 42
model name\t: Intel(R) Core(TM) i7-2600 CPU @ 3.40GHz
flags\t\t: fpu vme de pse tsc msr pae lm constant_tsc

processor\t: 1
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 26
";

    #[test]
    fn cpuinfo_family() {
        assert_eq!(CpuFamily::from_cpuinfo(CPUINFO), CpuFamily::SandyBridge);
        assert!(cpuinfo_64_bit(CPUINFO));
    }

    #[test]
    fn non_intel_is_unknown() {
        let amd = CPUINFO.replace("GenuineIntel", "AuthenticAMD");
        assert_eq!(CpuFamily::from_cpuinfo(&amd), CpuFamily::Dunno);
        assert!(!cpuinfo_64_bit("flags\t: fpu vme\n"));
    }

    #[test]
    fn darwin_family() {
        assert_eq!(
            CpuFamily::from_darwin_cpufamily(0x426f69ef),
            CpuFamily::Nehalem
        );
        assert_eq!(CpuFamily::from_darwin_cpufamily(1), CpuFamily::Dunno);
    }

    #[test]
    fn processors() {
        assert!(processor_count() >= 1);
    }
}
