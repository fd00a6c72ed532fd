use std::{fmt::Display, str::FromStr};

use crate::{
    error::{Error, Result},
    BuildEnv,
};

/// A named tweak a formula can apply on top of the default build environment.
///
/// Parsed from its name, or `name=value` for the ones taking an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Deparallelize,
    Fast,
    O4,
    O3,
    O2,
    O1,
    Os,
    Og,
    MinimalOptimization,
    NoOptimization,
    EnableWarnings,
    Gcc,
    Gcc40,
    Llvm,
    Clang,
    ExpandXcrun,
    Fortran,
    Osx104,
    Osx105,
    DeploymentTarget(String),
    Libxml2,
    X11,
    NcursesDefine,
    M64,
    M32,
    UniversalBinary,
    AppendToCflags(String),
    RemoveFromCflags(String),
    SetCflags(String),
}

/// Old names still accepted for some operations.
const ALIASES: [(&str, &str); 5] = [
    ("j1", "deparallelize"),
    ("gcc_4_2", "gcc"),
    ("gcc_4_0_1", "gcc_4_0"),
    ("libpng", "x11"),
    ("set_cflags_all", "set_cflags"),
];

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, value) = match s.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (s, None),
        };
        let name = ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |(_, canonical)| *canonical);
        let unknown = || Error::UnknownOperation(s.to_string());

        let op = match (name, value) {
            ("deparallelize", None) => Operation::Deparallelize,
            ("fast", None) => Operation::Fast,
            ("O4", None) => Operation::O4,
            ("O3", None) => Operation::O3,
            ("O2", None) => Operation::O2,
            ("O1", None) => Operation::O1,
            ("Os", None) => Operation::Os,
            ("Og", None) => Operation::Og,
            ("minimal_optimization", None) => Operation::MinimalOptimization,
            ("no_optimization", None) => Operation::NoOptimization,
            ("enable_warnings", None) => Operation::EnableWarnings,
            ("gcc", None) => Operation::Gcc,
            ("gcc_4_0", None) => Operation::Gcc40,
            ("llvm", None) => Operation::Llvm,
            ("clang", None) => Operation::Clang,
            ("expand_xcrun", None) => Operation::ExpandXcrun,
            ("fortran", None) => Operation::Fortran,
            ("osx_10_4", None) => Operation::Osx104,
            ("osx_10_5", None) => Operation::Osx105,
            ("macosx_deployment_target", Some(v)) if !v.is_empty() => {
                Operation::DeploymentTarget(v.to_string())
            }
            ("libxml2", None) => Operation::Libxml2,
            ("x11", None) => Operation::X11,
            ("ncurses_define", None) => Operation::NcursesDefine,
            ("m64", None) => Operation::M64,
            ("m32", None) => Operation::M32,
            ("universal_binary", None) => Operation::UniversalBinary,
            ("append_to_cflags", Some(v)) => Operation::AppendToCflags(v.to_string()),
            ("remove_from_cflags", Some(v)) if !v.is_empty() => {
                Operation::RemoveFromCflags(v.to_string())
            }
            ("set_cflags", Some(v)) => Operation::SetCflags(v.to_string()),
            _ => return Err(unknown()),
        };
        Ok(op)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Deparallelize => "deparallelize",
            Operation::Fast => "fast",
            Operation::O4 => "O4",
            Operation::O3 => "O3",
            Operation::O2 => "O2",
            Operation::O1 => "O1",
            Operation::Os => "Os",
            Operation::Og => "Og",
            Operation::MinimalOptimization => "minimal_optimization",
            Operation::NoOptimization => "no_optimization",
            Operation::EnableWarnings => "enable_warnings",
            Operation::Gcc => "gcc",
            Operation::Gcc40 => "gcc_4_0",
            Operation::Llvm => "llvm",
            Operation::Clang => "clang",
            Operation::ExpandXcrun => "expand_xcrun",
            Operation::Fortran => "fortran",
            Operation::Osx104 => "osx_10_4",
            Operation::Osx105 => "osx_10_5",
            Operation::DeploymentTarget(v) => return write!(f, "macosx_deployment_target={}", v),
            Operation::Libxml2 => "libxml2",
            Operation::X11 => "x11",
            Operation::NcursesDefine => "ncurses_define",
            Operation::M64 => "m64",
            Operation::M32 => "m32",
            Operation::UniversalBinary => "universal_binary",
            Operation::AppendToCflags(v) => return write!(f, "append_to_cflags={}", v),
            Operation::RemoveFromCflags(v) => return write!(f, "remove_from_cflags={}", v),
            Operation::SetCflags(v) => return write!(f, "set_cflags={}", v),
        };
        f.write_str(name)
    }
}

impl BuildEnv {
    pub fn run(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::Deparallelize => self.deparallelize(),
            Operation::Fast => self.fast(),
            Operation::O4 => self.o4(),
            Operation::O3 => self.o3(),
            Operation::O2 => self.o2(),
            Operation::O1 => self.o1(),
            Operation::Os => self.os(),
            Operation::Og => self.og(),
            Operation::MinimalOptimization => self.minimal_optimization(),
            Operation::NoOptimization => self.no_optimization(),
            Operation::EnableWarnings => self.enable_warnings(),
            Operation::Gcc => self.gcc()?,
            Operation::Gcc40 => self.gcc_4_0(),
            Operation::Llvm => self.llvm(),
            Operation::Clang => self.clang(),
            Operation::ExpandXcrun => self.expand_xcrun()?,
            Operation::Fortran => self.fortran()?,
            Operation::Osx104 => self.osx_10_4(),
            Operation::Osx105 => self.osx_10_5(),
            Operation::DeploymentTarget(v) => self.macosx_deployment_target(v),
            Operation::Libxml2 => self.libxml2(),
            Operation::X11 => self.x11(),
            Operation::NcursesDefine => self.ncurses_define(),
            Operation::M64 => self.m64(),
            Operation::M32 => self.m32(),
            Operation::UniversalBinary => self.universal_binary(),
            Operation::AppendToCflags(v) => self.append_to_cflags(v),
            Operation::RemoveFromCflags(v) => self.remove_from_cflags(v.as_str()),
            Operation::SetCflags(v) => self.set_cflags(v),
        }
        Ok(())
    }
}
