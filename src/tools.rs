use std::{
    env::split_paths,
    ffi::OsStr,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use nix::unistd::{access, AccessFlags};

use crate::error::{CommandErrorExt, Context, IOContext, IOErrorExt, Result};

pub fn is_executable<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

/// Searches a `PATH` style list for an executable.
pub fn which<S: AsRef<OsStr>>(name: &str, path: S) -> Option<PathBuf> {
    split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

pub fn realpath<P: AsRef<Path>>(path: P, context: Context) -> Result<PathBuf> {
    let path = path.as_ref();
    let real = path
        .canonicalize()
        .context(context, IOContext::Canonicalize(path.into()))?;
    Ok(real)
}

/// Asks the toolchain proxy whether it knows `tool`.
pub fn xcrun_knows<P: AsRef<Path>>(xcrun: P, tool: &str) -> bool {
    Command::new(xcrun.as_ref())
        .arg("-find")
        .arg(tool)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Resolves `tool` to an absolute path through the toolchain proxy.
pub fn xcrun_find<P: AsRef<Path>>(xcrun: P, tool: &str) -> Result<String> {
    let mut command = Command::new(xcrun.as_ref());
    command.arg("-find").arg(tool).stderr(Stdio::null());
    let output = command.output().cmd_context(&command, Context::ExpandXcrun)?;
    let path = String::from_utf8(output.stdout).cmd_context(&command, Context::ExpandXcrun)?;
    Ok(path.trim_end().to_string())
}
