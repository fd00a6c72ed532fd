use std::process::{ExitStatus, Output};
use std::{
    fmt::Display,
    io::{self, ErrorKind},
    iter,
    path::PathBuf,
    process::Command,
    result::Result as StdResult,
    string::FromUtf8Error,
};

use crate::build_env::Compiler;

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) trait CommandErrorExt<T>: Sized {
    fn cmd_context(self, command: &Command, context: Context) -> StdResult<T, CommandError>;
}

pub(crate) trait IOErrorExt<T> {
    fn context(self, context: Context, iocontext: IOContext) -> StdResult<T, IOError>;
}

impl<T> CommandErrorExt<T> for StdResult<T, FromUtf8Error> {
    fn cmd_context(self, command: &Command, context: Context) -> StdResult<T, CommandError> {
        self.map_err(|e| CommandError::utf8(e, command, context))
    }
}

impl CommandErrorExt<Output> for io::Result<Output> {
    fn cmd_context(self, command: &Command, context: Context) -> StdResult<Output, CommandError> {
        match self {
            Ok(status) if !status.status.success() => {
                Err(CommandError::exit(command, status.status.code(), context))
            }
            Ok(o) => Ok(o),
            Err(e) => Err(CommandError::exec(e, command, context)),
        }
    }
}

impl CommandErrorExt<ExitStatus> for io::Result<ExitStatus> {
    fn cmd_context(
        self,
        command: &Command,
        context: Context,
    ) -> StdResult<ExitStatus, CommandError> {
        self.map_err(|e| CommandError::exec(e, command, context))
    }
}

impl<T> IOErrorExt<T> for io::Result<T> {
    fn context(self, context: Context, iocontext: IOContext) -> StdResult<T, IOError> {
        self.map_err(|e| IOError::new(context, iocontext, e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Context {
    SelectCompiler(Compiler),
    ExpandXcrun,
    DetectHardware,
    RunCommand,
    None,
}

impl Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Context::SelectCompiler(c) => write!(f, "failed to select {}", c),
            Context::ExpandXcrun => f.write_str("failed to expand xcrun"),
            Context::DetectHardware => f.write_str("failed to detect hardware"),
            Context::RunCommand => f.write_str("failed to run command"),
            Context::None => f.write_str("no context"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IOContext {
    Read(PathBuf),
    Canonicalize(PathBuf),
}

impl Display for IOContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IOContext::Read(p) => write!(f, "read {}", p.display()),
            IOContext::Canonicalize(p) => write!(f, "realpath {}", p.display()),
        }
    }
}

#[derive(Debug)]
pub struct IOError {
    pub context: Context,
    pub iocontext: IOContext,
    pub err: std::io::Error,
}

impl std::error::Error for IOError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

impl Display for IOError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.context != Context::None {
            write!(f, "{}", self.context)?;
        }
        write!(f, ": {}", self.iocontext)?;

        if self.err.kind() != ErrorKind::Other {
            write!(f, ": {}", self.err)?;
        }
        Ok(())
    }
}

impl IOError {
    pub(crate) fn new<E: Into<io::Error>>(context: Context, iocontext: IOContext, err: E) -> Self {
        IOError {
            context,
            iocontext,
            err: err.into(),
        }
    }
}

#[derive(Debug)]
pub enum CommandErrorKind {
    Command(io::Error),
    UTF8(FromUtf8Error),
    ExitCode(Option<i32>),
}

impl Display for CommandErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandErrorKind::Command(e) => e.fmt(f),
            CommandErrorKind::UTF8(_) => write!(f, "output was not valid unicode"),
            CommandErrorKind::ExitCode(Some(code)) => write!(f, "exited {}", code),
            CommandErrorKind::ExitCode(None) => write!(f, "killed by signal"),
        }
    }
}

#[derive(Debug)]
pub struct CommandError {
    pub kind: CommandErrorKind,
    pub command: Vec<String>,
    pub context: Context,
}

impl std::error::Error for CommandError {}

impl Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.context != Context::None {
            write!(f, "{}: ", self.context)?;
        }
        match &self.kind {
            CommandErrorKind::Command(_) => write!(f, "{} ({})", self.command[0], self.kind)?,
            CommandErrorKind::UTF8(_) => write!(f, "{}: {}", self.command[0], self.kind)?,
            CommandErrorKind::ExitCode(_) => write!(f, "{} {}", self.command[0], self.kind)?,
        }

        Ok(())
    }
}

impl CommandError {
    pub(crate) fn exec(err: io::Error, command: &Command, context: Context) -> Self {
        CommandError {
            command: Self::command_to_string(command),
            context,
            kind: CommandErrorKind::Command(err),
        }
    }
    pub(crate) fn utf8(err: FromUtf8Error, command: &Command, context: Context) -> Self {
        CommandError {
            command: Self::command_to_string(command),
            context,
            kind: CommandErrorKind::UTF8(err),
        }
    }
    pub(crate) fn exit(command: &Command, code: Option<i32>, context: Context) -> Self {
        CommandError {
            command: Self::command_to_string(command),
            context,
            kind: CommandErrorKind::ExitCode(code),
        }
    }

    fn command_to_string(command: &Command) -> Vec<String> {
        iter::once(command.get_program())
            .chain(command.get_args())
            .map(|s| s.to_string_lossy().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolNotFoundKind {
    /// None of these locations held an executable.
    Missing(Vec<PathBuf>),
    /// The tool exists but is really an LLVM driver.
    LlvmAlias(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolNotFoundError {
    pub tool: String,
    pub kind: ToolNotFoundKind,
}

impl std::error::Error for ToolNotFoundError {}

impl Display for ToolNotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} could not be found", self.tool)?;
        match &self.kind {
            ToolNotFoundKind::Missing(searched) if !searched.is_empty() => {
                write!(f, " (searched:")?;
                for p in searched {
                    write!(f, " {}", p.display())?;
                }
                write!(f, ")")
            }
            ToolNotFoundKind::Missing(_) => Ok(()),
            ToolNotFoundKind::LlvmAlias(p) => {
                write!(f, " ({} is a symlink to llvm)", p.display())
            }
        }
    }
}

impl ToolNotFoundError {
    pub(crate) fn missing<S: Into<String>>(tool: S, searched: Vec<PathBuf>) -> Self {
        ToolNotFoundError {
            tool: tool.into(),
            kind: ToolNotFoundKind::Missing(searched),
        }
    }

    pub(crate) fn llvm_alias<S: Into<String>>(tool: S, path: PathBuf) -> Self {
        ToolNotFoundError {
            tool: tool.into(),
            kind: ToolNotFoundKind::LlvmAlias(path),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    ToolNotFound(ToolNotFoundError),
    NoFortranCompiler,
    UnknownOperation(String),
    IO(IOError),
    Command(CommandError),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(e) => Some(&e.err as _),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ToolNotFound(e) => e.fmt(f),
            Error::NoFortranCompiler => f.write_str(
                "this formula requires a fortran compiler, but we could not find one by
looking at the FC environment variable or searching your PATH for `gfortran`.
Please take one of the following actions:

  - Decide to use the build of gfortran provided by the package manager
        `brew install gfortran`

  - Choose another Fortran compiler by setting the FC environment variable:
        export FC=/path/to/some/fortran/compiler
    Using an alternative compiler may produce more efficient code, but we will
    not be able to provide support for build errors.",
            ),
            Error::UnknownOperation(name) => write!(f, "unknown operation '{}'", name),
            Error::IO(e) => e.fmt(f),
            Error::Command(e) => e.fmt(f),
        }
    }
}

impl From<ToolNotFoundError> for Error {
    fn from(value: ToolNotFoundError) -> Self {
        Error::ToolNotFound(value)
    }
}

impl From<IOError> for Error {
    fn from(value: IOError) -> Self {
        Self::IO(value)
    }
}

impl From<CommandError> for Error {
    fn from(value: CommandError) -> Self {
        Error::Command(value)
    }
}
