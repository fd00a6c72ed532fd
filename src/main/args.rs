use buildenv::Operation;
use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long)]
    pub use_gcc: bool,
    #[arg(long)]
    pub use_llvm: bool,
    #[arg(long)]
    pub use_clang: bool,
    #[arg(long)]
    pub build_bottle: bool,
    #[arg(long)]
    pub default_fortran_flags: bool,
    /// Set up FC and F77 after the other operations
    #[arg(long)]
    pub fortran: bool,
    /// Apply an operation, e.g. O3, deparallelize or set_cflags=-O1
    #[arg(long = "op", short = 'o', value_name = "OP")]
    pub ops: Vec<Operation>,
    #[arg(long, short = 'm')]
    pub nocolor: bool,
    /// Run this command in the build environment instead of printing it
    #[arg(last = true, value_name = "CMD")]
    pub command: Vec<String>,
}
