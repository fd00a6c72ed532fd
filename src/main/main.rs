mod args;
mod print;

use print::Printer;

use std::io::{stderr, stdout, IsTerminal, Write};

use ansi_term::{Color, Style};
use anyhow::{bail, Context, Error, Result};
use buildenv::{config::Config, error, BuildEnv, Options};
use clap::Parser;
use nix::unistd::Uid;

pub fn print_error(style: Style, err: Error) {
    eprint!("{}", style.paint("error"));

    for link in err.chain() {
        eprint!(": {}", link);
    }
    eprintln!();

    if let Some(error::Error::ToolNotFound(e)) = err.downcast_ref::<error::Error>() {
        eprintln!(
            "hint: pass --use-gcc, --use-llvm or --use-clang to use something other than {}",
            e.tool
        );
    }
}

pub fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            print_error(Style::new().fg(Color::Red).bold(), e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = args::Args::parse();

    if Uid::current().is_root() {
        bail!("running {} as root is not allowed", env!("CARGO_PKG_NAME"))
    }

    let options = Options {
        use_gcc: cli.use_gcc,
        use_llvm: cli.use_llvm,
        use_clang: cli.use_clang,
        build_bottle: cli.build_bottle,
        default_fortran_flags: cli.default_fortran_flags,
    };

    let color = !cli.nocolor && stderr().is_terminal();
    let config = Config::new().context("failed to inspect the host")?;
    let mut env = BuildEnv::new(config, options).callback(Printer::new(color));

    env.setup_build_environment()?;
    for op in &cli.ops {
        env.run(op).with_context(|| format!("operation {} failed", op))?;
    }
    if cli.fortran {
        env.fortran()?;
    }

    match cli.command.split_first() {
        Some((program, args)) => {
            let status = env.exec(program, args)?;
            // killed by a signal
            Ok(status.code().unwrap_or(1))
        }
        None => {
            stdout().lock().write_all(env.exports().as_bytes())?;
            Ok(0)
        }
    }
}
