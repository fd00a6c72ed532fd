use crate::{
    callback::{Event, LogLevel, LogMessage},
    error::{Error, Result},
    tools::which,
    BuildEnv,
};

impl BuildEnv {
    /// Sets up `FC` and `F77` for formulas that need a Fortran compiler.
    ///
    /// A user supplied `FC` always wins. Otherwise `gfortran` is looked up
    /// on `PATH` and given the C flags.
    pub fn fortran(&mut self) -> Result<()> {
        if let Some(fc) = self.get("FC").map(|s| s.to_string()) {
            self.event(Event::UsingAlternativeFortran(fc.clone()));
            if self.get("F77").is_none() {
                self.set("F77", fc.as_str());
            }
            self.set("FC", fc);

            if self.options.default_fortran_flags {
                let cflags = self.cflags().map(|s| s.to_string());
                for key in ["FCFLAGS", "FFLAGS"] {
                    if self.get(key).is_none() {
                        self.set_opt(key, cflags.clone());
                    }
                }
            } else if self.get("FCFLAGS").is_none() || self.get("FFLAGS").is_none() {
                self.log(LogLevel::Warning, LogMessage::NoFortranFlags);
            }
            return Ok(());
        }

        let gfortran = self.get("PATH").and_then(|path| which("gfortran", path));
        match gfortran {
            Some(gfortran) => {
                let fc = gfortran.display().to_string();
                self.event(Event::UsingBundledFortran(fc.clone()));
                self.set("FC", fc.as_str());
                self.set("F77", fc);

                let cflags = self.cflags().map(|s| s.to_string());
                self.set_opt("FCFLAGS", cflags.clone());
                self.set_opt("FFLAGS", cflags);
                Ok(())
            }
            None => Err(Error::NoFortranCompiler),
        }
    }
}
