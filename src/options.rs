/// Per-install overrides, the equivalent of the flags passed to `brew install`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub use_gcc: bool,
    pub use_llvm: bool,
    pub use_clang: bool,
    pub build_bottle: bool,
    pub default_fortran_flags: bool,
}

impl<'a> FromIterator<&'a str> for Options {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut options = Options::default();
        for arg in iter {
            match arg {
                "--use-gcc" => options.use_gcc = true,
                "--use-llvm" => options.use_llvm = true,
                "--use-clang" => options.use_clang = true,
                "--build-bottle" => options.build_bottle = true,
                "--default-fortran-flags" => options.default_fortran_flags = true,
                _ => (),
            }
        }
        options
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }
}
