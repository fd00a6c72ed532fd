use std::sync::LazyLock;

use regex::Regex;

use crate::{
    build_env::{Pattern, CFLAGS_FAMILY, SAFE_CFLAGS_FLAGS},
    BuildEnv,
};

/// A whole `-O<level>` or `-fast` word.
static OPTIMIZATION: LazyLock<Pattern> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)-(?:O\S*|fast)(?:\s|$)")
        .unwrap()
        .into()
});

impl BuildEnv {
    fn optimize(&mut self, flags: &str) {
        for key in CFLAGS_FAMILY {
            self.remove_all_pattern(key, &OPTIMIZATION);
        }
        self.append_to_cflags(flags);
    }

    /// LLVM link-time optimization.
    pub fn o4(&mut self) {
        self.optimize("-O4")
    }

    pub fn o3(&mut self) {
        self.optimize("-O3")
    }

    pub fn o2(&mut self) {
        self.optimize("-O2")
    }

    pub fn o1(&mut self) {
        self.optimize("-O1")
    }

    pub fn os(&mut self) {
        self.optimize("-Os")
    }

    /// Debug build.
    pub fn og(&mut self) {
        self.optimize("-g -O0")
    }

    /// Apple's recommended setting; plenty of software won't build with it.
    pub fn fast(&mut self) {
        self.optimize("-fast")
    }

    pub fn minimal_optimization(&mut self) {
        let flags = format!("-Os {}", SAFE_CFLAGS_FLAGS);
        self.set("CFLAGS", flags.as_str());
        self.set("CXXFLAGS", flags);
    }

    pub fn no_optimization(&mut self) {
        self.set("CFLAGS", SAFE_CFLAGS_FLAGS);
        self.set("CXXFLAGS", SAFE_CFLAGS_FLAGS);
    }

    /// Some software fails to build with warnings disabled.
    pub fn enable_warnings(&mut self) {
        self.remove_from_cflags("-w");
        self.remove_from_cflags("-Qunused-arguments");
    }
}
