use std::sync::LazyLock;

use regex::Regex;

use crate::{
    callback::{LogLevel, LogMessage},
    BuildEnv,
};

static VERSION_MIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?-mmacosx-version-min=\d+(\.\d+)*").unwrap());

impl BuildEnv {
    /// Builds for at least the given macOS release.
    pub fn macosx_deployment_target(&mut self, version: &str) {
        self.set("MACOSX_DEPLOYMENT_TARGET", version);
        self.remove_from_cflags(&*VERSION_MIN);
        self.append_to_cflags(format!("-mmacosx-version-min={}", version));
    }

    pub fn osx_10_4(&mut self) {
        self.macosx_deployment_target("10.4")
    }

    pub fn osx_10_5(&mut self) {
        self.macosx_deployment_target("10.5")
    }

    /// Some configure scripts won't find libxml2 without help.
    pub fn libxml2(&mut self) {
        self.append("CPPFLAGS", "-I/usr/include/libxml2");
    }

    pub fn x11(&mut self) {
        if !self.config.x11_installed() {
            self.log(LogLevel::Warning, LogMessage::X11NotInstalled);
        }

        let x11 = self.config.x11_prefix.display().to_string();
        // config scripts like freetype-config live here
        self.prepend_with("PATH", format!("{}/bin", x11), ":");
        self.append("CPPFLAGS", format!("-I{}/include", x11));
        self.append("LDFLAGS", format!("-L{}/lib", x11));
        // cmake ignores the variables above
        self.append_with("CMAKE_PREFIX_PATH", x11, ":");
    }

    /// Snow Leopard defines NCURSES_OPAQUE the opposite way to everyone else.
    pub fn ncurses_define(&mut self) {
        self.append("CPPFLAGS", "-DNCURSES_OPAQUE=0");
    }
}
