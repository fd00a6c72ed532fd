use std::{
    env::var_os,
    ffi::OsStr,
    io::{stdout, Write},
    os::unix::ffi::OsStrExt,
    path::PathBuf,
};

fn set_var<S: AsRef<OsStr>>(var: &str, s: S) {
    let mut stdout = stdout().lock();
    writeln!(stdout, "cargo:rerun-if-env-changed={}", var).unwrap();
    write!(stdout, "cargo:rustc-env={}=", var).unwrap();
    stdout.write_all(s.as_ref().as_bytes()).unwrap();
    writeln!(stdout).unwrap()
}

fn var<P: Into<PathBuf>>(key: &str, or: P) -> PathBuf {
    var_os(key).map(PathBuf::from).unwrap_or(or.into())
}

fn main() {
    println!("cargo:rerun-if-changed=.env");
    let _ = dotenvy::dotenv();

    // the toolchain already searches SYSTEM_PREFIX, so a PREFIX equal to it
    // needs no extra -isystem/-L flags
    let system_prefix = var("SYSTEM_PREFIX", "/usr/local");
    let prefix = var("PREFIX", &system_prefix);
    let x11_prefix = var("X11_PREFIX", "/usr/X11");

    set_var("PREFIX", prefix);
    set_var("SYSTEM_PREFIX", system_prefix);
    set_var("X11_PREFIX", x11_prefix);
}
