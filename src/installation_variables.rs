pub static PREFIX: &str = env!("PREFIX");
pub static SYSTEM_PREFIX: &str = env!("SYSTEM_PREFIX");
pub static X11_PREFIX: &str = env!("X11_PREFIX");
