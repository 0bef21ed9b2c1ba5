//! Kept in its own test binary: it mutates the real process environment.

use instconfig::env::{HOSTNAME, TAILSCALE_ENABLED, TAILSCALE_EXPOSE_WEBUI};
use instconfig::Config;

#[test]
fn reads_the_process_environment() {
    std::env::set_var(HOSTNAME, "from-process");
    std::env::set_var(TAILSCALE_ENABLED, "Yes");

    let cfg = Config::load(None).unwrap();

    std::env::remove_var(HOSTNAME);
    std::env::remove_var(TAILSCALE_ENABLED);

    assert_eq!(cfg.system.hostname, "from-process");
    assert!(cfg.tailscale.enabled);

    non_utf8_flag_counts_as_present();
}

// Runs from the test above so the two never touch the environment at once.
#[cfg(unix)]
fn non_utf8_flag_counts_as_present() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let mut cfg = Config::default();
    cfg.tailscale.expose_webui = true;

    std::env::set_var(TAILSCALE_EXPOSE_WEBUI, OsStr::from_bytes(b"\xff"));
    cfg.apply_env();
    std::env::remove_var(TAILSCALE_EXPOSE_WEBUI);

    assert!(!cfg.tailscale.expose_webui);
}

#[cfg(not(unix))]
fn non_utf8_flag_counts_as_present() {}
