//! Scenario tests against the always-available platform surface.
//!
//! Backend-specific dispatch needs real hardware and lives behind the
//! `hsa`/`cuda` features; everything here runs on any machine.

mod concurrent;
mod host_memory;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
