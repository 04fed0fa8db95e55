use assert_cmd::cargo_bin;
use std::process::Command;

pub const ROSTER: &str = "tests/fixtures/roster.json";

/// The binary with the fixture roster loaded and "today" pinned to Monday 2024-05-06.
pub fn payroll() -> Command {
    let mut cmd = Command::new(cargo_bin!("trainer-payroll"));
    cmd.env_remove("PAYROLL_DB_PATH")
        .args(["--roster", ROSTER, "--today", "2024-05-06"]);
    cmd
}
