use std::fs;
use std::io;
use std::path::Path;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, SessionOptions};

const OUTPUT_DIR: &str = "transcripts";

/// Scripted walkthroughs recorded against a fresh EEPROM image each.
const SCENARIOS: &[(&str, &[&str])] = &[
    (
        "set-and-unlock",
        &[
            "status",
            "tap 1 2 1 1 2 1",
            "status",
            "power-cycle",
            "tap 1 2 1 1 2 1",
            "status",
        ],
    ),
    (
        "wrong-code",
        &[
            "tap 2 2 1 1 2 2",
            "tap 1 1 1 1 1 1",
            "wait 2500",
            "tap 2 2 1 1 2 2",
            "status",
        ],
    ),
    (
        "entry-timeout",
        &["tap 1 2", "wait 3200", "status", "wait 2500", "status"],
    ),
    (
        "recovery-bypass",
        &[
            "tap 2 2 2 2 2 2",
            "power-cycle hold 1",
            "wait 500",
            "release",
            "wait 50",
            "status",
        ],
    ),
];

fn main() -> io::Result<()> {
    for (name, commands) in SCENARIOS {
        record_scenario(name, commands)?;
    }
    Ok(())
}

fn record_scenario(name: &str, commands: &[&str]) -> io::Result<()> {
    let dir = Path::new(OUTPUT_DIR);
    fs::create_dir_all(dir)?;

    let eeprom = dir.join(format!("{name}.eeprom"));
    if eeprom.exists() {
        fs::remove_file(&eeprom)?;
    }

    let mut session = Session::new(SessionOptions::new(
        eeprom,
        dir.join(format!("{name}.log")),
    ))?;
    for command in commands {
        let _ = session.handle_command(command)?;
    }
    Ok(())
}
