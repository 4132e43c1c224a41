mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use crossterm::style::{Color, Stylize};
use crossterm::tty::IsTty;

use session::{Output, Session, SessionOptions};

const USAGE: &str = "Usage: lock-emulator [--eeprom <path>] [--transcript <path>] [--poll-ms <n>] [--no-bypass]";

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let colour = stdout.is_tty();
    let mut writer = stdout.lock();
    let mut session = Session::new(options)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Binary safe emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for output in session.handle_command(trimmed)? {
            print_output(&mut writer, &output, colour)?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn print_output(writer: &mut impl Write, output: &Output, colour: bool) -> io::Result<()> {
    match output {
        Output::Frame { at, frame } if colour => {
            writeln!(
                writer,
                "[t={:>6} ms] leds {} {} {}",
                at.as_millis(),
                lamp(frame.red, Color::Red),
                lamp(frame.green, Color::Green),
                lamp(frame.blue, Color::Blue),
            )
        }
        other => writeln!(writer, "{other}"),
    }
}

fn lamp(lit: bool, color: Color) -> crossterm::style::StyledContent<&'static str> {
    if lit {
        "●".with(color)
    } else {
        "○".dark_grey()
    }
}

fn parse_options() -> Result<SessionOptions, String> {
    let mut options = SessionOptions::new("lock-eeprom.bin", "lock-transcript.log");
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = |name: &str| {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {name}"))
        };

        match flag.as_str() {
            "--eeprom" => options.eeprom = PathBuf::from(value("--eeprom")?),
            "--transcript" => options.transcript = PathBuf::from(value("--transcript")?),
            "--poll-ms" => {
                let raw = value("--poll-ms")?;
                let millis = raw
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --poll-ms value `{raw}`"))?;
                options.config = options
                    .config
                    .with_poll_interval(Duration::from_millis(millis));
            }
            "--no-bypass" => options.config = options.config.with_recovery_bypass(false),
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    options
        .config
        .validate()
        .map_err(|err| format!("Invalid configuration: {err}"))?;
    Ok(options)
}
