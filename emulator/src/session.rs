use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::Add;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lock_core::code::KeyId;
use lock_core::config::LockConfig;
use lock_core::debounce::KeySample;
use lock_core::indicator::LedFrame;
use lock_core::machine::{LockMachine, Phase};
use lock_core::store::{ByteStorage, CODE_SLOT_ADDRESS, CodeStore, SlotStore};
use lock_core::telemetry::LockEvent;
use lock_core::watchdog::EntryWatchdog;

/// Size of the emulated EEPROM image.
pub const EEPROM_IMAGE_LEN: usize = 64;

/// Extra polling ticks a scripted tap holds beyond the debounce window.
const TAP_MARGIN_TICKS: u32 = 4;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("tap", "tap <1|2>...              - press and release keys in order"),
    ("press", "press <1|2>                - hold a key down"),
    ("release", "release                    - let go of every key"),
    ("wait", "wait <ms>                  - advance simulated time"),
    ("status", "status                     - display lock state"),
    (
        "power-cycle",
        "power-cycle [hold <1|2>]   - reboot, optionally with a key held",
    ),
    ("help", "help [topic]               - show help for a command"),
];

/// Host-side settings for one emulator session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub eeprom: PathBuf,
    pub transcript: PathBuf,
    pub config: LockConfig,
}

impl SessionOptions {
    pub fn new(eeprom: impl Into<PathBuf>, transcript: impl Into<PathBuf>) -> Self {
        Self {
            eeprom: eeprom.into(),
            transcript: transcript.into(),
            config: LockConfig::default(),
        }
    }
}

/// Monotonic simulated time since the session started.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimInstant(Duration);

impl SimInstant {
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

/// One line of emulator output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Text(String),
    Event { at: Duration, event: LockEvent },
    Frame { at: Duration, frame: LedFrame },
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Text(line) => f.write_str(line),
            Output::Event { at, event } => {
                write!(f, "[t={:>6} ms] event {event}", at.as_millis())
            }
            Output::Frame { at, frame } => {
                write!(f, "[t={:>6} ms] leds {frame}", at.as_millis())
            }
        }
    }
}

type EmulatedMachine = LockMachine<SlotStore<FileStorage>, SimInstant, Arc<EntryWatchdog>>;

pub struct Session {
    options: SessionOptions,
    watchdog: Arc<EntryWatchdog>,
    machine: EmulatedMachine,
    transcript: TranscriptLogger,
    now: SimInstant,
    next_timer_tick: SimInstant,
    keys: KeySample,
    frame: Option<LedFrame>,
    boots: u32,
}

impl Session {
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        options
            .config
            .validate()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

        let transcript = TranscriptLogger::new(&options.transcript)?;
        let watchdog = Arc::new(EntryWatchdog::with_threshold(options.config.timeout_ticks));
        let storage = FileStorage::open(&options.eeprom)?;
        let machine = LockMachine::boot(
            options.config,
            SlotStore::new(storage),
            Arc::clone(&watchdog),
            KeySample::RELEASED,
        );

        Ok(Self {
            next_timer_tick: SimInstant::default() + options.config.watchdog_period,
            options,
            watchdog,
            machine,
            transcript,
            now: SimInstant::default(),
            keys: KeySample::RELEASED,
            frame: None,
            boots: 1,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<Output>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        self.transcript
            .append_line(self.now.since_start(), TranscriptRole::Host, trimmed)?;

        let mut words = trimmed.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let outputs = match command.as_str() {
            "help" => Ok(help_lines(args.first().copied())),
            "tap" => self.handle_tap(&args),
            "press" => self.handle_press(&args),
            "release" => {
                self.keys = KeySample::RELEASED;
                let poll = self.machine.config().poll_interval;
                self.run_for(poll)
            }
            "wait" => self.handle_wait(&args),
            "status" => Ok(self.status_lines()),
            "power-cycle" => self.handle_power_cycle(&args),
            other => Ok(vec![Output::Text(format!("ERR unknown command `{other}`"))]),
        }?;

        self.record_output(&outputs)?;
        Ok(outputs)
    }

    /// Advances simulated time, polling the machine and firing the timer interrupt.
    pub fn run_for(&mut self, duration: Duration) -> io::Result<Vec<Output>> {
        let config = *self.machine.config();
        let end = self.now + duration;
        let mut outputs = Vec::new();

        while self.now < end {
            while self.next_timer_tick <= self.now {
                self.watchdog.on_timer_tick();
                self.next_timer_tick = self.next_timer_tick + config.watchdog_period;
            }

            let report = self.machine.tick(self.now, self.keys);
            let at = self.now.since_start();
            for event in report.events {
                outputs.push(Output::Event { at, event });
            }
            if self.frame != Some(report.frame) {
                self.frame = Some(report.frame);
                outputs.push(Output::Frame {
                    at,
                    frame: report.frame,
                });
            }

            self.machine.store_mut().storage_mut().take_error()?;
            self.now = self.now + config.poll_interval;
        }

        Ok(outputs)
    }

    fn handle_tap(&mut self, args: &[&str]) -> io::Result<Vec<Output>> {
        let keys = match parse_key_list(args) {
            Ok(keys) if !keys.is_empty() => keys,
            Ok(_) => return Ok(vec![Output::Text("ERR syntax tap needs keys".into())]),
            Err(err) => return Ok(vec![Output::Text(format!("ERR syntax {err}"))]),
        };

        let config = *self.machine.config();
        let hold = config.poll_interval * (u32::from(config.debounce_depth) + TAP_MARGIN_TICKS);
        let mut outputs = Vec::new();
        for key in keys {
            self.keys = KeySample::holding(key);
            outputs.extend(self.run_for(hold)?);
            self.keys = KeySample::RELEASED;
            outputs.extend(self.run_for(hold)?);
        }
        Ok(outputs)
    }

    fn handle_press(&mut self, args: &[&str]) -> io::Result<Vec<Output>> {
        match args {
            [key] => match parse_key(key) {
                Ok(key) => {
                    self.keys = KeySample::holding(key);
                    let poll = self.machine.config().poll_interval;
                    self.run_for(poll)
                }
                Err(err) => Ok(vec![Output::Text(format!("ERR syntax {err}"))]),
            },
            _ => Ok(vec![Output::Text("ERR syntax press <1|2>".into())]),
        }
    }

    fn handle_wait(&mut self, args: &[&str]) -> io::Result<Vec<Output>> {
        match args.first().map(|value| value.parse::<u64>()) {
            Some(Ok(millis)) => self.run_for(Duration::from_millis(millis)),
            _ => Ok(vec![Output::Text("ERR syntax wait <ms>".into())]),
        }
    }

    fn handle_power_cycle(&mut self, args: &[&str]) -> io::Result<Vec<Output>> {
        let held = match args {
            [] => KeySample::RELEASED,
            ["hold", key] => match parse_key(key) {
                Ok(key) => KeySample::holding(key),
                Err(err) => return Ok(vec![Output::Text(format!("ERR syntax {err}"))]),
            },
            _ => {
                return Ok(vec![Output::Text(
                    "ERR syntax power-cycle [hold <1|2>]".into(),
                )]);
            }
        };

        let storage = FileStorage::open(&self.options.eeprom)?;
        self.machine = LockMachine::boot(
            self.options.config,
            SlotStore::new(storage),
            Arc::clone(&self.watchdog),
            held,
        );
        self.keys = held;
        self.frame = None;
        self.boots += 1;

        let mut outputs = vec![Output::Text(format!("power cycled (boot #{})", self.boots))];
        outputs.extend(self.run_for(self.options.config.poll_interval)?);
        Ok(outputs)
    }

    fn status_lines(&mut self) -> Vec<Output> {
        let stored = self.machine.store_mut().load();
        let phase = match self.machine.phase() {
            Phase::RecoveryHold => "recovery-hold",
            Phase::Entry => "entry",
            Phase::ErrorFeedback => "error-feedback",
            Phase::TimeoutFeedback => "timeout-feedback",
        };
        let frame = self.frame.unwrap_or(LedFrame::OFF);

        vec![
            Output::Text(format!(
                "mode={} phase={phase} entries={} code={}",
                self.machine.mode(),
                self.machine.entries(),
                self.machine.pending_code()
            )),
            Output::Text(format!(
                "stored=0b{stored:08b} slot={CODE_SLOT_ADDRESS} leds={frame} time=+{}ms",
                self.now.since_start().as_millis()
            )),
            Output::Text(format!(
                "watchdog armed={} ticks={}/{}",
                self.watchdog.is_armed(),
                self.watchdog.elapsed_ticks(),
                self.watchdog.threshold()
            )),
        ]
    }

    fn record_output(&mut self, outputs: &[Output]) -> io::Result<()> {
        for output in outputs {
            self.transcript.append_line(
                self.now.since_start(),
                TranscriptRole::Emulator,
                &output.to_string(),
            )?;
        }
        Ok(())
    }
}

fn parse_key(token: &str) -> Result<KeyId, String> {
    match token {
        "1" => Ok(KeyId::One),
        "2" => Ok(KeyId::Two),
        other => Err(format!("unknown key `{other}`")),
    }
}

/// Accepts `1 2 1` as well as `121`.
fn parse_key_list(args: &[&str]) -> Result<Vec<KeyId>, String> {
    args.iter()
        .flat_map(|arg| arg.chars())
        .map(|digit| match digit {
            '1' => Ok(KeyId::One),
            '2' => Ok(KeyId::Two),
            other => Err(format!("unknown key `{other}`")),
        })
        .collect()
}

fn help_lines(topic: Option<&str>) -> Vec<Output> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push(Output::Text((*detail).to_string()));
            } else {
                let topics: Vec<&str> = HELP_TOPICS.iter().map(|(name, _)| *name).collect();
                lines.push(Output::Text(format!("No help available for `{target}`.")));
                lines.push(Output::Text(format!(
                    "Available topics: {}",
                    topics.join(", ")
                )));
            }
        }
        None => {
            lines.push(Output::Text("Available commands:".to_string()));
            for (_, detail) in HELP_TOPICS {
                lines.push(Output::Text(format!("  {detail}")));
            }
        }
    }
    lines
}

/// EEPROM image kept in memory and written through to a file.
///
/// [`ByteStorage`] has no error channel, so write failures are parked and
/// surfaced by [`FileStorage::take_error`] after each polling tick.
#[derive(Debug)]
pub struct FileStorage {
    file: File,
    image: [u8; EEPROM_IMAGE_LEN],
    error: Option<io::Error>,
}

impl FileStorage {
    /// Opens or creates the image; a new or short image is zero-filled.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut image = [0u8; EEPROM_IMAGE_LEN];
        let mut contents = Vec::with_capacity(EEPROM_IMAGE_LEN);
        file.read_to_end(&mut contents)?;
        let existing = contents.len().min(EEPROM_IMAGE_LEN);
        image[..existing].copy_from_slice(&contents[..existing]);

        if contents.len() < EEPROM_IMAGE_LEN {
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&image)?;
            file.sync_data()?;
        }

        Ok(Self {
            file,
            image,
            error: None,
        })
    }

    pub fn image(&self) -> &[u8; EEPROM_IMAGE_LEN] {
        &self.image
    }

    /// Returns the first write failure since the previous call.
    pub fn take_error(&mut self) -> io::Result<()> {
        self.error.take().map_or(Ok(()), Err)
    }

    fn write_through(&mut self, address: u16, value: u8) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(u64::from(address)))?;
        self.file.write_all(&[value])?;
        self.file.sync_data()
    }
}

impl ByteStorage for FileStorage {
    fn read_byte(&mut self, address: u16) -> u8 {
        self.image
            .get(usize::from(address))
            .copied()
            .unwrap_or(u8::MAX)
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        let Some(slot) = self.image.get_mut(usize::from(address)) else {
            return;
        };
        *slot = value;

        if let Err(err) = self.write_through(address, value) {
            self.error.get_or_insert(err);
        }
    }
}

struct TranscriptLogger {
    writer: BufWriter<File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Binary safe emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since power-on"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
