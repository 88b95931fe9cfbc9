use std::str::FromStr;
use std::time::Duration;

use tracing::{error, info};

use crate::dice::{self, PRESET_DICE};
use crate::sampler::SamplerHandle;

/// One line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Roll(u32),
    Seed,
    Threshold(u64),
    Delay(u64),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),
    #[error("`{0}` needs a value")]
    MissingArgument(&'static str),
    #[error("invalid {what} value {value:?}")]
    InvalidNumber { what: &'static str, value: String },
}

fn number<T: FromStr>(what: &'static str, arg: Option<&str>) -> Result<T, CommandError> {
    let value = arg.ok_or(CommandError::MissingArgument(what))?;
    value.parse().map_err(|_| CommandError::InvalidNumber {
        what,
        value: value.to_string(),
    })
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };
        let head = head.to_ascii_lowercase();
        let arg = words.next();

        match head.as_str() {
            "roll" => number("sides", arg).map(Command::Roll),
            "seed" => Ok(Command::Seed),
            "threshold" => number("threshold", arg).map(Command::Threshold),
            "delay" => number("delay", arg).map(Command::Delay),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            d if d.starts_with('d') && d.len() > 1 => {
                number("sides", Some(&d[1..])).map(Command::Roll)
            }
            _ => Err(CommandError::Unknown(line.trim().to_string())),
        }
    }
}

pub fn help_text() -> String {
    let presets: Vec<String> = PRESET_DICE.iter().map(|s| format!("d{s}")).collect();
    format!(
        "commands:\n  \
         roll <sides> | d<sides>   roll a die ({})\n  \
         seed                      show the current seed\n  \
         threshold <n>             set the frame difference threshold\n  \
         delay <ms>                set the minimum capture interval\n  \
         status                    show seed and sampler settings\n  \
         quit                      exit",
        presets.join(", ")
    )
}

fn describe_seed(handle: &SamplerHandle) -> String {
    let record = handle.seed();
    match record.fetched_at {
        Some(at) => format!("current seed: {} (fetched {})", record.seed, at.to_rfc3339()),
        None => format!("current seed: {} (not fetched yet)", record.seed),
    }
}

/// Apply a command and return the text to show the user.
pub fn execute(command: Command, handle: &SamplerHandle) -> String {
    match command {
        Command::Roll(sides) => {
            let seed = handle.seed().seed;
            match dice::roll(seed, sides) {
                Ok(roll) => {
                    info!(seed, sides, value = roll.value, "rolled");
                    format!("you rolled {roll}")
                }
                Err(e) => {
                    error!(error = %e, sides, "roll failed");
                    format!("cannot roll: {e}")
                }
            }
        }
        Command::Seed => describe_seed(handle),
        Command::Threshold(threshold) => {
            info!(threshold, "new threshold");
            handle.set_threshold(threshold);
            format!("threshold set to {threshold}")
        }
        Command::Delay(ms) => {
            info!(delay_ms = ms, "new delay");
            handle.set_min_interval(Duration::from_millis(ms));
            format!("delay set to {ms} ms")
        }
        Command::Status => {
            let settings = handle.settings();
            format!(
                "{}\nthreshold: {}\ndelay: {} ms",
                describe_seed(handle),
                settings.threshold,
                settings.min_interval.as_millis()
            )
        }
        Command::Help => help_text(),
        Command::Quit => "bye".to_string(),
    }
}
