mod session;

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process;

use robot_core::encoder::Side;
use session::{Session, TranscriptProfile};

const USAGE: &str =
    "Usage: robot-emulator [--profile <drive|schedule|battery>] [--script <file>]";

/// Command-line choices for one emulator run.
#[derive(Debug, Default, PartialEq)]
struct Options {
    profile: Option<TranscriptProfile>,
    /// Console lines read from a file instead of stdin; echoed as they run.
    script: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let profile = options.profile.unwrap_or(TranscriptProfile::Drive);
    let mut session = Session::new(profile)?;
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    writeln!(
        writer,
        "Robot emulator ({}) logging to {}.",
        profile.header(),
        profile.log_path()
    )?;

    match options.script {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            drive(&mut session, reader, &mut writer, true)?;
        }
        None => {
            writeln!(
                writer,
                "Type `help` for commands, `wait <duration>` to let time pass, or `exit` to quit."
            )?;
            drive(&mut session, io::stdin().lock(), &mut writer, false)?;
        }
    }

    writeln!(
        writer,
        "Stopped at {:.3}s; wheels L={:.4}m R={:.4}m.",
        session.elapsed().as_secs_f32(),
        session.position(Side::Left),
        session.position(Side::Right),
    )
}

/// Feeds console lines to the session until end of input or `exit`.
fn drive<R, W>(session: &mut Session, reader: R, writer: &mut W, echo: bool) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut lines = reader.lines();
    loop {
        // The prompt carries simulated time so waits are visible.
        write!(writer, "[{:>8.3}s] > ", session.elapsed().as_secs_f32())?;
        writer.flush()?;

        let Some(line) = lines.next().transpose()? else {
            writeln!(writer)?;
            return Ok(());
        };
        let input = line.trim();
        if echo {
            writeln!(writer, "{input}")?;
        }
        if input.is_empty() || input.starts_with('#') {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            return Ok(());
        }

        for response in session.handle_command(input)? {
            writeln!(writer, "{response}")?;
        }
    }
}

fn parse_options<I>(args: I) -> Result<Options, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--profile" => options.profile = Some(TranscriptProfile::from_tag(&value()?)?),
            "--script" => options.script = Some(PathBuf::from(value()?)),
            tag if options.profile.is_none() && !tag.starts_with('-') => {
                options.profile = Some(TranscriptProfile::from_tag(tag)?);
            }
            other => return Err(format!("Unexpected argument `{other}`")),
        }
    }
    Ok(options)
}
