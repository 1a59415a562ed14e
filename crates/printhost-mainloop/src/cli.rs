// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Argument parsing for the printer-application command line.
//
// The grammar is "PROGRAM SUB-COMMAND [OPTIONS] [FILES]" where options and
// files may appear on either side of the sub-command and short options may
// be grouped ("-ad NAME").

use std::fmt;
use std::path::Path;

use printhost_core::error::{PrinthostError, Result};

/// Most files a single invocation may name.
pub const MAX_FILES: usize = 1000;

/// Most distinct options a single invocation may carry.
pub const MAX_OPTIONS: usize = 1000;

// ---------------------------------------------------------------------------
// Sub-commands
// ---------------------------------------------------------------------------

/// Standard sub-commands plus an optional application-defined one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subcommand {
    Add,
    AutoAdd,
    Cancel,
    Default,
    Delete,
    Devices,
    Drivers,
    Jobs,
    Modify,
    Options,
    Printers,
    Server,
    Shutdown,
    Status,
    Submit,
    Extension(String),
}

impl Subcommand {
    /// Names of the standard sub-commands, in help-text order.
    pub const STANDARD: [&'static str; 15] = [
        "add", "auto-add", "cancel", "default", "delete", "devices", "drivers", "jobs", "modify",
        "options", "printers", "server", "shutdown", "status", "submit",
    ];

    /// Match `name` against the standard sub-commands and `extension`.
    pub fn from_name(name: &str, extension: Option<&str>) -> Option<Self> {
        let sub = match name {
            "add" => Self::Add,
            "auto-add" => Self::AutoAdd,
            "cancel" => Self::Cancel,
            "default" => Self::Default,
            "delete" => Self::Delete,
            "devices" => Self::Devices,
            "drivers" => Self::Drivers,
            "jobs" => Self::Jobs,
            "modify" => Self::Modify,
            "options" => Self::Options,
            "printers" => Self::Printers,
            "server" => Self::Server,
            "shutdown" => Self::Shutdown,
            "status" => Self::Status,
            "submit" => Self::Submit,
            other if extension == Some(other) => Self::Extension(other.to_owned()),
            _ => return None,
        };
        Some(sub)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Add => "add",
            Self::AutoAdd => "auto-add",
            Self::Cancel => "cancel",
            Self::Default => "default",
            Self::Delete => "delete",
            Self::Devices => "devices",
            Self::Drivers => "drivers",
            Self::Jobs => "jobs",
            Self::Modify => "modify",
            Self::Options => "options",
            Self::Printers => "printers",
            Self::Server => "server",
            Self::Shutdown => "shutdown",
            Self::Status => "status",
            Self::Submit => "submit",
            Self::Extension(name) => name,
        }
    }

    /// Only `submit` and the extension sub-command take file arguments.
    pub fn accepts_files(&self) -> bool {
        matches!(self, Self::Submit | Self::Extension(_))
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Ordered NAME=VALUE pairs. Setting an existing name replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pairs: Vec<(String, String)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Parse a space-separated "NAME=VALUE" list into `options`.
///
/// Values may be quoted with `'` or `"`, and a backslash escapes the next
/// character. A bare `NAME` means `NAME=true`; `noNAME` means `NAME=false`.
pub fn parse_option_string(input: &str, options: &mut Options) {
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut name = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            name.push(c);
        }

        if chars.next_if_eq(&'=').is_none() {
            match name.strip_prefix("no") {
                Some(rest) if !rest.is_empty() => options.set(rest, "false"),
                _ => options.set(name, "true"),
            }
            continue;
        }

        let mut value = String::new();
        let mut quote: Option<char> = None;
        while let Some(c) = chars.next() {
            match (c, quote) {
                ('\\', _) => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                (q, Some(open)) if q == open => quote = None,
                ('\'' | '"', None) => quote = Some(c),
                (c, None) if c.is_whitespace() => break,
                (c, _) => value.push(c),
            }
        }

        if !name.is_empty() {
            options.set(name, value);
        }
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// A parsed invocation ready for dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// `None` when no sub-command was named; dispatch treats it as `submit`.
    pub subcommand: Option<Subcommand>,
    pub options: Options,
    pub files: Vec<String>,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Run(Invocation),
}

/// Parse the arguments following the program name.
pub fn parse_args<S: AsRef<str>>(args: &[S], extension: Option<&str>) -> Result<Command> {
    let mut inv = Invocation::default();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_ref();

        if arg == "--help" {
            return Ok(Command::Help);
        } else if arg == "--version" {
            return Ok(Command::Version);
        } else if arg == "--" {
            i += 1;
            let file = args
                .get(i)
                .ok_or_else(|| usage("Missing filename after '--'."))?;
            push_file(&mut inv, file.as_ref())?;
        } else if arg.starts_with("--") {
            return Err(usage(format!("Unknown option '{arg}'.")));
        } else if let Some(sub) = Subcommand::from_name(arg, extension) {
            if inv.subcommand.is_some() {
                return Err(usage("Cannot specify more than one sub-command."));
            }
            inv.subcommand = Some(sub);
        } else if arg.len() > 1 && arg.starts_with('-') {
            for flag in arg.chars().skip(1) {
                if flag == 'a' {
                    inv.options.set("cancel-all", "true");
                } else {
                    let (name, what) = short_option(flag)
                        .ok_or_else(|| usage(format!("Unknown option '-{flag}'.")))?;
                    i += 1;
                    let value = args
                        .get(i)
                        .ok_or_else(|| usage(format!("Missing {what} after '-{flag}'.")))?
                        .as_ref();
                    match name {
                        Some(name) => inv.options.set(name, value),
                        None => parse_option_string(value, &mut inv.options),
                    }
                }
            }
            if inv.options.len() > MAX_OPTIONS {
                return Err(PrinthostError::Capacity("options"));
            }
        } else if arg != "-" && inv.subcommand.is_none() && !Path::new(arg).exists() {
            return Err(PrinthostError::UnknownSubcommand(arg.to_owned()));
        } else {
            push_file(&mut inv, arg)?;
        }

        i += 1;
    }

    Ok(Command::Run(inv))
}

/// Option name for a short flag (`None` for `-o`, which carries a list)
/// and the noun used when its argument is missing.
fn short_option(flag: char) -> Option<(Option<&'static str>, &'static str)> {
    let entry = match flag {
        'd' => (Some("printer-name"), "printer name"),
        'h' => (Some("server-hostname"), "hostname"),
        'j' => (Some("job-id"), "job ID"),
        'm' => (Some("smi2699-device-command"), "driver name"),
        'n' => (Some("num-copies"), "copy count"),
        'o' => (None, "option(s)"),
        't' => (Some("job-name"), "title"),
        'u' => (Some("printer-uri"), "printer URI"),
        'v' => (Some("smi2699-device-uri"), "device URI"),
        _ => return None,
    };
    Some(entry)
}

fn push_file(inv: &mut Invocation, file: &str) -> Result<()> {
    if inv.files.len() >= MAX_FILES {
        return Err(PrinthostError::Capacity("files"));
    }
    inv.files.push(file.to_owned());
    Ok(())
}

fn usage(message: impl Into<String>) -> PrinthostError {
    PrinthostError::Usage(message.into())
}

/// The `--help` text.
pub fn usage_text(base: &str, extension: Option<(&str, &str)>) -> String {
    let mut text = format!("Usage: {base} SUB-COMMAND [OPTIONS] [FILENAME]\n");
    text.push_str(&format!("       {base} [OPTIONS] [FILENAME]\n"));
    text.push_str(&format!("       {base} [OPTIONS] -\n\n"));
    text.push_str("Sub-commands:\n");
    let entries = [
        ("add PRINTER", "Add a printer."),
        ("auto-add", "Automatically add connected printers."),
        ("cancel", "Cancel one or more jobs."),
        ("default", "Set the default printer."),
        ("delete", "Delete a printer."),
        ("devices", "List devices."),
        ("drivers", "List drivers."),
        ("jobs", "List jobs."),
        ("modify", "Modify a printer."),
        ("options", "List printer options."),
        ("printers", "List printers."),
        ("server", "Run a server."),
        ("shutdown", "Shutdown a running server."),
        ("status", "Show server/printer/job status."),
        ("submit", "Submit a file for printing."),
    ];
    for (name, description) in entries {
        text.push_str(&format!("  {name:<16}{description}\n"));
    }
    if let Some((name, description)) = extension {
        text.push_str(&format!("  {name:<16}{description}\n"));
    }
    text.push_str("\nOptions:\n");
    let options = [
        ("--help", "Show this help."),
        ("--version", "Show the program version."),
        ("-a", "Cancel all jobs (cancel)."),
        ("-d PRINTER", "Specify printer."),
        ("-h HOST", "Specify hostname."),
        ("-j JOB-ID", "Specify job ID (cancel)."),
        ("-m DRIVER-NAME", "Specify driver (add/modify)."),
        ("-n COPIES", "Specify number of copies (submit)."),
        ("-o NAME=VALUE", "Specify option (add,modify,server,submit)."),
        ("-t TITLE", "Specify job title (submit)."),
        ("-u URI", "Specify ipp: or ipps: printer/server."),
        ("-v DEVICE-URI", "Specify socket: or usb: device (add/modify)."),
    ];
    for (flag, description) in options {
        text.push_str(&format!("  {flag:<16}{description}\n"));
    }
    text
}
