// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printhost Mainloop — Command-line dispatcher for printer applications:
// argument parsing, sub-command dispatch, and the local server operations.

pub mod cli;
pub mod logging;
pub mod ops;

use std::path::Path;

use printhost_core::error::PrinthostError;

pub use cli::{Command, Invocation, Options, Subcommand, parse_args, parse_option_string};
pub use ops::{LocalOps, MainloopOps, dispatch};

/// Parse `args` (program name first), run the selected operation, and
/// return the process exit status.
pub fn mainloop<S: AsRef<str>>(args: &[S], version: &str, ops: &dyn MainloopOps) -> i32 {
    let base = args
        .first()
        .and_then(|arg0| Path::new(arg0.as_ref()).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("printhost");
    let rest = args.get(1..).unwrap_or_default();
    let extension = ops.extension().map(|(name, _)| name);

    let result = match parse_args(rest, extension) {
        Ok(Command::Help) => {
            print!("{}", ops.usage(base));
            Ok(())
        }
        Ok(Command::Version) => {
            println!("{base} v{version}");
            Ok(())
        }
        Ok(Command::Run(inv)) => dispatch(ops, base, &inv),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{base}: {e}");
            if matches!(e, PrinthostError::Usage(_)) {
                eprintln!("Try '{base} --help' for more information.");
            }
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printhost_core::error::Result;

    struct Submitter;

    impl MainloopOps for Submitter {
        fn submit(&self, _base: &str, _options: &Options, _files: &[String]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn exit_status_reflects_outcome() {
        assert_eq!(mainloop(&["/usr/bin/app", "-d", "Printer1", "submit"], "1.0", &Submitter), 0);
        assert_eq!(mainloop(&["app", "bogus-command"], "1.0", &Submitter), 1);
        assert_eq!(mainloop(&["app", "status"], "1.0", &Submitter), 1);
        assert_eq!(mainloop(&["app", "--version"], "1.0", &Submitter), 0);
    }

    #[test]
    fn empty_argv_runs_submit() {
        let args: [&str; 0] = [];
        assert_eq!(mainloop(&args, "1.0", &Submitter), 0);
    }
}
