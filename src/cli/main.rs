//-
// Copyright (c) 2024, The Mailcore Developers
//
// This file is part of Mailcore.
//
// Mailcore is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailcore is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mailcore. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Run the IMAP server in the foreground.
    ///
    /// Listens on the addresses given in the `[imap]` section of
    /// `mailcore.toml` and serves each connection on its own thread until
    /// the process is killed.
    Serve(ServerCommonOptions),
    /// Manage user credentials.
    User(UserSubcommand),
}

#[derive(StructOpt, Default)]
pub(super) struct ServerCommonOptions {
    /// The directory containing `mailcore.toml` etc
    /// [default: /etc/mailcore or /usr/local/etc/mailcore]
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,
}

#[derive(StructOpt)]
enum UserSubcommand {
    /// Read a password from the terminal and print the hash to put in the
    /// users file.
    HashPassword,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    match cmd {
        Command::Serve(common) => serve(common),
        Command::User(UserSubcommand::HashPassword) => {
            super::user::hash_password()
        }
    }
}

fn serve(common: ServerCommonOptions) {
    let root = common.root.unwrap_or_else(|| {
        if Path::new("/etc/mailcore/mailcore.toml").is_file() {
            "/etc/mailcore".to_owned().into()
        } else if Path::new("/usr/local/etc/mailcore/mailcore.toml").is_file()
        {
            "/usr/local/etc/mailcore".to_owned().into()
        } else {
            die!(
                EX_CONFIG,
                "Neither /etc/mailcore nor /usr/local/etc/mailcore looks like\n\
                 the Mailcore root; use --root=/path/to/mailcore if your\n\
                 installation is elsewhere."
            )
        }
    });

    let system_config = load_system_config(&root);
    init_logging(&root);
    super::serve::serve(system_config, root);
}

fn load_system_config(root: &Path) -> SystemConfig {
    let path = root.join("mailcore.toml");
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => die!(EX_CONFIG, "Error reading '{}': {}", path.display(), e),
    };

    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => die!(
            EX_CONFIG,
            "Error in config file at '{}': {}",
            path.display(),
            e
        ),
    }
}

fn init_logging(root: &Path) {
    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log();
        return;
    }

    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::file::Deserializers::new(),
        ) {
            die!(
                EX_CONFIG,
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
        }
    } else {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_MAIL,
            hostname: None,
            process: env!("CARGO_PKG_NAME").to_owned(),
            pid: nix::unistd::getpid().as_raw(),
        };

        let logger = match syslog::unix(formatter) {
            Ok(logger) => logger,
            Err(e) => die!(EX_OSERR, "Failed to connect to syslog: {}", e),
        };

        if let Err(e) =
            log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
                .map(|_| log::set_max_level(log::LevelFilter::Info))
        {
            die!(EX_SOFTWARE, "Failed to initialise logging: {}", e);
        }
    }
}
