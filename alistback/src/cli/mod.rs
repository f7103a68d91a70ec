//! Command line interface: `alistback backup` and `alistback restore`

use std::{path::PathBuf, time::Duration};

use alist::prelude::*;
use anyhow::{Error, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::{
    backup::{BackupReport, backup},
    reset::DEFAULT_ALIST_BIN,
    restore::{AdminReset, RestoreOptions, RestoreReport, restore_with},
    snapshot::DEFAULT_SNAPSHOT_FILE,
};

/// Server used by restore when no host is given
pub const DEFAULT_HOST: &str = ALIST_LOCAL_URL;
/// Admin username used by restore when none is given
pub const DEFAULT_USERNAME: &str = "admin";
/// Admin password used by restore when none is given
pub const DEFAULT_PASSWORD: &str = "admin";

#[derive(Parser, Debug)]
#[command(name = "alistback")]
#[command(author, version, about = "AList configuration backup and restore tool", long_about = None)]
pub struct Cli {
    /// Print machine-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose mode (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Color mode for log output
    #[arg(long, value_enum, default_value_t = ColorArg::Auto, global = true)]
    pub color: ColorArg,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save storages, settings, users, and metas of a server to a snapshot file
    Backup(BackupArgs),

    /// Recreate storages and users from a snapshot file
    Restore(RestoreArgs),
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Server url, e.g. <http://127.0.0.1:5244>
    #[arg(long, env = "ALIST_URL")]
    pub host: String,

    /// Admin username
    #[arg(long, env = "ALIST_USERNAME")]
    pub username: String,

    /// Admin password
    #[arg(long, env = "ALIST_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Snapshot file to write
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT_FILE)]
    pub output_file: PathBuf,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Server url. Default: <http://127.0.0.1:5244>
    #[arg(long)]
    pub host: Option<String>,

    /// Admin username. Default: admin
    #[arg(long)]
    pub username: Option<String>,

    /// Admin password. Default: admin
    #[arg(long)]
    pub password: Option<String>,

    /// Snapshot file to read
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT_FILE)]
    pub input_file: PathBuf,

    /// Set the admin password with the local server binary before logging in
    #[arg(long)]
    pub reset_password: bool,

    /// Server binary used by --reset-password
    #[arg(long, default_value = DEFAULT_ALIST_BIN)]
    pub alist_bin: PathBuf,

    /// Print one line per restored or failed record
    #[arg(long)]
    pub per_record: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{text}");
    Ok(())
}

/// Process exit code for an error: 2 for authentication failures, otherwise 1.
pub fn exit_code(err: &Error) -> i32 {
    if err
        .downcast_ref::<AlistError>()
        .is_some_and(AlistError::is_auth)
    {
        return 2;
    }
    1
}

pub async fn run(cli: Cli) -> Result<()> {
    let timeout = cli.timeout.map(Duration::from_secs);
    match cli.command {
        Commands::Backup(args) => handle_backup(cli.json, timeout, args).await,
        Commands::Restore(args) => handle_restore(cli.json, timeout, args).await,
    }
}

fn build_client(
    host: &str,
    username: &str,
    password: &str,
    timeout: Option<Duration>,
) -> Result<AlistClient> {
    let mut config = ClientConfig::default().base_url(host);
    if let Some(timeout) = timeout {
        config = config.timeout(timeout);
    }
    Ok(AlistClient::with_config(
        config,
        Credentials::new(username, password),
    )?)
}

async fn handle_backup(json: bool, timeout: Option<Duration>, args: BackupArgs) -> Result<()> {
    let client = build_client(&args.host, &args.username, &args.password, timeout)?;
    let result = backup(&client, &args.output_file).await;
    client.close();
    let report = result?;

    if json {
        emit_json(&report)?;
    } else {
        print_backup_report(&report);
    }
    Ok(())
}

fn print_backup_report(report: &BackupReport) {
    println!(
        "backup saved to {} (alist {})",
        report.output_file.display(),
        report.alist_version
    );
    if !report.failed.is_empty() {
        let failed: Vec<String> = report.failed.iter().map(ToString::to_string).collect();
        eprintln!("not fetched, saved as null: {}", failed.join(", "));
    }
}

async fn handle_restore(json: bool, timeout: Option<Duration>, args: RestoreArgs) -> Result<()> {
    let host = args.host.as_deref().unwrap_or(DEFAULT_HOST);
    let username = args.username.as_deref().unwrap_or(DEFAULT_USERNAME);
    let password = args.password.as_deref().unwrap_or(DEFAULT_PASSWORD);

    let options = RestoreOptions {
        input_file: args.input_file.clone(),
        reset: args.reset_password.then(|| AdminReset {
            alist_bin: args.alist_bin.clone(),
            password: password.to_string(),
        }),
        admin_username: username.to_string(),
    };

    let client = build_client(host, username, password, timeout)?;
    // the replay summary is printed before the admin update runs
    let mut printed_warnings = 0;
    let result = restore_with(&client, &options, |report| {
        if !json {
            print_replay_report(report, args.per_record);
            printed_warnings = report.warnings.len();
        }
    })
    .await;
    client.close();
    let report = result?;

    if json {
        emit_json(&report)?;
    } else {
        print_admin_report(&report, printed_warnings);
    }
    Ok(())
}

fn print_replay_report(report: &RestoreReport, per_record: bool) {
    if per_record {
        for record in &report.records {
            match (&record.message, record.restored) {
                (None, true) => println!("{} {} restored", record.kind, record.id),
                (Some(message), true) => {
                    println!("{} {} restored ({message})", record.kind, record.id);
                }
                (message, false) => println!(
                    "{} {} failed: {}",
                    record.kind,
                    record.id,
                    message.as_deref().unwrap_or_default()
                ),
            }
        }
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    for line in report.replay_summary() {
        println!("{line}");
    }
}

/// Prints warnings raised after the replay, then the admin update status.
fn print_admin_report(report: &RestoreReport, skip_warnings: usize) {
    for warning in report.warnings.iter().skip(skip_warnings) {
        eprintln!("warning: {warning}");
    }
    println!("{}", report.admin_summary());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backup_flags() {
        let cli = Cli::try_parse_from([
            "alistback",
            "backup",
            "--host",
            "http://nas:5244",
            "--username",
            "admin",
            "--password",
            "secret",
            "--output-file",
            "out.json",
        ])
        .unwrap();
        let Commands::Backup(args) = cli.command else {
            panic!("expected backup");
        };
        assert_eq!(args.host, "http://nas:5244");
        assert_eq!(args.output_file, PathBuf::from("out.json"));
    }

    #[test]
    fn parse_restore_defaults() {
        let cli = Cli::try_parse_from(["alistback", "restore"]).unwrap();
        let Commands::Restore(args) = cli.command else {
            panic!("expected restore");
        };
        assert!(args.host.is_none());
        assert_eq!(args.input_file, PathBuf::from("alist_backup.json"));
        assert_eq!(args.alist_bin, PathBuf::from("./alist"));
        assert!(!args.reset_password);
        assert!(!args.per_record);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["alistback", "restore", "--json", "-vv", "--color", "never"])
                .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorArg::Never);
    }

    #[test]
    fn parse_global_color_invalid_value() {
        let err = Cli::try_parse_from(["alistback", "--color", "badvalue", "restore"]).unwrap_err();
        assert!(err.to_string().contains("invalid value"));
    }

    #[test]
    fn auth_errors_exit_with_2() {
        let auth = Error::new(AlistError::Auth {
            message: "password is incorrect".into(),
        });
        assert_eq!(exit_code(&auth), 2);
        assert_eq!(exit_code(&Error::new(AlistError::Unauthorized)), 2);
        assert_eq!(
            exit_code(&Error::new(AlistError::Auth { message: "x".into() }).context("restore")),
            2
        );
        assert_eq!(exit_code(&anyhow::anyhow!("bad snapshot")), 1);
    }
}
