//! Command-line definition

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mdm_client::{ClientConfig, ConfigError};

fn enterprise_arg() -> Arg {
    Arg::new("enterprise")
        .long("enterprise")
        .value_name("NAME")
        .help("Enterprise resource name (defaults to the user's organization)")
}

fn path_arg() -> Arg {
    Arg::new("path")
        .required(true)
        .help("Dotted policy path, e.g. advancedSecurityOverrides.developerSettings")
}

fn policy_command() -> Command {
    Command::new("policy")
        .about("View and edit the enterprise policy")
        .subcommand_required(true)
        .arg(enterprise_arg().global(true))
        .subcommand(
            Command::new("show").about("Print the raw policy document").arg(
                Arg::new("format")
                    .long("format")
                    .value_parser(["json", "yaml"])
                    .default_value("json")
                    .help("Output format"),
            ),
        )
        .subcommand(
            Command::new("form")
                .about("Print the policy as a form")
                .arg(Arg::new("field").help("Only this field, with its help text")),
        )
        .subcommand(
            Command::new("set")
                .about("Set a field and save")
                .arg(path_arg())
                .arg(Arg::new("value").required(true).help("New value")),
        )
        .subcommand(Command::new("toggle").about("Flip a toggle and save").arg(path_arg()))
        .subcommand(
            Command::new("add")
                .about("Append to a list and save")
                .arg(path_arg())
                .arg(Arg::new("item").help("Item; a JSON object adds a filled row")),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a list element and save")
                .arg(path_arg())
                .arg(
                    Arg::new("index")
                        .required(true)
                        .value_parser(value_parser!(usize))
                        .help("Element index"),
                ),
        )
}

/// Full command tree
#[must_use]
pub fn build_cli() -> Command {
    Command::new("mdm-console")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Administration console for MDM enterprises")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .value_name("URL")
                .help("API root, e.g. http://localhost:8085/api"),
        )
        .arg(
            Arg::new("policy-id")
                .long("policy-id")
                .global(true)
                .value_name("ID")
                .help("Policy edited by the policy commands"),
        )
        .arg(
            Arg::new("session-file")
                .long("session-file")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Where the login session is stored"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in and store the session")
                .arg(Arg::new("email").long("email").required(true).help("Account email"))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .env("MDM_PASSWORD")
                        .hide_env_values(true)
                        .required(true)
                        .help("Account password"),
                ),
        )
        .subcommand(Command::new("logout").about("Clear the stored session"))
        .subcommand(Command::new("whoami").about("Show the signed-in role and tabs"))
        .subcommand(Command::new("orgs").about("List all organizations (super admin)"))
        .subcommand(Command::new("devices").about("List enterprise devices").arg(enterprise_arg()))
        .subcommand(
            Command::new("enroll")
                .about("Request an enrollment QR code")
                .arg(enterprise_arg())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .default_value("enrollment-qr.png")
                        .help("Where to write the image"),
                ),
        )
        .subcommand(
            Command::new("locate")
                .about("Show a device's last known location")
                .arg(Arg::new("serial").required(true).help("Device serial number")),
        )
        .subcommand(Command::new("employees").about("List employees"))
        .subcommand(
            Command::new("link-device")
                .about("Attach a device to an employee")
                .arg(Arg::new("employee").required(true))
                .arg(Arg::new("device").required(true)),
        )
        .subcommand(
            Command::new("unlink-device")
                .about("Detach a device from an employee")
                .arg(Arg::new("employee").required(true))
                .arg(Arg::new("device").required(true)),
        )
        .subcommand(policy_command())
}

/// Configuration from file and environment, with flags applied last
///
/// # Errors
/// Returns error if the file cannot be read or the result is invalid
pub fn resolve_config(matches: &ArgMatches) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    if let Some(url) = matches.get_one::<String>("base-url") {
        config = config.with_base_url(url);
    }
    if let Some(id) = matches.get_one::<String>("policy-id") {
        config = config.with_policy_id(id);
    }
    if let Some(file) = matches.get_one::<PathBuf>("session-file") {
        config = config.with_session_file(file);
    }
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("console.toml");
        std::fs::write(&file, "base_url = \"http://file.example.com/api\"\npolicy_id = \"kiosk\"\n").unwrap();

        let matches = build_cli()
            .try_get_matches_from([
                "mdm-console",
                "--config",
                file.to_str().unwrap(),
                "--base-url",
                "https://flag.example.com/api/",
                "whoami",
            ])
            .unwrap();
        let config = resolve_config(&matches).unwrap();
        assert_eq!(config.base_url, "https://flag.example.com/api");
        assert_eq!(config.policy_id, "kiosk");
    }

    #[test]
    fn policy_subcommands_parse() {
        let matches = build_cli()
            .try_get_matches_from(["mdm-console", "policy", "remove", "applications", "1", "--enterprise", "e/1"])
            .unwrap();
        let (_, policy) = matches.subcommand().unwrap();
        assert_eq!(policy.get_one::<String>("enterprise").map(String::as_str), Some("e/1"));
        let (name, remove) = policy.subcommand().unwrap();
        assert_eq!(name, "remove");
        assert_eq!(remove.get_one::<usize>("index"), Some(&1));
    }

    #[test]
    fn invalid_format_is_rejected() {
        assert!(build_cli()
            .try_get_matches_from(["mdm-console", "policy", "show", "--format", "xml"])
            .is_err());
    }
}
