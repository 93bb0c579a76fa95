use clap::{Arg, ArgAction, ArgMatches, Command};

/// Parsed subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    ReconcileAdmin {
        legacy_email: String,
        email: String,
        password: String,
        name: String,
    },
    ResetPassword {
        email: String,
        password: String,
    },
    SeedUsers,
    ListUsers {
        json: bool,
    },
    Migrate,
}

fn email_arg(env: &'static str) -> Arg {
    Arg::new("email")
        .long("email")
        .env(env)
        .required(true)
        .help("Email of the account to act on")
}

fn password_arg() -> Arg {
    Arg::new("password")
        .long("password")
        .env("ADMIN_PASSWORD")
        .hide_env_values(true)
        .required(true)
        .help("New plaintext password (hashed before it reaches the store)")
}

pub fn command() -> Command {
    Command::new("fundai-admin")
        .about("Maintenance tasks for the FundAI/CampaignIQ users table")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("reconcile-admin")
                .about("Ensure exactly one admin row exists under --email")
                .arg(email_arg("ADMIN_EMAIL"))
                .arg(
                    Arg::new("legacy-email")
                        .long("legacy-email")
                        .env("ADMIN_LEGACY_EMAIL")
                        .help("Previous admin email to migrate from (defaults to --email)"),
                )
                .arg(password_arg())
                .arg(
                    Arg::new("name")
                        .long("name")
                        .env("ADMIN_NAME")
                        .required(true)
                        .help("Display name for the admin"),
                ),
        )
        .subcommand(
            Command::new("reset-password")
                .about("Replace one user's password hash and verify it")
                .arg(email_arg("ADMIN_EMAIL"))
                .arg(password_arg()),
        )
        .subcommand(Command::new("seed-users").about("Create or refresh the demo user accounts"))
        .subcommand(
            Command::new("list-users")
                .about("Print every user row with totals")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Emit JSON instead of a table"),
                ),
        )
        .subcommand(
            Command::new("migrate")
                .about("Create or upgrade the users table (postgres store only)"),
        )
}

fn required(m: &ArgMatches, id: &str) -> String {
    // clap enforces `required(true)` before we get here
    m.get_one::<String>(id).cloned().unwrap_or_default()
}

pub fn parse(matches: &ArgMatches) -> Option<Cmd> {
    match matches.subcommand()? {
        ("reconcile-admin", m) => {
            let email = required(m, "email");
            Some(Cmd::ReconcileAdmin {
                legacy_email: m
                    .get_one::<String>("legacy-email")
                    .cloned()
                    .unwrap_or_else(|| email.clone()),
                email,
                password: required(m, "password"),
                name: required(m, "name"),
            })
        }
        ("reset-password", m) => Some(Cmd::ResetPassword {
            email: required(m, "email"),
            password: required(m, "password"),
        }),
        ("seed-users", _) => Some(Cmd::SeedUsers),
        ("list-users", m) => Some(Cmd::ListUsers {
            json: m.get_flag("json"),
        }),
        ("migrate", _) => Some(Cmd::Migrate),
        _ => None,
    }
}
