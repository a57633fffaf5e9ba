// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn force_arg() -> Arg {
    Arg::new("force")
        .short('f')
        .long("force")
        .action(ArgAction::SetTrue)
        .help("Reinstall even if the installed version is current")
}

fn build_cli() -> Command {
    Command::new("canary-updater")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Canary Updater Contributors")
        .about("Keep an application up to date from its .deb release channel, then launch it")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("JSON configuration file (defaults target Discord Canary)"),
        )
        .subcommand(Command::new("check").about("Compare the installed version with the latest release"))
        .subcommand(
            Command::new("update")
                .about("Install the latest release without launching")
                .arg(force_arg()),
        )
        .subcommand(
            Command::new("run")
                .about("Update if needed, then launch the application (default)")
                .arg(force_arg())
                .arg(
                    Arg::new("args")
                        .num_args(0..)
                        .trailing_var_arg(true)
                        .allow_hyphen_values(true)
                        .help("Arguments passed through to the application"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("canary-updater.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
