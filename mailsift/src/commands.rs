use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("mailsift")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("mailsift")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("serve")
                .about("Run the HTTP API for batch contact harvesting")
                .arg(config_arg())
                .arg(
                    arg!(--"host" <HOST>)
                        .required(false)
                        .help("Address to bind (default: 0.0.0.0)"),
                )
                .arg(
                    arg!(-p --"port" <PORT>)
                        .required(false)
                        .help("Port to listen on (default: 5000)")
                        .value_parser(clap::value_parser!(u16)),
                )
                .arg(workers_arg())
                .arg(deadline_arg()),
        )
        .subcommand(
            command!("find")
                .about("Harvest contact addresses for one or more domains from the command line")
                .arg(
                    arg!(-d --"domain" <DOMAIN>)
                        .required(false)
                        .help("A domain to harvest; may be given more than once")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of domains")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv")
                        .value_parser(["text", "json", "csv"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: print to stdout)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(config_arg())
                .arg(workers_arg())
                .arg(deadline_arg()),
        )
}

fn config_arg() -> clap::Arg {
    arg!(-c --"config" <PATH>)
        .required(false)
        .help("Path to a TOML settings file (default: ./mailsift.toml if present)")
}

fn workers_arg() -> clap::Arg {
    arg!(-t --"workers" <NUM_WORKERS>)
        .required(false)
        .help("Number of domains crawled concurrently within a batch")
        .value_parser(clap::value_parser!(usize))
}

fn deadline_arg() -> clap::Arg {
    arg!(--"deadline" <SECONDS>)
        .required(false)
        .help("Batch deadline in seconds; later domains are reported as timeouts")
        .value_parser(clap::value_parser!(u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_find_collects_repeated_domains() {
        let matches = command_argument_builder()
            .try_get_matches_from(["mailsift", "find", "-d", "a.com", "-d", "b.com", "-f", "csv"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "find");

        let domains: Vec<&String> = sub.get_many::<String>("domain").unwrap().collect();
        assert_eq!(domains, ["a.com", "b.com"]);
        assert_eq!(sub.get_one::<String>("format").unwrap(), "csv");
    }

    #[test]
    fn test_serve_port_must_be_numeric() {
        let result = command_argument_builder().try_get_matches_from([
            "mailsift", "serve", "--port", "http",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_find_rejects_unknown_format() {
        let result = command_argument_builder().try_get_matches_from([
            "mailsift", "find", "-d", "a.com", "-f", "xml",
        ]);
        assert!(result.is_err());
    }
}
