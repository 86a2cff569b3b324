use crate::CLAP_STYLING;
use clap::{arg, command};

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Output format: text, json")
        .value_parser(["text", "json"])
        .default_value("text")
}

fn output_arg() -> clap::Arg {
    arg!(-o --"output" <PATH>)
        .required(false)
        .help("Save output to file (default: display to screen)")
        .value_parser(clap::value_parser!(std::path::PathBuf))
}

fn capture_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-l --"list" <PATH>)
            .required(true)
            .help("Captured list request (JSON capture file)")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
    )
    .arg(
        arg!(-d --"detail" <PATH>)
            .required(true)
            .help("Captured detail request (JSON capture file)")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
    )
    .arg(
        arg!(--"list-path" <PATH_EXPR>)
            .required(false)
            .help("Dotted path to the item array inside the list response ('' for the root)")
            .default_value("data.list"),
    )
    .arg(
        arg!(--"total-path" <PATH_EXPR>)
            .required(false)
            .help("Dotted path to the total item count, logged for reference"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("fieldhound")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("fieldhound")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and informational logging").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
        .subcommand_required(false)
        .subcommand(
            capture_args(command!("analyze").about(
                "Infer how list items feed the detail request, then fetch every item's detail \
                and report which ones carry the target value.",
            ))
            .arg(
                arg!(-s --"search-field" <FIELD>)
                    .required(true)
                    .help("Field to read from each detail response (name or dotted path)"),
            )
            .arg(
                arg!(-T --"target" <VALUE>)
                    .required(true)
                    .help("Value the search field must equal"),
            )
            .arg(
                arg!(--"target-json")
                    .required(false)
                    .help("Parse --target as JSON (e.g. 42, true) instead of a plain string")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                arg!(-c --"concurrency" <NUM>)
                    .required(false)
                    .help("Maximum number of detail requests in flight")
                    .value_parser(clap::value_parser!(usize))
                    .default_value("5"),
            )
            .arg(
                arg!(--"timeout" <SECONDS>)
                    .required(false)
                    .help("Request timeout in seconds")
                    .value_parser(clap::value_parser!(u64))
                    .default_value("10"),
            )
            .arg(output_arg())
            .arg(format_arg()),
        )
        .subcommand(
            capture_args(command!("mapping").about(
                "Infer the field mapping offline from the captured list response, without \
                sending any requests.",
            ))
            .arg(output_arg())
            .arg(format_arg()),
        )
        .subcommand(
            command!("locate")
                .about("Search a JSON document for a field by name or dotted path")
                .arg(
                    arg!(-F --"file" <PATH>)
                        .required(true)
                        .help("JSON document to search")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-n --"field" <FIELD>)
                        .required(true)
                        .help("Field name or dotted path"),
                )
                .arg(
                    arg!(-a --"all")
                        .required(false)
                        .help("Report every occurrence instead of the first")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(format_arg()),
        )
}
