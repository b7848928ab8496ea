use std::{
    collections::BTreeMap,
    error::Error,
    fs::File,
    io::{self, Write},
    process::ExitCode,
    sync::Arc,
};

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info, span, Level};

use ossfs::{
    adapters::s3::S3Client,
    model::oss::SignMethod,
    util::object::parse_location,
    AdapterOptions, ChecksumProvider, Expiration, FilesystemAdapter, OssAdapter,
    PublicUrlGenerator, StorageAttributes, Visibility, WriteConfig,
};

fn cli() -> Command {
    let path = || Arg::new("PATH").required(true).index(1);

    Command::new("ossfs")
        .about("Filesystem operations on an OSS bucket")
        .version(clap::crate_version!())
        .subcommand_required(true)
        .arg(
            Arg::new("LOCATION")
                .help("oss://bucket[/prefix]")
                .required(true)
                .index(1),
        )
        .arg(Arg::new("endpoint").long("endpoint").global(true))
        .arg(Arg::new("url").long("url").global(true))
        .arg(Arg::new("temporary-url").long("temporary-url").global(true))
        .subcommand(
            Command::new("ls")
                .arg(Arg::new("PATH").default_value("").index(1))
                .arg(
                    Arg::new("recursive")
                        .long("recursive")
                        .short('r')
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("cat").arg(path()))
        .subcommand(Command::new("stat").arg(path()))
        .subcommand(
            Command::new("put")
                .arg(path())
                .arg(Arg::new("FILE").required(true).index(2))
                .arg(
                    Arg::new("visibility")
                        .long("visibility")
                        .value_parser(["public", "private"]),
                ),
        )
        .subcommand(Command::new("mkdir").arg(path()))
        .subcommand(
            Command::new("rm")
                .arg(path())
                .arg(Arg::new("dir").long("dir").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("cp")
                .arg(Arg::new("SOURCE").required(true).index(1))
                .arg(Arg::new("DESTINATION").required(true).index(2)),
        )
        .subcommand(
            Command::new("mv")
                .arg(Arg::new("SOURCE").required(true).index(1))
                .arg(Arg::new("DESTINATION").required(true).index(2)),
        )
        .subcommand(Command::new("url").arg(path()))
        .subcommand(
            Command::new("sign")
                .arg(path())
                .arg(
                    Arg::new("expires")
                        .long("expires")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("3600"),
                )
                .arg(
                    Arg::new("method")
                        .long("method")
                        .value_parser(["GET", "PUT", "HEAD", "DELETE"])
                        .default_value("GET"),
                ),
        )
        .subcommand(Command::new("checksum").arg(path()))
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn describe(entry: &StorageAttributes) -> String {
    match entry {
        StorageAttributes::Directory(dir) => format!("{}/", dir.path),
        StorageAttributes::File(file) => format!(
            "{}\t{}\t{}",
            file.path,
            file.size.unwrap_or_default(),
            file.last_modified.unwrap_or_default()
        ),
    }
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let location = parse_location(arg(matches, "LOCATION"))?;
    let endpoint = matches.get_one::<String>("endpoint").map(String::as_str);

    let mut options = AdapterOptions::default();
    if let Some(endpoint) = endpoint {
        options = options.with_endpoint(endpoint);
    }
    if let Some(url) = matches.get_one::<String>("url") {
        options = options.with_url(url);
    }
    if let Some(url) = matches.get_one::<String>("temporary-url") {
        options = options.with_temporary_url(url);
    }
    info!(bucket = %location.bucket, prefix = %location.prefix, "args");

    let client = S3Client::from_env(endpoint)?;
    let adapter = OssAdapter::new(
        Arc::new(client),
        &location.bucket,
        &location.prefix,
        options,
    );

    let mut stdout = io::stdout().lock();
    match matches.subcommand() {
        Some(("ls", sub)) => {
            let recursive = sub.get_flag("recursive");
            for entry in adapter.list_contents(arg(sub, "PATH"), recursive)? {
                writeln!(stdout, "{}", describe(&entry))?;
            }
        }
        Some(("cat", sub)) => {
            let mut reader = adapter.read_stream(arg(sub, "PATH"))?;
            io::copy(&mut reader, &mut stdout)?;
        }
        Some(("stat", sub)) => {
            let entry = adapter.metadata(arg(sub, "PATH"))?;
            writeln!(stdout, "{}", describe(&entry))?;
            if let StorageAttributes::File(file) = &entry {
                for (name, value) in &file.extra_metadata {
                    writeln!(stdout, "{}: {}", name, value)?;
                }
            }
        }
        Some(("put", sub)) => {
            let mut config = WriteConfig::new();
            if let Some(visibility) = sub.get_one::<String>("visibility") {
                config = config.with_visibility(visibility.parse::<Visibility>()?);
            }
            let mut file = File::open(arg(sub, "FILE"))?;
            adapter.write_stream(arg(sub, "PATH"), &mut file, &config)?;
        }
        Some(("mkdir", sub)) => adapter.create_directory(arg(sub, "PATH"), &WriteConfig::new())?,
        Some(("rm", sub)) if sub.get_flag("dir") => adapter.delete_directory(arg(sub, "PATH"))?,
        Some(("rm", sub)) => adapter.delete(arg(sub, "PATH"))?,
        Some(("cp", sub)) => adapter.copy(
            arg(sub, "SOURCE"),
            arg(sub, "DESTINATION"),
            &WriteConfig::new(),
        )?,
        Some(("mv", sub)) => adapter.move_file(
            arg(sub, "SOURCE"),
            arg(sub, "DESTINATION"),
            &WriteConfig::new(),
        )?,
        Some(("url", sub)) => writeln!(stdout, "{}", adapter.public_url(arg(sub, "PATH"))?)?,
        Some(("sign", sub)) => {
            let expires = sub.get_one::<u64>("expires").copied().unwrap_or(3600);
            let method = match arg(sub, "method") {
                "PUT" => SignMethod::Put,
                "HEAD" => SignMethod::Head,
                "DELETE" => SignMethod::Delete,
                _ => SignMethod::Get,
            };
            let url = adapter.temporary_url_with(
                arg(sub, "PATH"),
                Expiration::Seconds(expires),
                method,
                &BTreeMap::new(),
            )?;
            writeln!(stdout, "{}", url)?;
        }
        Some(("checksum", sub)) => {
            writeln!(stdout, "{}", adapter.checksum(arg(sub, "PATH"), "etag")?)?
        }
        _ => return Err("unknown subcommand".into()),
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().json().with_writer(io::stderr).init();

    let span = span!(Level::INFO, "main", context = "main");
    let _e = span.enter();
    info!("called");

    let matches = cli().get_matches();
    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error_message = %err, error_group = "main");
            eprintln!("ossfs: {}", err);
            ExitCode::FAILURE
        }
    }
}
