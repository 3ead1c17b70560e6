use aria::app::AppOptions;

fn main() -> anyhow::Result<()> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    aria::app::run(options)
}

fn parse_args(args: Vec<String>) -> anyhow::Result<AppOptions> {
    let mut out = AppOptions::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--listing" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--listing requires a file path");
                };
                out.listing = Some(value.into());
            }
            "--folder" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--folder requires a directory path");
                };
                out.folder = Some(value.into());
            }
            "--start" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--start requires a queue position");
                };
                out.start_index = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--start expects a number, got {value}"))?;
            }
            "--silent" => out.silent = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("aria");
    println!("  --listing <file>  Track listing JSON document to load");
    println!("  --folder <dir>    Scan a local folder for audio files instead");
    println!("  --start <n>       Queue position to stage at startup");
    println!("  --silent          Use the simulated player (no audio output)");
}
