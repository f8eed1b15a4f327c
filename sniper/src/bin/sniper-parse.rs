use clap::Parser;
use color_eyre::eyre;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
struct Options {
    #[clap(help = "run directory containing sim.out")]
    pub run_dir: PathBuf,

    #[clap(long = "object", default_value = "L3", help = "LLC object name in the store")]
    pub object: String,

    #[clap(long = "local-only", help = "ignore forwarded LLC objects")]
    pub local_only: bool,

    #[clap(long = "strict", help = "fail on missing report fields")]
    pub strict: bool,

    #[clap(long = "key", help = "configuration keys to print")]
    pub keys: Vec<String>,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let start = Instant::now();
    let options = Options::parse();

    let report = sniper::parser::read_report(
        options.run_dir.join(sniper::REPORT_FILE),
        &sniper::parser::Options {
            strict: options.strict,
        },
    )?;
    println!("report: {}", serde_json::to_string_pretty(&report)?);

    let db_options = sniper::db::Options {
        object: options.object.clone(),
        scope: if options.local_only {
            sniper::db::Scope::Local
        } else {
            sniper::db::Scope::WithRemote
        },
    };
    match sniper::db::read(&options.run_dir, &db_options)? {
        Some(store) => println!("store: {}", serde_json::to_string_pretty(&store)?),
        None => println!("store: unavailable"),
    }

    let files = std::iter::once(sniper::config::CONFIG_FILE).chain(sniper::config::INFO_FILES);
    for file in files {
        let Some(config) = sniper::config::Config::read(options.run_dir.join(file))? else {
            continue;
        };
        println!("{file}: {} keys", config.len());
        for key in &options.keys {
            println!("  {key} = {:?}", config.get(key));
        }
    }

    println!("done after {:?}", start.elapsed());
    Ok(())
}
