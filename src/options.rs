use super::{Error, Estimator, Technologies};
use clap::Parser;
use sniper::{db, parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about = "LLC energy and ED²P of two cache technologies")]
pub struct Options {
    #[clap(help = "sim.out (or run directory) of the baseline run")]
    pub baseline_sim_out: PathBuf,

    #[clap(help = "sim.out (or run directory) of the alternative run")]
    pub alternative_sim_out: PathBuf,

    #[clap(long = "baseline", default_value = "SRAM", help = "baseline technology label")]
    pub baseline: String,

    #[clap(long = "alternative", default_value = "JanS", help = "alternative technology label")]
    pub alternative: String,

    #[clap(long = "technologies", help = "YAML file with additional technologies")]
    pub technologies: Option<PathBuf>,

    #[clap(
        long = "out-dir",
        help = "output directory (default: <runs>/output_<benchmark>)"
    )]
    pub out_dir: Option<PathBuf>,

    #[clap(
        long = "tolerance",
        default_value_t = 0,
        help = "hit count mismatch still reported as consistent"
    )]
    pub tolerance: u64,

    #[clap(long = "local-only", help = "ignore forwarded LLC hits in the store")]
    pub local_only: bool,

    #[clap(long = "strict", help = "fail on missing report fields")]
    pub strict: bool,

    #[clap(short = 'q', long = "quiet", help = "do not print a summary")]
    pub quiet: bool,
}

impl Options {
    pub fn estimator(&self) -> Result<Estimator, Error> {
        let mut technologies = Technologies::default();
        if let Some(ref path) = self.technologies {
            technologies.extend_from_yaml(path)?;
        }
        let estimator = Estimator {
            technologies,
            report: parser::Options {
                strict: self.strict,
            },
            store: db::Options {
                scope: if self.local_only {
                    db::Scope::Local
                } else {
                    db::Scope::WithRemote
                },
                ..db::Options::default()
            },
            tolerance: self.tolerance,
            ..Estimator::default()
        };
        // fail early on unknown labels
        estimator.technology(&self.baseline)?;
        estimator.technology(&self.alternative)?;
        Ok(estimator)
    }
}
