use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use matter_pairs::data::model::DEFAULT_CHARGE_WIDTH;
use matter_pairs::pipeline;
use matter_pairs::{FormatMode, LoadOptions, RunConfig};

/// Identify vector pairs and unpaired states in matter state towers.
///
/// Every tower (`2Ms<N>.EL<N>.ER<N>.` file group) found in DIR is loaded and
/// paired; `<tower>vector_pairs.txt` and `<tower>up_vectors.txt` are written
/// next to the input files.
#[derive(Parser, Debug)]
#[command(name = "matter-pairs", author, version, about)]
struct Cli {
    /// Directory containing the tower files
    directory: PathBuf,

    /// Input uses the bracketed `( n, n, n) LABL` identifier layout
    #[arg(short, long)]
    bracketed: bool,

    /// Load the attribute files of a tower concurrently
    #[arg(short, long)]
    parallel: bool,

    /// Also write `<tower>pairing_summary.json`
    #[arg(long)]
    json: bool,

    /// Group the states of this Alpha sector into `<tower>sector_pairs.txt`
    #[arg(short, long)]
    sector: Option<String>,

    /// Expected number of RM U(1) charges per state
    #[arg(long, default_value_t = DEFAULT_CHARGE_WIDTH)]
    charge_width: usize,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        let format = if self.bracketed {
            FormatMode::Bracketed
        } else {
            FormatMode::Plain
        };
        RunConfig {
            directory: self.directory,
            load: LoadOptions {
                format,
                parallel: self.parallel,
                charge_width: self.charge_width,
            },
            json: self.json,
            sector: self.sector,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config();
    let outcomes = pipeline::run(&config)?;

    for outcome in &outcomes {
        let s = &outcome.summary;
        print!(
            "{}: {} states, {} pairs, {} paired, {} unpaired",
            s.tower, s.states, s.total_pairs, s.num_paired_states, s.unpaired
        );
        match outcome.sector_members {
            Some(n) => println!(", {n} in sector"),
            None => println!(),
        }
    }
    Ok(())
}
