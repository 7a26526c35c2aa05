use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

const TOWER: &str = "2Ms1.EL0.ER0.";
const CHARGE_WIDTH: usize = 12;
const LM_WIDTH: usize = 20;
const REP_CHOICES: [i64; 6] = [1, 3, -3, 6, -4, 8];

/// Write a small synthetic tower for trying out `matter-pairs`.
#[derive(Parser, Debug)]
struct Args {
    /// Output directory (created if missing)
    #[arg(default_value = "sample_tower")]
    out_dir: PathBuf,

    /// Number of generated base states
    #[arg(long, default_value_t = 24)]
    states: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        let span = (hi - lo + 1) as u64;
        lo + (self.next_u64() % span) as i64
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

struct SampleState {
    name: String,
    charges: Vec<i64>,
    reps: Vec<i64>,
}

/// Flip barred/unbarred on multiples of 3 so partners exercise normalization.
fn barred(reps: &[i64]) -> Vec<i64> {
    reps.iter()
        .map(|&r| if r % 3 == 0 { -r } else { r })
        .collect()
}

fn generate(rng: &mut SimpleRng, count: usize) -> Vec<SampleState> {
    let mut states = Vec::new();
    for i in 0..count {
        let charges: Vec<i64> = (0..CHARGE_WIDTH).map(|_| rng.range(-3, 3)).collect();
        let reps: Vec<i64> = (0..5).map(|_| rng.pick(&REP_CHOICES)).collect();
        let negated: Vec<i64> = charges.iter().map(|c| -c).collect();

        match i % 4 {
            // mutual pair
            0 | 1 => states.push(SampleState {
                name: format!("p{i}b"),
                charges: negated,
                reps: barred(&reps),
            }),
            // inverse charges, but the reps disagree
            2 => {
                let mut other = reps.clone();
                other[0] += 1;
                states.push(SampleState {
                    name: format!("d{i}b"),
                    charges: negated,
                    reps: other,
                });
            }
            // no partner at all
            _ => {}
        }
        states.push(SampleState {
            name: format!("s{i}"),
            charges,
            reps,
        });
    }
    states
}

fn join<T: ToString>(values: &[T], sep: &str) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let states = generate(&mut rng, args.states);

    let mut rm = String::new();
    let mut na = String::new();
    let mut lm = String::new();
    let mut descriptors = String::new();

    for (i, st) in states.iter().enumerate() {
        writeln!(rm, "{}\t\t {}", st.name, join(&st.charges, "\t "))?;
        writeln!(na, "{}\t\t{} \t", st.name, join(&st.reps, " \t"))?;

        let lm_charges: Vec<String> = (0..LM_WIDTH)
            .map(|_| format!("{:.2}", rng.range(-200, 200) as f64 / 100.0))
            .collect();
        writeln!(lm, "{} {}", st.name, lm_charges.join(" "))?;

        let sector = if i % 3 == 0 { "S" } else { "T" };
        writeln!(descriptors, "State ({})  {}", st.name, join(&st.charges[..4], "  "))?;
        writeln!(descriptors, "Alpha ({sector})  {}", if sector == "S" { "4  4  4  0" } else { "0  0  0  0" })?;
    }
    // One broken line, which the loader must skip.
    writeln!(rm, "broken\t\t 1\t x\t 0")?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    for (suffix, content) in [
        ("rm.u1.all", &rm),
        ("rm.na.all", &na),
        ("lm.u1.all", &lm),
        ("states.all", &descriptors),
    ] {
        let path = args.out_dir.join(format!("{TOWER}{suffix}"));
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    }

    println!(
        "Wrote {} states of tower {TOWER} to {}",
        states.len(),
        args.out_dir.display()
    );
    Ok(())
}
