//! Generate a sample companies dataset for demos:
//! `cargo run --bin generate_sample -- sample.csv`
//!
//! The output deliberately contains the mess the transform pipeline is
//! for: financial strings (`"$1.2B"`), empty cells, and an `"N/A"` token.

use std::io::Write;

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

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[(self.next_u64() % options.len() as u64) as usize]
    }
}

fn format_valuation(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.1}B", value / 1e9)
    } else {
        format!("${:.0}M", value / 1e6)
    }
}

fn main() -> std::io::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample.csv".to_string());
    let mut rng = SimpleRng::new(42);

    let industries = ["tech", "finance", "health", "retail", "energy"];
    let rows = 200;

    let mut out = std::fs::File::create(&path)?;
    writeln!(out, "company,industry,valuation,employees,founded,growth")?;

    for i in 0..rows {
        let industry = rng.pick(&industries);
        let employees = rng.gauss(2000.0, 800.0).max(10.0) as i64;
        // Valuation loosely tracks headcount so the correlation view has
        // something to find.
        let valuation = (employees as f64) * rng.gauss(1.5e6, 4e5).max(1e5);
        let year = 1980 + (rng.next_u64() % 40) as i64;
        let month = 1 + (rng.next_u64() % 12) as i64;
        let growth = rng.gauss(0.08, 0.15);

        // ~5% missing valuations, a couple of junk tokens.
        let valuation_cell = match rng.next_u64() % 40 {
            0 => String::new(),
            1 => "N/A".to_string(),
            _ => format_valuation(valuation),
        };
        // ~3% missing employee counts.
        let employees_cell = if rng.next_u64() % 33 == 0 {
            String::new()
        } else {
            employees.to_string()
        };

        writeln!(
            out,
            "company_{i:03},{industry},{valuation_cell},{employees_cell},{year}-{month:02}-01,{growth:.3}"
        )?;
    }

    println!("wrote {rows} rows to {path}");
    Ok(())
}
