use chrono::{Duration, NaiveDate};

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
}

const HEADERS: [&str; 7] = [
    "Time",
    "Speed Over Ground",
    "ME RPM",
    "ME Fuel Rate",
    "Draft Fwd",
    "Vessel Name",
    "Vessel IMO",
];

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_log.csv".to_string());

    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid start timestamp"))?;

    // Two weeks at 15-minute intervals.
    let n_rows = 14 * 24 * 4;
    let mut writer = csv::Writer::from_path(&output_path)?;
    writer.write_record(HEADERS)?;

    for i in 0..n_rows {
        let ts = start + Duration::minutes(15 * i as i64);
        let phase = i as f64 / 96.0 * std::f64::consts::TAU;
        let rpm = 85.0 + 10.0 * phase.sin() + rng.gauss(0.0, 1.5);
        let speed = 0.14 * rpm + rng.gauss(0.0, 0.3);
        let fuel = 0.002 * rpm.powi(2) + rng.gauss(0.0, 0.8);
        let draft = 9.2 - 0.0004 * i as f64 + rng.gauss(0.0, 0.02);

        // Loggers fill identity fields in only near the end of a session.
        let identity_written = i >= n_rows - n_rows / 10;
        let (name, imo) = if identity_written {
            ("MV Northern Atlas", "9123456")
        } else {
            ("", "")
        };

        // Occasional sensor dropout.
        let fuel = if rng.next_f64() < 0.02 {
            String::new()
        } else {
            format!("{fuel:.3}")
        };

        writer.write_record([
            ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{speed:.2}"),
            format!("{rpm:.1}"),
            fuel,
            format!("{draft:.3}"),
            name.to_string(),
            imo.to_string(),
        ])?;
    }
    writer.flush()?;

    log::info!("wrote {n_rows} rows to {output_path}");
    println!("Wrote {n_rows} datalogger rows to {output_path}");
    Ok(())
}
