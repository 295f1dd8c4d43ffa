use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a sample registry (`fornecedores.csv`) and order history
/// (`pedidos.parquet`) for the supplier panel.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Directory that receives both files.
    #[arg(default_value = ".")]
    out_dir: PathBuf,

    /// Anchor date (YYYY-MM-DD) for registrations and orders; defaults to today.
    #[arg(long, env = "PANEL_TODAY")]
    today: Option<NaiveDate>,
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

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `0..n`.
    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n.max(1)
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len() as u64) as usize]
    }
}

const STATES: &[&str] = &["SP", "SP", "SP", "RJ", "MG", "PR", "RS", "SC", "BA", "GO"];
const CATEGORIES: &[&str] = &[
    "Limpeza",
    "Escritório",
    "TI",
    "Obras",
    "Elétrica",
    "Alimentação",
    "Logística",
];
const NAMES: &[&str] = &[
    "Alfa", "Beta", "Comercial", "Distribuidora", "Nacional", "Paulista", "Sul", "Norte",
    "Central", "Prime", "Global", "Serviços",
];

/// Check digits are not computed; the panel only needs 14 digits.
fn tax_id(rng: &mut SimpleRng) -> i64 {
    // some roots start with 0 so the numeric column drops leading zeros
    (rng.below(99_999_999) * 1_000_000 + 1_000 + rng.below(100)) as i64
}

fn main() -> Result<()> {
    let args = Args::parse();
    let out_dir = args.out_dir;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let mut rng = SimpleRng::new(42);

    // ---- Supplier registry (CSV, ';' separated like a pt-BR export) ----
    let n_suppliers = 120;
    let mut keys: Vec<i64> = Vec::with_capacity(n_suppliers);
    let forn_path = out_dir.join("fornecedores.csv");
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(&forn_path)
        .with_context(|| format!("creating {}", forn_path.display()))?;
    writer.write_record([
        "FORN_CNPJ",
        "FORN_RAZAO",
        "FORN_FANTASIA",
        "FORN_UF",
        "FORN_DTCADASTRO",
        "CATEGORIAS",
    ])?;

    for i in 0..n_suppliers {
        let key = tax_id(&mut rng);
        keys.push(key);

        let name = format!("{} {}", rng.pick(NAMES), rng.pick(NAMES));
        let registered = today - Duration::days(rng.below(1500) as i64);
        let n_cats = 1 + rng.below(3) as usize;
        let cats: Vec<&str> = (0..n_cats).map(|_| *rng.pick(CATEGORIES)).collect();
        // a few rows with the messy input real exports carry
        let registered_cell = match i % 40 {
            7 => "31/02/2020".to_string(),
            13 => registered.format("%d/%m/%Y").to_string(),
            _ => registered.format("%Y-%m-%d").to_string(),
        };

        writer.write_record([
            format!("{key:014}"),
            format!("{} LTDA", name.to_uppercase()),
            name,
            rng.pick(STATES).to_lowercase(),
            registered_cell,
            cats.join(", "),
        ])?;
    }
    writer.flush()?;

    // ---- Order history (Parquet: numeric CNPJ + native dates) ----
    // Skewed usage: a handful of suppliers receive most orders.
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch")?;
    let mut order_keys: Vec<i64> = Vec::new();
    let mut order_days: Vec<Option<i32>> = Vec::new();
    for _ in 0..2_000 {
        let u = rng.next_f64();
        let idx = ((u * u * u) * n_suppliers as f64) as usize;
        // a third of the registry never receives an order
        if idx >= n_suppliers * 2 / 3 {
            continue;
        }
        let date = today - Duration::days(rng.below(720) as i64);
        order_keys.push(keys[idx]);
        order_days.push(if rng.below(50) == 0 {
            None
        } else {
            Some((date - epoch).num_days() as i32)
        });
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("PED_FORNECEDOR", DataType::Int64, false),
        Field::new("PED_DT", DataType::Date32, true),
    ]));
    let n_orders = order_keys.len();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(order_keys)),
            Arc::new(Date32Array::from(order_days)),
        ],
    )
    .context("building order batch")?;

    let ped_path = out_dir.join("pedidos.parquet");
    let file = std::fs::File::create(&ped_path)
        .with_context(|| format!("creating {}", ped_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;

    println!(
        "Wrote {n_suppliers} suppliers to {} and {n_orders} orders to {}",
        forn_path.display(),
        ped_path.display()
    );
    Ok(())
}
