/// Data layer: loading, normalization, join, filtering, metrics and export.
///
/// Architecture:
/// ```text
///  fornecedores.csv / .parquet / .json      pedidos.csv / .parquet / .json
///        │                                         │
///        ▼                                         ▼
///   ┌──────────┐   RawTable → normalize    ┌──────────┐
///   │  loader   │ ───────────────────────▶ │  loader   │
///   └──────────┘                           └──────────┘
///        │ Vec<SupplierRecord>                     │ Vec<OrderRecord>
///        └───────────────┬─────────────────────────┘
///                        ▼
///                   ┌────────┐
///                   │  join   │  last order per CNPJ → SupplierDataset
///                   └────────┘
///                        │
///                        ▼
///                   ┌────────┐
///                   │ filter  │  UF / category / registration range → indices
///                   └────────┘
///                        │
///              ┌─────────┴─────────┐
///              ▼                   ▼
///         ┌─────────┐         ┌─────────┐
///         │ metrics  │         │ export   │
///         └─────────┘         └─────────┘
/// ```

pub mod error;
pub mod export;
pub mod filter;
pub mod join;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod normalize;
