//! Benchmark-only root package; see `benches/`.
