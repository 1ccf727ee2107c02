/// Column-name constants for the padi-core frames.
/// Single source of truth - exported to Python via PyO3.

// ── Source document fields ──────────────────────────────────────────────────
pub mod source {
    pub const PROVINCE: &str = "provinsi";
    pub const REGENCY: &str = "kabupaten_kota";
    pub const YEAR: &str = "tahun";
    pub const PRODUCTION_TONS: &str = "produksi_ton";
}

// ── Canonical record columns ────────────────────────────────────────────────
pub mod record {
    pub const PROVINCE: &str = "province";
    pub const REGENCY: &str = "regency";
    pub const YEAR: &str = "year";
    pub const PRODUCTION_TONS: &str = "production_tons";

    pub const ALL: [&str; 4] = [PROVINCE, REGENCY, YEAR, PRODUCTION_TONS];
}

// ── Aggregate columns ───────────────────────────────────────────────────────
pub mod aggregate {
    pub const TOTAL_PRODUCTION_TONS: &str = "total_production_tons";
}

// ── Geospatial columns ──────────────────────────────────────────────────────
pub mod geo {
    pub const LAT: &str = "lat";
    pub const LON: &str = "lon";
    pub const TIER: &str = "tier";
    /// RGBA marker fill, a list of four `u8`.
    pub const COLOR: &str = "color";
}

// ── Decline columns ─────────────────────────────────────────────────────────
pub mod decline {
    pub const TOTAL_PREV: &str = "total_prev";
    pub const TOTAL_NOW: &str = "total_now";
    pub const DELTA_TONS: &str = "delta_tons";
}
