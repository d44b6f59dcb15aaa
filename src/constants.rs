/// Shared constants for the projection report pipeline: source column
/// names, enrichment output fields, and report limits.

/// Column names of the projection export. The CSV header row uses these
/// exact spellings, so they double as normalized record keys.
pub mod fields {
    pub const SEASON: &str = "Temporada";
    pub const FRUIT: &str = "Fruta";
    pub const COLLECTION_CENTER: &str = "Centro_acopio";
    pub const STATE: &str = "Estado";
    pub const PRODUCER_CODE: &str = "PR_Productor";
    pub const PRODUCER_NAME: &str = "Nombre_Productor";
    pub const ORCHARD_NAME: &str = "Nombre_Huerto";
    pub const ORCHARD_CODE: &str = "Codigo_Huerto";
    pub const HECTARES: &str = "Hectareas";
    pub const MONTH: &str = "Mes";
    pub const WEEK: &str = "Semana";
    pub const PROJECTED_BOXES: &str = "Cajas_proyectadas";
    pub const VARIETY: &str = "Variedad";
    pub const UPDATE_DATE: &str = "Fecha_Update";

    /// Injected by the month/year split, not a source column.
    pub const YEAR: &str = "Anio";

    // Injected by enrichment, absent from the source export
    pub const RECEPTION_TOTAL: &str = "ReceptionTotal";
    pub const RECEPTION_ACCEPTED: &str = "ReceptionAceptada";
}

/// Sheet names longer than this are truncated by the workbook format.
pub const SHEET_NAME_LIMIT: usize = 31;

/// Failure-message fragment the enrichment source emits when an aggregate
/// already exists for the requested date; tracked as its own category.
pub const DUPLICATE_DATE_RECORD: &str = "Date record already exists";

/// Prefix for the single run-aborting error entry.
pub const GENERAL_ERROR_PREFIX: &str = "General processing error";
