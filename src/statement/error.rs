use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Statement surface of {width}x{height} px is unavailable (limit {limit} px per side)")]
    SurfaceUnavailable { width: u32, height: u32, limit: u32 },

    #[error("Invalid page size: {width} x {height} mm")]
    InvalidPageSize { width: f64, height: f64 },

    #[error("Failed to write statement: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// What to tell the person who asked for the statement.
    pub fn user_message(&self) -> &'static str {
        "Error generating PDF. Please try again."
    }
}
