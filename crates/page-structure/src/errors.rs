use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("snapshot payload is malformed: {0}")]
    Malformed(String),
    #[error("snapshot references node {key} but holds only {len} nodes")]
    DanglingKey { key: u32, len: usize },
}

impl From<serde_json::Error> for StructureError {
    fn from(err: serde_json::Error) -> Self {
        StructureError::Malformed(err.to_string())
    }
}
