use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleTreeError {
    #[error("dataset {index} is empty")]
    EmptyDataset { index: usize },
    #[error("dataset {index} opens with a minor (IF) item")]
    MinorBeforeMajor { index: usize },
}
