use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::DataError;
use crate::model::group::LayoutError;
use crate::report::ReportError;
use crate::solver::SolveError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

pub type Result<T> = std::result::Result<T, Error>;
