use std::io;

use worker_pool::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum MultiBarError {
    #[error("terminal write failed: {0}")]
    Terminal(#[from] io::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
