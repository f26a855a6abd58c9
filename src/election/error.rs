use thiserror::Error;

use crate::bus::BusError;

#[derive(Error, Debug)]
pub enum ElectionError {
    #[error("Not the master")]
    NotMaster,

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Node event channel closed")]
    EventChannelClosed,
}
