use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeterError {
    #[error("max value must be a finite number greater than zero, got {0}")]
    InvalidMaxValue(f64),
    #[error("invalid meter configuration: {0}")]
    InvalidConfig(String),
    #[error("font data could not be parsed")]
    Font,
    #[error(transparent)]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error(transparent)]
    Os(#[from] winit::error::OsError),
    #[error(transparent)]
    Pixels(#[from] pixels::Error),
}
