use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("no adc channel on pin {0}")]
    UnknownPin(u8),
    #[error("adc pin {0} already bound")]
    PinInUse(u8),
}

pub type Result<T> = std::result::Result<T, HwError>;
