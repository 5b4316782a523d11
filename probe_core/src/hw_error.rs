//! Maps `Box<dyn Error>` from trait boundaries to typed `ProbeError`.
//!
//! The traits in `probe_traits` use `Box<dyn Error + Send + Sync>` so any
//! peripheral driver can plug in; this module converts those to our typed
//! error enum, with an optional feature-gated path for
//! `probe_hardware::HwError` downcasting.

use crate::error::ProbeError;

/// Map a trait-boundary error to a typed `ProbeError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ProbeError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<probe_hardware::HwError>() {
            return match hw {
                probe_hardware::HwError::UnknownPin(pin) => {
                    ProbeError::Hardware(format!("adc setup: no channel on pin {pin}"))
                }
                probe_hardware::HwError::PinInUse(pin) => {
                    ProbeError::Hardware(format!("adc setup: pin {pin} already bound"))
                }
            };
        }
    }

    ProbeError::Hardware(e.to_string())
}
