//! Simulated collaborators for the probe driver: scripted ADC channels, a
//! recording trigger sink, and a virtual-time scheduler.
pub mod adc;
pub mod error;
pub mod sched;
pub mod sink;

pub use adc::{AdcFeed, SimSample, SimulatedAdc, SimulatedAdcBank};
pub use error::HwError;
pub use sched::{SimScheduler, VirtualClock};
pub use sink::RecordingSink;

#[cfg(test)]
mod tests {
    use super::*;
    use probe_traits::{AdcChannel, AdcSetup, SampleStatus};

    #[test]
    fn simulated_adc_reports_busy_once() {
        let feed = AdcFeed::new();
        feed.push_busy(700, 25);
        feed.push(710);
        let mut adc = SimulatedAdc::new(3, feed.clone());
        assert_eq!(adc.begin_sample(), SampleStatus::Busy(25));
        assert_eq!(adc.begin_sample(), SampleStatus::Ready);
        assert_eq!(adc.read(), 700);
        assert_eq!(adc.begin_sample(), SampleStatus::Ready);
        assert_eq!(adc.read(), 710);
        // Dry feed holds the last value.
        assert_eq!(adc.read(), 710);
        assert_eq!(feed.read_count(), 3);
    }

    #[test]
    fn bank_rejects_unknown_and_rebound_pins() {
        let mut bank = SimulatedAdcBank::new();
        bank.add_pin(4);
        assert!(bank.setup(4).is_ok());
        let again = bank.setup(4).err().map(|e| e.to_string());
        assert_eq!(again.as_deref(), Some("adc pin 4 already bound"));
        let unknown = bank.setup(9).err().map(|e| e.to_string());
        assert_eq!(unknown.as_deref(), Some("no adc channel on pin 9"));
    }
}
