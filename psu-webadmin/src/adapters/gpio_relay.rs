//! Relay driven by an `embedded-hal` output pin.
//!
//! The relay board pulls its coil in when the pin is low, so "on" is
//! `set_low` and the pin idles high.

use core::convert::Infallible;

use embedded_hal::digital::{OutputPin, StatefulOutputPin};

use crate::domain::ports::RelayControl;

/// Active-low relay on a GPIO pin.
///
/// Works with any HAL whose pins cannot fail, which covers the on-chip GPIO
/// of the ESP8266 and most other MCUs.
///
/// # Example
///
/// ```ignore
/// let pin = io.pins.gpio3.into_push_pull_output();
/// let relay = GpioRelay::new(pin);
/// ```
pub struct GpioRelay<P> {
    pin: P,
}

impl<P> GpioRelay<P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    /// Take over `pin` and switch the relay off.
    pub fn new(mut pin: P) -> Self {
        let Ok(()) = pin.set_high();
        Self { pin }
    }

    /// Release the pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> RelayControl for GpioRelay<P>
where
    P: StatefulOutputPin<Error = Infallible>,
{
    fn power_on(&mut self) {
        let Ok(()) = self.pin.set_low();
        info!("Power on");
    }

    fn power_off(&mut self) {
        let Ok(()) = self.pin.set_high();
        info!("Power off");
    }

    fn is_on(&mut self) -> bool {
        let Ok(low) = self.pin.is_set_low();
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType;

    struct MockPin {
        high: bool,
        writes: u32,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    impl StatefulOutputPin for MockPin {
        fn is_set_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high)
        }

        fn is_set_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high)
        }
    }

    #[test]
    fn test_starts_off() {
        let mut relay = GpioRelay::new(MockPin {
            high: false,
            writes: 0,
        });
        assert!(!relay.is_on());
        assert_eq!(relay.into_inner().writes, 1);
    }

    #[test]
    fn test_active_low() {
        let mut relay = GpioRelay::new(MockPin {
            high: true,
            writes: 0,
        });

        relay.power_on();
        assert!(relay.is_on());
        assert!(!relay.pin.high);

        relay.power_off();
        assert!(!relay.is_on());
        assert!(relay.pin.high);
    }
}
