/// Construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Requested strip length is zero or beyond [`MAX_LEDS`](crate::MAX_LEDS).
    Capacity(usize),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Capacity(n) => {
                write!(f, "unsupported strip length: {}", n)
            }
        }
    }
}
