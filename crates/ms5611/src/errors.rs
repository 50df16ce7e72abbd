/// Errors surfaced by the MS5611 driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// The shared bus could not be claimed within its bounded wait.
    BusClaim(E),
    /// The bus transfer itself failed.
    BusTransfer(E),
    /// `start_conversion` gave up after the configured number of retries.
    StartRetriesExhausted,
    /// A self-test reading fell outside the datasheet operating range.
    OutOfRange,
}

impl<E: core::fmt::Debug + core::fmt::Display> core::fmt::Display
    for Error<E>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::BusClaim(err) => {
                write!(f, "failed to claim the shared bus: {}", err)
            }
            Error::BusTransfer(err) => {
                write!(f, "bus transfer error: {}", err)
            }
            Error::StartRetriesExhausted => {
                write!(f, "conversion command retries exhausted")
            }
            Error::OutOfRange => {
                write!(f, "self-test reading out of range")
            }
        }
    }
}
