/// Shared serial-bus access, as the MS5611 needs it.
///
/// The physical bus carries unrelated peripherals, so every framed
/// transaction is wrapped in its own claim/release pair. This is distinct
/// from the device-level lock that serialises whole conversion sequences;
/// see [`self_test`](crate::self_test) and
/// [`BaroSampler`](crate::BaroSampler).
///
/// `claim` may wait for the current holder, but only up to the
/// implementation's bounded timeout. It must not block forever.
#[allow(async_fn_in_trait)]
pub trait BaroBus {
    type Error: core::fmt::Debug;

    /// Claim the bus for one framed transaction.
    async fn claim(&mut self) -> Result<(), Self::Error>;

    /// Release the bus after a transaction.
    fn release(&mut self);

    /// Assert this device's chip select.
    fn select(&mut self);

    /// Deassert this device's chip select.
    fn deselect(&mut self);

    /// Clock one byte out (and the reply byte in).
    async fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error>;

    /// Clock `rx.len()` bytes in.
    async fn read(&mut self, rx: &mut [u8]) -> Result<(), Self::Error>;
}
