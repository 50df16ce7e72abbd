use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;

use crate::bus::BaroBus;
use crate::device::{Conversion, Ms5611};

/// One computed barometer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaroSample {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Kilopascal.
    pub pressure: f32,
    /// Metres, derived via the international barometric formula.
    pub altitude: f32,
}

/// Capacity-1 sample queue: consumers only ever see the most recent
/// sample, and the producer never blocks on it.
pub type BaroQueue<M> = Channel<M, BaroSample, 1>;
pub type BaroReceiver<'a, M> = Receiver<'a, M, BaroSample, 1>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    Barometer,
}

/// Sink that sensor sample streams are announced to at wiring time.
/// Downstream consumers pull from the registered receiver.
pub trait SensorRegistry<M: RawMutex> {
    fn register(&mut self, kind: SensorKind, samples: BaroReceiver<'static, M>);
}

/// Announce the barometer queue to a registry. Called once when the
/// device is brought up.
pub fn register_baro_queue<M: RawMutex>(
    queue: &'static BaroQueue<M>,
    registry: &mut impl SensorRegistry<M>,
) {
    registry.register(SensorKind::Barometer, queue.receiver());
}

/// Periodic pressure/temperature sampling.
///
/// Temperature drifts slowly, so one temperature refresh is interleaved
/// between `temperature_interleaving` pressure-only iterations, per the
/// device's [`Config`](crate::Config). The device lock is taken per
/// conversion sequence, never across the whole iteration, so a self-test
/// can slot in between cycles.
pub struct BaroSampler<'a, M: RawMutex, BUS, D> {
    dev: &'a Mutex<M, Ms5611<BUS, D>>,
    queue: &'a BaroQueue<M>,
    countdown: u32,
}

impl<'a, M, BUS, D, E> BaroSampler<'a, M, BUS, D>
where
    M: RawMutex,
    BUS: BaroBus<Error = E>,
    E: core::fmt::Debug,
    D: DelayNs,
{
    /// The countdown starts at 1 so the very first iteration refreshes
    /// the temperature; pressure compensation is meaningless before a
    /// temperature conversion has run.
    pub fn new(
        dev: &'a Mutex<M, Ms5611<BUS, D>>,
        queue: &'a BaroQueue<M>,
    ) -> Self {
        Self { dev, queue, countdown: 1 }
    }

    /// One sampling iteration: temperature refresh when the interleave
    /// countdown expires, then a pressure cycle, then a best-effort
    /// publish.
    pub async fn step(&mut self) {
        self.countdown -= 1;

        if self.countdown == 0 {
            let mut dev = self.dev.lock().await;
            let _ = dev.convert(Conversion::Temperature).await;
            // An interleave of 0 must not wedge the countdown.
            self.countdown =
                dev.config().temperature_interleaving.max(1);
        }

        let mut dev = self.dev.lock().await;
        // A failed read costs one sample, not the stream.
        if dev.convert(Conversion::Pressure).await.is_ok() {
            let _ = self.queue.try_send(dev.sample());
        }
    }

    /// Run the sampling loop for the life of the process. Meant to be
    /// hosted by a high-priority executor task, since conversion timing
    /// accuracy depends on low jitter between start and read.
    pub async fn run(mut self) -> ! {
        loop {
            self.step().await;
        }
    }
}
