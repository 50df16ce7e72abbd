use byteorder::{BigEndian, ByteOrder};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;
use micromath::F32Ext;

use crate::bus::BaroBus;
use crate::errors::Error;
use crate::sampler::BaroSample;

const CMD_RESET: u8 = 0x1E;
/// First PROM word is factory data; the six calibration words follow.
const CMD_PROM_READ: u8 = 0xA2;
const CMD_ADC_READ: u8 = 0x00;
const CMD_CONVERT_PRESSURE: u8 = 0x40;
const CMD_CONVERT_TEMPERATURE: u8 = 0x50;

/// Time for the chip to come back up after a reset command.
const RESET_SETTLE_MS: u32 = 20;

/// Standard sea-level pressure in kPa, for the altitude formula.
const STANDARD_PRESSURE_KPA: f32 = 101.3250;

/// ADC oversampling ratio. The discriminant is the offset added to the
/// convert commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Osr {
    Osr256 = 0x00,
    Osr512 = 0x02,
    Osr1024 = 0x04,
    Osr2048 = 0x06,
    Osr4096 = 0x08,
}

impl Osr {
    /// Worst-case conversion time in milliseconds for this ratio.
    ///
    /// The chip does not flag an early read; it just hands back a
    /// truncated code. Callers must wait at least this long between
    /// `start_conversion` and `read_adc`.
    pub fn conversion_delay_ms(self) -> u32 {
        conversion_delay_ms(self as u8)
    }

    pub(crate) fn command_bits(self) -> u8 {
        self as u8
    }
}

/// Conversion delay lookup on raw command-offset bits. Unrecognised
/// values get the worst-case delay.
pub fn conversion_delay_ms(osr_bits: u8) -> u32 {
    match osr_bits {
        0x00 => 2,
        0x02 => 2,
        0x04 => 3,
        0x06 => 5,
        _ => 10,
    }
}

/// Which ADC conversion is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Conversion {
    Pressure,
    Temperature,
}

/// Driver configuration.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub osr: Osr,
    /// Pressure-only cycles between temperature refreshes in the
    /// [`BaroSampler`](crate::BaroSampler) loop.
    pub temperature_interleaving: u32,
    /// Bound on transient bus failures tolerated by `start_conversion`
    /// before it reports `StartRetriesExhausted`.
    pub max_start_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            osr: Osr::Osr1024,
            temperature_interleaving: 1,
            max_start_retries: 100,
        }
    }
}

/// MS5611 barometer on a shared bus.
///
/// One conversion sequence (start, wait, read) must run to completion
/// before the next begins; callers that share the device wrap it in an
/// [`embassy_sync::mutex::Mutex`] and hold the lock across the whole
/// sequence.
pub struct Ms5611<BUS, D> {
    bus: BUS,
    delay: D,
    config: Config,
    calibration: [u16; 6],
    current_conversion: Conversion,
    pressure_unscaled: i64,
    temperature_unscaled: i64,
    // Carried from the latest temperature pass into every following
    // pressure pass. Both stay zero until the first temperature
    // conversion; a pressure read before that compensates against zeros,
    // matching the zero-initialised statics in the firmware this chip's
    // reference code ships with.
    delta_temp: i64,
    temperature_coarse: i64,
}

impl<BUS, D, E> Ms5611<BUS, D>
where
    BUS: BaroBus<Error = E>,
    E: core::fmt::Debug,
    D: DelayNs,
{
    /// Reset the chip, wait for it to settle, and read the six factory
    /// calibration words from PROM.
    pub async fn init(
        bus: BUS,
        delay: D,
        config: Config,
    ) -> Result<Self, Error<E>> {
        let mut dev = Self {
            bus,
            delay,
            config,
            calibration: [0; 6],
            current_conversion: Conversion::Temperature,
            pressure_unscaled: 0,
            temperature_unscaled: 0,
            delta_temp: 0,
            temperature_coarse: 0,
        };

        dev.write_command(CMD_RESET).await?;
        dev.delay.delay_ms(RESET_SETTLE_MS).await;

        for i in 0..dev.calibration.len() {
            let mut word = [0u8; 2];
            dev.read_registers(CMD_PROM_READ + 2 * i as u8, &mut word)
                .await?;
            dev.calibration[i] = BigEndian::read_u16(&word);
        }

        Ok(dev)
    }

    /// Factory calibration words C1..C6.
    pub fn calibration(&self) -> &[u16; 6] {
        &self.calibration
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The conversion recorded by the last `start_conversion`.
    pub fn current_conversion(&self) -> Conversion {
        self.current_conversion
    }

    /// Latest compensated temperature in centi-degrees Celsius.
    pub fn temperature_unscaled(&self) -> i64 {
        self.temperature_unscaled
    }

    /// Latest compensated pressure in Pa.
    pub fn pressure_unscaled(&self) -> i64 {
        self.pressure_unscaled
    }

    /// Issue a convert command for `kind`.
    ///
    /// Bus failures here are transient (another peripheral holds the
    /// bus), so the write is retried up to the configured bound before
    /// giving up.
    pub async fn start_conversion(
        &mut self,
        kind: Conversion,
    ) -> Result<(), Error<E>> {
        let command = match kind {
            Conversion::Pressure => {
                CMD_CONVERT_PRESSURE + self.config.osr.command_bits()
            }
            Conversion::Temperature => {
                CMD_CONVERT_TEMPERATURE + self.config.osr.command_bits()
            }
        };

        let mut attempts = 0;
        loop {
            match self.write_command(command).await {
                Ok(()) => break,
                Err(_) if attempts < self.config.max_start_retries => {
                    attempts += 1;
                }
                Err(_) => return Err(Error::StartRetriesExhausted),
            }
        }

        self.current_conversion = kind;
        Ok(())
    }

    /// Read the 24-bit conversion result and run the datasheet's
    /// fixed-point compensation for whichever conversion is in flight.
    pub async fn read_adc(&mut self) -> Result<(), Error<E>> {
        let mut data = [0u8; 3];
        self.read_registers(CMD_ADC_READ, &mut data).await?;

        let raw = u32::from(data[0]) << 16
            | u32::from(data[1]) << 8
            | u32::from(data[2]);

        match self.current_conversion {
            Conversion::Temperature => self.compensate_temperature(raw),
            Conversion::Pressure => self.compensate_pressure(raw),
        }

        Ok(())
    }

    /// One full conversion sequence: start, wait out the conversion
    /// time, read back and compensate.
    pub async fn convert(&mut self, kind: Conversion) -> Result<(), Error<E>> {
        self.start_conversion(kind).await?;
        let ms = self.config.osr.conversion_delay_ms();
        self.delay.delay_ms(ms).await;
        self.read_adc().await
    }

    /// Latest readings scaled to physical units, with altitude derived
    /// from the international barometric formula.
    pub fn sample(&self) -> BaroSample {
        let temperature = self.temperature_unscaled as f32 / 100.0;
        let pressure = self.pressure_unscaled as f32 / 1000.0;
        let altitude = 44330.0
            * (1.0 - (pressure / STANDARD_PRESSURE_KPA).powf(1.0 / 5.255));
        BaroSample { temperature, pressure, altitude }
    }

    fn compensate_temperature(&mut self, raw: u32) {
        self.delta_temp =
            i64::from(raw) - (i64::from(self.calibration[4]) << 8);

        let temperature = 2000
            + ((self.delta_temp * i64::from(self.calibration[5])) >> 23);
        self.temperature_coarse = temperature;
        self.temperature_unscaled = temperature;

        // Second order temperature compensation.
        if temperature < 2000 {
            self.temperature_unscaled -=
                (self.delta_temp * self.delta_temp) >> 31;
        }
    }

    fn compensate_pressure(&mut self, raw: u32) {
        // The quadratic low-temperature terms use the uncorrected
        // temperature from the latest temperature pass, while the
        // deep-cold branch checks the corrected one. Mixed on purpose:
        // this is what the vendor's reference code does.
        let temperature = self.temperature_coarse;

        let mut offset = (i64::from(self.calibration[1]) << 16)
            + ((i64::from(self.calibration[3]) * self.delta_temp) >> 7);
        let mut sens = (i64::from(self.calibration[0]) << 15)
            + ((i64::from(self.calibration[2]) * self.delta_temp) >> 8);

        if temperature < 2000 {
            offset -=
                (5 * (temperature - 2000) * (temperature - 2000)) >> 1;
            sens -= (5 * (temperature - 2000) * (temperature - 2000)) >> 2;

            if self.temperature_unscaled < -1500 {
                offset -= 7 * (temperature + 1500) * (temperature + 1500);
                sens -=
                    (11 * (temperature + 1500) * (temperature + 1500)) >> 1;
            }
        }

        self.pressure_unscaled =
            (((i64::from(raw) * sens) >> 21) - offset) >> 15;
    }

    /// One framed write: claim, select, command byte, deselect, release.
    async fn write_command(&mut self, command: u8) -> Result<(), Error<E>> {
        self.bus.claim().await.map_err(Error::BusClaim)?;
        self.bus.select();

        let result = self.bus.transfer(command).await;

        self.bus.deselect();
        self.bus.release();

        result.map(|_| ()).map_err(Error::BusTransfer)
    }

    /// One framed read: claim, select, command byte, clock `rx` in,
    /// deselect, release. The bus is released on every exit path.
    async fn read_registers(
        &mut self,
        command: u8,
        rx: &mut [u8],
    ) -> Result<(), Error<E>> {
        self.bus.claim().await.map_err(Error::BusClaim)?;
        self.bus.select();

        let result = match self.bus.transfer(command).await {
            Ok(_) => self.bus.read(rx).await,
            Err(e) => Err(e),
        };

        self.bus.deselect();
        self.bus.release();

        result.map_err(Error::BusTransfer)
    }
}

/// Run one full temperature cycle and one full pressure cycle, then check
/// the results against the datasheet operating range: -40.00..85.00 deg C
/// and 10..120 kPa.
///
/// Each cycle holds the device lock for its whole start/wait/read
/// sequence, so a concurrently running [`BaroSampler`](crate::BaroSampler)
/// is excluded cycle-by-cycle rather than starved.
pub async fn self_test<M, BUS, D, E>(
    dev: &Mutex<M, Ms5611<BUS, D>>,
) -> Result<(), Error<E>>
where
    M: RawMutex,
    BUS: BaroBus<Error = E>,
    E: core::fmt::Debug,
    D: DelayNs,
{
    {
        let mut dev = dev.lock().await;
        dev.convert(Conversion::Temperature).await?;
    }

    {
        let mut dev = dev.lock().await;
        dev.convert(Conversion::Pressure).await?;
    }

    let dev = dev.lock().await;
    if dev.temperature_unscaled() < -4000
        || dev.temperature_unscaled() > 8500
        || dev.pressure_unscaled() < 1000
        || dev.pressure_unscaled() > 120000
    {
        return Err(Error::OutOfRange);
    }

    Ok(())
}
