//! Command implementations
//!
//! Each variant carries the working state it needs between ticks. Setup and
//! execute borrow the driver and timer from the dispatcher for one call.

use super::dispatcher::DispatcherConfig;
use super::SessionError;
use crate::devices::imu::{ImuError, Mpu9250};
use crate::platform::{RegisterBus, TimerInterface};
use heapless::Vec;
use imu_stream_core::ahrs::{
    AttitudeFilter, AttitudeState, DeltaTimer, FilterConfig, FilterOutcome, FusionAlgorithm,
    FusionInput, OrientationFilter,
};
use imu_stream_core::protocol::{CommandCode, CommandRequest, Packet, PacketWriter};

/// Most packets a single execute can produce (register dump)
pub const MAX_PACKETS_PER_TICK: usize = 3;

/// Register bytes carried per dump packet, after the start-address marker
const DUMP_CHUNK_LEN: usize = 60;

/// Acknowledgment payload of the Stop command
const STOP_ACK: u8 = 1;

/// Payload of the failure packet
const FAILURE: u8 = 0;

/// Output of one execute step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Packets to send, in order
    pub packets: Vec<Packet, MAX_PACKETS_PER_TICK>,
    /// Delay after each sent packet (ms)
    pub packet_delay_ms: u32,
    /// Whether execute should run again on the next tick
    pub keep_running: bool,
}

impl Execution {
    fn done() -> Self {
        Self {
            packets: Vec::new(),
            packet_delay_ms: 0,
            keep_running: false,
        }
    }

    /// Nothing to send, run again next tick
    fn waiting() -> Self {
        Self {
            keep_running: true,
            ..Self::done()
        }
    }

    fn push(&mut self, packet: Packet) {
        if self.packets.push(packet).is_err() {
            crate::log_error!("Packet batch full, dropping packet");
        }
    }
}

/// Working state of a StartStreaming session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamingSession {
    filter: OrientationFilter,
    initial_orientation: [f32; 4],
    state: AttitudeState,
    delta: DeltaTimer,
    counter: u32,
    threshold: u32,
}

impl StreamingSession {
    /// Create a session emitting one packet every `threshold` ticks
    ///
    /// A threshold of 0 is treated as 1.
    pub fn new(algorithm: FusionAlgorithm, threshold: u32, filter: &FilterConfig) -> Self {
        Self {
            filter: OrientationFilter::new(algorithm, &filter.gains),
            initial_orientation: filter.initial_orientation,
            state: AttitudeState::new(filter.initial_orientation),
            delta: DeltaTimer::new(0),
            counter: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn algorithm(&self) -> FusionAlgorithm {
        self.filter.algorithm()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Current attitude estimate
    pub fn state(&self) -> &AttitudeState {
        &self.state
    }

    fn reset<T: TimerInterface>(&mut self, timer: &T) {
        self.state = AttitudeState::new(self.initial_orientation);
        self.counter = 0;
        self.delta = DeltaTimer::new(timer.now_us() as u32);
    }

    fn execute<B: RegisterBus, T: TimerInterface>(
        &mut self,
        imu: &mut Mpu9250<B>,
        timer: &mut T,
        config: &DispatcherConfig,
    ) -> Result<Execution, SessionError> {
        let read = match imu.data_ready() {
            Ok(true) => imu.read_sample().map(Some),
            Ok(false) => Ok(None),
            Err(e) => Err(e),
        };
        let sample = match read {
            Ok(Some(sample)) => sample,
            Ok(None) => return Ok(Execution::waiting()),
            Err(ImuError::Bus(_e)) => {
                crate::log_warn!("Sample read failed, skipping tick: {}", _e.as_str());
                return Ok(Execution::waiting());
            }
            Err(e) => return Err(e.into()),
        };
        let dt = self.delta.update(timer.now_us() as u32);

        let input = FusionInput {
            accel: sample.accel,
            gyro: sample.gyro,
            mag: sample.mag,
        };
        if self.filter.update(&mut self.state, &input, dt) == FilterOutcome::Skipped {
            crate::log_trace!("Filter tick skipped: zero accel or mag");
        }

        let mut execution = Execution {
            packets: Vec::new(),
            packet_delay_ms: config.stream_packet_delay_ms,
            keep_running: true,
        };

        self.counter = (self.counter + 1) % self.threshold;
        if self.counter == 0 {
            let rate = if dt > 0.0 { 1.0 / dt } else { 0.0 };
            let mut writer = PacketWriter::start(CommandCode::StartStreaming.as_u8(), false);
            writer.push_f32_slice(&sample.to_array())?;
            writer.push_f32_slice(&self.state.to_array())?;
            writer.push_f32(rate)?;
            execution.push(writer.finish());
        }
        Ok(execution)
    }
}

/// Active command and its working state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Stream fused orientation and scaled samples
    StartStreaming(StreamingSession),
    /// Acknowledge and go quiet
    Stop,
    /// Solve magnetometer hard/soft-iron correction
    CalibrateMagnetometer,
    /// Send the register file; optionally set the device up first
    DumpRegisters { reinitialize: bool },
}

impl Command {
    /// Build the command for a decoded request
    pub fn from_request(request: &CommandRequest<'_>, config: &DispatcherConfig) -> Self {
        match request.code {
            CommandCode::StartStreaming => {
                let threshold = match request.arg(0) {
                    Some(0) => {
                        crate::log_warn!("Decimation threshold 0, using 1");
                        1
                    }
                    Some(value) => u32::from(value),
                    None => config.default_threshold,
                };
                let algorithm = match request.arg(1) {
                    Some(selector) => FusionAlgorithm::from_selector(selector).unwrap_or_else(|| {
                        crate::log_warn!("Unknown fusion algorithm {}, using Madgwick", selector);
                        FusionAlgorithm::Madgwick
                    }),
                    None => FusionAlgorithm::default(),
                };
                Command::StartStreaming(StreamingSession::new(algorithm, threshold, &config.filter))
            }
            CommandCode::Stop => Command::Stop,
            CommandCode::CalibrateMagnetometer => Command::CalibrateMagnetometer,
            CommandCode::DumpRegisters => Command::DumpRegisters {
                reinitialize: request.arg(0).is_some_and(|flag| flag != 0),
            },
        }
    }

    pub fn code(&self) -> CommandCode {
        match self {
            Command::StartStreaming(_) => CommandCode::StartStreaming,
            Command::Stop => CommandCode::Stop,
            Command::CalibrateMagnetometer => CommandCode::CalibrateMagnetometer,
            Command::DumpRegisters { .. } => CommandCode::DumpRegisters,
        }
    }

    /// Run once before the first execute
    pub fn setup<B: RegisterBus, T: TimerInterface>(
        &mut self,
        imu: &mut Mpu9250<B>,
        timer: &mut T,
        config: &DispatcherConfig,
    ) -> Result<(), SessionError> {
        match self {
            Command::StartStreaming(session) => {
                imu.setup(timer)?;
                session.reset(timer);
                crate::log_info!(
                    "Streaming with {}, one packet every {} samples",
                    session.algorithm().as_str(),
                    session.threshold()
                );
            }
            Command::Stop => {}
            Command::CalibrateMagnetometer => {
                imu.to_bypass_mode(timer)?;
                imu.ak8963_setup_direct(timer)?;
                timer
                    .delay_ms(config.mag_setup_delay_ms)
                    .map_err(ImuError::from)?;
            }
            Command::DumpRegisters { reinitialize } => {
                if *reinitialize {
                    imu.setup(timer)?;
                }
            }
        }
        Ok(())
    }

    /// Run one tick
    pub fn execute<B: RegisterBus, T: TimerInterface>(
        &mut self,
        imu: &mut Mpu9250<B>,
        timer: &mut T,
        config: &DispatcherConfig,
    ) -> Result<Execution, SessionError> {
        match self {
            Command::StartStreaming(session) => session.execute(imu, timer, config),
            Command::Stop => {
                let mut execution = Execution::done();
                execution.push(Packet::with_payload(CommandCode::Stop.as_u8(), &[STOP_ACK], true)?);
                Ok(execution)
            }
            Command::CalibrateMagnetometer => {
                let mut execution = Execution::done();
                match imu.calibrate_magnetometer(timer) {
                    Ok(correction) => {
                        let mut writer =
                            PacketWriter::start(CommandCode::CalibrateMagnetometer.as_u8(), true);
                        writer.push_f32_slice(&correction.bias)?;
                        writer.push_f32_slice(&correction.scale)?;
                        execution.push(writer.finish());
                    }
                    Err(ImuError::Calibration(_e)) => {
                        crate::log_error!("Magnetometer calibration failed: {}", _e.as_str());
                        execution.push(failure_packet(CommandCode::CalibrateMagnetometer)?);
                    }
                    Err(e) => return Err(e.into()),
                }
                Ok(execution)
            }
            Command::DumpRegisters { .. } => {
                let regs = imu.read_register_dump()?;
                timer
                    .delay_ms(config.dump_packet_delay_ms)
                    .map_err(ImuError::from)?;

                let mut execution = Execution::done();
                execution.packet_delay_ms = config.dump_packet_delay_ms;
                let chunks = regs.len().div_ceil(DUMP_CHUNK_LEN);
                for (index, chunk) in regs.chunks(DUMP_CHUNK_LEN).enumerate() {
                    let mut writer = PacketWriter::start(
                        CommandCode::DumpRegisters.as_u8(),
                        index + 1 == chunks,
                    );
                    writer.push_u8((index * DUMP_CHUNK_LEN) as u8)?;
                    writer.push_bytes(chunk)?;
                    execution.push(writer.finish());
                }
                Ok(execution)
            }
        }
    }
}

/// One-byte `[0]` packet marked final
pub fn failure_packet(code: CommandCode) -> Result<Packet, SessionError> {
    Ok(Packet::with_payload(code.as_u8(), &[FAILURE], true)?)
}
