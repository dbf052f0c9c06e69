use crate::register::{
    EmitPolicy::{LatestValue, WindowAverage},
    RegisterSpec,
    Width::{S32, U16, U32},
};

/// First input register of the poll (5001 in Sungrow's 1-based documentation).
pub const BLOCK_START: u16 = 0x1388;
/// Registers requested per poll; covers every footprint in `REGISTERS`.
pub const BLOCK_LEN: u16 = 105;

/// Tag attached to every InfluxDB point.
pub const SENSOR: &str = "Sungrow-SG8K-D";

pub const FEEDER_POWER: u16 = 82;
pub const LOAD_POWER: u16 = 90;

/// Addresses whose decoded values get clamped to 0 above `OUTLIER_LIMIT`.
pub const OUTLIER_ADDRESSES: [u16; 2] = [FEEDER_POWER, LOAD_POWER];
pub const OUTLIER_LIMIT: f64 = 200_000_000.0;

pub static REGISTERS: [RegisterSpec; 30] = [
    RegisterSpec::new("Nominal_output_power", "Nominal output power", 0, U16, 0.1, LatestValue),
    RegisterSpec::new("Output_type", "Output type", 1, U16, 1.0, LatestValue),
    RegisterSpec::new("Daily_power", "Daily power", 2, U16, 0.1, LatestValue),
    RegisterSpec::new("Total_power_yield", "Total power yield", 3, U32, 1.0, LatestValue),
    RegisterSpec::new("Total_running_time", "Total running time", 5, U32, 1.0, LatestValue),
    RegisterSpec::new("Internal_temperature", "Internal temperature", 7, U16, 0.1, WindowAverage),
    RegisterSpec::new("DC_voltage_of_MPPT1", "DC voltage of MPPT1", 10, U16, 0.1, WindowAverage),
    RegisterSpec::new("DC_current_of_MPPT1", "DC current of MPPT1", 11, U16, 0.1, WindowAverage),
    RegisterSpec::new("DC_voltage_of_MPPT2", "DC voltage of MPPT2", 12, U16, 0.1, WindowAverage),
    RegisterSpec::new("DC_current_of_MPPT2", "DC current of MPPT2", 13, U16, 0.1, WindowAverage),
    RegisterSpec::new("Total_DC_power", "Total DC power", 16, U32, 1.0, WindowAverage),
    RegisterSpec::new("Phase_A_voltage", "Phase A voltage", 18, U16, 0.1, WindowAverage),
    RegisterSpec::new("Phase_A_current", "Phase A current", 21, U16, 0.1, WindowAverage),
    RegisterSpec::new("Total_active_power", "Total active power", 30, U32, 1.0, WindowAverage),
    RegisterSpec::new("Total_reactive_power", "Total reactive power", 32, S32, 1.0, WindowAverage),
    // signed on the device, but read as U16 like the rest of this block
    RegisterSpec::new("Power_factor", "Power factor", 34, U16, 0.1, WindowAverage),
    RegisterSpec::new("Grid_frequency", "Grid frequency", 35, U16, 0.1, WindowAverage),
    RegisterSpec::new("Work_state", "Work state", 37, U16, 1.0, LatestValue),
    RegisterSpec::new("Fault_year", "Fault year", 38, U16, 1.0, LatestValue),
    RegisterSpec::new("Fault_month", "Fault month", 39, U16, 1.0, LatestValue),
    RegisterSpec::new("Fault_day", "Fault day", 40, U16, 1.0, LatestValue),
    RegisterSpec::new("Fault_hour", "Fault hour", 41, U16, 1.0, LatestValue),
    RegisterSpec::new("Fault_minute", "Fault minute", 42, U16, 1.0, LatestValue),
    RegisterSpec::new("Fault_second", "Fault second", 43, U16, 1.0, LatestValue),
    RegisterSpec::new("Fault_code", "Fault code", 44, U16, 1.0, LatestValue),
    RegisterSpec::new("Nominal_reactive_output_power", "Nominal reactive output power", 48, U16, 0.1, WindowAverage),
    RegisterSpec::new("Impedance_to_ground", "Impedance to ground", 70, U16, 1.0, WindowAverage),
    RegisterSpec::new("Work_state_2", "Work state 2", 80, U32, 1.0, LatestValue),
    RegisterSpec::new("Feeder_power", "Feeder power", FEEDER_POWER, S32, 1.0, WindowAverage),
    RegisterSpec::new("Load_power", "Load power", LOAD_POWER, S32, 1.0, WindowAverage),
];
