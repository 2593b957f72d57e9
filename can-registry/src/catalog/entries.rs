//! Embedded protocol table
//!
//! One row per named message, one row per run of reserved identifiers. Rows
//! are expanded into per-identifier descriptors by
//! [`DescriptorTable`](super::DescriptorTable).

use crate::types::Category::{self, *};

/// What a catalog row describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A single named message
    Named {
        name: &'static str,
        comment: &'static str,
    },
    /// Placeholder identifiers with a known frame shape
    Reserved,
    /// Private 64-bit sensor payloads, remappable at runtime
    PrivateSensor,
}

/// A row of the embedded table covering `first..=last`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEntry {
    pub first: u16,
    pub last: u16,
    pub length: u8,
    pub category: Category,
    pub kind: EntryKind,
}

impl RawEntry {
    pub const fn named(
        id: u16,
        length: u8,
        name: &'static str,
        comment: &'static str,
        category: Category,
    ) -> Self {
        Self {
            first: id,
            last: id,
            length,
            category,
            kind: EntryKind::Named { name, comment },
        }
    }

    pub const fn reserved(first: u16, last: u16, length: u8, category: Category) -> Self {
        Self {
            first,
            last,
            length,
            category,
            kind: EntryKind::Reserved,
        }
    }

    pub const fn private_sensor(first: u16, last: u16) -> Self {
        Self {
            first,
            last,
            length: 8,
            category: SensorData,
            kind: EntryKind::PrivateSensor,
        }
    }
}

use RawEntry as E;

/// The master bus protocol, ascending by identifier
pub const CATALOG: &[RawEntry] = &[
    // 0x100 error / alarm
    E::named(0x100, 8, "ERR_GENERAL_FAULT", "Node ID + fault code + detail", ErrorAlarm),
    E::named(0x101, 4, "ERR_BUS_OFF", "Node recovered from bus-off", ErrorAlarm),
    E::named(0x102, 8, "ERR_OVER_TEMP", "Node ID + temperature (float)", ErrorAlarm),
    E::named(0x103, 8, "ERR_UNDER_VOLTAGE", "Node ID + supply voltage (float)", ErrorAlarm),
    E::named(0x104, 8, "ERR_OVER_CURRENT", "Node ID + sub-module + current (mA)", ErrorAlarm),
    E::named(0x105, 6, "ERR_CFG_CRC_MISMATCH", "Node ID + stored config CRC", ErrorAlarm),
    E::reserved(0x106, 0x10F, 8, ErrorAlarm),
    // 0x110 switch control
    E::named(0x110, 6, "SW_SET_STATE", "Node ID + sub-module + on/off", SwitchControl),
    E::named(0x111, 5, "SW_TOGGLE", "Node ID + sub-module", SwitchControl),
    E::named(0x112, 6, "SW_SET_MODE", "Node ID + sub-module + mode", SwitchControl),
    E::named(0x113, 7, "SW_MOMENTARY", "Node ID + sub-module + pulse ms", SwitchControl),
    E::named(0x114, 7, "SW_SET_PWM_DUTY", "Node ID + sub-module + duty", SwitchControl),
    E::named(0x115, 8, "SW_SET_STROBE", "Node ID + sub-module + on ms + off ms", SwitchControl),
    E::named(0x116, 6, "SW_STATE_REPORT", "Node ID + sub-module + state", SwitchControl),
    E::reserved(0x117, 0x13F, 8, SwitchControl),
    // 0x200 display / LED / button config
    E::named(0x200, 6, "DISP_SET_BACKLIGHT", "Node ID + sub-module + level", DisplayConfig),
    E::named(0x201, 5, "DISP_CLEAR", "Node ID + sub-module", DisplayConfig),
    E::named(0x202, 6, "DISP_SET_PAGE", "Node ID + sub-module + page", DisplayConfig),
    E::reserved(0x203, 0x20F, 8, DisplayConfig),
    E::named(0x210, 8, "LED_SET_COLOR", "Node ID + sub-module + RGB", DisplayConfig),
    E::named(0x211, 6, "LED_SET_BRIGHTNESS", "Node ID + sub-module + level", DisplayConfig),
    E::named(0x212, 7, "ARGB_SET_EFFECT", "Node ID + sub-module + effect + speed", DisplayConfig),
    E::named(0x213, 8, "ARGB_SET_SEGMENT", "Node ID + segment + RGB", DisplayConfig),
    E::reserved(0x214, 0x21F, 8, DisplayConfig),
    E::named(0x220, 6, "BTN_PRESS_EVENT", "Node ID + sub-module + press type", DisplayConfig),
    E::named(0x221, 7, "BTN_CONFIG", "Node ID + sub-module + debounce ms", DisplayConfig),
    E::reserved(0x222, 0x23F, 8, DisplayConfig),
    // 0x400 introduction / system
    E::named(0x400, 4, "ACK_INTRO", "Master acknowledges an identity frame", Introduction),
    E::named(0x401, 4, "REQ_NODE_INTRO", "Request all nodes to introduce themselves", Introduction),
    E::named(0x402, 0, "SYS_HALT_OPERATION", "Halt all bus operation", Introduction),
    E::named(0x403, 0, "SYS_RESUME_OPERATION", "Resume bus operation", Introduction),
    E::reserved(0x404, 0x40B, 8, Introduction),
    E::named(0x40C, 8, "EPOCH", "Heartbeat / RTC sync: node ID + unix time", Introduction),
    E::reserved(0x40D, 0x41A, 8, Introduction),
    E::named(0x41B, 4, "NODE_ERASE_CFG", "Node ID", Introduction),
    E::named(0x41C, 4, "NODE_REBOOT", "Node ID", Introduction),
    E::named(0x41D, 8, "NODE_COMMIT_CFG", "Node ID + config CRC", Introduction),
    E::reserved(0x41E, 0x41F, 8, Introduction),
    // 0x420 configuration
    E::named(0x420, 8, "CFG_ANALOG_STRIP", "Analog strip sub-module config", Configuration),
    E::named(0x421, 8, "CFG_ARGB_STRIP", "ARGB strip sub-module config", Configuration),
    E::reserved(0x422, 0x428, 8, Configuration),
    E::named(0x429, 8, "CFG_SUB_RAW_DATA", "Node ID + sub-module + raw config", Configuration),
    E::reserved(0x42A, 0x42B, 8, Configuration),
    E::named(0x42C, 8, "CFG_SUB_DATA_MSG", "Node ID + sub-module + data msg ID", Configuration),
    E::named(0x42D, 8, "CFG_SUB_INTRO_MSG", "Node ID + sub-module + intro msg ID", Configuration),
    E::reserved(0x42E, 0x42E, 8, Configuration),
    E::named(0x42F, 4, "COLORPICKER_WRITE_NVS", "Persist color picker node list", Configuration),
    E::reserved(0x430, 0x432, 8, Configuration),
    E::named(0x433, 8, "COLORPICKER_ADD_NODE", "Target node ID + sub-module", Configuration),
    E::named(0x434, 4, "CFG_ERASE_NVS", "Node ID", Configuration),
    E::named(0x435, 4, "CFG_REBOOT", "Node ID", Configuration),
    E::named(0x436, 6, "CFG_WRITE_NVS", "Node ID + config CRC", Configuration),
    E::reserved(0x437, 0x43D, 8, Configuration),
    E::named(0x43E, 8, "CFG_ANALOG_OUT", "Analog output sub-module config", Configuration),
    E::named(0x43F, 8, "CFG_PWM_OUT", "PWM output sub-module config", Configuration),
    // 0x500 sensor / data report
    E::named(0x500, 8, "DATA_ANALOG_IN", "Node ID + sub-module + mV", SensorData),
    E::named(0x501, 6, "DATA_DIGITAL_IN", "Node ID + sub-module + level", SensorData),
    E::named(0x502, 8, "DATA_AMBIENT_LIGHT", "USE PRIV MSG", SensorData),
    E::named(0x503, 8, "DATA_IMU_X", "USE PRIV MSG", SensorData),
    E::named(0x504, 8, "DATA_IMU_Y", "USE PRIV MSG", SensorData),
    E::named(0x505, 8, "DATA_IMU_Z", "USE PRIV MSG", SensorData),
    E::reserved(0x506, 0x50F, 8, SensorData),
    E::named(0x510, 8, "DATA_BUS_VOLTAGE", "Node ID + volts (float)", SensorData),
    E::named(0x511, 8, "DATA_BUS_CURRENT", "Node ID + amps (float)", SensorData),
    E::reserved(0x512, 0x517, 8, SensorData),
    E::named(0x518, 7, "DATA_KNOB", "Node ID + ADC mV + sub-module", SensorData),
    E::reserved(0x519, 0x519, 8, SensorData),
    E::named(0x51A, 8, "DATA_CPU_TEMP", "Node ID + celsius (float)", SensorData),
    E::reserved(0x51B, 0x525, 8, SensorData),
    E::named(0x526, 6, "DATA_CONFIG_CRC", "Node ID + stored config CRC", SensorData),
    E::reserved(0x527, 0x527, 8, SensorData),
    E::named(0x528, 4, "DATA_CFGWRITE_FAILED", "Node ID", SensorData),
    E::named(0x529, 8, "DATA_SENSOR_MSG", "Node ID + private msg ID + channel", SensorData),
    E::private_sensor(0x52A, 0x53F),
    // 0x700 display / input / sensor descriptors
    E::named(0x700, 8, "INTRO_ANALOG_STRIP", "Analog LED strip", DeviceDescriptor),
    E::named(0x701, 8, "INTRO_ARGBW_STRIP", "ARGBW strip", DeviceDescriptor),
    E::named(0x702, 8, "INTRO_ARGB_STRIP", "ARGB strip", DeviceDescriptor),
    E::reserved(0x703, 0x709, 8, DeviceDescriptor),
    E::named(0x70A, 8, "INTRO_ANALOG_BACKLIGHT", "Analog backlight", DeviceDescriptor),
    E::named(0x70B, 8, "INTRO_LCD_TOUCH", "LCD with touch", DeviceDescriptor),
    E::reserved(0x70C, 0x70F, 8, DeviceDescriptor),
    E::named(0x710, 8, "INTRO_ANALOG_IN", "Analog input", DeviceDescriptor),
    E::named(0x711, 8, "INTRO_DIGITAL_IN", "Digital input", DeviceDescriptor),
    E::named(0x712, 8, "INTRO_KNOB", "Rotary knob", DeviceDescriptor),
    E::named(0x713, 8, "INTRO_TEMP_SENSOR", "Temperature sensor", DeviceDescriptor),
    E::named(0x714, 8, "INTRO_IMU", "Inertial measurement unit", DeviceDescriptor),
    E::named(0x715, 8, "INTRO_STROBE_OUT", "Strobe output", DeviceDescriptor),
    E::reserved(0x716, 0x73F, 8, DeviceDescriptor),
    // 0x740 output descriptors
    E::named(0x740, 8, "INTRO_RELAY_OUT", "Relay output", OutputDescriptor),
    E::reserved(0x741, 0x743, 8, OutputDescriptor),
    E::named(0x744, 8, "INTRO_DIGITAL_OUT", "Digital output", OutputDescriptor),
    E::named(0x745, 8, "INTRO_PWM_OUT", "PWM output", OutputDescriptor),
    E::reserved(0x746, 0x74F, 8, OutputDescriptor),
    // 0x750 introduction / system reserved
    E::reserved(0x750, 0x77F, 8, Reserved),
    // 0x780 interface / enclosure descriptors
    E::named(0x780, 8, "IFACE_GENERIC", "Generic node enclosure", InterfaceDescriptor),
    E::reserved(0x781, 0x791, 8, InterfaceDescriptor),
    E::named(0x792, 8, "IFACE_CYD_TOUCH", "CYD touchscreen node identity", InterfaceDescriptor),
    E::reserved(0x793, 0x79B, 8, InterfaceDescriptor),
    E::named(0x79C, 8, "IFACE_ARGB_MULTI", "Standard multi-ARGB node identity", InterfaceDescriptor),
    E::reserved(0x79D, 0x79F, 8, InterfaceDescriptor),
];
