//! Message catalog: the embedded protocol table, its descriptor index, and
//! DBC interchange.

pub mod dbc;
pub mod entries;
mod table;

pub use table::{CatalogStats, DescriptorTable};

/// Identifiers the surrounding application acts on directly
pub mod ids {
    /// Master acknowledges a node or sub-module identity frame
    pub const ACK_INTRO: u16 = 0x400;
    /// Ask every node to re-introduce itself
    pub const REQ_NODE_INTRO: u16 = 0x401;
    pub const SYS_HALT_OPERATION: u16 = 0x402;
    pub const SYS_RESUME_OPERATION: u16 = 0x403;
    /// Heartbeat / RTC sync: node ID (u32 BE) + unix seconds (u32 BE)
    pub const EPOCH: u16 = 0x40C;
    pub const NODE_COMMIT_CFG: u16 = 0x41D;
    pub const CFG_WRITE_NVS: u16 = 0x436;
    /// Node ID (u32 BE) + knob ADC millivolts (u16 BE)
    pub const DATA_KNOB: u16 = 0x518;
    /// Node ID (u32 BE) + CPU temperature in celsius (f32 BE)
    pub const DATA_CPU_TEMP: u16 = 0x51A;
    pub const DATA_CONFIG_CRC: u16 = 0x526;
    pub const DATA_CFGWRITE_FAILED: u16 = 0x528;
    /// Binds a logical sensor channel to one identifier of the dynamic band
    pub const DATA_SENSOR_MSG: u16 = 0x529;
    pub const IFACE_CYD_TOUCH: u16 = 0x792;
    pub const IFACE_ARGB_MULTI: u16 = 0x79C;

    /// Sub-module identity frames
    pub const SUBMODULE_INTRO_FIRST: u16 = 0x700;
    pub const SUBMODULE_INTRO_LAST: u16 = 0x74F;
    /// Node identity frames
    pub const NODE_INTRO_FIRST: u16 = 0x780;
    pub const NODE_INTRO_LAST: u16 = 0x79F;
}
