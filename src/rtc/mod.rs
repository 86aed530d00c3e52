//! RTC Module - Contract der externen Engine
//!
//! Dieses Modul kapselt alles, was von der externen Engine konsumiert wird:
//! - Factory-, Engine- und Channel-Handle-Traits
//! - Event-Typen der Handles
//! - Eine simulierte Engine für Demo und Tests
//!

mod contract;
mod events;
mod sim;

pub use contract::{
    ChannelMediaOptions, RtcChannelHandle, RtcEngineHandle, RtcError, RtcService,
};
pub use events::{RtcEvent, Uid};
pub use sim::{SimulatedChannelHandle, SimulatedEngineHandle, SimulatedRtc};
