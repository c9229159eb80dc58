//! CAN device configuration carried in `IFLA_LINKINFO`
//!
//! Layouts follow `linux/can/netlink.h`, host byte order.

use bytes::{BufMut, BytesMut};
use wirefmt_core::{array_at, ensure_len, Result};

use super::attr::{decode_attributes, find, Attribute};
use super::{IFLA_INFO_DATA, IFLA_INFO_KIND, IFLA_INFO_XSTATS, IFLA_LINKINFO};

pub const IFLA_CAN_BITTIMING: u16 = 1;
pub const IFLA_CAN_BITTIMING_CONST: u16 = 2;
pub const IFLA_CAN_CLOCK: u16 = 3;
pub const IFLA_CAN_STATE: u16 = 4;
pub const IFLA_CAN_CTRLMODE: u16 = 5;
pub const IFLA_CAN_RESTART_MS: u16 = 6;
pub const IFLA_CAN_RESTART: u16 = 7;
pub const IFLA_CAN_BERR_COUNTER: u16 = 8;
pub const IFLA_CAN_DATA_BITTIMING: u16 = 9;
pub const IFLA_CAN_DATA_BITTIMING_CONST: u16 = 10;

// Controller mode flags
pub const CAN_CTRLMODE_LOOPBACK: u32 = 0x01;
pub const CAN_CTRLMODE_LISTENONLY: u32 = 0x02;
pub const CAN_CTRLMODE_3_SAMPLES: u32 = 0x04;
pub const CAN_CTRLMODE_ONE_SHOT: u32 = 0x08;
pub const CAN_CTRLMODE_BERR_REPORTING: u32 = 0x10;
pub const CAN_CTRLMODE_FD: u32 = 0x20;

/// Value of `IFLA_INFO_KIND` for CAN devices
pub const CAN_LINK_KIND: &str = "can";

fn read_u32s<const N: usize>(data: &[u8], base: usize) -> Result<[u32; N]> {
    let mut words = [0u32; N];
    for (i, word) in words.iter_mut().enumerate() {
        *word = u32::from_ne_bytes(array_at(data, base + i * 4)?);
    }
    Ok(words)
}

fn write_u32s(buf: &mut BytesMut, words: &[u32]) {
    for word in words {
        buf.put_slice(&word.to_ne_bytes());
    }
}

/// `struct can_bittiming`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanBitTiming {
    /// Bit rate in bits/second
    pub bitrate: u32,
    /// Sample point in one-tenth of a percent
    pub sample_point: u32,
    /// Time quantum in nanoseconds
    pub tq: u32,
    pub prop_seg: u32,
    pub phase_seg1: u32,
    pub phase_seg2: u32,
    /// Synchronisation jump width in time quanta
    pub sjw: u32,
    /// Bit-rate prescaler
    pub brp: u32,
}

impl CanBitTiming {
    pub const SIZE: usize = 32;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "can_bittiming")?;
        let [bitrate, sample_point, tq, prop_seg, phase_seg1, phase_seg2, sjw, brp] =
            read_u32s::<8>(data, 0)?;
        Ok(CanBitTiming {
            bitrate,
            sample_point,
            tq,
            prop_seg,
            phase_seg1,
            phase_seg2,
            sjw,
            brp,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        write_u32s(
            &mut buf,
            &[
                self.bitrate,
                self.sample_point,
                self.tq,
                self.prop_seg,
                self.phase_seg1,
                self.phase_seg2,
                self.sjw,
                self.brp,
            ],
        );
        buf.to_vec()
    }
}

/// `struct can_bittiming_const`: hardware limits reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanBitTimingConst {
    /// Driver name, NUL padded
    pub name: [u8; 16],
    pub tseg1_min: u32,
    pub tseg1_max: u32,
    pub tseg2_min: u32,
    pub tseg2_max: u32,
    pub sjw_max: u32,
    pub brp_min: u32,
    pub brp_max: u32,
    pub brp_inc: u32,
}

impl CanBitTimingConst {
    pub const SIZE: usize = 48;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "can_bittiming_const")?;
        let [tseg1_min, tseg1_max, tseg2_min, tseg2_max, sjw_max, brp_min, brp_max, brp_inc] =
            read_u32s::<8>(data, 16)?;
        Ok(CanBitTimingConst {
            name: array_at(data, 0)?,
            tseg1_min,
            tseg1_max,
            tseg2_min,
            tseg2_max,
            sjw_max,
            brp_min,
            brp_max,
            brp_inc,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_slice(&self.name);
        write_u32s(
            &mut buf,
            &[
                self.tseg1_min,
                self.tseg1_max,
                self.tseg2_min,
                self.tseg2_max,
                self.sjw_max,
                self.brp_min,
                self.brp_max,
                self.brp_inc,
            ],
        );
        buf.to_vec()
    }

    /// Driver name up to the first NUL
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

/// `struct can_device_stats`, reported through `IFLA_INFO_XSTATS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanDeviceStats {
    pub bus_error: u32,
    pub error_warning: u32,
    pub error_passive: u32,
    pub bus_off: u32,
    pub arbitration_lost: u32,
    pub restarts: u32,
}

impl CanDeviceStats {
    pub const SIZE: usize = 24;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "can_device_stats")?;
        let [bus_error, error_warning, error_passive, bus_off, arbitration_lost, restarts] =
            read_u32s::<6>(data, 0)?;
        Ok(CanDeviceStats {
            bus_error,
            error_warning,
            error_passive,
            bus_off,
            arbitration_lost,
            restarts,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        write_u32s(
            &mut buf,
            &[
                self.bus_error,
                self.error_warning,
                self.error_passive,
                self.bus_off,
                self.arbitration_lost,
                self.restarts,
            ],
        );
        buf.to_vec()
    }
}

/// `struct can_clock`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanClock {
    /// CAN system clock frequency in Hz
    pub freq: u32,
}

impl CanClock {
    pub const SIZE: usize = 4;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "can_clock")?;
        Ok(CanClock {
            freq: u32::from_ne_bytes(array_at(data, 0)?),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.freq.to_ne_bytes().to_vec()
    }
}

/// `struct can_berr_counter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanBerrCounter {
    pub txerr: u16,
    pub rxerr: u16,
}

impl CanBerrCounter {
    pub const SIZE: usize = 4;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "can_berr_counter")?;
        Ok(CanBerrCounter {
            txerr: u16::from_ne_bytes(array_at(data, 0)?),
            rxerr: u16::from_ne_bytes(array_at(data, 2)?),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_slice(&self.txerr.to_ne_bytes());
        buf.put_slice(&self.rxerr.to_ne_bytes());
        buf.to_vec()
    }
}

/// `struct can_ctrlmode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanCtrlMode {
    /// Which bits of `flags` are meaningful
    pub mask: u32,
    pub flags: u32,
}

impl CanCtrlMode {
    pub const SIZE: usize = 8;

    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, Self::SIZE, "can_ctrlmode")?;
        let [mask, flags] = read_u32s::<2>(data, 0)?;
        Ok(CanCtrlMode { mask, flags })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        write_u32s(&mut buf, &[self.mask, self.flags]);
        buf.to_vec()
    }

    pub fn is_set(&self, mode: u32) -> bool {
        self.mask & self.flags & mode == mode
    }
}

/// One decoded `IFLA_CAN_*` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanLinkAttribute {
    BitTiming(CanBitTiming),
    BitTimingConst(CanBitTimingConst),
    Clock(CanClock),
    /// `enum can_state` value
    State(u32),
    CtrlMode(CanCtrlMode),
    RestartMs(u32),
    Restart(u32),
    BerrCounter(CanBerrCounter),
    DataBitTiming(CanBitTiming),
    DataBitTimingConst(CanBitTimingConst),
    /// Kinds without a typed form, kept as received
    Other(Attribute),
}

impl CanLinkAttribute {
    pub fn decode(attr: &Attribute) -> Result<Self> {
        let value = attr.value.as_slice();
        let decoded = match attr.attr_type() {
            IFLA_CAN_BITTIMING => CanLinkAttribute::BitTiming(CanBitTiming::decode(value)?),
            IFLA_CAN_BITTIMING_CONST => {
                CanLinkAttribute::BitTimingConst(CanBitTimingConst::decode(value)?)
            }
            IFLA_CAN_CLOCK => CanLinkAttribute::Clock(CanClock::decode(value)?),
            IFLA_CAN_STATE => CanLinkAttribute::State(attr.as_u32()?),
            IFLA_CAN_CTRLMODE => CanLinkAttribute::CtrlMode(CanCtrlMode::decode(value)?),
            IFLA_CAN_RESTART_MS => CanLinkAttribute::RestartMs(attr.as_u32()?),
            IFLA_CAN_RESTART => CanLinkAttribute::Restart(attr.as_u32()?),
            IFLA_CAN_BERR_COUNTER => {
                CanLinkAttribute::BerrCounter(CanBerrCounter::decode(value)?)
            }
            IFLA_CAN_DATA_BITTIMING => {
                CanLinkAttribute::DataBitTiming(CanBitTiming::decode(value)?)
            }
            IFLA_CAN_DATA_BITTIMING_CONST => {
                CanLinkAttribute::DataBitTimingConst(CanBitTimingConst::decode(value)?)
            }
            _ => CanLinkAttribute::Other(attr.clone()),
        };
        Ok(decoded)
    }

    /// Back to a generic attribute
    pub fn to_attribute(&self) -> Attribute {
        match self {
            CanLinkAttribute::BitTiming(bt) => Attribute::new(IFLA_CAN_BITTIMING, bt.encode()),
            CanLinkAttribute::BitTimingConst(btc) => {
                Attribute::new(IFLA_CAN_BITTIMING_CONST, btc.encode())
            }
            CanLinkAttribute::Clock(clock) => Attribute::new(IFLA_CAN_CLOCK, clock.encode()),
            CanLinkAttribute::State(state) => Attribute::u32(IFLA_CAN_STATE, *state),
            CanLinkAttribute::CtrlMode(mode) => Attribute::new(IFLA_CAN_CTRLMODE, mode.encode()),
            CanLinkAttribute::RestartMs(ms) => Attribute::u32(IFLA_CAN_RESTART_MS, *ms),
            CanLinkAttribute::Restart(v) => Attribute::u32(IFLA_CAN_RESTART, *v),
            CanLinkAttribute::BerrCounter(berr) => {
                Attribute::new(IFLA_CAN_BERR_COUNTER, berr.encode())
            }
            CanLinkAttribute::DataBitTiming(bt) => {
                Attribute::new(IFLA_CAN_DATA_BITTIMING, bt.encode())
            }
            CanLinkAttribute::DataBitTimingConst(btc) => {
                Attribute::new(IFLA_CAN_DATA_BITTIMING_CONST, btc.encode())
            }
            CanLinkAttribute::Other(attr) => attr.clone(),
        }
    }
}

/// Nested `IFLA_LINKINFO` attributes, or `None` when the link is not a CAN device
fn can_link_info(link_attrs: &[Attribute]) -> Result<Option<Vec<Attribute>>> {
    let info = match find(link_attrs, IFLA_LINKINFO) {
        Some(info) => info.nested_attributes()?,
        None => return Ok(None),
    };
    let is_can = match find(&info, IFLA_INFO_KIND) {
        Some(kind) => kind.as_str()? == CAN_LINK_KIND,
        None => false,
    };
    Ok(is_can.then_some(info))
}

/// CAN settings from the attributes of an `RTM_NEWLINK` message.
///
/// Walks `IFLA_LINKINFO -> IFLA_INFO_DATA`; `None` when the link is not a CAN
/// device or carries no data.
pub fn can_link_data(link_attrs: &[Attribute]) -> Result<Option<Vec<CanLinkAttribute>>> {
    let info = match can_link_info(link_attrs)? {
        Some(info) => info,
        None => return Ok(None),
    };
    let data = match find(&info, IFLA_INFO_DATA) {
        Some(data) => decode_attributes(&data.value)?,
        None => return Ok(None),
    };
    data.iter()
        .map(CanLinkAttribute::decode)
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Device statistics from `IFLA_LINKINFO -> IFLA_INFO_XSTATS`
pub fn can_device_stats(link_attrs: &[Attribute]) -> Result<Option<CanDeviceStats>> {
    let info = match can_link_info(link_attrs)? {
        Some(info) => info,
        None => return Ok(None),
    };
    find(&info, IFLA_INFO_XSTATS)
        .map(|xstats| CanDeviceStats::decode(&xstats.value))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::{IFLA_IFNAME, IFLA_MTU};

    fn bittiming() -> CanBitTiming {
        CanBitTiming {
            bitrate: 500_000,
            sample_point: 875,
            tq: 125,
            prop_seg: 6,
            phase_seg1: 7,
            phase_seg2: 2,
            sjw: 1,
            brp: 10,
        }
    }

    fn linkinfo(kind: &str, data: &[Attribute], xstats: Option<CanDeviceStats>) -> Attribute {
        let mut info = vec![
            Attribute::string(IFLA_INFO_KIND, kind),
            Attribute::nested(IFLA_INFO_DATA, data).unwrap(),
        ];
        if let Some(stats) = xstats {
            info.push(Attribute::new(IFLA_INFO_XSTATS, stats.encode()));
        }
        Attribute::nested(IFLA_LINKINFO, &info).unwrap()
    }

    #[test]
    fn test_bittiming_layout() {
        let bytes = bittiming().encode();
        assert_eq!(bytes.len(), CanBitTiming::SIZE);
        assert_eq!(&bytes[0..4], &500_000u32.to_ne_bytes());
        assert_eq!(&bytes[28..32], &10u32.to_ne_bytes());
        assert_eq!(CanBitTiming::decode(&bytes).unwrap(), bittiming());
        assert!(CanBitTiming::decode(&bytes[..31]).unwrap_err().is_truncated());
    }

    #[test]
    fn test_bittiming_const_name() {
        let mut btc = CanBitTimingConst {
            tseg1_min: 1,
            tseg1_max: 16,
            tseg2_min: 1,
            tseg2_max: 8,
            sjw_max: 4,
            brp_min: 1,
            brp_max: 64,
            brp_inc: 1,
            ..Default::default()
        };
        btc.name[..5].copy_from_slice(b"mcp25");
        let bytes = btc.encode();
        assert_eq!(bytes.len(), CanBitTimingConst::SIZE);
        let decoded = CanBitTimingConst::decode(&bytes).unwrap();
        assert_eq!(decoded, btc);
        assert_eq!(decoded.name(), "mcp25");
    }

    #[test]
    fn test_small_records() {
        let stats = CanDeviceStats {
            bus_error: 1,
            error_warning: 2,
            error_passive: 3,
            bus_off: 4,
            arbitration_lost: 5,
            restarts: 6,
        };
        assert_eq!(CanDeviceStats::decode(&stats.encode()).unwrap(), stats);

        let berr = CanBerrCounter { txerr: 96, rxerr: 128 };
        let bytes = berr.encode();
        assert_eq!(&bytes[2..4], &128u16.to_ne_bytes());
        assert_eq!(CanBerrCounter::decode(&bytes).unwrap(), berr);

        let clock = CanClock { freq: 16_000_000 };
        assert_eq!(CanClock::decode(&clock.encode()).unwrap(), clock);

        let mode = CanCtrlMode {
            mask: CAN_CTRLMODE_FD | CAN_CTRLMODE_LOOPBACK,
            flags: CAN_CTRLMODE_FD,
        };
        let decoded = CanCtrlMode::decode(&mode.encode()).unwrap();
        assert!(decoded.is_set(CAN_CTRLMODE_FD));
        assert!(!decoded.is_set(CAN_CTRLMODE_LOOPBACK));
    }

    #[test]
    fn test_link_attribute_roundtrip() {
        let typed = vec![
            CanLinkAttribute::BitTiming(bittiming()),
            CanLinkAttribute::State(0),
            CanLinkAttribute::RestartMs(100),
            CanLinkAttribute::BerrCounter(CanBerrCounter { txerr: 1, rxerr: 2 }),
            CanLinkAttribute::Other(Attribute::u8(42, 7)),
        ];
        for attr in &typed {
            assert_eq!(&CanLinkAttribute::decode(&attr.to_attribute()).unwrap(), attr);
        }
    }

    #[test]
    fn test_can_link_data() {
        let data = vec![
            CanLinkAttribute::BitTiming(bittiming()).to_attribute(),
            CanLinkAttribute::Clock(CanClock { freq: 8_000_000 }).to_attribute(),
        ];
        let stats = CanDeviceStats {
            restarts: 2,
            ..Default::default()
        };
        let link_attrs = vec![
            Attribute::string(IFLA_IFNAME, "can0"),
            Attribute::u32(IFLA_MTU, 16),
            linkinfo("can", &data, Some(stats)),
        ];

        let settings = can_link_data(&link_attrs).unwrap().unwrap();
        assert_eq!(settings[0], CanLinkAttribute::BitTiming(bittiming()));
        assert_eq!(settings[1], CanLinkAttribute::Clock(CanClock { freq: 8_000_000 }));
        assert_eq!(can_device_stats(&link_attrs).unwrap(), Some(stats));
    }

    #[test]
    fn test_not_a_can_link() {
        let vcan = vec![linkinfo("vcan", &[], None)];
        assert_eq!(can_link_data(&vcan).unwrap(), None);

        let plain = vec![Attribute::string(IFLA_IFNAME, "eth0")];
        assert_eq!(can_link_data(&plain).unwrap(), None);
        assert_eq!(can_device_stats(&plain).unwrap(), None);
    }

    #[test]
    fn test_short_payload_is_error() {
        let attr = Attribute::new(IFLA_CAN_BITTIMING, vec![0; 16]);
        assert!(CanLinkAttribute::decode(&attr).unwrap_err().is_truncated());
    }
}
