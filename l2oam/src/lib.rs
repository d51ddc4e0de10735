// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Wire format for the vendor-extended IEEE 1904.2 / 802.3 slow-protocol
//! OAM dialect ("L2OAM") used to manage an EPON OLT and its ONUs at layer 2.
//!
//! Every PDU here is the payload of an Ethernet frame; the `eth` module
//! provides the framing (and the optional outer management S-tag).  OLT
//! management PDUs ("TOAM") carry a correlation tag and an object context
//! after a fixed slow-protocol prefix, followed by one of a dozen
//! branch/leaf-keyed body shapes.  All multi-byte integers are big-endian.

use thiserror::Error;

pub mod action;
pub mod discovery;
pub mod eth;
pub mod info;
pub mod onu;
pub mod pbuf;
pub mod switching;
pub mod toam;
pub mod traffic;

pub use pbuf::ParseBuffer;

/// Organizationally Unique Identifier carried in every vendor OAMPDU.
pub const OUI: [u8; 3] = [0x2a, 0xea, 0x15];

/// Slow-protocol OAM opcode.
pub const OPCODE_OAM: u8 = 0x03;
/// Vendor-specific discovery opcode.
pub const OPCODE_DISCOVERY: u8 = 0xfd;

/// OAMPDU code for an Information (keepalive) PDU.
pub const CODE_INFO: u8 = 0x00;
/// OAMPDU code for an Organization-Specific PDU.
pub const CODE_ORG_SPECIFIC: u8 = 0xfe;

/// Handshake phase bits carried in the OAMPDU flags field.
pub const FLAGS_INFO_FIRST: u16 = 0x0008;
pub const FLAGS_INFO_SECOND: u16 = 0x0030;
pub const FLAGS_INFO_FINAL: u16 = 0x0050;

/// OLT-management opcodes following the Organization-Specific prefix.
pub const TOMI_GET: u8 = 0x01;
pub const TOMI_SET: u8 = 0x03;
pub const TOMI_EVENT: u8 = 0x81;

/// Branch and type of the correlation tag attached to every OLT-management
/// request.
pub const CT_BRANCH: u8 = 0x0c;
pub const CT_TYPE: u16 = 0x0c7a;

/// Sentinel length marking an absent variable-container body or an empty
/// TPID/VID field.
pub const LENGTH_EMPTY: u8 = 0x80;

pub type FrameResult<T> = Result<T, FrameError>;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame at offset {offset}: {reason}")]
    Malformed { reason: String, offset: usize },
    #[error("unknown leaf {branch:#04x}/{leaf:#06x}")]
    UnknownLeaf { branch: u8, leaf: u16 },
    #[error("unknown TLV type {tlv_type:#04x}")]
    UnknownTlvType { tlv_type: u8 },
}

pub(crate) fn parse_error(
    pb: &pbuf::ParseBuffer,
    reason: impl ToString,
) -> FrameError {
    FrameError::Malformed {
        reason: reason.to_string(),
        offset: pb.offset(),
    }
}

/// The two ONU firmware dialects.  Each has its own byte-literal
/// provisioning sequences; the variant is inferred from the peer's
/// Organization-Specific Information TLV during the keepalive handshake.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PackageVariant {
    A,
    B,
}

/// A {branch, type, length, instance} tuple naming a managed object inside
/// the OLT's object tree.  Objects are created by "Action Create" requests
/// and the OLT echoes the context in all subsequent operations on them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ObjectContext {
    pub branch: u8,
    pub otype: u16,
    pub length: u8,
    pub instance: u32,
}

impl ObjectContext {
    /// The OLT device object itself.
    pub const DEVICE: ObjectContext = ObjectContext {
        branch: 0x0c,
        otype: 0x0dce,
        length: 4,
        instance: 0,
    };

    /// The OLT's PON port object.
    pub const PON_PORT: ObjectContext = ObjectContext {
        branch: 0x0c,
        otype: 0x0007,
        length: 4,
        instance: 0,
    };

    /// A PON link (ONU) object, keyed by the instance assigned at
    /// registration.
    pub fn onu_link(instance: u32) -> ObjectContext {
        ObjectContext {
            branch: 0x0c,
            otype: 0x0011,
            length: 4,
            instance,
        }
    }

    /// A traffic-profile object issued by Action Create.
    pub fn traffic_profile(instance: u32) -> ObjectContext {
        ObjectContext {
            branch: 0x0c,
            otype: 0x070f,
            length: 4,
            instance,
        }
    }

    /// A traffic-control object referenced by the per-link reference table.
    pub fn traffic_control(instance: u32) -> ObjectContext {
        ObjectContext {
            branch: 0x0c,
            otype: 0x07c0,
            length: 4,
            instance,
        }
    }

    /// A protocol-filter action object, keyed by the OLT-issued action ID.
    pub fn protocol_filter(instance: u32) -> ObjectContext {
        ObjectContext {
            branch: 0x0c,
            otype: 0x0cff,
            length: 4,
            instance,
        }
    }

    /// The instance field as network-order bytes.
    pub fn instance_bytes(&self) -> [u8; 4] {
        self.instance.to_be_bytes()
    }

    pub(crate) fn put(&self, v: &mut bytes::BytesMut) {
        use bytes::BufMut;
        v.put_u8(self.branch);
        v.put_u16(self.otype);
        v.put_u8(self.length);
        v.put_u32(self.instance);
    }

    pub(crate) fn parse(
        pb: &mut pbuf::ParseBuffer,
    ) -> FrameResult<ObjectContext> {
        Ok(ObjectContext {
            branch: pb.get_u8()?,
            otype: pb.get_u16()?,
            length: pb.get_u8()?,
            instance: pb.get_u32()?,
        })
    }
}

impl std::fmt::Display for ObjectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x}/{:04x}/{:02x}/{:08x}",
            self.branch, self.otype, self.length, self.instance
        )
    }
}
