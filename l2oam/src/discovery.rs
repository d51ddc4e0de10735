// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Vendor discovery: the Solicit we broadcast at an OLT and the Hello it
//! answers with.  Both are a fixed sequence of {type, length, bytes}
//! fields; a declared length may exceed the meaningful bytes, in which
//! case the field is zero-padded on the wire.

use bytes::BufMut;
use bytes::BytesMut;

use crate::parse_error;
use crate::pbuf::ParseBuffer;
use crate::FrameResult;
use crate::OPCODE_DISCOVERY;
use crate::OUI;

pub const FIELD_VENDOR_ID: u8 = 0xfd;
pub const FIELD_CONTROLLER_PRIORITY: u8 = 0x05;
pub const FIELD_NETWORK_ID: u8 = 0x06;
pub const FIELD_DEVICE_TYPE: u8 = 0x07;
pub const FIELD_SUPPORTED_PROTOCOLS: u8 = 0x08;
pub const FIELD_PAD: u8 = 0xff;

pub const NETWORK_ID: &[u8] = b"tibitcom.com";

/// One typed discovery field.  `declared` is the on-wire length; encoding
/// zero-fills past the end of `value`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveryField {
    pub ftype: u8,
    pub declared: u16,
    pub value: Vec<u8>,
}

impl DiscoveryField {
    fn new(ftype: u8, declared: u16, value: &[u8]) -> DiscoveryField {
        DiscoveryField {
            ftype,
            declared,
            value: value.to_vec(),
        }
    }

    fn wire_len(&self) -> usize {
        3 + self.declared as usize
    }

    fn put(&self, v: &mut BytesMut) {
        v.put_u8(self.ftype);
        v.put_u16(self.declared);
        v.put_slice(&self.value);
        for _ in self.value.len()..self.declared as usize {
            v.put_u8(0);
        }
    }

    fn parse(pb: &mut ParseBuffer) -> FrameResult<DiscoveryField> {
        let ftype = pb.get_u8()?;
        let declared = pb.get_u16()?;
        let value = pb.get_bytes(declared as usize)?;
        Ok(DiscoveryField {
            ftype,
            declared,
            value,
        })
    }
}

/// Discovery Solicit, sent to enroll an OLT.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoverySolicit {
    pub vendor_id: DiscoveryField,
    pub controller_priority: DiscoveryField,
    pub network_id: DiscoveryField,
    pub device_type: DiscoveryField,
    pub supported_protocols: DiscoveryField,
    pub pad: DiscoveryField,
}

impl DiscoverySolicit {
    pub fn new() -> DiscoverySolicit {
        DiscoverySolicit {
            vendor_id: DiscoveryField::new(FIELD_VENDOR_ID, 3, &OUI),
            controller_priority: DiscoveryField::new(
                FIELD_CONTROLLER_PRIORITY,
                1,
                &[128],
            ),
            network_id: DiscoveryField::new(FIELD_NETWORK_ID, 16, NETWORK_ID),
            device_type: DiscoveryField::new(FIELD_DEVICE_TYPE, 1, &[1]),
            supported_protocols: DiscoveryField::new(
                FIELD_SUPPORTED_PROTOCOLS,
                1,
                &[0x03],
            ),
            pad: DiscoveryField::new(FIELD_PAD, 1, &[0]),
        }
    }

    fn fields(&self) -> [&DiscoveryField; 5] {
        [
            &self.vendor_id,
            &self.controller_priority,
            &self.network_id,
            &self.device_type,
            &self.supported_protocols,
        ]
    }

    /// The vendor length field: every field after it, minus the padding.
    fn vendor_length(&self) -> u16 {
        self.fields().iter().map(|f| f.wire_len() as u16).sum()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut v = BytesMut::new();
        v.put_u8(OPCODE_DISCOVERY);
        v.put_u8(0x01);
        v.put_u8(0xfe);
        v.put_u16(self.vendor_length());
        for f in self.fields() {
            f.put(&mut v);
        }
        self.pad.put(&mut v);
        v.to_vec()
    }

    pub fn parse(data: &[u8]) -> FrameResult<DiscoverySolicit> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let opcode = pb.get_u8()?;
        if opcode != OPCODE_DISCOVERY {
            return Err(parse_error(&pb, "not a discovery PDU"));
        }
        let _dtype = pb.get_u8()?;
        let _vendor_type = pb.get_u8()?;
        let _length = pb.get_u16()?;
        Ok(DiscoverySolicit {
            vendor_id: DiscoveryField::parse(&mut pb)?,
            controller_priority: DiscoveryField::parse(&mut pb)?,
            network_id: DiscoveryField::parse(&mut pb)?,
            device_type: DiscoveryField::parse(&mut pb)?,
            supported_protocols: DiscoveryField::parse(&mut pb)?,
            pad: DiscoveryField::parse(&mut pb)?,
        })
    }
}

impl Default for DiscoverySolicit {
    fn default() -> Self {
        Self::new()
    }
}

/// Discovery Hello, the OLT's answer.  Same field scheme, no controller
/// priority, plus a tunnel field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveryHello {
    pub vendor_id: DiscoveryField,
    pub network_id: DiscoveryField,
    pub device_type: DiscoveryField,
    pub supported_protocols: DiscoveryField,
    pub tunnel: DiscoveryField,
    pub pad: DiscoveryField,
}

impl DiscoveryHello {
    pub fn parse(data: &[u8]) -> FrameResult<DiscoveryHello> {
        let mut pb = ParseBuffer::new_from_slice(data);
        let opcode = pb.get_u8()?;
        if opcode != OPCODE_DISCOVERY {
            return Err(parse_error(&pb, "not a discovery PDU"));
        }
        let _dtype = pb.get_u8()?;
        let _vendor_type = pb.get_u8()?;
        let _length = pb.get_u16()?;
        Ok(DiscoveryHello {
            vendor_id: DiscoveryField::parse(&mut pb)?,
            network_id: DiscoveryField::parse(&mut pb)?,
            device_type: DiscoveryField::parse(&mut pb)?,
            supported_protocols: DiscoveryField::parse(&mut pb)?,
            tunnel: DiscoveryField::parse(&mut pb)?,
            pad: DiscoveryField::parse(&mut pb)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let fields = [
            &self.vendor_id,
            &self.network_id,
            &self.device_type,
            &self.supported_protocols,
            &self.tunnel,
        ];
        let length: u16 = fields.iter().map(|f| f.wire_len() as u16).sum();
        let mut v = BytesMut::new();
        v.put_u8(OPCODE_DISCOVERY);
        v.put_u8(0x01);
        v.put_u8(0xfe);
        v.put_u16(length);
        for f in fields {
            f.put(&mut v);
        }
        self.pad.put(&mut v);
        v.to_vec()
    }

    pub fn network_id(&self) -> String {
        let trimmed: Vec<u8> = self
            .network_id
            .value
            .iter()
            .take_while(|b| **b != 0)
            .copied()
            .collect();
        String::from_utf8_lossy(&trimmed).into_owned()
    }
}
