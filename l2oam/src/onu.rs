// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! ONU provisioning PDUs.  The two firmware dialects take these as opaque
//! byte literals keyed by (variant, step index); their internal structure
//! is not modeled, only preserved.

use crate::PackageVariant;

/// FEC Mode
pub fn fec_mode(variant: PackageVariant) -> &'static [u8] {
    match variant {
        PackageVariant::A => &[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x02, 0x01, 0x00, 0xd7, 0x06, 0x05, 0x02, 0x01, 0x01,
        ],
        PackageVariant::B => &[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x03, 0xca, 0xfe,
            0x00, 0xb7, 0x00, 0x16, 0x01, 0x01,
        ],
    }
}

/// Encryption Mode; variant A takes two steps.
pub fn encryption_mode(
    variant: PackageVariant,
    index: usize,
) -> Option<&'static [u8]> {
    match (variant, index) {
        (PackageVariant::A, 1) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x02, 0x01, 0x00, 0xd7, 0x04, 0x01, 0x02, 0x01, 0x2c, 0x00,
            0x00,
        ]),
        (PackageVariant::A, 2) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x02, 0x01, 0x00, 0xd7, 0x04, 0x02, 0x01, 0x02, 0x00, 0x00,
        ]),
        (PackageVariant::B, 1) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x03, 0xca, 0xfe,
            0x00, 0xb7, 0x00, 0x01, 0x01, 0x02,
        ]),
        _ => None,
    }
}

/// Dynamic Learning Mode; variant A takes three steps.
pub fn dyn_learning_mode(
    variant: PackageVariant,
    index: usize,
) -> Option<&'static [u8]> {
    match (variant, index) {
        (PackageVariant::A, 1) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x01, 0xd6, 0x00,
            0x03, 0x01, 0x00, 0xd7, 0x01, 0x01, 0x00, 0x00,
        ]),
        (PackageVariant::A, 2) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x03, 0x01, 0x00, 0xd7, 0x01, 0x02, 0x07, 0xd0, 0x00, 0x00,
        ]),
        (PackageVariant::A, 3) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x01, 0xd6, 0x00,
            0x03, 0x01, 0x00, 0xd7, 0x01, 0x03, 0x00, 0x00,
        ]),
        (PackageVariant::B, 1) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x00, 0xca, 0xfe,
            0x00, 0xb6, 0x00, 0x01, 0x04, 0x01, 0x00, 0x00, 0x01, 0xb7,
            0x00, 0x1c, 0x00, 0x00,
        ]),
        _ => None,
    }
}

/// ONU System Information
pub fn system_info(variant: PackageVariant) -> &'static [u8] {
    match variant {
        PackageVariant::A => &[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x01, 0xd7, 0x00,
            0x06, 0x00, 0x00,
        ],
        PackageVariant::B => &[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x00, 0xca, 0xfe,
            0x00, 0xb7, 0x00, 0x40, 0x00, 0x00,
        ],
    }
}

/// Serial number carried in a variant-A system-information reply.
pub fn serial_number(variant: PackageVariant, data: &[u8]) -> Option<String> {
    if variant == PackageVariant::A && data.len() >= 26 {
        Some(String::from_utf8_lossy(&data[20..26]).into_owned())
    } else {
        None
    }
}

/// Manufacturer inferred from a variant-A system-information reply.
pub fn manufacturer(
    variant: PackageVariant,
    data: &[u8],
) -> Option<&'static str> {
    if variant == PackageVariant::A
        && data.len() >= 19
        && data[16] == 0x32
        && data[17] == 0x30
        && data[18] == 0x4b
    {
        Some("FURUKAWA")
    } else {
        None
    }
}

/// PonP Optical Rx Input Power
pub fn optical_rx_power(variant: PackageVariant) -> &'static [u8] {
    match variant {
        PackageVariant::A => &[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x01, 0xd6, 0x00,
            0x01, 0x01, 0x00, 0xd7, 0x02, 0x21, 0x00, 0x00,
        ],
        PackageVariant::B => &[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x00, 0xca, 0xfe,
            0x00, 0xb6, 0x00, 0x01, 0x04, 0x01, 0x00, 0x00, 0x01, 0xb7,
            0x00, 0x34, 0x00, 0x00,
        ],
    }
}

/// UNI Port Information
pub fn unip_info(variant: PackageVariant) -> &'static [u8] {
    match variant {
        PackageVariant::A => &[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x01, 0xd6, 0x00,
            0x03, 0x01, 0x00, 0x07, 0x00, 0x20, 0x07, 0x00, 0x5d, 0x07,
            0x00, 0x5a, 0x07, 0x00, 0x4f, 0x07, 0x00, 0xa3, 0x07, 0x00,
            0x1a, 0x07, 0x00, 0x47, 0x07, 0x00, 0xb0, 0x00, 0x00,
        ],
        PackageVariant::B => &[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x00, 0xca, 0xfe,
            0x00, 0xb6, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00, 0xb7,
            0x00, 0x41,
        ],
    }
}

/// UNI Link Mode
pub fn unip_link_mode(variant: PackageVariant) -> &'static [u8] {
    match variant {
        PackageVariant::A => &[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x03, 0x01, 0x00, 0xd7, 0x01, 0x05, 0x04, 0x00, 0xdf,
        ],
        PackageVariant::B => &[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x03, 0xca, 0xfe,
            0x00, 0xb6, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00, 0xb7,
            0x00, 0x11, 0x01, 0x24,
        ],
    }
}

/// VLAN Tag Filter; two steps, with the inner TPID appended to variant B's
/// first step.
pub fn vlan_tag_filter(
    variant: PackageVariant,
    index: usize,
    value: &[u8],
) -> Option<Vec<u8>> {
    match (variant, index) {
        (PackageVariant::A, 1) => Some(vec![
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x00, 0xd7, 0x05, 0x03, 0x03, 0x81, 0x00, 0x01,
        ]),
        (PackageVariant::A, 2) => Some(vec![
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x00, 0xd7, 0x05, 0x04, 0x03, 0x88, 0xa8, 0x00,
        ]),
        (PackageVariant::B, 1) => {
            let mut frame = vec![
                0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x03, 0xca, 0xfe,
                0x00, 0xb7, 0x00, 0x13, 0x03, 0x03,
            ];
            frame.extend_from_slice(value);
            Some(frame)
        }
        (PackageVariant::B, 2) => Some(vec![
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x03, 0xca, 0xfe,
            0x00, 0xb7, 0x00, 0x14, 0x03, 0x01, 0x00, 0x64,
        ]),
        _ => None,
    }
}

/// Priority Queue Count; variant A takes two steps.
pub fn priority_queue_count(
    variant: PackageVariant,
    index: usize,
) -> Option<&'static [u8]> {
    match (variant, index) {
        (PackageVariant::A, 1) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x01, 0xd7, 0x00,
            0x0a, 0x00, 0x00,
        ]),
        (PackageVariant::A, 2) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0xd7, 0x01, 0x0d, 0x08,
            0x01, 0x01, 0xd0, 0x02, 0x01, 0xd0, 0x01, 0x32, 0x00, 0x00,
        ]),
        (PackageVariant::B, 1) => Some(&[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x03, 0xca, 0xfe,
            0x00, 0xb7, 0x00, 0x01, 0x01, 0x02,
        ]),
        _ => None,
    }
}

/// Traffic Enable
pub fn traffic_enable(_variant: PackageVariant) -> &'static [u8] {
    &[
        0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00, 0x02,
        0x01, 0x00, 0xd9, 0x06, 0x01, 0x80,
    ]
}

/// Reset ONU
pub fn reset(variant: PackageVariant) -> &'static [u8] {
    match variant {
        PackageVariant::A => &[
            0x03, 0x00, 0x50, 0xfe, 0x00, 0x10, 0x00, 0x03, 0xd6, 0x00,
            0x00, 0xd9, 0x00, 0x01, 0x80, 0x00, 0x00,
        ],
        PackageVariant::B => &[
            0x03, 0x00, 0x50, 0xfe, 0x90, 0x82, 0x60, 0x03, 0xca, 0xfe,
            0x00, 0xb9, 0x00, 0x0e, 0x01, 0x01, 0x00, 0x00,
        ],
    }
}
