// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

use std::sync::Mutex;

// First value handed out is INITIAL_TAG + 1; the OLT only requires that
// tags on one link strictly increase.
const INITIAL_TAG: u32 = 0x5c1f6a60;

/// Process-wide allocator for the correlation tag carried in every
/// OLT-management request.
pub struct CorrelationTags {
    next: Mutex<u32>,
}

impl CorrelationTags {
    pub fn new() -> CorrelationTags {
        CorrelationTags {
            next: Mutex::new(INITIAL_TAG),
        }
    }

    pub fn next(&self) -> u32 {
        let mut v = self.next.lock().unwrap();
        *v += 1;
        *v
    }
}

impl Default for CorrelationTags {
    fn default() -> Self {
        Self::new()
    }
}
