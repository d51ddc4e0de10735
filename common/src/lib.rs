// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/

//! Building blocks shared by the L2OAM codec and the `oltd` daemon.

pub mod logging;
pub mod network;
