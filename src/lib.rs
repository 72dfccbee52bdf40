// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Hypervisor support for an AArch64 microkernel running at EL2.
//!
//! - [`vcpu`] keeps a shadow copy of each VCPU's EL1/EL0 system registers and switches them in
//!   and out of hardware.
//! - [`hyp`] defines the `HCR_EL2` trap profiles for native threads and guest VCPUs, and
//!   [`hyp::boot_init`] programs a core before anything runs below EL2.
//! - [`exceptions::classify`] resolves the lower-EL traps the kernel handles itself.
//! - [`gic`] holds the interrupt numbering conventions and the per-core acknowledged interrupt.
//!
//! All hardware access goes through [`sysreg::SystemRegisters`].

#![cfg_attr(not(test), no_std)]
#![deny(clippy::undocumented_unsafe_blocks)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod abi;
#[cfg(target_arch = "aarch64")]
mod arch;
pub mod exceptions;
pub mod gic;
pub mod hyp;
pub mod sysreg;
pub mod vcpu;

pub use exceptions::{TrapContext, classify};
pub use hyp::{Profile, boot_init};
pub use sysreg::{SysReg, SystemRegisters};
pub use vcpu::{VCPU_REG_COUNT, Vcpu, VcpuReg};
