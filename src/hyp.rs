// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! EL2 trap configuration for native threads and for guest VCPUs, and the per-core boot setup.

use arm_sysregs::{HcrEl2, SctlrEl1, VtcrEl2};
use log::{debug, trace};

use crate::sysreg::{SysReg, SystemRegisters};

/// Trapping common to native threads and guest VCPUs: WFI/WFE, physical interrupts routed to
/// EL2, stage-2 translation on and an AArch64 EL1.
pub const HCR_COMMON: HcrEl2 = HcrEl2::TWI
    .union(HcrEl2::TWE)
    .union(HcrEl2::VM)
    .union(HcrEl2::RW)
    .union(HcrEl2::AMO)
    .union(HcrEl2::IMO)
    .union(HcrEl2::FMO);

/// Native threads run at EL0 with their virtual memory state emulated by the kernel.
///
/// `DC` turns stage-1 translation off, and all virtual memory, cache, TLB and SMC operations
/// trap.
pub const HCR_NATIVE: HcrEl2 = HCR_COMMON
    .union(HcrEl2::TGE)
    .union(HcrEl2::TVM)
    .union(HcrEl2::TTLB)
    .union(HcrEl2::DC)
    .union(HcrEl2::TACR)
    .union(HcrEl2::SWIO)
    .union(HcrEl2::TSC);

/// Guest VCPUs own their EL1 state.
pub const HCR_VCPU: HcrEl2 = HCR_COMMON;

/// Cortex-A57 reset value of `SCTLR_EL1`, with the MMU and alignment checks off.
pub const SCTLR_EL1_VM: SctlrEl1 = SctlrEl1::from_bits_retain(0x34d5_8820);

/// `SCTLR_EL1` for native threads: caches on and EL0 cache maintenance allowed.
pub const SCTLR_EL1_NATIVE: SctlrEl1 = SCTLR_EL1_VM
    .union(SctlrEl1::C)
    .union(SctlrEl1::I)
    .union(SctlrEl1::UCI);

/// The `SCTLR_EL1` value loaded at boot.
pub const SCTLR_DEFAULT: SctlrEl1 = SCTLR_EL1_NATIVE;

/// Stage-2 translation for cores with a 44-bit physical address space.
pub const VTCR_EL2_BOOT: VtcrEl2 = VtcrEl2::RES1
    .with_t0sz(20) // 44-bit IPA
    .with_sl0(0b10) // start at level 0 with 4 KiB pages
    .with_irgn0(0b01) // inner write-back, read/write allocate
    .with_orgn0(0b01) // outer write-back, read/write allocate
    .with_sh0(0b11) // inner shareable
    .with_tg0(0) // 4 KiB granule
    .with_ps(0b100); // 44-bit PA

/// The trap configuration of the context about to run at a lower exception level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Profile {
    /// A kernel-managed thread at EL0.
    Native,
    /// A guest VCPU at EL1.
    Vcpu,
}

impl Profile {
    /// Returns the `HCR_EL2` value for the profile.
    pub const fn hcr(self) -> HcrEl2 {
        match self {
            Self::Native => HCR_NATIVE,
            Self::Vcpu => HCR_VCPU,
        }
    }

    /// Loads the profile into `HCR_EL2`.
    pub fn apply(self, hw: &mut impl SystemRegisters) {
        let hcr = self.hcr();
        trace!("HCR_EL2 <- {:#x} ({self:?})", hcr.bits());
        hw.write(SysReg::HcrEl2, hcr.bits());
        hw.isb();
    }
}

/// Sets up the current core for running native threads.
///
/// Must run once on each core before anything executes below EL2.
pub fn boot_init(hw: &mut impl SystemRegisters) {
    debug!("VTCR_EL2 <- {:#x}", VTCR_EL2_BOOT.bits());
    hw.write(SysReg::VtcrEl2, VTCR_EL2_BOOT.bits());
    hw.isb();

    debug!("HCR_EL2 <- {:#x}", HCR_NATIVE.bits());
    hw.write(SysReg::HcrEl2, HCR_NATIVE.bits());
    hw.isb();

    debug!("SCTLR_EL1 <- {:#x}", SCTLR_EL1_NATIVE.bits());
    hw.write(SysReg::SctlrEl1, SCTLR_EL1_NATIVE.bits());
    hw.isb();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hcr_values() {
        assert_eq!(HCR_COMMON.bits(), 0x8000_6039);
        assert_eq!(HCR_NATIVE.bits(), 0x8e28_703b);
        assert_eq!(HCR_VCPU, HCR_COMMON);
    }

    #[test]
    fn native_is_strict_superset_of_common() {
        assert!(HCR_NATIVE.contains(HCR_COMMON));
        assert_ne!(HCR_NATIVE, HCR_COMMON);
        assert!(HCR_NATIVE.contains(HcrEl2::DC));
        assert!(!HCR_VCPU.contains(HcrEl2::DC));
        assert!(!HCR_VCPU.contains(HcrEl2::TGE));
    }

    #[test]
    fn vcpu_profile_only_routes_interrupts_and_traps_wfx() {
        let expected = HcrEl2::TWI
            | HcrEl2::TWE
            | HcrEl2::IMO
            | HcrEl2::FMO
            | HcrEl2::AMO
            | HcrEl2::VM
            | HcrEl2::RW;
        assert_eq!(Profile::Vcpu.hcr(), expected);
        assert_eq!(Profile::Native.hcr(), HCR_NATIVE);
    }

    #[test]
    fn sctlr_values() {
        assert_eq!(SCTLR_EL1_NATIVE.bits(), 0x34d5_9824);
        assert_eq!(SCTLR_DEFAULT, SCTLR_EL1_NATIVE);
        assert!(SCTLR_EL1_NATIVE.contains(SCTLR_EL1_VM));
        assert!(!SCTLR_EL1_NATIVE.contains(SctlrEl1::M));
        assert!(!SCTLR_EL1_NATIVE.contains(SctlrEl1::A));
    }

    #[test]
    fn vtcr_value() {
        assert_eq!(VTCR_EL2_BOOT.bits(), 0x8004_3594);
        assert_eq!(VTCR_EL2_BOOT.t0sz(), 20);
        assert_eq!(VTCR_EL2_BOOT.sl0(), 0b10);
        assert_eq!(VTCR_EL2_BOOT.ps(), 0b100);
        assert!(VTCR_EL2_BOOT.contains(VtcrEl2::RES1));
    }
}
