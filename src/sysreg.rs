// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The boundary between this crate and the physical system registers.
//!
//! All hardware state this crate touches goes through a [`SystemRegisters`] implementation. On
//! real hardware that is [`El2SystemRegisters`]; tests substitute a recording fake.

/// A physical system register touched by this crate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SysReg {
    /// `SCTLR_EL1`, EL1 system control.
    SctlrEl1,
    /// `TTBR0_EL1`, lower half translation table base.
    Ttbr0El1,
    /// `TTBR1_EL1`, upper half translation table base.
    Ttbr1El1,
    /// `TCR_EL1`, stage-1 translation control.
    TcrEl1,
    /// `MAIR_EL1`, memory attribute indirection.
    MairEl1,
    /// `AMAIR_EL1`.
    AmairEl1,
    /// `CONTEXTIDR_EL1`.
    ContextidrEl1,
    /// `ACTLR_EL1`, implementation defined auxiliary control.
    ActlrEl1,
    /// `CPACR_EL1`, FP/SIMD access control.
    CpacrEl1,
    /// `AFSR0_EL1`.
    Afsr0El1,
    /// `AFSR1_EL1`.
    Afsr1El1,
    /// `ESR_EL1`, EL1 exception syndrome.
    EsrEl1,
    /// `FAR_EL1`, EL1 fault address.
    FarEl1,
    /// `ISR_EL1`, pending interrupt status. Read-only, so writes to it are ignored.
    IsrEl1,
    /// `VBAR_EL1`, EL1 vector table base.
    VbarEl1,
    /// `TPIDR_EL0`.
    TpidrEl0,
    /// `TPIDR_EL1`.
    TpidrEl1,
    /// `TPIDRRO_EL0`.
    TpidrroEl0,
    /// `CNTV_TVAL_EL0`, virtual timer value.
    CntvTvalEl0,
    /// `CNTV_CTL_EL0`, virtual timer control.
    CntvCtlEl0,
    /// `SP_EL1`.
    SpEl1,
    /// `ELR_EL1`, EL1 exception return address.
    ElrEl1,
    /// `SPSR_EL1`, EL1 saved program status.
    SpsrEl1,
    /// `HCR_EL2`, see [`crate::hyp::Profile`].
    HcrEl2,
    /// `VTCR_EL2`, stage-2 translation control.
    VtcrEl2,
}

/// Access to the current core's system registers.
///
/// Each call touches exactly one register and has no effect on any other.
pub trait SystemRegisters {
    /// Reads the given register.
    fn read(&mut self, reg: SysReg) -> u64;

    /// Writes the given register.
    ///
    /// Writing [`SysReg::IsrEl1`] has no effect.
    fn write(&mut self, reg: SysReg, value: u64);

    /// Issues an instruction synchronization barrier.
    fn isb(&mut self);
}

/// The system registers of the core this is running on.
#[cfg(target_arch = "aarch64")]
#[derive(Debug)]
pub struct El2SystemRegisters {
    _private: (),
}

#[cfg(target_arch = "aarch64")]
impl El2SystemRegisters {
    /// Returns a handle to the current core's registers.
    ///
    /// # Safety
    ///
    /// The caller must be running at EL2 with `HCR_EL2.E2H` clear, so that the EL1&0 registers
    /// do not affect its own execution. The handle must stay on the core it was created on, and
    /// at most one VCPU's state may be loaded through it at a time.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "aarch64")]
impl SystemRegisters for El2SystemRegisters {
    fn read(&mut self, reg: SysReg) -> u64 {
        use crate::arch;

        match reg {
            SysReg::SctlrEl1 => arch::sctlr_el1::read(),
            SysReg::Ttbr0El1 => arch::ttbr0_el1::read(),
            SysReg::Ttbr1El1 => arch::ttbr1_el1::read(),
            SysReg::TcrEl1 => arch::tcr_el1::read(),
            SysReg::MairEl1 => arch::mair_el1::read(),
            SysReg::AmairEl1 => arch::amair_el1::read(),
            SysReg::ContextidrEl1 => arch::contextidr_el1::read(),
            SysReg::ActlrEl1 => arch::actlr_el1::read(),
            SysReg::CpacrEl1 => arch::cpacr_el1::read(),
            SysReg::Afsr0El1 => arch::afsr0_el1::read(),
            SysReg::Afsr1El1 => arch::afsr1_el1::read(),
            SysReg::EsrEl1 => arch::esr_el1::read(),
            SysReg::FarEl1 => arch::far_el1::read(),
            SysReg::IsrEl1 => arch::isr_el1::read(),
            SysReg::VbarEl1 => arch::vbar_el1::read(),
            SysReg::TpidrEl0 => arch::tpidr_el0::read(),
            SysReg::TpidrEl1 => arch::tpidr_el1::read(),
            SysReg::TpidrroEl0 => arch::tpidrro_el0::read(),
            SysReg::CntvTvalEl0 => arch::cntv_tval_el0::read(),
            SysReg::CntvCtlEl0 => arch::cntv_ctl_el0::read(),
            SysReg::SpEl1 => arch::sp_el1::read(),
            SysReg::ElrEl1 => arch::elr_el1::read(),
            SysReg::SpsrEl1 => arch::spsr_el1::read(),
            SysReg::HcrEl2 => arch::hcr_el2::read(),
            SysReg::VtcrEl2 => arch::vtcr_el2::read(),
        }
    }

    fn write(&mut self, reg: SysReg, value: u64) {
        use crate::arch;

        // SAFETY: `new` requires that we run at EL2 without E2H, so none of the EL1&0 registers
        // affect this code. HCR_EL2 and VTCR_EL2 only control the translation and trapping of
        // lower exception levels.
        unsafe {
            match reg {
                SysReg::SctlrEl1 => arch::sctlr_el1::write(value),
                SysReg::Ttbr0El1 => arch::ttbr0_el1::write(value),
                SysReg::Ttbr1El1 => arch::ttbr1_el1::write(value),
                SysReg::TcrEl1 => arch::tcr_el1::write(value),
                SysReg::MairEl1 => arch::mair_el1::write(value),
                SysReg::AmairEl1 => arch::amair_el1::write(value),
                SysReg::ContextidrEl1 => arch::contextidr_el1::write(value),
                SysReg::ActlrEl1 => arch::actlr_el1::write(value),
                SysReg::CpacrEl1 => arch::cpacr_el1::write(value),
                SysReg::Afsr0El1 => arch::afsr0_el1::write(value),
                SysReg::Afsr1El1 => arch::afsr1_el1::write(value),
                SysReg::EsrEl1 => arch::esr_el1::write(value),
                SysReg::FarEl1 => arch::far_el1::write(value),
                SysReg::IsrEl1 => {}
                SysReg::VbarEl1 => arch::vbar_el1::write(value),
                SysReg::TpidrEl0 => arch::tpidr_el0::write(value),
                SysReg::TpidrEl1 => arch::tpidr_el1::write(value),
                SysReg::TpidrroEl0 => arch::tpidrro_el0::write(value),
                SysReg::CntvTvalEl0 => arch::cntv_tval_el0::write(value),
                SysReg::CntvCtlEl0 => arch::cntv_ctl_el0::write(value),
                SysReg::SpEl1 => arch::sp_el1::write(value),
                SysReg::ElrEl1 => arch::elr_el1::write(value),
                SysReg::SpsrEl1 => arch::spsr_el1::write(value),
                SysReg::HcrEl2 => arch::hcr_el2::write(value),
                SysReg::VtcrEl2 => arch::vtcr_el2::write(value),
            }
        }
    }

    fn isb(&mut self) {
        crate::arch::isb();
    }
}
