// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! First-level handling of synchronous exceptions taken to EL2 from a lower exception level.

use arm_sysregs::EsrEl2;
use log::trace;

/// The syndrome reported for an exception with an unknown reason from a 32-bit instruction.
pub const UNKNOWN_FAULT: u64 = 0x200_0000;

/// The kernel state the classifier acts on.
///
/// Implemented by the kernel for the thread or VCPU that took the exception.
pub trait TrapContext {
    /// Returns whether the FPU is enabled for the current thread.
    fn is_fpu_enabled(&self) -> bool;

    /// Enables the FPU for the current thread and loads its FPU state.
    fn handle_fpu_fault(&mut self);

    /// Delivers a user-level fault to the current thread.
    fn deliver_user_fault(&mut self, code: u64, auxiliary: u64);

    /// Returns the address of the instruction that took the exception.
    fn restart_pc(&self) -> u64;

    /// Sets the address the current thread will resume at.
    fn set_next_pc(&mut self, pc: u64);
}

/// The class of an exception.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExceptionClass {
    /// Unknown reason.
    Unknown,
    /// Trapped WFI or WFE instruction.
    WfiWfe,
    /// Access to SVE, Advanced SIMD or floating-point functionality trapped by `CPACR_EL1.FPEN`
    /// or `CPTR_EL2`.
    FpAccess,
    /// HVC instruction execution in `AArch64` state.
    HvcTrappedInAArch64,
    /// SMC instruction execution in `AArch64` state.
    SmcTrappedInAArch64,
    /// Trapped MSR, MRS or system instruction in `AArch64` state, including `CPACR_EL1`.
    SysRegTrappedInAArch64,
    /// Instruction abort from a lower exception level.
    InstructionAbortLower,
    /// Data abort from a lower exception level.
    DataAbortLower,
    /// Any other exception class.
    Other(u8),
}

impl ExceptionClass {
    fn new(value: u8) -> Self {
        match value {
            0x00 => Self::Unknown,
            0x01 => Self::WfiWfe,
            0x07 => Self::FpAccess,
            0x16 => Self::HvcTrappedInAArch64,
            0x17 => Self::SmcTrappedInAArch64,
            0x18 => Self::SysRegTrappedInAArch64,
            0x20 => Self::InstructionAbortLower,
            0x24 => Self::DataAbortLower,
            _ => Self::Other(value),
        }
    }

    /// Extracts the exception class from an `ESR_EL2` value.
    pub fn from_esr(esr: u64) -> Self {
        Self::new(EsrEl2::from_bits_retain(esr).ec())
    }

    /// Returns whether the exception may have been caused by the FPU being disabled.
    pub const fn is_fpu_trap(self) -> bool {
        matches!(self, Self::FpAccess | Self::SysRegTrappedInAArch64)
    }
}

/// Handles the exceptions the kernel resolves by itself.
///
/// Returns `true` if the exception was handled and the thread may resume, or `false` if the
/// caller must decide what to do with it, e.g. by forwarding it to the guest's fault handler.
pub fn classify(ctx: &mut impl TrapContext, esr: u64) -> bool {
    let class = ExceptionClass::from_esr(esr);

    if cfg!(feature = "fpu") && class.is_fpu_trap() && !ctx.is_fpu_enabled() {
        trace!("lazy FPU enable, esr={esr:#x}, class={class:?}");
        ctx.handle_fpu_fault();
        let pc = ctx.restart_pc();
        ctx.set_next_pc(pc);
        return true;
    }

    if esr == UNKNOWN_FAULT {
        trace!("unknown exception, delivering user fault");
        ctx.deliver_user_fault(0, 0);
        return true;
    }

    trace!("unhandled exception, esr={esr:#x}, class={class:?}");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_class() {
        assert_eq!(ExceptionClass::from_esr(0), ExceptionClass::Unknown);
        assert_eq!(ExceptionClass::from_esr(UNKNOWN_FAULT), ExceptionClass::Unknown);
        assert_eq!(ExceptionClass::from_esr(0x1e00_0000), ExceptionClass::FpAccess);
        assert_eq!(
            ExceptionClass::from_esr(0x6200_0000),
            ExceptionClass::SysRegTrappedInAArch64
        );
        assert_eq!(
            ExceptionClass::from_esr(0x9200_0046),
            ExceptionClass::DataAbortLower
        );
        assert_eq!(
            ExceptionClass::from_esr(0x5a00_0000),
            ExceptionClass::HvcTrappedInAArch64
        );
        assert_eq!(ExceptionClass::from_esr(0xfc00_0000), ExceptionClass::Other(0x3f));
    }

    #[test]
    fn class_ignores_upper_word() {
        assert_eq!(
            ExceptionClass::from_esr(0xffff_ffff_0000_0000 | 0x1e00_0000),
            ExceptionClass::FpAccess
        );
    }

    #[test]
    fn fpu_trap_classes() {
        assert!(ExceptionClass::FpAccess.is_fpu_trap());
        assert!(ExceptionClass::SysRegTrappedInAArch64.is_fpu_trap());
        assert!(!ExceptionClass::DataAbortLower.is_fpu_trap());
        assert!(!ExceptionClass::Unknown.is_fpu_trap());
    }
}
