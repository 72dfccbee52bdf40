// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Entry points for kernel code that refers to VCPUs by pointer and registers by raw index.
//!
//! A null VCPU or an out of range index is a bug in the calling kernel code, so these panic
//! rather than return an error.

use crate::sysreg::SystemRegisters;
use crate::vcpu::{Vcpu, VcpuReg};

const INVALID: &str = "ARM/HYP: Invalid register index or NULL VCPU";

fn checked(vcpu: Option<&mut Vcpu>, reg: usize) -> (&mut Vcpu, VcpuReg) {
    match (vcpu, VcpuReg::try_from(reg)) {
        (Some(vcpu), Ok(reg)) => (vcpu, reg),
        (vcpu, reg) => panic!(
            "{INVALID}: vcpu present={}, index={reg:?}",
            vcpu.is_some()
        ),
    }
}

fn checked_range(vcpu: Option<&mut Vcpu>, lo: usize, hi: usize) -> (&mut Vcpu, VcpuReg, VcpuReg) {
    let (vcpu, lo) = checked(vcpu, lo);
    let (vcpu, hi) = checked(Some(vcpu), hi);
    (vcpu, lo, hi)
}

/// Saves register `reg` of `vcpu` from hardware.
///
/// # Panics
///
/// Panics if `vcpu` is `None` or `reg` is not a valid register index.
pub fn save_reg(hw: &mut impl SystemRegisters, vcpu: Option<&mut Vcpu>, reg: usize) {
    let (vcpu, reg) = checked(vcpu, reg);
    vcpu.save(hw, reg);
}

/// Saves registers `lo` to `hi` inclusive of `vcpu` from hardware.
///
/// Both bounds are checked before any register is touched. Nothing is saved if `lo > hi`.
///
/// # Panics
///
/// Panics if `vcpu` is `None` or either bound is not a valid register index. This holds even
/// when `lo > hi`, where the range itself would be empty.
pub fn save_reg_range(
    hw: &mut impl SystemRegisters,
    vcpu: Option<&mut Vcpu>,
    lo: usize,
    hi: usize,
) {
    let (vcpu, lo, hi) = checked_range(vcpu, lo, hi);
    vcpu.save_range(hw, lo, hi);
}

/// Restores register `reg` of `vcpu` to hardware.
///
/// # Panics
///
/// Panics if `vcpu` is `None` or `reg` is not a valid register index.
pub fn restore_reg(hw: &mut impl SystemRegisters, vcpu: Option<&mut Vcpu>, reg: usize) {
    let (vcpu, reg) = checked(vcpu, reg);
    vcpu.restore(hw, reg);
}

/// Restores registers `lo` to `hi` inclusive of `vcpu` to hardware.
///
/// Both bounds are checked before any register is touched. Nothing is restored if `lo > hi`.
///
/// # Panics
///
/// Panics if `vcpu` is `None` or either bound is not a valid register index. This holds even
/// when `lo > hi`, where the range itself would be empty.
pub fn restore_reg_range(
    hw: &mut impl SystemRegisters,
    vcpu: Option<&mut Vcpu>,
    lo: usize,
    hi: usize,
) {
    let (vcpu, lo, hi) = checked_range(vcpu, lo, hi);
    vcpu.restore_range(hw, lo, hi);
}

/// Returns the shadow value of register `reg` of `vcpu`.
///
/// # Panics
///
/// Panics if `vcpu` is `None` or `reg` is not a valid register index.
pub fn read_reg(vcpu: Option<&mut Vcpu>, reg: usize) -> u64 {
    let (vcpu, reg) = checked(vcpu, reg);
    vcpu.read(reg)
}

/// Sets the shadow value of register `reg` of `vcpu`.
///
/// # Panics
///
/// Panics if `vcpu` is `None` or `reg` is not a valid register index.
pub fn write_reg(vcpu: Option<&mut Vcpu>, reg: usize, value: u64) {
    let (vcpu, reg) = checked(vcpu, reg);
    vcpu.write(reg, value);
}

#[cfg(target_arch = "aarch64")]
mod ffi {
    use crate::hyp::boot_init;
    use crate::sysreg::El2SystemRegisters;
    use crate::vcpu::Vcpu;

    fn registers() -> El2SystemRegisters {
        // SAFETY: The kernel only calls into this module at EL2 with E2H clear, from the core
        // whose VCPU state it is switching.
        unsafe { El2SystemRegisters::new() }
    }

    /// Converts a VCPU pointer from the kernel into a reference.
    ///
    /// # Safety
    ///
    /// `vcpu` must be null or point to a valid `Vcpu` not otherwise accessed for `'a`.
    unsafe fn vcpu_mut<'a>(vcpu: *mut Vcpu) -> Option<&'a mut Vcpu> {
        // SAFETY: The caller guarantees `vcpu` is null or valid and unaliased.
        unsafe { vcpu.as_mut() }
    }

    #[unsafe(no_mangle)]
    extern "C" fn armv_vcpu_boot_init() {
        boot_init(&mut registers());
    }

    /// # Safety
    ///
    /// `vcpu` must be null or point to a valid `Vcpu` not otherwise accessed during the call.
    #[unsafe(no_mangle)]
    unsafe extern "C" fn vcpu_save_reg(vcpu: *mut Vcpu, reg: usize) {
        // SAFETY: Upheld by our caller.
        super::save_reg(&mut registers(), unsafe { vcpu_mut(vcpu) }, reg);
    }

    /// # Safety
    ///
    /// `vcpu` must be null or point to a valid `Vcpu` not otherwise accessed during the call.
    #[unsafe(no_mangle)]
    unsafe extern "C" fn vcpu_save_reg_range(vcpu: *mut Vcpu, start: usize, end: usize) {
        // SAFETY: Upheld by our caller.
        super::save_reg_range(&mut registers(), unsafe { vcpu_mut(vcpu) }, start, end);
    }

    /// # Safety
    ///
    /// `vcpu` must be null or point to a valid `Vcpu` not otherwise accessed during the call.
    #[unsafe(no_mangle)]
    unsafe extern "C" fn vcpu_restore_reg(vcpu: *mut Vcpu, reg: usize) {
        // SAFETY: Upheld by our caller.
        super::restore_reg(&mut registers(), unsafe { vcpu_mut(vcpu) }, reg);
    }

    /// # Safety
    ///
    /// `vcpu` must be null or point to a valid `Vcpu` not otherwise accessed during the call.
    #[unsafe(no_mangle)]
    unsafe extern "C" fn vcpu_restore_reg_range(vcpu: *mut Vcpu, start: usize, end: usize) {
        // SAFETY: Upheld by our caller.
        super::restore_reg_range(&mut registers(), unsafe { vcpu_mut(vcpu) }, start, end);
    }

    /// # Safety
    ///
    /// `vcpu` must be null or point to a valid `Vcpu` not otherwise accessed during the call.
    #[unsafe(no_mangle)]
    unsafe extern "C" fn vcpu_read_reg(vcpu: *mut Vcpu, reg: usize) -> u64 {
        // SAFETY: Upheld by our caller.
        super::read_reg(unsafe { vcpu_mut(vcpu) }, reg)
    }

    /// # Safety
    ///
    /// `vcpu` must be null or point to a valid `Vcpu` not otherwise accessed during the call.
    #[unsafe(no_mangle)]
    unsafe extern "C" fn vcpu_write_reg(vcpu: *mut Vcpu, reg: usize, value: u64) {
        // SAFETY: Upheld by our caller.
        super::write_reg(unsafe { vcpu_mut(vcpu) }, reg, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_round_trip_by_index() {
        let mut vcpu = Vcpu::new();
        write_reg(Some(&mut vcpu), 12, 0xdead_beef);
        assert_eq!(read_reg(Some(&mut vcpu), 12), 0xdead_beef);
        assert_eq!(vcpu.read(VcpuReg::Far), 0xdead_beef);
    }

    #[test]
    #[should_panic(expected = "ARM/HYP: Invalid register index or NULL VCPU")]
    fn read_null_vcpu() {
        read_reg(None, 0);
    }

    #[test]
    #[should_panic(expected = "ARM/HYP: Invalid register index or NULL VCPU")]
    fn write_index_equal_to_count() {
        let mut vcpu = Vcpu::new();
        write_reg(Some(&mut vcpu), crate::vcpu::VCPU_REG_COUNT, 1);
    }
}
