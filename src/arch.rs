// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Raw `mrs`/`msr` accessors for the registers the VCPU core multiplexes.
//!
//! Nothing outside [`crate::sysreg`] may use this module.

use core::arch::asm;

/// Instruction Synchronization Barrier.
pub fn isb() {
    // SAFETY: Instruction Synchronization Barrier is always safe.
    unsafe {
        asm!("isb", options(nostack, preserves_flags));
    }
}

macro_rules! sys_reg {
    (@read $name:ident) => {
        #[doc = concat!("Read the `", stringify!($name), "` system register.")]
        pub fn read() -> u64 {
            let val: u64;
            // SAFETY: The register is readable at EL2 and reading it has no side effects.
            unsafe {
                asm!(concat!("mrs {}, ", stringify!($name)), out(reg) val, options(nomem, nostack, preserves_flags));
            }
            val
        }
    };
    ($name:ident, read_only) => {
        pub mod $name {
            use core::arch::asm;

            sys_reg!(@read $name);
        }
    };
    ($name:ident) => {
        pub mod $name {
            use core::arch::asm;

            sys_reg!(@read $name);

            #[doc = concat!("Write the `", stringify!($name), "` system register.")]
            ///
            /// # Safety
            ///
            /// The caller must guarantee that the new value does not change the translation,
            /// caching or exception routing of the code currently running at EL2 in a way that
            /// would invalidate the stack, the heap or any live Rust reference. No context
            /// synchronization is performed; issue an `ISB` if the effect must be visible.
            pub unsafe fn write(val: u64) {
                // SAFETY: The caller upholds the contract above.
                unsafe {
                    asm!(concat!("msr ", stringify!($name), ", {}"), in(reg) val, options(nomem, nostack, preserves_flags));
                }
            }
        }
    };
}

// EL1&0 translation regime.
sys_reg!(sctlr_el1);
sys_reg!(ttbr0_el1);
sys_reg!(ttbr1_el1);
sys_reg!(tcr_el1);
sys_reg!(mair_el1);
sys_reg!(amair_el1);
sys_reg!(contextidr_el1);
sys_reg!(actlr_el1);
sys_reg!(cpacr_el1);

// EL1 fault reporting.
sys_reg!(afsr0_el1);
sys_reg!(afsr1_el1);
sys_reg!(esr_el1);
sys_reg!(far_el1);
sys_reg!(isr_el1, read_only);
sys_reg!(vbar_el1);

// Thread pointers.
sys_reg!(tpidr_el0);
sys_reg!(tpidr_el1);
sys_reg!(tpidrro_el0);

// Virtual timer.
sys_reg!(cntv_tval_el0);
sys_reg!(cntv_ctl_el0);

// EL1 exception state.
sys_reg!(sp_el1);
sys_reg!(elr_el1);
sys_reg!(spsr_el1);

// EL2 configuration.
sys_reg!(hcr_el2);
sys_reg!(vtcr_el2);
